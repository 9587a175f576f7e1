//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! The in-memory stores are the system of record while a request runs:
//! - **Users**: registered identities and their closed role variant
//! - **Courses / Lessons / Assignments**: authored content, owned top-down
//! - **Enrollments**: one row per (student, course)
//! - **Submissions**: one row per (assignment, student)
//!
//! When a database pool is configured, every mutation is written through to
//! Postgres and the stores are hydrated from it on startup.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lms_core::{Email, Role};
use lms_state::{CoursePublication, Enrollment, LatePolicy, Submission};
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because we never hold the lock across `.await` points. `parking_lot::RwLock`
/// is non-poisonable, so a panicking writer does not wedge the store.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// First record matching `pred`.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// All records matching `pred`.
    pub fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Whether any record matches `pred`.
    pub fn exists(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.data.read().values().any(pred)
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure receives a `&mut T` and may inspect the current state,
    /// validate preconditions, mutate the record, and return `Ok(R)` or
    /// `Err(E)`. The entire operation runs under a single write lock.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Insert a record unless one with the same composite key exists.
    ///
    /// `make` sees the existing record for the key (if any) and decides
    /// whether to build a new one. Lookup and insert share one write lock,
    /// so two concurrent callers cannot both create a row for the same key.
    pub fn insert_unique<E>(
        &self,
        id: Uuid,
        same_key: impl Fn(&T) -> bool,
        make: impl FnOnce(Option<&T>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard = self.data.write();
        let existing = guard.values().find(|v| same_key(v));
        let value = make(existing)?;
        guard.insert(id, value.clone());
        Ok(value)
    }

    /// Update the record with the given composite key, or create it.
    ///
    /// Runs under one write lock, so the key stays unique under concurrency.
    pub fn upsert(
        &self,
        same_key: impl Fn(&T) -> bool,
        update: impl FnOnce(&mut T),
        create: impl FnOnce() -> (Uuid, T),
    ) -> T {
        let mut guard = self.data.write();
        if let Some(entry) = guard.values_mut().find(|v| same_key(v)) {
            update(entry);
            return entry.clone();
        }
        let (id, value) = create();
        guard.insert(id, value.clone());
        value
    }

    /// Put the entry for `id` back to `previous`, removing it when `None`.
    pub fn restore(&self, id: Uuid, previous: Option<T>) {
        let mut guard = self.data.write();
        match previous {
            Some(value) => {
                guard.insert(id, value);
            }
            None => {
                guard.remove(&id);
            }
        }
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Remove every record matching `pred`, returning what was removed.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut guard = self.data.write();
        let ids: Vec<Uuid> = guard
            .iter()
            .filter(|(_, v)| pred(v))
            .map(|(id, _)| *id)
            .collect();
        ids.iter().filter_map(|id| guard.remove(id)).collect()
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Record Types -------------------------------------------------------------

/// Role-specific part of a user. The role is derived from the variant, so
/// the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserKind {
    Student { student_number: Option<String> },
    Instructor { bio: Option<String> },
    Admin,
}

impl UserKind {
    pub fn role(&self) -> Role {
        match self {
            Self::Student { .. } => Role::Student,
            Self::Instructor { .. } => Role::Instructor,
            Self::Admin => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: Email,
    pub full_name: String,
    pub kind: UserKind,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn role(&self) -> Role {
        self.kind.role()
    }
}

/// Course record. Exactly one instructor owns each course.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseRecord {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Publication status and timestamp.
    #[serde(flatten)]
    pub publication: CoursePublication,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseRecord {
    pub fn is_published(&self) -> bool {
        self.publication.is_published()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LessonRecord {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    /// Where the lesson material lives. Only visible through the gated listing.
    pub content_url: Option<String>,
    /// Caller-assigned position, at least 1. Duplicates and gaps are allowed.
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

/// Assignment record. Its course is reached through the parent lesson.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignmentRecord {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub title: String,
    pub instructions: Option<String>,
    pub max_points: i32,
    pub due_at: Option<DateTime<Utc>>,
    pub allow_late: bool,
    pub created_at: DateTime<Utc>,
}

impl AssignmentRecord {
    pub fn late_policy(&self) -> LatePolicy {
        LatePolicy {
            due_at: self.due_at,
            allow_late: self.allow_late,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    #[serde(flatten)]
    pub lifecycle: Enrollment,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    #[serde(flatten)]
    pub lifecycle: Submission,
}

// -- Application State --------------------------------------------------------

/// Application configuration, read once from the environment at startup.
///
/// Custom `Debug` redacts the `auth_secret` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared secret for bearer credentials. When `None`, `Bearer <email>`
    /// is trusted as is (development mode).
    pub auth_secret: Option<String>,
    /// E-mail of the admin account created on startup if absent.
    pub admin_email: Option<String>,
}

impl AppConfig {
    /// Read `PORT`, `LMS_AUTH_SECRET` and `LMS_ADMIN_EMAIL`.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            port,
            auth_secret: non_empty("LMS_AUTH_SECRET"),
            admin_email: non_empty("LMS_ADMIN_EMAIL"),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_secret",
                &self.auth_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("admin_email", &self.admin_email)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_secret: None,
            admin_email: None,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Store<UserRecord>,
    pub courses: Store<CourseRecord>,
    pub lessons: Store<LessonRecord>,
    pub assignments: Store<AssignmentRecord>,
    pub enrollments: Store<EnrollmentRecord>,
    pub submissions: Store<SubmissionRecord>,

    /// PostgreSQL connection pool for write-through persistence.
    /// When `None`, the API operates in in-memory-only mode.
    pub db_pool: Option<PgPool>,

    /// Prometheus recorder handle backing `/metrics`, when installed.
    pub metrics: Option<PrometheusHandle>,

    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("users", &self.users.len())
            .field("courses", &self.courses.len())
            .field("enrollments", &self.enrollments.len())
            .field("submissions", &self.submissions.len())
            .field("db_pool", &self.db_pool.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// State with the given configuration and optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            users: Store::new(),
            courses: Store::new(),
            lessons: Store::new(),
            assignments: Store::new(),
            enrollments: Store::new(),
            submissions: Store::new(),
            db_pool,
            metrics: None,
            config,
        }
    }

    /// Attach the Prometheus handle rendered by `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Look up a user by e-mail.
    pub fn user_by_email(&self, email: &Email) -> Option<UserRecord> {
        self.users.find(|u| &u.email == email)
    }

    /// Course that owns an assignment, through its lesson.
    pub fn course_of_assignment(&self, assignment: &AssignmentRecord) -> Option<CourseRecord> {
        let lesson = self.lessons.get(&assignment.lesson_id)?;
        self.courses.get(&lesson.course_id)
    }

    /// Status of the enrollment for (student, course), if a row exists.
    pub fn enrollment_of(&self, student_id: Uuid, course_id: Uuid) -> Option<EnrollmentRecord> {
        self.enrollments
            .find(|e| e.student_id == student_id && e.course_id == course_id)
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available. Read
    /// operations stay synchronous against the stores afterwards.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let users = crate::db::users::load_all(pool).await?;
        let user_count = users.len();
        for record in users {
            self.users.insert(record.id, record);
        }

        let courses = crate::db::courses::load_all(pool).await?;
        let course_count = courses.len();
        for record in courses {
            self.courses.insert(record.id, record);
        }
        for record in crate::db::courses::load_all_lessons(pool).await? {
            self.lessons.insert(record.id, record);
        }
        for record in crate::db::courses::load_all_assignments(pool).await? {
            self.assignments.insert(record.id, record);
        }

        let enrollments = crate::db::enrollments::load_all(pool).await?;
        let enrollment_count = enrollments.len();
        for record in enrollments {
            self.enrollments.insert(record.id, record);
        }

        let submissions = crate::db::submissions::load_all(pool).await?;
        let submission_count = submissions.len();
        for record in submissions {
            self.submissions.insert(record.id, record);
        }

        tracing::info!(
            users = user_count,
            courses = course_count,
            lessons = self.lessons.len(),
            assignments = self.assignments.len(),
            enrollments = enrollment_count,
            submissions = submission_count,
            "hydrated in-memory stores from database"
        );
        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
