//! # Course API
//!
//! Catalogue of published courses, course authoring, and the lessons and
//! assignments beneath a course. Metadata of a published course is public;
//! lessons and assignments are gated on ownership or an active enrollment.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lms_core::validate::{
    in_range, optional_text, optional_url, required_in_range, required_text,
    MAX_CONTENT_URL_LEN, MAX_DESCRIPTION_LEN, MAX_INSTRUCTIONS_LEN, MAX_MAX_POINTS,
    MAX_ORDER_INDEX, MAX_TITLE_LEN, MIN_MAX_POINTS, MIN_ORDER_INDEX,
};
use lms_core::{Page, PageRequest, ValidationError};
use lms_state::CourseStatus;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{persist_error, undo_on_failure};
use crate::auth::Actor;
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::services::course::{self as authoring, AssignmentFields, LessonFields, Removed};
use crate::services::visibility;
use crate::state::{AppState, AssignmentRecord, CourseRecord, LessonRecord};

// -- Request DTOs -------------------------------------------------------------

/// Request to create a course. New courses start as drafts.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: Option<String>,
}

impl Validate for CreateCourseRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        required_text("title", &self.title, MAX_TITLE_LEN)?;
        optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
    }
}

/// Full replacement of a course's editable fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCourseRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: CourseStatus,
}

impl Validate for UpdateCourseRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        required_text("title", &self.title, MAX_TITLE_LEN)?;
        optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LessonRequest {
    pub title: String,
    /// Absolute URL of the lesson material.
    pub content_url: Option<String>,
    /// Position within the course, 1 to 10000. Duplicates and gaps are allowed.
    pub order_index: Option<i64>,
}

impl Validate for LessonRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        required_text("title", &self.title, MAX_TITLE_LEN)?;
        optional_url("content_url", self.content_url.as_deref(), MAX_CONTENT_URL_LEN)?;
        required_in_range("order_index", self.order_index, MIN_ORDER_INDEX, MAX_ORDER_INDEX)
    }
}

impl LessonRequest {
    fn into_fields(self) -> Result<LessonFields, AppError> {
        let order_index = self
            .order_index
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(|| AppError::Validation("order_index is out of range".into()))?;
        Ok(LessonFields {
            title: self.title,
            content_url: self.content_url.map(|u| u.trim().to_string()),
            order_index,
        })
    }
}

/// Request to add an assignment to one of the course's lessons.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAssignmentRequest {
    pub lesson_id: Uuid,
    #[serde(flatten)]
    pub fields: AssignmentBody,
}

impl Validate for CreateAssignmentRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        self.fields.validate()
    }
}

/// Editable assignment fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignmentBody {
    pub title: String,
    pub instructions: Option<String>,
    pub max_points: i64,
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub allow_late: bool,
}

impl Validate for AssignmentBody {
    fn validate(&self) -> Result<(), ValidationError> {
        required_text("title", &self.title, MAX_TITLE_LEN)?;
        optional_text(
            "instructions",
            self.instructions.as_deref(),
            MAX_INSTRUCTIONS_LEN,
        )?;
        in_range("max_points", self.max_points, MIN_MAX_POINTS, MAX_MAX_POINTS)
    }
}

impl AssignmentBody {
    fn into_fields(self) -> Result<AssignmentFields, AppError> {
        let max_points = i32::try_from(self.max_points)
            .map_err(|_| AppError::Validation("max_points is out of range".into()))?;
        Ok(AssignmentFields {
            title: self.title,
            instructions: self.instructions,
            max_points,
            due_at: self.due_at,
            allow_late: self.allow_late,
        })
    }
}

// -- Router -------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/courses", get(list_courses).post(create_course))
        .route(
            "/v1/courses/{course_id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route(
            "/v1/courses/{course_id}/lessons",
            get(list_lessons).post(add_lesson),
        )
        .route(
            "/v1/courses/{course_id}/lessons/{lesson_id}",
            put(update_lesson).delete(delete_lesson),
        )
        .route(
            "/v1/courses/{course_id}/assignments",
            get(list_assignments).post(add_assignment),
        )
        .route(
            "/v1/courses/{course_id}/assignments/{assignment_id}",
            put(update_assignment).delete(delete_assignment),
        )
}

// -- Courses ------------------------------------------------------------------

/// GET /v1/courses — Published courses, newest first.
#[utoipa::path(
    get,
    path = "/v1/courses",
    params(
        ("page" = Option<u32>, Query, description = "Zero-based page index (default 0)"),
        ("size" = Option<u32>, Query, description = "Page size, 1 to 100 (default 20)"),
    ),
    responses(
        (status = 200, description = "Page of published courses", body = Page<CourseRecord>),
    ),
    tag = "courses"
)]
pub(crate) async fn list_courses(
    State(state): State<AppState>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<Page<CourseRecord>>, AppError> {
    let page = extract_query(query)?;
    Ok(Json(authoring::list_published(&state, page)))
}

/// POST /v1/courses — Create a draft course owned by the calling instructor.
#[utoipa::path(
    post,
    path = "/v1/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseRecord),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not an instructor", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "courses"
)]
pub(crate) async fn create_course(
    State(state): State<AppState>,
    actor: Actor,
    body: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CourseRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let record = authoring::create_course(&state, req.title, req.description, &actor)?;

    if let Some(pool) = &state.db_pool {
        let written = crate::db::courses::upsert(pool, &record).await;
        undo_on_failure(&state.courses, "course", record.id, None, written)?;
    }

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/courses/{course_id} — Course metadata. Drafts are hidden from
/// everyone but their owner and admins.
#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course found", body = CourseRecord),
        (status = 404, description = "Not found or not visible", body = crate::error::ErrorBody),
    ),
    tag = "courses"
)]
pub(crate) async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<CourseRecord>, AppError> {
    visibility::resolve_course_read(&state, course_id, &actor).map(Json)
}

/// PUT /v1/courses/{course_id} — Update title, description and status.
#[utoipa::path(
    put,
    path = "/v1/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseRecord),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "courses"
)]
pub(crate) async fn update_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    actor: Actor,
    body: Result<Json<UpdateCourseRequest>, JsonRejection>,
) -> Result<Json<CourseRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let previous = state.courses.get(&course_id);
    let record = authoring::update_course(
        &state,
        course_id,
        req.title,
        req.description,
        req.status,
        &actor,
    )?;

    if let Some(pool) = &state.db_pool {
        let written = crate::db::courses::upsert(pool, &record).await;
        undo_on_failure(&state.courses, "course", record.id, previous, written)?;
    }

    Ok(Json(record))
}

/// DELETE /v1/courses/{course_id} — Delete a course and everything under it.
#[utoipa::path(
    delete,
    path = "/v1/courses/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course not found", body = crate::error::ErrorBody),
    ),
    tag = "courses"
)]
pub(crate) async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    actor: Actor,
) -> Result<StatusCode, AppError> {
    let removed = authoring::delete_course(&state, course_id, &actor)?;

    if let Some(pool) = &state.db_pool {
        let deleted = crate::db::courses::delete(pool, course_id).await;
        undo_delete(&state, "course", course_id, removed, deleted)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

// -- Lessons ------------------------------------------------------------------

/// GET /v1/courses/{course_id}/lessons — Lessons ordered by `order_index`.
#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}/lessons",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Lessons of the course", body = Vec<LessonRecord>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Not enrolled or not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course not found", body = crate::error::ErrorBody),
    ),
    tag = "lessons"
)]
pub(crate) async fn list_lessons(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<Vec<LessonRecord>>, AppError> {
    visibility::list_lessons(&state, course_id, &actor).map(Json)
}

#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/lessons",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    request_body = LessonRequest,
    responses(
        (status = 201, description = "Lesson added", body = LessonRecord),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "lessons"
)]
pub(crate) async fn add_lesson(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    actor: Actor,
    body: Result<Json<LessonRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LessonRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let record = authoring::add_lesson(&state, course_id, req.into_fields()?, &actor)?;

    if let Some(pool) = &state.db_pool {
        let written = crate::db::courses::upsert_lesson(pool, &record).await;
        undo_on_failure(&state.lessons, "lesson", record.id, None, written)?;
    }

    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/v1/courses/{course_id}/lessons/{lesson_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("lesson_id" = Uuid, Path, description = "Lesson ID"),
    ),
    request_body = LessonRequest,
    responses(
        (status = 200, description = "Lesson updated", body = LessonRecord),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course or lesson not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "lessons"
)]
pub(crate) async fn update_lesson(
    State(state): State<AppState>,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
    body: Result<Json<LessonRequest>, JsonRejection>,
) -> Result<Json<LessonRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let previous = state.lessons.get(&lesson_id);
    let record =
        authoring::update_lesson(&state, course_id, lesson_id, req.into_fields()?, &actor)?;

    if let Some(pool) = &state.db_pool {
        let written = crate::db::courses::upsert_lesson(pool, &record).await;
        undo_on_failure(&state.lessons, "lesson", record.id, previous, written)?;
    }

    Ok(Json(record))
}

/// DELETE /v1/courses/{course_id}/lessons/{lesson_id} — Also removes the
/// lesson's assignments and their submissions.
#[utoipa::path(
    delete,
    path = "/v1/courses/{course_id}/lessons/{lesson_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("lesson_id" = Uuid, Path, description = "Lesson ID"),
    ),
    responses(
        (status = 204, description = "Lesson deleted"),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course or lesson not found", body = crate::error::ErrorBody),
    ),
    tag = "lessons"
)]
pub(crate) async fn delete_lesson(
    State(state): State<AppState>,
    Path((course_id, lesson_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
) -> Result<StatusCode, AppError> {
    let removed = authoring::delete_lesson(&state, course_id, lesson_id, &actor)?;

    if let Some(pool) = &state.db_pool {
        let deleted = crate::db::courses::delete_lesson(pool, lesson_id).await;
        undo_delete(&state, "lesson", lesson_id, removed, deleted)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

// -- Assignments --------------------------------------------------------------

/// GET /v1/courses/{course_id}/assignments — Assignments across all lessons.
#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}/assignments",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Assignments of the course", body = Vec<AssignmentRecord>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Not enrolled or not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course not found", body = crate::error::ErrorBody),
    ),
    tag = "assignments"
)]
pub(crate) async fn list_assignments(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<Vec<AssignmentRecord>>, AppError> {
    visibility::list_assignments(&state, course_id, &actor).map(Json)
}

#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/assignments",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    request_body = CreateAssignmentRequest,
    responses(
        (status = 201, description = "Assignment added", body = AssignmentRecord),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course or lesson not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "assignments"
)]
pub(crate) async fn add_assignment(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    actor: Actor,
    body: Result<Json<CreateAssignmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AssignmentRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let fields = req.fields.into_fields()?;
    let record = authoring::add_assignment(&state, course_id, req.lesson_id, fields, &actor)?;

    if let Some(pool) = &state.db_pool {
        let written = crate::db::courses::upsert_assignment(pool, &record).await;
        undo_on_failure(&state.assignments, "assignment", record.id, None, written)?;
    }

    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/v1/courses/{course_id}/assignments/{assignment_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("assignment_id" = Uuid, Path, description = "Assignment ID"),
    ),
    request_body = AssignmentBody,
    responses(
        (status = 200, description = "Assignment updated", body = AssignmentRecord),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course or assignment not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "assignments"
)]
pub(crate) async fn update_assignment(
    State(state): State<AppState>,
    Path((course_id, assignment_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
    body: Result<Json<AssignmentBody>, JsonRejection>,
) -> Result<Json<AssignmentRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let previous = state.assignments.get(&assignment_id);
    let record = authoring::update_assignment(
        &state,
        course_id,
        assignment_id,
        req.into_fields()?,
        &actor,
    )?;

    if let Some(pool) = &state.db_pool {
        let written = crate::db::courses::upsert_assignment(pool, &record).await;
        undo_on_failure(&state.assignments, "assignment", record.id, previous, written)?;
    }

    Ok(Json(record))
}

/// DELETE /v1/courses/{course_id}/assignments/{assignment_id} — Also removes
/// the assignment's submissions.
#[utoipa::path(
    delete,
    path = "/v1/courses/{course_id}/assignments/{assignment_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("assignment_id" = Uuid, Path, description = "Assignment ID"),
    ),
    responses(
        (status = 204, description = "Assignment deleted"),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Course or assignment not found", body = crate::error::ErrorBody),
    ),
    tag = "assignments"
)]
pub(crate) async fn delete_assignment(
    State(state): State<AppState>,
    Path((course_id, assignment_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
) -> Result<StatusCode, AppError> {
    let removed = authoring::delete_assignment(&state, course_id, assignment_id, &actor)?;

    if let Some(pool) = &state.db_pool {
        let deleted = crate::db::courses::delete_assignment(pool, assignment_id).await;
        undo_delete(&state, "assignment", assignment_id, removed, deleted)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Put the rows a delete removed back when the database delete failed.
fn undo_delete(
    state: &AppState,
    entity: &'static str,
    id: Uuid,
    removed: Removed,
    deleted: Result<bool, sqlx::Error>,
) -> Result<(), AppError> {
    match deleted {
        Ok(_) => Ok(()),
        Err(err) => {
            removed.restore(state);
            Err(persist_error(entity, id, err))
        }
    }
}
