//! # User Registration API
//!
//! Self-registration for students and instructors, and a `whoami` endpoint
//! that resolves the bearer credential to the registered user.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lms_core::validate::{len_between, optional_text, MAX_FULL_NAME_LEN, MIN_FULL_NAME_LEN};
use lms_core::{Email, Role, ValidationError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::services::users;
use crate::state::{AppState, UserKind, UserRecord};

/// Role a caller may register with. Admins are provisioned, never registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationRole {
    #[default]
    Student,
    Instructor,
}

/// Request to register a new account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    /// Defaults to `STUDENT`.
    #[serde(default)]
    pub role: RegistrationRole,
    pub student_number: Option<String>,
    pub bio: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Email::parse(&self.email)?;
        len_between(
            "full_name",
            &self.full_name,
            MIN_FULL_NAME_LEN,
            MAX_FULL_NAME_LEN,
        )?;
        optional_text("student_number", self.student_number.as_deref(), 64)?;
        optional_text("bio", self.bio.as_deref(), 2_000)
    }
}

/// Public view of a user. The role is flattened out of the variant.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        let role = user.role();
        let (student_number, bio) = match user.kind {
            UserKind::Student { student_number } => (student_number, None),
            UserKind::Instructor { bio } => (None, bio),
            UserKind::Admin => (None, None),
        };
        Self {
            id: user.id,
            email: user.email.to_string(),
            full_name: user.full_name,
            role,
            student_number,
            bio,
            created_at: user.created_at,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/whoami", get(whoami))
}

/// POST /v1/auth/register — Register a student or instructor.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserView),
        (status = 409, description = "E-mail already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let req = extract_validated_json(body)?;
    let email = Email::parse(&req.email)?;
    let kind = match req.role {
        RegistrationRole::Student => UserKind::Student {
            student_number: req.student_number,
        },
        RegistrationRole::Instructor => UserKind::Instructor { bio: req.bio },
    };

    let record = users::register(&state, email, req.full_name, kind)?;

    if let Some(pool) = &state.db_pool {
        let written = crate::db::users::upsert(pool, &record).await;
        super::undo_on_failure(&state.users, "user", record.id, None, written)?;
    }

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /v1/auth/whoami — The registered user behind the bearer credential.
#[utoipa::path(
    get,
    path = "/v1/auth/whoami",
    responses(
        (status = 200, description = "Current user", body = UserView),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
pub(crate) async fn whoami(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<UserView>, AppError> {
    users::whoami(&state, &actor).map(|u| Json(u.into()))
}
