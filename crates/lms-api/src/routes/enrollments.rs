//! # Enrollment API
//!
//! Students enroll in published courses and cancel their own enrollments.
//! The owning instructor or an admin marks an enrollment complete.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use lms_core::{Page, PageRequest};
use uuid::Uuid;

use super::undo_on_failure;
use crate::auth::Actor;
use crate::error::AppError;
use crate::extractors::extract_query;
use crate::services::enrollment;
use crate::state::{AppState, EnrollmentRecord};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/courses/{course_id}/enroll", post(enroll))
        .route("/v1/enrollments", get(my_enrollments))
        .route("/v1/enrollments/{id}/cancel", patch(cancel))
        .route("/v1/enrollments/{id}/complete", patch(complete))
}

/// POST /v1/courses/{course_id}/enroll — Enroll the calling student.
#[utoipa::path(
    post,
    path = "/v1/courses/{course_id}/enroll",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentRecord),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a student", body = crate::error::ErrorBody),
        (status = 404, description = "Course not found or not published", body = crate::error::ErrorBody),
        (status = 409, description = "Already enrolled", body = crate::error::ErrorBody),
    ),
    tag = "enrollments"
)]
pub(crate) async fn enroll(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    actor: Actor,
) -> Result<(StatusCode, Json<EnrollmentRecord>), AppError> {
    let record = enrollment::enroll(&state, course_id, &actor)?;

    // A unique violation here means another instance enrolled the same
    // student first; it surfaces as Conflict.
    persist(&state, &record, None).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/enrollments — The calling student's enrollments, newest first.
#[utoipa::path(
    get,
    path = "/v1/enrollments",
    params(
        ("page" = Option<u32>, Query, description = "Zero-based page index (default 0)"),
        ("size" = Option<u32>, Query, description = "Page size, 1 to 100 (default 20)"),
    ),
    responses(
        (status = 200, description = "Page of enrollments", body = Page<EnrollmentRecord>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a student", body = crate::error::ErrorBody),
    ),
    tag = "enrollments"
)]
pub(crate) async fn my_enrollments(
    State(state): State<AppState>,
    actor: Actor,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<Page<EnrollmentRecord>>, AppError> {
    let page = extract_query(query)?;
    enrollment::my_enrollments(&state, &actor, page).map(Json)
}

/// PATCH /v1/enrollments/{id}/cancel — Cancel one of the caller's enrollments.
#[utoipa::path(
    patch,
    path = "/v1/enrollments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment cancelled", body = EnrollmentRecord),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 404, description = "Enrollment not found", body = crate::error::ErrorBody),
    ),
    tag = "enrollments"
)]
pub(crate) async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<EnrollmentRecord>, AppError> {
    let previous = state.enrollments.get(&id);
    let record = enrollment::cancel(&state, id, &actor)?;
    persist(&state, &record, previous).await?;
    Ok(Json(record))
}

/// PATCH /v1/enrollments/{id}/complete — Mark an enrollment complete.
#[utoipa::path(
    patch,
    path = "/v1/enrollments/{id}/complete",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment completed", body = EnrollmentRecord),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Enrollment not found", body = crate::error::ErrorBody),
    ),
    tag = "enrollments"
)]
pub(crate) async fn complete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
) -> Result<Json<EnrollmentRecord>, AppError> {
    let previous = state.enrollments.get(&id);
    let record = enrollment::complete_by_staff(&state, id, &actor)?;
    persist(&state, &record, previous).await?;
    Ok(Json(record))
}

/// Write `record` through, restoring `previous` (or dropping a new row)
/// when the database refuses it.
async fn persist(
    state: &AppState,
    record: &EnrollmentRecord,
    previous: Option<EnrollmentRecord>,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        let written = crate::db::enrollments::upsert(pool, record).await;
        undo_on_failure(&state.enrollments, "enrollment", record.id, previous, written)?;
    }
    Ok(())
}
