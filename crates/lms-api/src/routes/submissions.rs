//! # Submission API
//!
//! Submission and grading workflow. Students submit an artifact URL per
//! assignment (resubmitting bumps the version); the owning instructor or an
//! admin grades it or requests another version.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use lms_core::validate::{optional_text, required_url, MAX_ARTIFACT_URL_LEN, MAX_FEEDBACK_LEN};
use lms_core::{Page, PageRequest, ValidationError};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::undo_on_failure;
use crate::auth::Actor;
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::services::{gate, submission};
use crate::state::{AppState, SubmissionRecord};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// Absolute URL of the work (repository, document, upload).
    pub artifact_url: String,
}

impl Validate for SubmitRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        required_url("artifact_url", &self.artifact_url, MAX_ARTIFACT_URL_LEN)
    }
}

/// Request to grade a submission. The score bound depends on the
/// assignment and is checked by the workflow, not here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GradeRequest {
    pub score: i64,
    pub feedback: Option<String>,
}

impl Validate for GradeRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        optional_text("feedback", self.feedback.as_deref(), MAX_FEEDBACK_LEN)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ResubmissionRequest {
    pub feedback: Option<String>,
}

impl Validate for ResubmissionRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        optional_text("feedback", self.feedback.as_deref(), MAX_FEEDBACK_LEN)
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/assignments/{assignment_id}/submissions", post(submit))
        .route("/v1/submissions/mine", get(my_submissions))
        .route("/v1/courses/{course_id}/submissions", get(list_by_course))
        .route("/v1/submissions/{id}/grade", patch(grade))
        .route(
            "/v1/submissions/{id}/request-resubmission",
            patch(request_resubmission),
        )
}

/// POST /v1/assignments/{assignment_id}/submissions — Submit or resubmit.
///
/// Returns 201 for every accepted version; the body carries the version.
#[utoipa::path(
    post,
    path = "/v1/assignments/{assignment_id}/submissions",
    params(("assignment_id" = Uuid, Path, description = "Assignment ID")),
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Submission accepted", body = SubmissionRecord),
        (status = 400, description = "Past due", body = crate::error::ErrorBody),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Not a student or not enrolled", body = crate::error::ErrorBody),
        (status = 404, description = "Assignment not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "submissions"
)]
pub(crate) async fn submit(
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
    actor: Actor,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let previous = gate::resolve_user(&state, &actor).and_then(|student| {
        state
            .submissions
            .find(|s| s.assignment_id == assignment_id && s.student_id == student.id)
    });
    let artifact_url = req.artifact_url.trim().to_string();
    let record = submission::submit(&state, assignment_id, artifact_url, &actor)?;
    persist(&state, &record, previous).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/submissions/mine — The calling student's submissions.
#[utoipa::path(
    get,
    path = "/v1/submissions/mine",
    params(
        ("page" = Option<u32>, Query, description = "Zero-based page index (default 0)"),
        ("size" = Option<u32>, Query, description = "Page size, 1 to 100 (default 20)"),
    ),
    responses(
        (status = 200, description = "Page of submissions", body = Page<SubmissionRecord>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a student", body = crate::error::ErrorBody),
    ),
    tag = "submissions"
)]
pub(crate) async fn my_submissions(
    State(state): State<AppState>,
    actor: Actor,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<Page<SubmissionRecord>>, AppError> {
    let page = extract_query(query)?;
    submission::my_submissions(&state, &actor, page).map(Json)
}

/// GET /v1/courses/{course_id}/submissions — Every submission in a course.
#[utoipa::path(
    get,
    path = "/v1/courses/{course_id}/submissions",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("page" = Option<u32>, Query, description = "Zero-based page index (default 0)"),
        ("size" = Option<u32>, Query, description = "Page size, 1 to 100 (default 20)"),
    ),
    responses(
        (status = 200, description = "Page of submissions", body = Page<SubmissionRecord>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
    ),
    tag = "submissions"
)]
pub(crate) async fn list_by_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    actor: Actor,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<Page<SubmissionRecord>>, AppError> {
    let page = extract_query(query)?;
    submission::list_by_course(&state, course_id, &actor, page).map(Json)
}

/// PATCH /v1/submissions/{id}/grade — Score a submission.
#[utoipa::path(
    patch,
    path = "/v1/submissions/{id}/grade",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = GradeRequest,
    responses(
        (status = 200, description = "Submission graded", body = SubmissionRecord),
        (status = 400, description = "Score out of range", body = crate::error::ErrorBody),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Submission not found", body = crate::error::ErrorBody),
    ),
    tag = "submissions"
)]
pub(crate) async fn grade(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    body: Result<Json<GradeRequest>, JsonRejection>,
) -> Result<Json<SubmissionRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let previous = state.submissions.get(&id);
    let record = submission::grade(&state, id, req.score, req.feedback, &actor)?;
    persist(&state, &record, previous).await?;
    Ok(Json(record))
}

/// PATCH /v1/submissions/{id}/request-resubmission — Ask for another version.
#[utoipa::path(
    patch,
    path = "/v1/submissions/{id}/request-resubmission",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = ResubmissionRequest,
    responses(
        (status = 200, description = "Resubmission requested", body = SubmissionRecord),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorBody),
        (status = 403, description = "Not the course owner", body = crate::error::ErrorBody),
        (status = 404, description = "Submission not found", body = crate::error::ErrorBody),
    ),
    tag = "submissions"
)]
pub(crate) async fn request_resubmission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: Actor,
    body: Result<Json<ResubmissionRequest>, JsonRejection>,
) -> Result<Json<SubmissionRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let previous = state.submissions.get(&id);
    let record = submission::request_resubmission(&state, id, req.feedback, &actor)?;
    persist(&state, &record, previous).await?;
    Ok(Json(record))
}

/// Write `record` through. A refused first submission is dropped; a refused
/// later version or grading puts `previous` back.
async fn persist(
    state: &AppState,
    record: &SubmissionRecord,
    previous: Option<SubmissionRecord>,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        let written = crate::db::submissions::upsert(pool, record).await;
        undo_on_failure(&state.submissions, "submission", record.id, previous, written)?;
    }
    Ok(())
}
