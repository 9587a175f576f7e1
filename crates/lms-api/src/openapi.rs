//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1
//! document served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer credential scheme to the document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "`Bearer <email>:<secret>`, or `Bearer <email>` when \
                             LMS_AUTH_SECRET is unset.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LMS API",
        description = "Course authoring, enrollment lifecycle, submission and grading workflow.\n\nAnonymous callers may browse published courses. Every other operation resolves the bearer credential to a registered user and checks its role.",
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Users ────────────────────────────────────────────────────────
        crate::routes::users::register,
        crate::routes::users::whoami,
        // ── Courses ──────────────────────────────────────────────────────
        crate::routes::courses::list_courses,
        crate::routes::courses::create_course,
        crate::routes::courses::get_course,
        crate::routes::courses::update_course,
        crate::routes::courses::delete_course,
        // ── Lessons ──────────────────────────────────────────────────────
        crate::routes::courses::list_lessons,
        crate::routes::courses::add_lesson,
        crate::routes::courses::update_lesson,
        crate::routes::courses::delete_lesson,
        // ── Assignments ──────────────────────────────────────────────────
        crate::routes::courses::list_assignments,
        crate::routes::courses::add_assignment,
        crate::routes::courses::update_assignment,
        crate::routes::courses::delete_assignment,
        // ── Enrollments ──────────────────────────────────────────────────
        crate::routes::enrollments::enroll,
        crate::routes::enrollments::my_enrollments,
        crate::routes::enrollments::cancel,
        crate::routes::enrollments::complete,
        // ── Submissions ──────────────────────────────────────────────────
        crate::routes::submissions::submit,
        crate::routes::submissions::my_submissions,
        crate::routes::submissions::list_by_course,
        crate::routes::submissions::grade,
        crate::routes::submissions::request_resubmission,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::users::RegisterRequest,
        crate::routes::users::RegistrationRole,
        crate::routes::users::UserView,
        crate::routes::courses::CreateCourseRequest,
        crate::routes::courses::UpdateCourseRequest,
        crate::routes::courses::LessonRequest,
        crate::routes::courses::CreateAssignmentRequest,
        crate::routes::courses::AssignmentBody,
        crate::routes::submissions::SubmitRequest,
        crate::routes::submissions::GradeRequest,
        crate::routes::submissions::ResubmissionRequest,
        crate::state::CourseRecord,
        crate::state::LessonRecord,
        crate::state::AssignmentRecord,
        crate::state::EnrollmentRecord,
        crate::state::SubmissionRecord,
        lms_core::Role,
        lms_state::CourseStatus,
        lms_state::CoursePublication,
        lms_state::EnrollmentStatus,
        lms_state::SubmissionStatus,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and identity"),
        (name = "courses", description = "Course catalogue and authoring"),
        (name = "lessons", description = "Lessons of a course"),
        (name = "assignments", description = "Assignments of a course"),
        (name = "enrollments", description = "Enrollment lifecycle"),
        (name = "submissions", description = "Submission and grading workflow"),
    )
)]
pub struct ApiDoc;

/// Router serving the generated document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/v1/auth/register",
            "/v1/courses",
            "/v1/courses/{course_id}",
            "/v1/courses/{course_id}/lessons/{lesson_id}",
            "/v1/courses/{course_id}/enroll",
            "/v1/submissions/{id}/grade",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }
}
