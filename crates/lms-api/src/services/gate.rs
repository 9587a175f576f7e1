//! # Authorization Gate
//!
//! Resolves the actor to a persisted user and decides who may manage a
//! course. Roles are matched explicitly; an admin is not "more" than an
//! instructor, it simply has its own rule.
//!
//! Callers check that the target exists (NotFound) before asking the gate,
//! so an unauthorized caller can still learn that an id is unknown.

use lms_core::Role;

use crate::auth::Actor;
use crate::error::AppError;
use crate::state::{AppState, CourseRecord, UserRecord};

/// The persisted user behind the actor, if any.
pub fn resolve_user(state: &AppState, actor: &Actor) -> Option<UserRecord> {
    actor
        .principal()
        .and_then(|p| state.user_by_email(&p.email))
}

/// Require an authenticated actor that resolves to a registered user.
pub fn require_user(state: &AppState, actor: &Actor) -> Result<UserRecord, AppError> {
    let principal = actor
        .principal()
        .ok_or_else(|| AppError::Unauthorized("authentication required".into()))?;
    state.user_by_email(&principal.email).ok_or_else(|| {
        tracing::debug!(email = %principal.email, "credential does not match a registered user");
        AppError::Unauthorized("unknown user".into())
    })
}

/// Require a resolved user of the student variant.
///
/// `denied` is the Forbidden message for a non-student caller.
pub fn require_student(
    state: &AppState,
    actor: &Actor,
    denied: &str,
) -> Result<UserRecord, AppError> {
    let user = require_user(state, actor)?;
    match user.role() {
        Role::Student => Ok(user),
        Role::Instructor | Role::Admin => {
            tracing::debug!(
                user_id = %user.id,
                role = %user.role(),
                "student-only operation denied"
            );
            Err(AppError::Forbidden(denied.to_string()))
        }
    }
}

/// Whether `user` may manage `course`: an admin, or the owning instructor.
pub fn can_manage_course(user: &UserRecord, course: &CourseRecord) -> bool {
    match user.role() {
        Role::Admin => true,
        Role::Instructor => user.id == course.instructor_id,
        Role::Student => false,
    }
}

/// Require an admin or the instructor who owns `course`.
pub fn require_owner_or_admin(
    state: &AppState,
    actor: &Actor,
    course: &CourseRecord,
) -> Result<UserRecord, AppError> {
    let user = require_user(state, actor)?;
    if can_manage_course(&user, course) {
        Ok(user)
    } else {
        tracing::debug!(user_id = %user.id, course_id = %course.id, "course management denied");
        Err(AppError::Forbidden("not the course owner".into()))
    }
}
