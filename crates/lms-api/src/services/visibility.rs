//! # Course Visibility
//!
//! Two read rules:
//!
//! - **Course metadata.** A published course is readable by anyone,
//!   anonymous callers included. A draft is readable by an admin or its
//!   owner; to everyone else it does not exist (NotFound, never Forbidden).
//! - **Course content** (lessons and assignments). A draft course is gated
//!   like a management operation. For a published course the owner and
//!   admins pass, and a student needs an `Active` enrollment. Everyone else
//!   is Forbidden.

use lms_core::Role;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::services::gate::{can_manage_course, require_owner_or_admin, resolve_user};
use crate::state::{AppState, AssignmentRecord, CourseRecord, LessonRecord};

/// Read a course's metadata, hiding drafts from anyone who cannot manage them.
pub fn resolve_course_read(
    state: &AppState,
    course_id: Uuid,
    actor: &Actor,
) -> Result<CourseRecord, AppError> {
    let course = state
        .courses
        .get(&course_id)
        .ok_or_else(|| AppError::not_found("course"))?;
    if course.is_published() {
        return Ok(course);
    }
    match resolve_user(state, actor) {
        Some(user) if can_manage_course(&user, &course) => Ok(course),
        _ => Err(AppError::not_found("course")),
    }
}

/// Check that the actor may read lessons and assignments of a course.
pub fn require_content_access(
    state: &AppState,
    course_id: Uuid,
    actor: &Actor,
) -> Result<CourseRecord, AppError> {
    let course = state
        .courses
        .get(&course_id)
        .ok_or_else(|| AppError::not_found("course"))?;

    if !course.is_published() {
        require_owner_or_admin(state, actor, &course)?;
        return Ok(course);
    }

    let user = resolve_user(state, actor)
        .ok_or_else(|| AppError::Forbidden("must be enrolled to access lessons".into()))?;
    match user.role() {
        Role::Admin => Ok(course),
        Role::Instructor if user.id == course.instructor_id => Ok(course),
        Role::Instructor => Err(AppError::Forbidden("not the course owner".into())),
        Role::Student => {
            let enrollment = state.enrollment_of(user.id, course.id);
            lms_state::require_active(enrollment.as_ref().map(|e| &e.lifecycle))?;
            Ok(course)
        }
    }
}

/// Lessons of a course ordered by `order_index`, subject to the content rule.
pub fn list_lessons(
    state: &AppState,
    course_id: Uuid,
    actor: &Actor,
) -> Result<Vec<LessonRecord>, AppError> {
    let course = require_content_access(state, course_id, actor)?;
    Ok(lessons_of(state, course.id))
}

/// Assignments of a course across all its lessons, subject to the content rule.
pub fn list_assignments(
    state: &AppState,
    course_id: Uuid,
    actor: &Actor,
) -> Result<Vec<AssignmentRecord>, AppError> {
    let course = require_content_access(state, course_id, actor)?;
    Ok(assignments_of(state, course.id))
}

pub(crate) fn lessons_of(state: &AppState, course_id: Uuid) -> Vec<LessonRecord> {
    let mut lessons = state.lessons.filter(|l| l.course_id == course_id);
    lessons.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then(a.created_at.cmp(&b.created_at))
    });
    lessons
}

pub(crate) fn assignments_of(state: &AppState, course_id: Uuid) -> Vec<AssignmentRecord> {
    let lesson_ids: Vec<Uuid> = lessons_of(state, course_id).iter().map(|l| l.id).collect();
    let mut assignments = state
        .assignments
        .filter(|a| lesson_ids.contains(&a.lesson_id));
    assignments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::*;
    use lms_state::{Enrollment, EnrollmentStatus};

    #[test]
    fn published_course_is_public() {
        let state = AppState::new();
        let course = published_course(&state, &instructor(&state, "i@school.edu"));
        assert!(resolve_course_read(&state, course.id, &Actor::anonymous()).is_ok());
    }

    #[test]
    fn draft_is_hidden_from_everyone_but_owner_and_admin() {
        let state = AppState::new();
        let owner = instructor(&state, "i@school.edu");
        instructor(&state, "other@school.edu");
        student(&state, "s@school.edu");
        admin(&state, "root@school.edu");
        let course = draft_course(&state, &owner);

        for who in [
            Actor::anonymous(),
            actor("s@school.edu"),
            actor("other@school.edu"),
            actor("ghost@school.edu"),
        ] {
            let err = resolve_course_read(&state, course.id, &who).unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)), "{who:?}");
        }
        assert!(resolve_course_read(&state, course.id, &actor("i@school.edu")).is_ok());
        assert!(resolve_course_read(&state, course.id, &actor("root@school.edu")).is_ok());
    }

    #[test]
    fn missing_course_is_not_found() {
        let state = AppState::new();
        let err = resolve_course_read(&state, Uuid::new_v4(), &Actor::anonymous()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = list_lessons(&state, Uuid::new_v4(), &Actor::anonymous()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn draft_content_uses_management_gate() {
        let state = AppState::new();
        let course = draft_course(&state, &instructor(&state, "i@school.edu"));
        student(&state, "s@school.edu");
        assert!(matches!(
            list_lessons(&state, course.id, &Actor::anonymous()),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            list_lessons(&state, course.id, &actor("s@school.edu")),
            Err(AppError::Forbidden(_))
        ));
        assert!(list_lessons(&state, course.id, &actor("i@school.edu")).is_ok());
    }

    #[test]
    fn published_content_requires_active_enrollment() {
        let state = AppState::new();
        let course = published_course(&state, &instructor(&state, "i@school.edu"));
        let s = student(&state, "s@school.edu");
        let who = actor("s@school.edu");

        assert!(matches!(
            list_assignments(&state, course.id, &who),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            list_lessons(&state, course.id, &Actor::anonymous()),
            Err(AppError::Forbidden(_))
        ));

        let mut lifecycle = Enrollment::begin(None, chrono::Utc::now()).unwrap();
        let id = Uuid::new_v4();
        state.enrollments.insert(
            id,
            crate::state::EnrollmentRecord {
                id,
                student_id: s.id,
                course_id: course.id,
                lifecycle: lifecycle.clone(),
            },
        );
        assert!(list_lessons(&state, course.id, &who).is_ok());

        lifecycle.cancel(chrono::Utc::now());
        state.enrollments.update(&id, |e| e.lifecycle = lifecycle.clone());
        assert_eq!(
            state.enrollments.get(&id).unwrap().lifecycle.status,
            EnrollmentStatus::Cancelled
        );
        assert!(matches!(
            list_lessons(&state, course.id, &who),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn lessons_are_ordered_by_index() {
        let state = AppState::new();
        let owner = instructor(&state, "i@school.edu");
        let course = published_course(&state, &owner);
        lesson(&state, &course, 3);
        lesson(&state, &course, 1);
        lesson(&state, &course, 2);
        let order: Vec<i32> = list_lessons(&state, course.id, &actor("i@school.edu"))
            .unwrap()
            .iter()
            .map(|l| l.order_index)
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }
}
