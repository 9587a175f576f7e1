//! # Enrollment Service
//!
//! Students enroll in published courses and may cancel; course staff mark
//! enrollments complete. There is at most one enrollment per
//! (student, course), whatever its status.

use chrono::Utc;
use lms_core::{Page, PageRequest};
use lms_state::Enrollment;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::services::gate::{can_manage_course, require_student, require_user};
use crate::state::{AppState, EnrollmentRecord};

/// Enroll the calling student in a published course.
pub fn enroll(
    state: &AppState,
    course_id: Uuid,
    actor: &Actor,
) -> Result<EnrollmentRecord, AppError> {
    let student = require_student(state, actor, "only students can enroll")?;
    let course = state
        .courses
        .get(&course_id)
        .filter(|c| c.is_published())
        .ok_or_else(|| AppError::not_found("course"))?;

    let id = Uuid::new_v4();
    let record = state.enrollments.insert_unique(
        id,
        |e| e.student_id == student.id && e.course_id == course.id,
        |existing| {
            let lifecycle = Enrollment::begin(existing.map(|e| e.lifecycle.status), Utc::now())?;
            Ok::<_, AppError>(EnrollmentRecord {
                id,
                student_id: student.id,
                course_id: course.id,
                lifecycle,
            })
        },
    )?;

    tracing::info!(
        enrollment_id = %id,
        student_id = %student.id,
        course_id = %course.id,
        "student enrolled"
    );
    Ok(record)
}

/// Cancel one of the caller's own enrollments. Idempotent.
pub fn cancel(
    state: &AppState,
    enrollment_id: Uuid,
    actor: &Actor,
) -> Result<EnrollmentRecord, AppError> {
    let student = require_student(state, actor, "only students can cancel enrollments")?;
    let record = state
        .enrollments
        .try_update(&enrollment_id, |e| {
            if e.student_id != student.id {
                return Err(AppError::not_found("enrollment"));
            }
            e.lifecycle.cancel(Utc::now());
            Ok(e.clone())
        })
        .ok_or_else(|| AppError::not_found("enrollment"))??;

    tracing::info!(
        enrollment_id = %enrollment_id,
        student_id = %student.id,
        "enrollment cancelled"
    );
    Ok(record)
}

/// Mark an enrollment complete. Admins and the owning instructor only.
pub fn complete_by_staff(
    state: &AppState,
    enrollment_id: Uuid,
    actor: &Actor,
) -> Result<EnrollmentRecord, AppError> {
    let staff = require_user(state, actor)?;
    let enrollment = state
        .enrollments
        .get(&enrollment_id)
        .ok_or_else(|| AppError::not_found("enrollment"))?;
    let course = state
        .courses
        .get(&enrollment.course_id)
        .ok_or_else(|| AppError::not_found("enrollment"))?;
    if !can_manage_course(&staff, &course) {
        tracing::debug!(user_id = %staff.id, enrollment_id = %enrollment_id, "completion denied");
        return Err(AppError::Forbidden("not the course owner".into()));
    }

    let record = state
        .enrollments
        .update(&enrollment_id, |e| e.lifecycle.complete(Utc::now()))
        .ok_or_else(|| AppError::not_found("enrollment"))?;

    tracing::info!(enrollment_id = %enrollment_id, staff_id = %staff.id, "enrollment completed");
    Ok(record)
}

/// The caller's own enrollments, newest first.
pub fn my_enrollments(
    state: &AppState,
    actor: &Actor,
    page: PageRequest,
) -> Result<Page<EnrollmentRecord>, AppError> {
    let student = require_student(state, actor, "only students have enrollments")?;
    let mut rows = state.enrollments.filter(|e| e.student_id == student.id);
    rows.sort_by(|a, b| {
        b.lifecycle
            .enrolled_at
            .cmp(&a.lifecycle.enrolled_at)
            .then(a.id.cmp(&b.id))
    });
    Ok(page.paginate(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::*;
    use lms_state::EnrollmentStatus;

    #[test]
    fn enroll_creates_active_row() {
        let state = AppState::new();
        let course = published_course(&state, &instructor(&state, "i@school.edu"));
        student(&state, "s@school.edu");
        let e = enroll(&state, course.id, &actor("s@school.edu")).unwrap();
        assert_eq!(e.lifecycle.status, EnrollmentStatus::Active);
        assert_eq!(e.course_id, course.id);
    }

    #[test]
    fn enroll_twice_conflicts_and_keeps_one_row() {
        let state = AppState::new();
        let course = published_course(&state, &instructor(&state, "i@school.edu"));
        student(&state, "s@school.edu");
        enroll(&state, course.id, &actor("s@school.edu")).unwrap();
        let err = enroll(&state, course.id, &actor("s@school.edu")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(state.enrollments.len(), 1);
    }

    #[test]
    fn re_enroll_after_cancel_conflicts() {
        let state = AppState::new();
        let course = published_course(&state, &instructor(&state, "i@school.edu"));
        student(&state, "s@school.edu");
        let e = enroll(&state, course.id, &actor("s@school.edu")).unwrap();
        cancel(&state, e.id, &actor("s@school.edu")).unwrap();
        assert!(matches!(
            enroll(&state, course.id, &actor("s@school.edu")),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn enroll_rules() {
        let state = AppState::new();
        let owner = instructor(&state, "i@school.edu");
        let draft = draft_course(&state, &owner);
        student(&state, "s@school.edu");

        assert!(matches!(
            enroll(&state, draft.id, &Actor::anonymous()),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            enroll(&state, draft.id, &actor("i@school.edu")),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            enroll(&state, draft.id, &actor("s@school.edu")),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            enroll(&state, Uuid::new_v4(), &actor("s@school.edu")),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn cancel_is_idempotent_and_owner_scoped() {
        let state = AppState::new();
        let course = published_course(&state, &instructor(&state, "i@school.edu"));
        student(&state, "s@school.edu");
        student(&state, "t@school.edu");
        let e = enroll(&state, course.id, &actor("s@school.edu")).unwrap();

        assert!(matches!(
            cancel(&state, e.id, &actor("t@school.edu")),
            Err(AppError::NotFound(_))
        ));
        let once = cancel(&state, e.id, &actor("s@school.edu")).unwrap();
        let twice = cancel(&state, e.id, &actor("s@school.edu")).unwrap();
        assert_eq!(once.lifecycle, twice.lifecycle);
        assert_eq!(twice.lifecycle.status, EnrollmentStatus::Cancelled);
    }

    #[test]
    fn complete_by_staff_checks_in_order() {
        let state = AppState::new();
        let course = published_course(&state, &instructor(&state, "i@school.edu"));
        instructor(&state, "other@school.edu");
        admin(&state, "root@school.edu");
        student(&state, "s@school.edu");
        let e = enroll(&state, course.id, &actor("s@school.edu")).unwrap();

        assert!(matches!(
            complete_by_staff(&state, e.id, &Actor::anonymous()),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            complete_by_staff(&state, Uuid::new_v4(), &actor("other@school.edu")),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            complete_by_staff(&state, e.id, &actor("other@school.edu")),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            complete_by_staff(&state, e.id, &actor("s@school.edu")),
            Err(AppError::Forbidden(_))
        ));
        let done = complete_by_staff(&state, e.id, &actor("i@school.edu")).unwrap();
        assert_eq!(done.lifecycle.status, EnrollmentStatus::Completed);
        assert!(complete_by_staff(&state, e.id, &actor("root@school.edu")).is_ok());
    }

    #[test]
    fn my_enrollments_pages_own_rows() {
        let state = AppState::new();
        let owner = instructor(&state, "i@school.edu");
        student(&state, "s@school.edu");
        student(&state, "t@school.edu");
        for _ in 0..3 {
            let c = published_course(&state, &owner);
            enroll(&state, c.id, &actor("s@school.edu")).unwrap();
        }
        let c = published_course(&state, &owner);
        enroll(&state, c.id, &actor("t@school.edu")).unwrap();

        let page = my_enrollments(&state, &actor("s@school.edu"), PageRequest::new(0, 2)).unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 2);
    }
}
