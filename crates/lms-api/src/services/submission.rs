//! # Submission Service
//!
//! Students submit work for assignments of published courses they are
//! enrolled in; course staff grade it or ask for another version. Each
//! (assignment, student) pair keeps a single submission whose version grows
//! with every resubmit.

use chrono::Utc;
use lms_core::{Page, PageRequest};
use lms_state::Submission;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::services::gate::{can_manage_course, require_student, require_user};
use crate::state::{AppState, AssignmentRecord, CourseRecord, SubmissionRecord, UserRecord};

/// Submit (or resubmit) the caller's work for an assignment.
pub fn submit(
    state: &AppState,
    assignment_id: Uuid,
    artifact_url: String,
    actor: &Actor,
) -> Result<SubmissionRecord, AppError> {
    let student = require_student(state, actor, "only students can submit")?;
    let assignment = state
        .assignments
        .get(&assignment_id)
        .ok_or_else(|| AppError::not_found("assignment"))?;
    let course = state
        .course_of_assignment(&assignment)
        .filter(|c| c.is_published())
        .ok_or_else(|| AppError::not_found("assignment"))?;

    let enrolled = state
        .enrollments
        .exists(|e| e.student_id == student.id && e.course_id == course.id);
    if !enrolled {
        return Err(AppError::Forbidden("not enrolled in this course".into()));
    }

    let now = Utc::now();
    assignment.late_policy().check(now)?;

    let record = state.submissions.upsert(
        |s| s.assignment_id == assignment.id && s.student_id == student.id,
        |s| s.lifecycle.resubmit(artifact_url.clone(), now),
        || {
            let id = Uuid::new_v4();
            let record = SubmissionRecord {
                id,
                assignment_id: assignment.id,
                student_id: student.id,
                lifecycle: Submission::first(artifact_url.clone(), now),
            };
            (id, record)
        },
    );

    tracing::info!(
        submission_id = %record.id,
        assignment_id = %assignment.id,
        student_id = %student.id,
        version = record.lifecycle.version,
        "submission received"
    );
    Ok(record)
}

/// Score a submission. Admins and the owning instructor only.
pub fn grade(
    state: &AppState,
    submission_id: Uuid,
    score: i64,
    feedback: Option<String>,
    actor: &Actor,
) -> Result<SubmissionRecord, AppError> {
    let (staff, assignment) = require_grader(state, submission_id, actor)?;
    let record = state
        .submissions
        .try_update(&submission_id, |s| {
            s.lifecycle
                .grade(score, assignment.max_points, feedback, Utc::now())?;
            Ok::<_, AppError>(s.clone())
        })
        .ok_or_else(|| AppError::not_found("submission"))??;

    tracing::info!(
        submission_id = %submission_id,
        staff_id = %staff.id,
        score,
        "submission graded"
    );
    Ok(record)
}

/// Ask the student for another version. Any existing score is kept.
pub fn request_resubmission(
    state: &AppState,
    submission_id: Uuid,
    feedback: Option<String>,
    actor: &Actor,
) -> Result<SubmissionRecord, AppError> {
    let (staff, _) = require_grader(state, submission_id, actor)?;
    let record = state
        .submissions
        .update(&submission_id, |s| {
            s.lifecycle.request_resubmission(feedback, Utc::now())
        })
        .ok_or_else(|| AppError::not_found("submission"))?;

    tracing::info!(submission_id = %submission_id, staff_id = %staff.id, "resubmission requested");
    Ok(record)
}

/// All submissions for a course's assignments, newest first.
pub fn list_by_course(
    state: &AppState,
    course_id: Uuid,
    actor: &Actor,
    page: PageRequest,
) -> Result<Page<SubmissionRecord>, AppError> {
    let user = require_user(state, actor)?;
    let allowed = match state.courses.get(&course_id) {
        Some(course) => can_manage_course(&user, &course),
        None => user.role() == lms_core::Role::Admin,
    };
    if !allowed {
        tracing::debug!(user_id = %user.id, course_id = %course_id, "submission listing denied");
        return Err(AppError::Forbidden("not the course owner".into()));
    }

    let assignment_ids: Vec<Uuid> = crate::services::visibility::assignments_of(state, course_id)
        .iter()
        .map(|a| a.id)
        .collect();
    let mut rows = state
        .submissions
        .filter(|s| assignment_ids.contains(&s.assignment_id));
    sort_newest_first(&mut rows);
    Ok(page.paginate(rows))
}

/// The caller's own submissions, newest first.
pub fn my_submissions(
    state: &AppState,
    actor: &Actor,
    page: PageRequest,
) -> Result<Page<SubmissionRecord>, AppError> {
    let student = require_student(state, actor, "only students have submissions")?;
    let mut rows = state.submissions.filter(|s| s.student_id == student.id);
    sort_newest_first(&mut rows);
    Ok(page.paginate(rows))
}

/// Resolve the caller, then the submission, then check course management.
fn require_grader(
    state: &AppState,
    submission_id: Uuid,
    actor: &Actor,
) -> Result<(UserRecord, AssignmentRecord), AppError> {
    let user = require_user(state, actor)?;
    let submission = state
        .submissions
        .get(&submission_id)
        .ok_or_else(|| AppError::not_found("submission"))?;
    let assignment = state
        .assignments
        .get(&submission.assignment_id)
        .ok_or_else(|| AppError::not_found("submission"))?;
    let course: CourseRecord = state
        .course_of_assignment(&assignment)
        .ok_or_else(|| AppError::not_found("submission"))?;
    if !can_manage_course(&user, &course) {
        tracing::debug!(user_id = %user.id, submission_id = %submission_id, "grading denied");
        return Err(AppError::Forbidden("not the course owner".into()));
    }
    Ok((user, assignment))
}

fn sort_newest_first(rows: &mut [SubmissionRecord]) {
    rows.sort_by(|a, b| {
        b.lifecycle
            .submitted_at
            .cmp(&a.lifecycle.submitted_at)
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::enrollment::{cancel, enroll};
    use crate::services::testing::*;
    use chrono::Duration;
    use lms_state::SubmissionStatus;

    struct Fixture {
        state: AppState,
        assignment: AssignmentRecord,
        course: CourseRecord,
    }

    fn fixture(max_points: i32) -> Fixture {
        let state = AppState::new();
        let owner = instructor(&state, "i@school.edu");
        student(&state, "s@school.edu");
        admin(&state, "root@school.edu");
        instructor(&state, "other@school.edu");
        let course = published_course(&state, &owner);
        let l = lesson(&state, &course, 1);
        let assignment = assignment(&state, &l, max_points, None, false);
        enroll(&state, course.id, &actor("s@school.edu")).unwrap();
        Fixture {
            state,
            assignment,
            course,
        }
    }

    #[test]
    fn versions_grow_and_grades_clear() {
        let f = fixture(10);
        let s = actor("s@school.edu");
        let first = submit(&f.state, f.assignment.id, "v1".into(), &s).unwrap();
        assert_eq!(first.lifecycle.version, 1);

        grade(&f.state, first.id, 8, Some("good".into()), &actor("i@school.edu")).unwrap();
        let second = submit(&f.state, f.assignment.id, "v2".into(), &s).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.lifecycle.version, 2);
        assert!(second.lifecycle.score.is_none());
        assert!(second.lifecycle.feedback.is_none());
        assert_eq!(second.lifecycle.status, SubmissionStatus::Submitted);

        let third = submit(&f.state, f.assignment.id, "v3".into(), &s).unwrap();
        assert_eq!(third.lifecycle.version, 3);
        assert_eq!(f.state.submissions.len(), 1);
    }

    #[test]
    fn score_bounds() {
        let f = fixture(100);
        let sub = submit(&f.state, f.assignment.id, "v1".into(), &actor("s@school.edu")).unwrap();
        let staff = actor("i@school.edu");
        assert!(grade(&f.state, sub.id, 0, None, &staff).is_ok());
        assert!(grade(&f.state, sub.id, 100, None, &staff).is_ok());
        for bad in [-1, 101] {
            let err = grade(&f.state, sub.id, bad, None, &staff).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
            assert!(err.to_string().contains("100"));
        }
        assert_eq!(f.state.submissions.get(&sub.id).unwrap().lifecycle.score, Some(100));
    }

    #[test]
    fn submit_requires_enrollment_row_of_any_status() {
        let f = fixture(10);
        student(&f.state, "t@school.edu");
        let err =
            submit(&f.state, f.assignment.id, "x".into(), &actor("t@school.edu")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // A cancelled enrollment still permits submission.
        let e = f
            .state
            .enrollment_of(resolve(&f.state, "s@school.edu").id, f.course.id)
            .unwrap();
        cancel(&f.state, e.id, &actor("s@school.edu")).unwrap();
        assert!(submit(&f.state, f.assignment.id, "x".into(), &actor("s@school.edu")).is_ok());
    }

    #[test]
    fn submit_hides_unpublished_course_and_rejects_staff() {
        let f = fixture(10);
        assert!(matches!(
            submit(&f.state, f.assignment.id, "x".into(), &actor("i@school.edu")),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            submit(&f.state, Uuid::new_v4(), "x".into(), &actor("s@school.edu")),
            Err(AppError::NotFound(_))
        ));
        f.state.courses.update(&f.course.id, |c| {
            c.publication
                .set_status(lms_state::CourseStatus::Draft, Utc::now())
        });
        assert!(matches!(
            submit(&f.state, f.assignment.id, "x".into(), &actor("s@school.edu")),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn late_gate() {
        let state = AppState::new();
        let owner = instructor(&state, "i@school.edu");
        student(&state, "s@school.edu");
        let course = published_course(&state, &owner);
        let l = lesson(&state, &course, 1);
        let due = Some(Utc::now() - Duration::hours(1));
        let strict = assignment(&state, &l, 10, due, false);
        let lenient = assignment(&state, &l, 10, due, true);
        enroll(&state, course.id, &actor("s@school.edu")).unwrap();

        assert!(matches!(
            submit(&state, strict.id, "x".into(), &actor("s@school.edu")),
            Err(AppError::BadRequest(_))
        ));
        assert!(submit(&state, lenient.id, "x".into(), &actor("s@school.edu")).is_ok());
    }

    #[test]
    fn grading_authorization() {
        let f = fixture(10);
        let sub = submit(&f.state, f.assignment.id, "v1".into(), &actor("s@school.edu")).unwrap();
        assert!(matches!(
            grade(&f.state, sub.id, 5, None, &Actor::anonymous()),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            grade(&f.state, Uuid::new_v4(), 5, None, &actor("i@school.edu")),
            Err(AppError::NotFound(_))
        ));
        for email in ["other@school.edu", "s@school.edu"] {
            assert!(matches!(
                grade(&f.state, sub.id, 5, None, &actor(email)),
                Err(AppError::Forbidden(_))
            ));
        }
        assert!(grade(&f.state, sub.id, 5, None, &actor("root@school.edu")).is_ok());
    }

    #[test]
    fn request_resubmission_keeps_score() {
        let f = fixture(10);
        let sub = submit(&f.state, f.assignment.id, "v1".into(), &actor("s@school.edu")).unwrap();
        grade(&f.state, sub.id, 6, None, &actor("i@school.edu")).unwrap();
        let r = request_resubmission(&f.state, sub.id, Some("redo".into()), &actor("i@school.edu"))
            .unwrap();
        assert_eq!(r.lifecycle.status, SubmissionStatus::ResubmitRequested);
        assert_eq!(r.lifecycle.score, Some(6));
        assert_eq!(r.lifecycle.feedback.as_deref(), Some("redo"));
    }

    #[test]
    fn listings() {
        let f = fixture(10);
        submit(&f.state, f.assignment.id, "v1".into(), &actor("s@school.edu")).unwrap();

        let all = PageRequest::default;
        let page = list_by_course(&f.state, f.course.id, &actor("i@school.edu"), all()).unwrap();
        assert_eq!(page.total_elements, 1);
        assert!(matches!(
            list_by_course(&f.state, f.course.id, &actor("other@school.edu"), all()),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            list_by_course(&f.state, f.course.id, &actor("s@school.edu"), all()),
            Err(AppError::Forbidden(_))
        ));

        let mine = my_submissions(&f.state, &actor("s@school.edu"), all()).unwrap();
        assert_eq!(mine.items.len(), 1);
        assert!(matches!(
            my_submissions(&f.state, &actor("i@school.edu"), PageRequest::default()),
            Err(AppError::Forbidden(_))
        ));
    }
}
