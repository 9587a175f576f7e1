//! # Course Authoring
//!
//! Instructors create courses and manage their lessons and assignments.
//! Every mutation looks the course up first (NotFound), then asks the gate.
//! A lesson or assignment id that belongs to another course is reported as
//! not found rather than forbidden.

use chrono::{DateTime, Utc};
use lms_core::{Page, PageRequest, Role};
use lms_state::{CoursePublication, CourseStatus};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::services::gate::{require_owner_or_admin, require_user};
use crate::state::{
    AppState, AssignmentRecord, CourseRecord, EnrollmentRecord, LessonRecord, SubmissionRecord,
};

/// Editable fields of a lesson.
#[derive(Debug, Clone)]
pub struct LessonFields {
    pub title: String,
    pub content_url: Option<String>,
    pub order_index: i32,
}

/// Editable fields of an assignment.
#[derive(Debug, Clone)]
pub struct AssignmentFields {
    pub title: String,
    pub instructions: Option<String>,
    pub max_points: i32,
    pub due_at: Option<DateTime<Utc>>,
    pub allow_late: bool,
}

/// Everything a delete took out of the stores.
///
/// Handed back to the caller so the rows can be put back when the database
/// delete that follows fails.
#[derive(Debug, Default)]
pub struct Removed {
    pub courses: Vec<CourseRecord>,
    pub lessons: Vec<LessonRecord>,
    pub assignments: Vec<AssignmentRecord>,
    pub enrollments: Vec<EnrollmentRecord>,
    pub submissions: Vec<SubmissionRecord>,
}

impl Removed {
    /// Reinsert every removed row.
    pub fn restore(self, state: &AppState) {
        for c in self.courses {
            state.courses.insert(c.id, c);
        }
        for l in self.lessons {
            state.lessons.insert(l.id, l);
        }
        for a in self.assignments {
            state.assignments.insert(a.id, a);
        }
        for e in self.enrollments {
            state.enrollments.insert(e.id, e);
        }
        for s in self.submissions {
            state.submissions.insert(s.id, s);
        }
    }
}

/// Published courses, newest first. Open to anyone.
pub fn list_published(state: &AppState, page: PageRequest) -> Page<CourseRecord> {
    let mut rows = state.courses.filter(|c| c.is_published());
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    page.paginate(rows)
}

pub fn create_course(
    state: &AppState,
    title: String,
    description: Option<String>,
    actor: &Actor,
) -> Result<CourseRecord, AppError> {
    let user = require_user(state, actor)?;
    if user.role() != Role::Instructor {
        return Err(AppError::Forbidden(
            "only instructors can create courses".into(),
        ));
    }

    let now = Utc::now();
    let record = CourseRecord {
        id: Uuid::new_v4(),
        instructor_id: user.id,
        title,
        description,
        publication: CoursePublication::draft(),
        created_at: now,
        updated_at: now,
    };
    state.courses.insert(record.id, record.clone());
    tracing::info!(course_id = %record.id, instructor_id = %user.id, "course created");
    Ok(record)
}

/// Replace a course's title, description and status.
pub fn update_course(
    state: &AppState,
    course_id: Uuid,
    title: String,
    description: Option<String>,
    status: CourseStatus,
    actor: &Actor,
) -> Result<CourseRecord, AppError> {
    let course = find_course(state, course_id)?;
    require_owner_or_admin(state, actor, &course)?;

    let now = Utc::now();
    let record = state
        .courses
        .update(&course_id, |c| {
            c.title = title;
            c.description = description;
            c.publication.set_status(status, now);
            c.updated_at = now;
        })
        .ok_or_else(|| AppError::not_found("course"))?;
    tracing::info!(course_id = %course_id, status = %status, "course updated");
    Ok(record)
}

/// Delete a course with its lessons, assignments, enrollments and submissions.
pub fn delete_course(
    state: &AppState,
    course_id: Uuid,
    actor: &Actor,
) -> Result<Removed, AppError> {
    let course = find_course(state, course_id)?;
    require_owner_or_admin(state, actor, &course)?;

    let mut removed = Removed {
        lessons: state.lessons.remove_where(|l| l.course_id == course_id),
        ..Removed::default()
    };
    let lesson_ids: Vec<Uuid> = removed.lessons.iter().map(|l| l.id).collect();
    cascade_lessons(state, &lesson_ids, &mut removed);
    removed.enrollments = state.enrollments.remove_where(|e| e.course_id == course_id);
    removed.courses.extend(state.courses.remove(&course_id));

    tracing::info!(
        course_id = %course_id,
        lessons = removed.lessons.len(),
        enrollments = removed.enrollments.len(),
        submissions = removed.submissions.len(),
        "course deleted"
    );
    Ok(removed)
}

pub fn add_lesson(
    state: &AppState,
    course_id: Uuid,
    fields: LessonFields,
    actor: &Actor,
) -> Result<LessonRecord, AppError> {
    let course = find_course(state, course_id)?;
    require_owner_or_admin(state, actor, &course)?;

    let record = LessonRecord {
        id: Uuid::new_v4(),
        course_id,
        title: fields.title,
        content_url: fields.content_url,
        order_index: fields.order_index,
        created_at: Utc::now(),
    };
    state.lessons.insert(record.id, record.clone());
    tracing::info!(course_id = %course_id, lesson_id = %record.id, "lesson added");
    Ok(record)
}

pub fn update_lesson(
    state: &AppState,
    course_id: Uuid,
    lesson_id: Uuid,
    fields: LessonFields,
    actor: &Actor,
) -> Result<LessonRecord, AppError> {
    let course = find_course(state, course_id)?;
    require_owner_or_admin(state, actor, &course)?;

    state
        .lessons
        .try_update(&lesson_id, |l| {
            if l.course_id != course_id {
                return Err(AppError::not_found("lesson"));
            }
            l.title = fields.title;
            l.content_url = fields.content_url;
            l.order_index = fields.order_index;
            Ok(l.clone())
        })
        .ok_or_else(|| AppError::not_found("lesson"))?
}

/// Delete a lesson with its assignments and their submissions.
pub fn delete_lesson(
    state: &AppState,
    course_id: Uuid,
    lesson_id: Uuid,
    actor: &Actor,
) -> Result<Removed, AppError> {
    let course = find_course(state, course_id)?;
    require_owner_or_admin(state, actor, &course)?;
    find_lesson(state, course_id, lesson_id)?;

    let mut removed = Removed::default();
    removed.lessons.extend(state.lessons.remove(&lesson_id));
    cascade_lessons(state, &[lesson_id], &mut removed);
    tracing::info!(
        course_id = %course_id,
        lesson_id = %lesson_id,
        submissions = removed.submissions.len(),
        "lesson deleted"
    );
    Ok(removed)
}

pub fn add_assignment(
    state: &AppState,
    course_id: Uuid,
    lesson_id: Uuid,
    fields: AssignmentFields,
    actor: &Actor,
) -> Result<AssignmentRecord, AppError> {
    let course = find_course(state, course_id)?;
    require_owner_or_admin(state, actor, &course)?;
    let lesson = find_lesson(state, course_id, lesson_id)?;

    let record = AssignmentRecord {
        id: Uuid::new_v4(),
        lesson_id: lesson.id,
        title: fields.title,
        instructions: fields.instructions,
        max_points: fields.max_points,
        due_at: fields.due_at,
        allow_late: fields.allow_late,
        created_at: Utc::now(),
    };
    state.assignments.insert(record.id, record.clone());
    tracing::info!(course_id = %course_id, assignment_id = %record.id, "assignment added");
    Ok(record)
}

pub fn update_assignment(
    state: &AppState,
    course_id: Uuid,
    assignment_id: Uuid,
    fields: AssignmentFields,
    actor: &Actor,
) -> Result<AssignmentRecord, AppError> {
    let course = find_course(state, course_id)?;
    require_owner_or_admin(state, actor, &course)?;
    find_assignment(state, course_id, assignment_id)?;

    state
        .assignments
        .update(&assignment_id, |a| {
            a.title = fields.title;
            a.instructions = fields.instructions;
            a.max_points = fields.max_points;
            a.due_at = fields.due_at;
            a.allow_late = fields.allow_late;
        })
        .ok_or_else(|| AppError::not_found("assignment"))
}

/// Delete an assignment with its submissions.
pub fn delete_assignment(
    state: &AppState,
    course_id: Uuid,
    assignment_id: Uuid,
    actor: &Actor,
) -> Result<Removed, AppError> {
    let course = find_course(state, course_id)?;
    require_owner_or_admin(state, actor, &course)?;
    find_assignment(state, course_id, assignment_id)?;

    let removed = Removed {
        assignments: state.assignments.remove(&assignment_id).into_iter().collect(),
        submissions: state
            .submissions
            .remove_where(|s| s.assignment_id == assignment_id),
        ..Removed::default()
    };
    tracing::info!(
        course_id = %course_id,
        assignment_id = %assignment_id,
        submissions = removed.submissions.len(),
        "assignment deleted"
    );
    Ok(removed)
}

fn find_course(state: &AppState, course_id: Uuid) -> Result<CourseRecord, AppError> {
    state
        .courses
        .get(&course_id)
        .ok_or_else(|| AppError::not_found("course"))
}

fn find_lesson(
    state: &AppState,
    course_id: Uuid,
    lesson_id: Uuid,
) -> Result<LessonRecord, AppError> {
    state
        .lessons
        .get(&lesson_id)
        .filter(|l| l.course_id == course_id)
        .ok_or_else(|| AppError::not_found("lesson"))
}

fn find_assignment(
    state: &AppState,
    course_id: Uuid,
    assignment_id: Uuid,
) -> Result<AssignmentRecord, AppError> {
    state
        .assignments
        .get(&assignment_id)
        .filter(|a| {
            state
                .lessons
                .get(&a.lesson_id)
                .is_some_and(|l| l.course_id == course_id)
        })
        .ok_or_else(|| AppError::not_found("assignment"))
}

/// Remove assignments of the given lessons and their submissions.
/// Returns the number of submissions removed.
/// Remove the assignments of `lesson_ids` and their submissions.
fn cascade_lessons(state: &AppState, lesson_ids: &[Uuid], removed: &mut Removed) {
    let assignments = state
        .assignments
        .remove_where(|a| lesson_ids.contains(&a.lesson_id));
    let assignment_ids: Vec<Uuid> = assignments.iter().map(|a| a.id).collect();
    removed.submissions.extend(
        state
            .submissions
            .remove_where(|s| assignment_ids.contains(&s.assignment_id)),
    );
    removed.assignments.extend(assignments);
}
