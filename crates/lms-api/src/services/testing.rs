//! Fixtures shared by the service tests.

use chrono::{DateTime, Utc};
use lms_core::Email;
use lms_state::{CoursePublication, CourseStatus};
use uuid::Uuid;

use crate::auth::Actor;
use crate::state::{AppState, AssignmentRecord, CourseRecord, LessonRecord, UserKind, UserRecord};

pub fn actor(email: &str) -> Actor {
    Actor::from_email(Email::parse(email).unwrap())
}

fn user(state: &AppState, email: &str, kind: UserKind) -> UserRecord {
    let record = UserRecord {
        id: Uuid::new_v4(),
        email: Email::parse(email).unwrap(),
        full_name: "Test User".into(),
        kind,
        created_at: Utc::now(),
    };
    state.users.insert(record.id, record.clone());
    record
}

pub fn student(state: &AppState, email: &str) -> UserRecord {
    user(state, email, UserKind::Student { student_number: None })
}

pub fn instructor(state: &AppState, email: &str) -> UserRecord {
    user(state, email, UserKind::Instructor { bio: None })
}

pub fn admin(state: &AppState, email: &str) -> UserRecord {
    user(state, email, UserKind::Admin)
}

pub fn resolve(state: &AppState, email: &str) -> UserRecord {
    state
        .user_by_email(&Email::parse(email).unwrap())
        .unwrap()
}

pub fn draft_course(state: &AppState, owner: &UserRecord) -> CourseRecord {
    let now = Utc::now();
    let record = CourseRecord {
        id: Uuid::new_v4(),
        instructor_id: owner.id,
        title: "Systems Programming".into(),
        description: None,
        publication: CoursePublication::draft(),
        created_at: now,
        updated_at: now,
    };
    state.courses.insert(record.id, record.clone());
    record
}

pub fn published_course(state: &AppState, owner: &UserRecord) -> CourseRecord {
    let course = draft_course(state, owner);
    state
        .courses
        .update(&course.id, |c| {
            c.publication.set_status(CourseStatus::Published, Utc::now())
        })
        .unwrap()
}

pub fn lesson(state: &AppState, course: &CourseRecord, order_index: i32) -> LessonRecord {
    let record = LessonRecord {
        id: Uuid::new_v4(),
        course_id: course.id,
        title: format!("Lesson {order_index}"),
        content_url: Some(format!("https://cdn.school.edu/lessons/{order_index}")),
        order_index,
        created_at: Utc::now(),
    };
    state.lessons.insert(record.id, record.clone());
    record
}

pub fn assignment(
    state: &AppState,
    lesson: &LessonRecord,
    max_points: i32,
    due_at: Option<DateTime<Utc>>,
    allow_late: bool,
) -> AssignmentRecord {
    let record = AssignmentRecord {
        id: Uuid::new_v4(),
        lesson_id: lesson.id,
        title: "Homework".into(),
        instructions: None,
        max_points,
        due_at,
        allow_late,
        created_at: Utc::now(),
    };
    state.assignments.insert(record.id, record.clone());
    record
}
