//! Course, lesson and assignment persistence.
//!
//! Ownership of lessons and assignments is enforced at the application
//! layer; the schema only cascades deletes downward.

use chrono::{DateTime, Utc};
use lms_state::{CoursePublication, CourseStatus};
use sqlx::PgPool;
use uuid::Uuid;

use super::parse_status;
use crate::state::{AssignmentRecord, CourseRecord, LessonRecord};

// -- Courses ------------------------------------------------------------------

/// Insert or replace a course.
pub async fn upsert(pool: &PgPool, record: &CourseRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO courses (id, instructor_id, title, description, status, published_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            description = EXCLUDED.description,
            status = EXCLUDED.status,
            published_at = EXCLUDED.published_at,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(record.id)
    .bind(record.instructor_id)
    .bind(&record.title)
    .bind(&record.description)
    .bind(record.publication.status.as_str())
    .bind(record.publication.published_at)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a course. Lessons, assignments, enrollments and submissions
/// beneath it go with it.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<CourseRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CourseRow>(
        "SELECT id, instructor_id, title, description, status, published_at, created_at, updated_at
         FROM courses ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(CourseRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    instructor_id: Uuid,
    title: String,
    description: Option<String>,
    status: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CourseRow {
    fn into_record(self) -> Result<CourseRecord, sqlx::Error> {
        let status: CourseStatus = parse_status("status", &self.status)?;
        Ok(CourseRecord {
            id: self.id,
            instructor_id: self.instructor_id,
            title: self.title,
            description: self.description,
            publication: CoursePublication {
                status,
                published_at: self.published_at,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// -- Lessons ------------------------------------------------------------------

pub async fn upsert_lesson(pool: &PgPool, record: &LessonRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO lessons (id, course_id, title, content_url, order_index, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            content_url = EXCLUDED.content_url,
            order_index = EXCLUDED.order_index",
    )
    .bind(record.id)
    .bind(record.course_id)
    .bind(&record.title)
    .bind(&record.content_url)
    .bind(record.order_index)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_lesson(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn load_all_lessons(pool: &PgPool) -> Result<Vec<LessonRecord>, sqlx::Error> {
    sqlx::query_as::<_, LessonRow>(
        "SELECT id, course_id, title, content_url, order_index, created_at
         FROM lessons ORDER BY created_at",
    )
    .fetch_all(pool)
    .await
    .map(|rows| rows.into_iter().map(LessonRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct LessonRow {
    id: Uuid,
    course_id: Uuid,
    title: String,
    content_url: Option<String>,
    order_index: i32,
    created_at: DateTime<Utc>,
}

impl LessonRow {
    fn into_record(self) -> LessonRecord {
        LessonRecord {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            content_url: self.content_url,
            order_index: self.order_index,
            created_at: self.created_at,
        }
    }
}

// -- Assignments --------------------------------------------------------------

pub async fn upsert_assignment(
    pool: &PgPool,
    record: &AssignmentRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO assignments (id, lesson_id, title, instructions, max_points, due_at, allow_late, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            instructions = EXCLUDED.instructions,
            max_points = EXCLUDED.max_points,
            due_at = EXCLUDED.due_at,
            allow_late = EXCLUDED.allow_late",
    )
    .bind(record.id)
    .bind(record.lesson_id)
    .bind(&record.title)
    .bind(&record.instructions)
    .bind(record.max_points)
    .bind(record.due_at)
    .bind(record.allow_late)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_assignment(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn load_all_assignments(pool: &PgPool) -> Result<Vec<AssignmentRecord>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentRow>(
        "SELECT id, lesson_id, title, instructions, max_points, due_at, allow_late, created_at
         FROM assignments ORDER BY created_at",
    )
    .fetch_all(pool)
    .await
    .map(|rows| rows.into_iter().map(AssignmentRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: Uuid,
    lesson_id: Uuid,
    title: String,
    instructions: Option<String>,
    max_points: i32,
    due_at: Option<DateTime<Utc>>,
    allow_late: bool,
    created_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn into_record(self) -> AssignmentRecord {
        AssignmentRecord {
            id: self.id,
            lesson_id: self.lesson_id,
            title: self.title,
            instructions: self.instructions,
            max_points: self.max_points,
            due_at: self.due_at,
            allow_late: self.allow_late,
            created_at: self.created_at,
        }
    }
}
