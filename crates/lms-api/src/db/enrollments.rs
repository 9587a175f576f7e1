//! Enrollment persistence operations.
//!
//! The `UNIQUE (student_id, course_id)` constraint backs the in-memory
//! uniqueness check; a violation surfaces as `AppError::Conflict`.

use chrono::{DateTime, Utc};
use lms_state::{Enrollment, EnrollmentStatus, EnrollmentTransitionRecord};
use sqlx::PgPool;
use uuid::Uuid;

use super::{encode_log, parse_log, parse_status};
use crate::state::EnrollmentRecord;

/// Insert a new enrollment or update the status of an existing one.
pub async fn upsert(pool: &PgPool, record: &EnrollmentRecord) -> Result<(), sqlx::Error> {
    let transitions = encode_log(&record.lifecycle.transitions)?;

    sqlx::query(
        "INSERT INTO enrollments (id, student_id, course_id, status, enrolled_at, transitions)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (id) DO UPDATE SET
            status = EXCLUDED.status,
            transitions = EXCLUDED.transitions",
    )
    .bind(record.id)
    .bind(record.student_id)
    .bind(record.course_id)
    .bind(record.lifecycle.status.as_str())
    .bind(record.lifecycle.enrolled_at)
    .bind(&transitions)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<EnrollmentRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EnrollmentRow>(
        "SELECT id, student_id, course_id, status, enrolled_at, transitions
         FROM enrollments ORDER BY enrolled_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(EnrollmentRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct EnrollmentRow {
    id: Uuid,
    student_id: Uuid,
    course_id: Uuid,
    status: String,
    enrolled_at: DateTime<Utc>,
    transitions: serde_json::Value,
}

impl EnrollmentRow {
    fn into_record(self) -> Result<EnrollmentRecord, sqlx::Error> {
        let status: EnrollmentStatus = parse_status("status", &self.status)?;
        let transitions: Vec<EnrollmentTransitionRecord> =
            parse_log("transitions", self.transitions)?;
        Ok(EnrollmentRecord {
            id: self.id,
            student_id: self.student_id,
            course_id: self.course_id,
            lifecycle: Enrollment {
                status,
                enrolled_at: self.enrolled_at,
                transitions,
            },
        })
    }
}
