//! Submission persistence operations.

use chrono::{DateTime, Utc};
use lms_state::{Submission, SubmissionStatus, SubmissionTransitionRecord};
use sqlx::PgPool;
use uuid::Uuid;

use super::{encode_log, parse_log, parse_status};
use crate::state::SubmissionRecord;

/// Insert the first version of a submission or overwrite it with a later one.
pub async fn upsert(pool: &PgPool, record: &SubmissionRecord) -> Result<(), sqlx::Error> {
    let s = &record.lifecycle;
    let transitions = encode_log(&s.transitions)?;

    sqlx::query(
        "INSERT INTO submissions
            (id, assignment_id, student_id, artifact_url, submitted_at, status, score, feedback, version, transitions)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (id) DO UPDATE SET
            artifact_url = EXCLUDED.artifact_url,
            submitted_at = EXCLUDED.submitted_at,
            status = EXCLUDED.status,
            score = EXCLUDED.score,
            feedback = EXCLUDED.feedback,
            version = EXCLUDED.version,
            transitions = EXCLUDED.transitions",
    )
    .bind(record.id)
    .bind(record.assignment_id)
    .bind(record.student_id)
    .bind(&s.artifact_url)
    .bind(s.submitted_at)
    .bind(s.status.as_str())
    .bind(s.score)
    .bind(&s.feedback)
    .bind(s.version)
    .bind(&transitions)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<SubmissionRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SubmissionRow>(
        "SELECT id, assignment_id, student_id, artifact_url, submitted_at, status, score, feedback, version, transitions
         FROM submissions ORDER BY submitted_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SubmissionRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: Uuid,
    assignment_id: Uuid,
    student_id: Uuid,
    artifact_url: String,
    submitted_at: DateTime<Utc>,
    status: String,
    score: Option<i32>,
    feedback: Option<String>,
    version: i32,
    transitions: serde_json::Value,
}

impl SubmissionRow {
    fn into_record(self) -> Result<SubmissionRecord, sqlx::Error> {
        let status: SubmissionStatus = parse_status("status", &self.status)?;
        let transitions: Vec<SubmissionTransitionRecord> =
            parse_log("transitions", self.transitions)?;
        Ok(SubmissionRecord {
            id: self.id,
            assignment_id: self.assignment_id,
            student_id: self.student_id,
            lifecycle: Submission {
                artifact_url: self.artifact_url,
                submitted_at: self.submitted_at,
                status,
                score: self.score,
                feedback: self.feedback,
                version: self.version,
                transitions,
            },
        })
    }
}
