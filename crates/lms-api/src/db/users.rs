//! User persistence operations on the `users` table.

use chrono::{DateTime, Utc};
use lms_core::Email;
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::{UserKind, UserRecord};

/// Insert or replace a user.
pub async fn upsert(pool: &PgPool, record: &UserRecord) -> Result<(), sqlx::Error> {
    let (student_number, bio) = match &record.kind {
        UserKind::Student { student_number } => (student_number.as_deref(), None),
        UserKind::Instructor { bio } => (None, bio.as_deref()),
        UserKind::Admin => (None, None),
    };

    sqlx::query(
        "INSERT INTO users (id, email, full_name, role, student_number, bio, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (id) DO UPDATE SET
            email = EXCLUDED.email,
            full_name = EXCLUDED.full_name,
            role = EXCLUDED.role,
            student_number = EXCLUDED.student_number,
            bio = EXCLUDED.bio",
    )
    .bind(record.id)
    .bind(record.email.as_str())
    .bind(&record.full_name)
    .bind(record.role().as_str())
    .bind(student_number)
    .bind(bio)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all users on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<UserRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, full_name, role, student_number, bio, created_at
         FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(UserRow::into_record).collect()
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    full_name: String,
    role: String,
    student_number: Option<String>,
    bio: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_record(self) -> Result<UserRecord, sqlx::Error> {
        let email = Email::parse(&self.email).map_err(|e| sqlx::Error::ColumnDecode {
            index: "email".into(),
            source: Box::new(e),
        })?;
        let kind = match self.role.as_str() {
            "STUDENT" => UserKind::Student {
                student_number: self.student_number,
            },
            "INSTRUCTOR" => UserKind::Instructor { bio: self.bio },
            "ADMIN" => UserKind::Admin,
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "role".into(),
                    source: format!("unknown role: {other}").into(),
                })
            }
        };
        Ok(UserRecord {
            id: self.id,
            email,
            full_name: self.full_name,
            kind,
            created_at: self.created_at,
        })
    }
}
