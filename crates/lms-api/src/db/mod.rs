//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx.
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, every
//! mutation is written through to PostgreSQL and the in-memory stores are
//! hydrated from it on startup. When absent, the API runs in memory only
//! (suitable for development and testing).
//!
//! Writes are upserts keyed on the primary key, so replaying a write is
//! harmless. Deletes rely on `ON DELETE CASCADE` for the content beneath a
//! course, lesson or assignment.

pub mod courses;
pub mod enrollments;
pub mod submissions;
pub mod users;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}

/// Parse a stored status name, mapping unknown values to a decode error.
pub(crate) fn parse_status<T>(column: &str, raw: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}

/// Decode a JSONB transition log.
pub(crate) fn parse_log<T: serde::de::DeserializeOwned>(
    column: &str,
    raw: serde_json::Value,
) -> Result<Vec<T>, sqlx::Error> {
    serde_json::from_value(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Encode a transition log for a JSONB column.
pub(crate) fn encode_log<T: serde::Serialize>(log: &[T]) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(log)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to serialize transition log: {e}")))
}
