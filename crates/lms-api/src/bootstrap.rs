//! # Startup Bootstrap
//!
//! Builds the application state before the server starts listening.
//!
//! ## Bootstrap Sequence
//!
//! 1. **Build state** from the configuration and the optional database pool.
//! 2. **Hydrate** the in-memory stores from Postgres, when connected.
//! 3. **Seed the admin** named by `LMS_ADMIN_EMAIL`, unless that e-mail is
//!    already registered.

use lms_core::{Email, ValidationError};
use sqlx::PgPool;

use crate::services::users::ensure_admin;
use crate::state::{AppConfig, AppState};

/// Errors during startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// `LMS_ADMIN_EMAIL` is not a valid e-mail address.
    #[error("invalid LMS_ADMIN_EMAIL: {0}")]
    AdminEmail(#[from] ValidationError),

    /// Hydration or the admin write-through failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Build, hydrate and seed the application state.
pub async fn bootstrap(
    config: AppConfig,
    db_pool: Option<PgPool>,
) -> Result<AppState, BootstrapError> {
    let state = AppState::with_config(config, db_pool);
    state.hydrate_from_db().await?;
    seed_admin(&state).await?;
    Ok(state)
}

/// Create the configured admin account if it does not exist yet.
pub async fn seed_admin(state: &AppState) -> Result<(), BootstrapError> {
    let Some(raw) = state.config.admin_email.as_deref() else {
        return Ok(());
    };
    let email = Email::parse(raw)?;

    match ensure_admin(state, email) {
        Some(record) => {
            if let Some(pool) = &state.db_pool {
                crate::db::users::upsert(pool, &record).await?;
            }
        }
        None => tracing::debug!(email = %raw, "admin e-mail already registered"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::Role;

    fn config(admin: Option<&str>) -> AppConfig {
        AppConfig {
            admin_email: admin.map(String::from),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn seeds_configured_admin_once() {
        let state = bootstrap(config(Some("root@school.edu")), None).await.unwrap();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.users.list()[0].role(), Role::Admin);

        seed_admin(&state).await.unwrap();
        assert_eq!(state.users.len(), 1);
    }

    #[tokio::test]
    async fn no_admin_without_config() {
        let state = bootstrap(config(None), None).await.unwrap();
        assert!(state.users.is_empty());
    }

    #[tokio::test]
    async fn rejects_malformed_admin_email() {
        let err = bootstrap(config(Some("not-an-email")), None).await.unwrap_err();
        assert!(matches!(err, BootstrapError::AdminEmail(_)));
    }
}
