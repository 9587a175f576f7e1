//! User registration and identity lookup.

use chrono::Utc;
use lms_core::Email;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::services::gate::require_user;
use crate::state::{AppState, UserKind, UserRecord};

/// Register a new student or instructor.
///
/// Admin accounts cannot be self-registered; they are created on startup
/// from configuration.
pub fn register(
    state: &AppState,
    email: Email,
    full_name: String,
    kind: UserKind,
) -> Result<UserRecord, AppError> {
    if matches!(kind, UserKind::Admin) {
        return Err(AppError::Forbidden("admin accounts cannot be registered".into()));
    }
    let record = insert_user(state, email, full_name, kind)?;
    tracing::info!(user_id = %record.id, role = %record.role(), "user registered");
    Ok(record)
}

/// The registered user behind the caller's credential.
pub fn whoami(state: &AppState, actor: &Actor) -> Result<UserRecord, AppError> {
    require_user(state, actor)
}

/// Create the admin account for `email` unless a user with it exists.
///
/// Returns the new record, or `None` when the e-mail is already taken.
pub fn ensure_admin(state: &AppState, email: Email) -> Option<UserRecord> {
    match insert_user(state, email, "Administrator".into(), UserKind::Admin) {
        Ok(record) => {
            tracing::info!(user_id = %record.id, email = %record.email, "admin account created");
            Some(record)
        }
        Err(_) => None,
    }
}

fn insert_user(
    state: &AppState,
    email: Email,
    full_name: String,
    kind: UserKind,
) -> Result<UserRecord, AppError> {
    let id = Uuid::new_v4();
    state.users.insert_unique(
        id,
        |u| u.email == email,
        |existing| match existing {
            Some(_) => Err(AppError::Conflict(
                "user with this email already exists".into(),
            )),
            None => Ok(UserRecord {
                id,
                email: email.clone(),
                full_name: full_name.trim().to_string(),
                kind,
                created_at: Utc::now(),
            }),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::actor;
    use lms_core::Role;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[test]
    fn register_defaults_and_duplicates() {
        let state = AppState::new();
        let u = register(
            &state,
            email("s@school.edu"),
            "  Sam Student ".into(),
            UserKind::Student { student_number: None },
        )
        .unwrap();
        assert_eq!(u.role(), Role::Student);
        assert_eq!(u.full_name, "Sam Student");

        let err = register(
            &state,
            email("s@school.edu"),
            "Other".into(),
            UserKind::Instructor { bio: None },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(state.users.len(), 1);
    }

    #[test]
    fn admin_cannot_self_register() {
        let state = AppState::new();
        let err = register(&state, email("a@school.edu"), "Ad Min".into(), UserKind::Admin)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn ensure_admin_is_idempotent() {
        let state = AppState::new();
        assert!(ensure_admin(&state, email("root@school.edu")).is_some());
        assert!(ensure_admin(&state, email("root@school.edu")).is_none());
        let me = whoami(&state, &actor("root@school.edu")).unwrap();
        assert_eq!(me.role(), Role::Admin);
    }

    #[test]
    fn whoami_requires_registration() {
        let state = AppState::new();
        assert!(matches!(
            whoami(&state, &actor("ghost@school.edu")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            whoami(&state, &Actor::anonymous()),
            Err(AppError::Unauthorized(_))
        ));
    }
}
