//! # API Route Modules
//!
//! - `users` — registration and the `whoami` lookup.
//! - `courses` — course catalogue, authoring of courses, lessons and
//!   assignments, and the enrollment-gated content listings.
//! - `enrollments` — enroll, cancel, complete, and the caller's enrollments.
//! - `submissions` — submit, grade, request resubmission, and listings.
//!
//! Handlers call the synchronous services in [`crate::services`] and then
//! write the affected records through to the database when a pool is
//! configured. A failed write puts the in-memory stores back the way they
//! were before the request.

pub mod courses;
pub mod enrollments;
pub mod submissions;
pub mod users;

use uuid::Uuid;

use crate::error::AppError;
use crate::state::Store;

/// Log a failed write-through and turn it into the response error.
pub(crate) fn persist_error(entity: &'static str, id: Uuid, err: sqlx::Error) -> AppError {
    tracing::error!(%id, error = %err, "failed to persist {entity} to database");
    AppError::from(err)
}

/// Settle a write-through of the record `id`.
///
/// On failure the store entry goes back to `previous`, the snapshot taken
/// before the service call (`None` when the request created the record).
pub(crate) fn undo_on_failure<T: Clone + Send + Sync>(
    store: &Store<T>,
    entity: &'static str,
    id: Uuid,
    previous: Option<T>,
    written: Result<(), sqlx::Error>,
) -> Result<(), AppError> {
    written.map_err(|err| {
        store.restore(id, previous);
        persist_error(entity, id, err)
    })
}
