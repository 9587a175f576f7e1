//! # Domain Services
//!
//! Synchronous operations over [`AppState`](crate::state::AppState). Each
//! takes the calling [`Actor`](crate::auth::Actor), checks existence before
//! authorization, and mutates the in-memory stores atomically. Route
//! handlers own persistence: they write the returned records through to the
//! database afterwards.

pub mod course;
pub mod enrollment;
pub mod gate;
pub mod submission;
pub mod users;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;
