//! # lms-core — Foundational Types for the LMS Stack
//!
//! Leaf crate of the workspace. Defines the vocabulary every other crate
//! speaks: who is acting ([`Principal`], [`Role`]), how input is validated
//! ([`ValidationError`] and the helpers in [`validate`]), and how list
//! endpoints page their results ([`PageRequest`], [`Page`]).
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lms-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod pagination;
pub mod validate;

pub use error::ValidationError;
pub use identity::{Email, Principal, Role};
pub use pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
