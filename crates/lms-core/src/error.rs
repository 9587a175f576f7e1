//! # Error Types
//!
//! Input validation errors shared by every layer. Each variant names the
//! offending field so the API can return a precise message without
//! inspecting the request again.

use thiserror::Error;

/// Rejection of caller-supplied input before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// E-mail address is not syntactically valid.
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    /// A required field is absent from the request.
    #[error("{field} is required")]
    Missing {
        /// Field name.
        field: &'static str,
    },

    /// A required text field is empty or whitespace only.
    #[error("{field} must not be blank")]
    Blank {
        /// Field name as it appears in the request body.
        field: &'static str,
    },

    /// A text field exceeds its maximum length (in characters).
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },

    /// A text field is shorter than its minimum length (in characters).
    #[error("{field} must be at least {min} characters")]
    TooShort {
        /// Field name.
        field: &'static str,
        /// Minimum allowed length.
        min: usize,
    },

    /// A field that must hold an absolute URL does not.
    #[error("{field} must be a valid URL")]
    InvalidUrl {
        /// Field name.
        field: &'static str,
    },

    /// A numeric field is outside its inclusive range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
        /// Rejected value.
        value: i64,
    },
}
