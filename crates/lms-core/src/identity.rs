//! # Identity Primitives
//!
//! Roles and the authenticated principal. The credential verifier that
//! produces a [`Principal`] lives at the transport boundary; everything
//! below it only trusts the e-mail carried here and re-resolves the
//! persisted user on every call.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;

// ── Role ────────────────────────────────────────────────────────────────────

/// Closed set of roles. Every authorization decision matches on this enum
/// explicitly; there is no privilege ordering between variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Enrolls in courses and submits assignments.
    Student,
    /// Owns and authors courses, grades submissions for owned courses.
    Instructor,
    /// Full access to every course and submission.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Instructor => "INSTRUCTOR",
            Self::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Email ───────────────────────────────────────────────────────────────────

/// Maximum length of an e-mail address in characters.
pub const MAX_EMAIL_LEN: usize = 255;

/// A syntactically valid e-mail address.
///
/// Surrounding whitespace is trimmed on construction; comparison is exact
/// on the trimmed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, format = "email")]
pub struct Email(String);

impl Email {
    /// Validate and wrap an e-mail address.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let value = raw.as_ref().trim();
        let invalid = || ValidationError::InvalidEmail(value.to_string());

        if value.is_empty() || value.chars().count() > MAX_EMAIL_LEN {
            return Err(invalid());
        }
        if value.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        let labels: Vec<&str> = domain.split('.').collect();
        let bad_label = |l: &&str| {
            l.is_empty() || !l.chars().all(|c| c.is_alphanumeric() || c == '-')
        };
        if labels.len() < 2 || labels.iter().any(bad_label) {
            return Err(invalid());
        }
        Ok(Self(value.to_string()))
    }

    /// Return the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Principal ───────────────────────────────────────────────────────────────

/// An authenticated caller as vouched for by the credential verifier.
///
/// Carries only the e-mail: role and id come from the persisted user record,
/// so a principal whose user was never registered resolves to nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: Email,
}

impl Principal {
    pub fn new(email: Email) -> Self {
        Self { email }
    }
}
