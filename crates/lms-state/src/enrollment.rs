//! # Enrollment Lifecycle
//!
//! ```text
//! Active ──▶ Cancelled
//!   │            │
//!   └──▶ Completed ◀┘
//! ```
//!
//! An enrollment starts `Active`. Cancelling and completing set the status
//! unconditionally, so repeating either is a no-op and a staff member may
//! complete an enrollment the student already cancelled. Nothing returns to
//! `Active`: a student who cancelled cannot enroll in the same course again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

// ─── Enrollment Status ──────────────────────────────────────────────

/// Status of a student's enrollment in a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    /// Enrolled; grants access to lessons and assignments.
    Active,
    /// Withdrawn by the student.
    Cancelled,
    /// Marked complete by the course owner or an admin.
    Completed,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "CANCELLED" => Ok(Self::Cancelled),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(format!("unknown enrollment status: {other}")),
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    /// A row for this (student, course) pair already exists, whatever its status.
    #[error("already enrolled (enrollment is {status})")]
    AlreadyEnrolled { status: EnrollmentStatus },

    /// Course content requires an `Active` enrollment.
    #[error("must be enrolled to access course content")]
    NotActive { status: Option<EnrollmentStatus> },
}

// ─── Transition Record ──────────────────────────────────────────────

/// Record of an enrollment status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentTransitionRecord {
    pub from_state: EnrollmentStatus,
    pub to_state: EnrollmentStatus,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

// ─── Enrollment ─────────────────────────────────────────────────────

/// Lifecycle of one (student, course) enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub status: EnrollmentStatus,
    /// Set once when the enrollment is created.
    pub enrolled_at: DateTime<Utc>,
    pub transitions: Vec<EnrollmentTransitionRecord>,
}

impl Enrollment {
    /// Start a new enrollment, refusing if one already exists for the pair.
    ///
    /// `existing` is the status of the row already stored for the same
    /// (student, course), if any.
    pub fn begin(
        existing: Option<EnrollmentStatus>,
        now: DateTime<Utc>,
    ) -> Result<Self, EnrollmentError> {
        if let Some(status) = existing {
            return Err(EnrollmentError::AlreadyEnrolled { status });
        }
        Ok(Self {
            status: EnrollmentStatus::Active,
            enrolled_at: now,
            transitions: Vec::new(),
        })
    }

    /// Withdraw. Idempotent.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.set(EnrollmentStatus::Cancelled, now, "cancelled by student");
    }

    /// Mark complete. Idempotent, and allowed from any status.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.set(EnrollmentStatus::Completed, now, "completed by staff");
    }

    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }

    fn set(&mut self, to: EnrollmentStatus, now: DateTime<Utc>, reason: &str) {
        if self.status == to {
            return;
        }
        self.transitions.push(EnrollmentTransitionRecord {
            from_state: self.status,
            to_state: to,
            timestamp: now,
            reason: reason.to_string(),
        });
        self.status = to;
    }
}

/// Content gate: only an `Active` enrollment lets a student read lessons
/// and assignments of a published course.
pub fn require_active(enrollment: Option<&Enrollment>) -> Result<(), EnrollmentError> {
    match enrollment {
        Some(e) if e.is_active() => Ok(()),
        other => Err(EnrollmentError::NotActive {
            status: other.map(|e| e.status),
        }),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn active() -> Enrollment {
        Enrollment::begin(None, Utc::now()).unwrap()
    }

    #[test]
    fn begin_creates_active_enrollment() {
        let now = Utc::now();
        let e = Enrollment::begin(None, now).unwrap();
        assert_eq!(e.status, EnrollmentStatus::Active);
        assert_eq!(e.enrolled_at, now);
        assert!(e.transitions.is_empty());
        assert!(e.is_active());
    }

    #[test]
    fn begin_refuses_any_existing_row() {
        for status in [
            EnrollmentStatus::Active,
            EnrollmentStatus::Cancelled,
            EnrollmentStatus::Completed,
        ] {
            let err = Enrollment::begin(Some(status), Utc::now()).unwrap_err();
            assert_eq!(err, EnrollmentError::AlreadyEnrolled { status });
        }
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut e = active();
        let t = Utc::now();
        e.cancel(t);
        let once = e.clone();
        e.cancel(t + Duration::minutes(5));
        assert_eq!(e, once);
        assert_eq!(e.status, EnrollmentStatus::Cancelled);
        assert_eq!(e.transitions.len(), 1);
    }

    #[test]
    fn complete_after_cancel_is_allowed() {
        let mut e = active();
        e.cancel(Utc::now());
        e.complete(Utc::now());
        assert_eq!(e.status, EnrollmentStatus::Completed);
        assert_eq!(e.transitions.len(), 2);
        assert_eq!(e.transitions[1].from_state, EnrollmentStatus::Cancelled);
        assert_eq!(e.transitions[1].to_state, EnrollmentStatus::Completed);
    }

    #[test]
    fn enrolled_at_never_changes() {
        let mut e = active();
        let enrolled_at = e.enrolled_at;
        e.complete(enrolled_at + Duration::days(30));
        assert_eq!(e.enrolled_at, enrolled_at);
    }

    #[test]
    fn only_active_grants_content_access() {
        let mut e = active();
        assert!(require_active(Some(&e)).is_ok());
        e.cancel(Utc::now());
        assert_eq!(
            require_active(Some(&e)),
            Err(EnrollmentError::NotActive {
                status: Some(EnrollmentStatus::Cancelled)
            })
        );
        e.complete(Utc::now());
        assert!(require_active(Some(&e)).is_err());
        assert_eq!(
            require_active(None),
            Err(EnrollmentError::NotActive { status: None })
        );
    }

    #[test]
    fn status_parses_its_display() {
        for status in [
            EnrollmentStatus::Active,
            EnrollmentStatus::Cancelled,
            EnrollmentStatus::Completed,
        ] {
            assert_eq!(status.to_string().parse::<EnrollmentStatus>(), Ok(status));
        }
    }
}
