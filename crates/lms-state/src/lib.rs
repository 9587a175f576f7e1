//! # lms-state — Lifecycle State Machines
//!
//! The three lifecycles that drive the LMS workflow. Each machine owns its
//! status, its timestamps and an ordered transition log; callers supply the
//! clock so transitions are reproducible in tests.
//!
//! ## State Machines
//!
//! - **Course publication** (`course.rs`): `Draft ⇄ Published`, with
//!   `published_at` tracking the moment the course first became visible.
//!
//! - **Enrollment** (`enrollment.rs`): `Active → Cancelled | Completed`.
//!   Only an `Active` enrollment grants access to course content.
//!
//! - **Submission** (`submission.rs`): `Submitted → Graded |
//!   ResubmitRequested → Submitted`, with a monotonically increasing
//!   version, the late-submission policy and the score bound.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lms-*` crates.
//! - Authorization is not decided here. These types assume the caller has
//!   already been allowed to perform the transition.

pub mod course;
pub mod enrollment;
pub mod submission;

// ─── Course re-exports ──────────────────────────────────────────────

pub use course::{CoursePublication, CourseStatus};

// ─── Enrollment re-exports ──────────────────────────────────────────

pub use enrollment::{
    require_active, Enrollment, EnrollmentError, EnrollmentStatus, EnrollmentTransitionRecord,
};

// ─── Submission re-exports ──────────────────────────────────────────

pub use submission::{
    check_score, LatePolicy, Submission, SubmissionError, SubmissionStatus,
    SubmissionTransitionRecord,
};
