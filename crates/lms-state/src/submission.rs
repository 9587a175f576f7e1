//! # Submission Lifecycle
//!
//! ```text
//!              grade                    request_resubmission
//! Submitted ─────────▶ Graded ─────────────────────────▶ ResubmitRequested
//!     ▲  │                │                                    │
//!     │  └────────────────┴── request_resubmission ───────────┤
//!     └──────────────────────── resubmit ──────────────────────┘
//! ```
//!
//! There is one submission per (assignment, student). Every submit after
//! the first replaces the artifact, bumps `version` by one and clears the
//! previous score and feedback. Grading and requesting a resubmission are
//! accepted from any status; the caller decides who may perform them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

// ─── Submission Status ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    /// Awaiting grading.
    Submitted,
    /// Scored by staff.
    Graded,
    /// Staff asked the student to submit again.
    ResubmitRequested,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Graded => "GRADED",
            Self::ResubmitRequested => "RESUBMIT_REQUESTED",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMITTED" => Ok(Self::Submitted),
            "GRADED" => Ok(Self::Graded),
            "RESUBMIT_REQUESTED" => Ok(Self::ResubmitRequested),
            other => Err(format!("unknown submission status: {other}")),
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// The deadline has passed and the assignment does not accept late work.
    #[error("assignment is past due (due {due_at})")]
    PastDue { due_at: DateTime<Utc> },

    /// Score outside `0..=max_points`.
    #[error("score must be between 0 and {max_points}, got {score}")]
    ScoreOutOfRange { score: i64, max_points: i32 },
}

// ─── Late Policy ────────────────────────────────────────────────────

/// Deadline settings of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatePolicy {
    /// No deadline is enforced when absent.
    pub due_at: Option<DateTime<Utc>>,
    pub allow_late: bool,
}

impl LatePolicy {
    /// Refuse a submission made after the deadline unless late work is allowed.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), SubmissionError> {
        match self.due_at {
            Some(due_at) if now > due_at && !self.allow_late => {
                Err(SubmissionError::PastDue { due_at })
            }
            _ => Ok(()),
        }
    }
}

// ─── Transition Record ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionTransitionRecord {
    pub from_state: SubmissionStatus,
    pub to_state: SubmissionStatus,
    /// Version of the submission after the transition.
    pub version: i32,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

// ─── Submission ─────────────────────────────────────────────────────

/// Lifecycle of the single submission a student keeps for an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    pub artifact_url: String,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub score: Option<i32>,
    pub feedback: Option<String>,
    /// Starts at 1 and grows by one per resubmission.
    pub version: i32,
    pub transitions: Vec<SubmissionTransitionRecord>,
}

impl Submission {
    /// The first submission for an (assignment, student) pair.
    pub fn first(artifact_url: String, now: DateTime<Utc>) -> Self {
        Self {
            artifact_url,
            submitted_at: now,
            status: SubmissionStatus::Submitted,
            score: None,
            feedback: None,
            version: 1,
            transitions: Vec::new(),
        }
    }

    /// Replace the artifact with a new version.
    pub fn resubmit(&mut self, artifact_url: String, now: DateTime<Utc>) {
        self.version = self.version.saturating_add(1);
        self.artifact_url = artifact_url;
        self.submitted_at = now;
        self.score = None;
        self.feedback = None;
        self.record(SubmissionStatus::Submitted, now, "resubmitted by student");
    }

    /// Score the current version.
    pub fn grade(
        &mut self,
        score: i64,
        max_points: i32,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SubmissionError> {
        let score = check_score(score, max_points)?;
        self.score = Some(score);
        self.feedback = feedback;
        self.record(SubmissionStatus::Graded, now, "graded");
        Ok(())
    }

    /// Ask for another version. Any existing score is kept.
    pub fn request_resubmission(&mut self, feedback: Option<String>, now: DateTime<Utc>) {
        self.feedback = feedback;
        self.record(SubmissionStatus::ResubmitRequested, now, "resubmission requested");
    }

    fn record(&mut self, to: SubmissionStatus, now: DateTime<Utc>, reason: &str) {
        self.transitions.push(SubmissionTransitionRecord {
            from_state: self.status,
            to_state: to,
            version: self.version,
            timestamp: now,
            reason: reason.to_string(),
        });
        self.status = to;
    }
}

/// Validate `0 <= score <= max_points`.
pub fn check_score(score: i64, max_points: i32) -> Result<i32, SubmissionError> {
    let out_of_range = || SubmissionError::ScoreOutOfRange { score, max_points };
    if score < 0 || score > i64::from(max_points) {
        return Err(out_of_range());
    }
    i32::try_from(score).map_err(|_| out_of_range())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn submitted() -> Submission {
        Submission::first("https://repo.example/v1".into(), Utc::now())
    }

    #[test]
    fn first_submission_is_version_one() {
        let s = submitted();
        assert_eq!(s.version, 1);
        assert_eq!(s.status, SubmissionStatus::Submitted);
        assert!(s.score.is_none());
        assert!(s.feedback.is_none());
    }

    #[test]
    fn resubmit_bumps_version_and_clears_grade() {
        let mut s = submitted();
        s.grade(7, 10, Some("ok".into()), Utc::now()).unwrap();
        s.resubmit("https://repo.example/v2".into(), Utc::now());
        assert_eq!(s.version, 2);
        assert_eq!(s.status, SubmissionStatus::Submitted);
        assert_eq!(s.artifact_url, "https://repo.example/v2");
        assert!(s.score.is_none());
        assert!(s.feedback.is_none());
    }

    #[test]
    fn grade_accepts_bounds() {
        let mut s = submitted();
        s.grade(0, 10, None, Utc::now()).unwrap();
        assert_eq!(s.score, Some(0));
        s.grade(10, 10, Some("perfect".into()), Utc::now()).unwrap();
        assert_eq!(s.score, Some(10));
        assert_eq!(s.status, SubmissionStatus::Graded);
        assert_eq!(s.feedback.as_deref(), Some("perfect"));
    }

    #[test]
    fn grade_rejects_out_of_range_without_mutation() {
        let mut s = submitted();
        let before = s.clone();
        assert_eq!(
            s.grade(-1, 10, None, Utc::now()),
            Err(SubmissionError::ScoreOutOfRange {
                score: -1,
                max_points: 10
            })
        );
        assert!(s.grade(11, 10, None, Utc::now()).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn score_error_names_the_maximum() {
        let err = check_score(101, 100).unwrap_err();
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn request_resubmission_keeps_score() {
        let mut s = submitted();
        s.grade(5, 10, Some("partial".into()), Utc::now()).unwrap();
        s.request_resubmission(Some("fix part 2".into()), Utc::now());
        assert_eq!(s.status, SubmissionStatus::ResubmitRequested);
        assert_eq!(s.score, Some(5));
        assert_eq!(s.feedback.as_deref(), Some("fix part 2"));
    }

    #[test]
    fn transitions_are_logged_in_order() {
        let mut s = submitted();
        s.grade(5, 10, None, Utc::now()).unwrap();
        s.request_resubmission(None, Utc::now());
        s.resubmit("https://repo.example/v2".into(), Utc::now());
        let path: Vec<_> = s.transitions.iter().map(|t| t.to_state).collect();
        assert_eq!(
            path,
            vec![
                SubmissionStatus::Graded,
                SubmissionStatus::ResubmitRequested,
                SubmissionStatus::Submitted,
            ]
        );
        assert_eq!(s.transitions[2].version, 2);
    }

    #[test]
    fn late_policy() {
        let now = Utc::now();
        let past = LatePolicy {
            due_at: Some(now - Duration::hours(1)),
            allow_late: false,
        };
        assert!(matches!(past.check(now), Err(SubmissionError::PastDue { .. })));

        let lenient = LatePolicy {
            allow_late: true,
            ..past
        };
        assert!(lenient.check(now).is_ok());

        let future = LatePolicy {
            due_at: Some(now + Duration::hours(1)),
            allow_late: false,
        };
        assert!(future.check(now).is_ok());

        let open = LatePolicy {
            due_at: None,
            allow_late: false,
        };
        assert!(open.check(now).is_ok());
    }

    #[test]
    fn status_serializes_screaming_case() {
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::ResubmitRequested).unwrap(),
            "\"RESUBMIT_REQUESTED\""
        );
        assert_eq!(
            "RESUBMIT_REQUESTED".parse::<SubmissionStatus>(),
            Ok(SubmissionStatus::ResubmitRequested)
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Resubmit,
        Grade(i64),
        RequestResubmission,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Resubmit),
            (-5i64..20).prop_map(Op::Grade),
            Just(Op::RequestResubmission),
        ]
    }

    proptest! {
        /// Versions never decrease, grow by exactly one per resubmit, and
        /// every resubmit leaves the submission ungraded.
        #[test]
        fn version_is_monotonic(ops in prop::collection::vec(op(), 0..40)) {
            let mut s = Submission::first("v1".into(), Utc::now());
            let mut resubmits = 0;
            for op in ops {
                let before = s.version;
                match op {
                    Op::Resubmit => {
                        s.resubmit("next".into(), Utc::now());
                        resubmits += 1;
                        prop_assert_eq!(s.version, before + 1);
                        prop_assert!(s.score.is_none());
                        prop_assert!(s.feedback.is_none());
                        prop_assert_eq!(s.status, SubmissionStatus::Submitted);
                    }
                    Op::Grade(score) => {
                        let _ = s.grade(score, 10, Some("fb".into()), Utc::now());
                        prop_assert_eq!(s.version, before);
                    }
                    Op::RequestResubmission => {
                        s.request_resubmission(None, Utc::now());
                        prop_assert_eq!(s.version, before);
                    }
                }
            }
            prop_assert_eq!(s.version, 1 + resubmits);
        }

        /// A score is accepted exactly when it lies in `0..=max_points`.
        #[test]
        fn score_bound(max_points in 1i32..=100_000, score in -1_000i64..200_000) {
            let accepted = check_score(score, max_points).is_ok();
            prop_assert_eq!(accepted, (0..=i64::from(max_points)).contains(&score));
        }
    }
}
