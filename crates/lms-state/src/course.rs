//! # Course Publication
//!
//! ```text
//! Draft ◀──▶ Published
//! ```
//!
//! A course is created as a draft and may be published or unpublished any
//! number of times. `published_at` is present exactly when the course is
//! published; re-publishing an already published course keeps the original
//! timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Publication status of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
    /// Visible only to its owner and admins.
    Draft,
    /// Visible to everyone.
    Published,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CourseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            other => Err(format!("unknown course status: {other}")),
        }
    }
}

/// Status of a course together with the moment it was published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CoursePublication {
    pub status: CourseStatus,
    pub published_at: Option<DateTime<Utc>>,
}

impl CoursePublication {
    /// A freshly created, unpublished course.
    pub fn draft() -> Self {
        Self {
            status: CourseStatus::Draft,
            published_at: None,
        }
    }

    /// Move to `status`, maintaining `published_at`.
    pub fn set_status(&mut self, status: CourseStatus, now: DateTime<Utc>) {
        self.published_at = match status {
            CourseStatus::Published => Some(self.published_at.unwrap_or(now)),
            CourseStatus::Draft => None,
        };
        self.status = status;
    }

    pub fn is_published(&self) -> bool {
        self.status == CourseStatus::Published
    }
}

impl Default for CoursePublication {
    fn default() -> Self {
        Self::draft()
    }
}
