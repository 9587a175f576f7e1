//! # Field Validation
//!
//! Length and range checks applied to request bodies before any store is
//! touched. Lengths are counted in characters, not bytes.

use url::Url;

use crate::error::ValidationError;

/// Maximum course, lesson and assignment title length.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum course description length.
pub const MAX_DESCRIPTION_LEN: usize = 20_000;
/// Maximum assignment instructions length.
pub const MAX_INSTRUCTIONS_LEN: usize = 50_000;
/// Maximum grading feedback length.
pub const MAX_FEEDBACK_LEN: usize = 50_000;
/// Maximum submission artifact URL length.
pub const MAX_ARTIFACT_URL_LEN: usize = 2_048;
/// Maximum lesson content URL length.
pub const MAX_CONTENT_URL_LEN: usize = 2_048;
/// Inclusive bounds on a lesson's position within its course.
pub const MIN_ORDER_INDEX: i64 = 1;
pub const MAX_ORDER_INDEX: i64 = 10_000;
/// Inclusive bounds on a user's full name.
pub const MIN_FULL_NAME_LEN: usize = 2;
pub const MAX_FULL_NAME_LEN: usize = 255;
/// Inclusive bounds on an assignment's maximum points.
pub const MIN_MAX_POINTS: i64 = 1;
pub const MAX_MAX_POINTS: i64 = 100_000;

/// Require a non-blank value no longer than `max` characters.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    max_len(field, value, max)
}

/// Require an optional value, when present, to be no longer than `max` characters.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) => max_len(field, v, max),
        None => Ok(()),
    }
}

/// Require a value to be no longer than `max` characters.
pub fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Require a trimmed value of `min..=max` characters.
pub fn len_between(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::Blank { field });
    }
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Require a non-blank absolute URL no longer than `max` characters.
///
/// Scheme-only forms such as `mailto:` are rejected; the value has to name a
/// location a browser can open.
pub fn required_url(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    required_text(field, value, max)?;
    match Url::parse(value.trim()) {
        Ok(url) if !url.cannot_be_a_base() => Ok(()),
        _ => Err(ValidationError::InvalidUrl { field }),
    }
}

/// [`required_url`] for a field that may be omitted.
pub fn optional_url(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) => required_url(field, v, max),
        None => Ok(()),
    }
}

/// Require a present value with `min <= value <= max`.
pub fn required_in_range(
    field: &'static str,
    value: Option<i64>,
    min: i64,
    max: i64,
) -> Result<(), ValidationError> {
    match value {
        Some(v) => in_range(field, v, min, max),
        None => Err(ValidationError::Missing { field }),
    }
}

/// Require `min <= value <= max`.
pub fn in_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_blank_and_long() {
        assert_eq!(
            required_text("title", "   ", MAX_TITLE_LEN),
            Err(ValidationError::Blank { field: "title" })
        );
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert_eq!(
            required_text("title", &long, MAX_TITLE_LEN),
            Err(ValidationError::TooLong {
                field: "title",
                max: MAX_TITLE_LEN
            })
        );
        assert!(required_text("title", &"x".repeat(MAX_TITLE_LEN), MAX_TITLE_LEN).is_ok());
    }

    #[test]
    fn lengths_count_characters() {
        // 200 two-byte characters is still within the title limit.
        let title = "é".repeat(MAX_TITLE_LEN);
        assert!(required_text("title", &title, MAX_TITLE_LEN).is_ok());
    }

    #[test]
    fn optional_text_allows_absence() {
        assert!(optional_text("description", None, 10).is_ok());
        assert!(optional_text("description", Some(""), 10).is_ok());
        assert!(optional_text("description", Some("01234567890"), 10).is_err());
    }

    #[test]
    fn full_name_bounds() {
        assert!(matches!(
            len_between("full_name", "A", MIN_FULL_NAME_LEN, MAX_FULL_NAME_LEN),
            Err(ValidationError::TooShort { .. })
        ));
        assert!(len_between("full_name", "Al", MIN_FULL_NAME_LEN, MAX_FULL_NAME_LEN).is_ok());
        assert!(matches!(
            len_between("full_name", "  ", MIN_FULL_NAME_LEN, MAX_FULL_NAME_LEN),
            Err(ValidationError::Blank { .. })
        ));
    }

    #[test]
    fn urls_must_be_absolute() {
        assert!(required_url("artifact_url", "https://git.school.edu/s/hw1", 2_048).is_ok());
        assert!(required_url("artifact_url", " https://example.com ", 2_048).is_ok());
        for bad in ["not a url", "/relative/path", "mailto:s@school.edu"] {
            assert_eq!(
                required_url("artifact_url", bad, 2_048),
                Err(ValidationError::InvalidUrl {
                    field: "artifact_url"
                }),
                "{bad}"
            );
        }
        assert_eq!(
            required_url("artifact_url", "  ", 2_048),
            Err(ValidationError::Blank {
                field: "artifact_url"
            })
        );
        let long = format!("https://example.com/{}", "x".repeat(2_048));
        assert!(matches!(
            required_url("artifact_url", &long, 2_048),
            Err(ValidationError::TooLong { .. })
        ));
        assert!(optional_url("content_url", None, 10).is_ok());
        assert!(optional_url("content_url", Some(""), 10).is_err());
    }

    #[test]
    fn order_index_range() {
        for bad in [-1, 0, 10_001] {
            assert!(in_range("order_index", bad, MIN_ORDER_INDEX, MAX_ORDER_INDEX).is_err());
        }
        assert!(in_range("order_index", 1, MIN_ORDER_INDEX, MAX_ORDER_INDEX).is_ok());
        assert!(in_range("order_index", 10_000, MIN_ORDER_INDEX, MAX_ORDER_INDEX).is_ok());
        assert_eq!(
            required_in_range("order_index", None, MIN_ORDER_INDEX, MAX_ORDER_INDEX),
            Err(ValidationError::Missing {
                field: "order_index"
            })
        );
        let three = required_in_range("order_index", Some(3), MIN_ORDER_INDEX, MAX_ORDER_INDEX);
        assert!(three.is_ok());
    }

    #[test]
    fn max_points_range() {
        assert!(in_range("max_points", 0, MIN_MAX_POINTS, MAX_MAX_POINTS).is_err());
        assert!(in_range("max_points", 1, MIN_MAX_POINTS, MAX_MAX_POINTS).is_ok());
        assert!(in_range("max_points", 100_000, MIN_MAX_POINTS, MAX_MAX_POINTS).is_ok());
        assert!(in_range("max_points", 100_001, MIN_MAX_POINTS, MAX_MAX_POINTS).is_err());
    }
}
