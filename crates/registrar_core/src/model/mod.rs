//! Canonical domain model for the academic records engine.
//!
//! # Responsibility
//! - Define the records shared by access, lifecycle, aggregation and
//!   dispatch layers.
//! - Keep per-record validation next to the data it protects.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that is never reused.
//! - Repository write paths must call `validate()` before persistence.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod assignment;
pub mod attendance;
pub mod course;
pub mod notification;
pub mod principal;
pub mod stored_file;

/// Validation failure raised by model `validate()` methods.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValidationError {
    /// Email does not match the accepted address shape.
    InvalidEmail(String),
    /// Required text field is empty or whitespace.
    EmptyField(&'static str),
    /// Course credits outside the accepted `[1, 6]` range.
    CreditsOutOfRange(u8),
    /// Assignment max marks must be strictly positive.
    NonPositiveMaxMarks(f64),
    /// Submission grade is negative.
    NegativeGrade(f64),
    /// Submission has a graded timestamp without a grade.
    GradedAtWithoutGrade,
    /// Attendance day is not an ISO `YYYY-MM-DD` date.
    InvalidDay(String),
    /// Stored file size is negative.
    NegativeFileSize(i64),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::EmptyField(field) => write!(f, "field `{field}` must not be empty"),
            Self::CreditsOutOfRange(credits) => {
                write!(f, "course credits must be in [1, 6], got {credits}")
            }
            Self::NonPositiveMaxMarks(value) => {
                write!(f, "assignment max marks must be > 0, got {value}")
            }
            Self::NegativeGrade(value) => write!(f, "submission grade must be >= 0, got {value}"),
            Self::GradedAtWithoutGrade => {
                write!(f, "submission carries graded_at without a grade")
            }
            Self::InvalidDay(value) => {
                write!(f, "attendance day must be YYYY-MM-DD, got `{value}`")
            }
            Self::NegativeFileSize(value) => {
                write!(f, "stored file size must be >= 0, got {value}")
            }
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn require_non_empty(
    field: &'static str,
    value: &str,
) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::EmptyField(field));
    }
    Ok(())
}

/// Current instant in epoch milliseconds; 0 if the clock is before 1970.
pub(crate) fn now_epoch_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
