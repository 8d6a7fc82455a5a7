//! Assignment and submission models.
//!
//! # Invariants
//! - `Assignment::max_marks` is strictly positive.
//! - At most one submission per (assignment, student) pair.
//! - A submission's grade, when present, must not exceed the assignment's
//!   `max_marks`; the grade bound is checked against the assignment at
//!   write time because the submission row alone cannot see it.

use super::course::CourseId;
use super::principal::PrincipalId;
use super::{require_non_empty, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable assignment identifier.
pub type AssignmentId = Uuid;
/// Stable submission identifier.
pub type SubmissionId = Uuid;

/// Canonical assignment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub uuid: AssignmentId,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    /// Due instant in epoch milliseconds.
    pub due_at: i64,
    pub max_marks: f64,
    /// Weak reference into `StoredFile::filename`; no store-level key.
    pub filename: Option<String>,
}

impl Assignment {
    /// Creates an assignment with a generated stable ID.
    pub fn new(course_id: CourseId, title: impl Into<String>, due_at: i64, max_marks: f64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            course_id,
            title: title.into(),
            description: None,
            due_at,
            max_marks,
            filename: None,
        }
    }

    /// Validates field shapes prior to persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("title", &self.title)?;
        if self.max_marks <= 0.0 {
            return Err(ModelValidationError::NonPositiveMaxMarks(self.max_marks));
        }
        Ok(())
    }
}

/// Work handed in by a student for one assignment.
///
/// `grade` stays `None` until a faculty member posts it; `graded_at` is set
/// in the same write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub uuid: SubmissionId,
    pub assignment_id: AssignmentId,
    pub student_id: PrincipalId,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    /// Hand-in instant in epoch milliseconds.
    pub submitted_at: i64,
    pub graded_at: Option<i64>,
    /// Weak reference into `StoredFile::filename`; no store-level key.
    pub filename: Option<String>,
}

impl Submission {
    /// Creates an ungraded submission with a generated stable ID.
    pub fn new(assignment_id: AssignmentId, student_id: PrincipalId, submitted_at: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            assignment_id,
            student_id,
            grade: None,
            feedback: None,
            submitted_at,
            graded_at: None,
            filename: None,
        }
    }

    /// Validates internal field shapes prior to persistence.
    ///
    /// The upper grade bound needs the owning assignment and is enforced by
    /// the write path, not here.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if let Some(grade) = self.grade {
            if grade < 0.0 {
                return Err(ModelValidationError::NegativeGrade(grade));
            }
        } else if self.graded_at.is_some() {
            return Err(ModelValidationError::GradedAtWithoutGrade);
        }
        Ok(())
    }

    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }
}

/// Derived hand-in state used by gradebook cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Graded,
    LateSubmitted,
    Submitted,
    NotSubmitted,
}
