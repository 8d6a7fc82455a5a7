//! Course, faculty-assignment and enrollment models.
//!
//! # Invariants
//! - `Course::code` is unique across courses.
//! - `credits` stays within `[1, 6]`.
//! - At most one `FacultyAssignment` per course has `is_primary = true`;
//!   the lifecycle layer demotes before it promotes.

use super::principal::PrincipalId;
use super::{require_non_empty, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable course identifier.
pub type CourseId = Uuid;

pub const MIN_CREDITS: u8 = 1;
pub const MAX_CREDITS: u8 = 6;

/// Canonical course record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub uuid: CourseId,
    pub code: String,
    pub name: String,
    pub credits: u8,
    pub description: Option<String>,
}

impl Course {
    /// Creates a course with a generated stable ID.
    pub fn new(code: impl Into<String>, name: impl Into<String>, credits: u8) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            credits,
            description: None,
        }
    }

    /// Validates field shapes prior to persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("code", &self.code)?;
        require_non_empty("name", &self.name)?;
        if !(MIN_CREDITS..=MAX_CREDITS).contains(&self.credits) {
            return Err(ModelValidationError::CreditsOutOfRange(self.credits));
        }
        Ok(())
    }
}

/// Teaching-rights edge between a course and a faculty principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyAssignment {
    pub course_id: CourseId,
    pub faculty_id: PrincipalId,
    pub is_primary: bool,
}

/// Active registration edge between a student and a course.
///
/// Only active registrations exist; there is no history of past
/// enrollments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub student_id: PrincipalId,
    pub course_id: CourseId,
}
