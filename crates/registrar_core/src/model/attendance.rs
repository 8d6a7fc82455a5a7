//! Attendance record model.
//!
//! # Invariants
//! - One row per (student, course, day); re-marking a (course, day) pair is
//!   a destructive replace of every prior row for that pair.
//! - `day` is an ISO `YYYY-MM-DD` calendar date.

use super::course::CourseId;
use super::principal::PrincipalId;
use super::ModelValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid day regex"));

/// Per-day presence state for one student in one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    /// Stable string id used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
        }
    }

    /// Parses a stored status value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            "late" => Some(Self::Late),
            _ => None,
        }
    }
}

/// Canonical attendance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: PrincipalId,
    pub course_id: CourseId,
    pub day: String,
    pub status: AttendanceStatus,
    pub marked_by: PrincipalId,
}

impl AttendanceRecord {
    pub fn new(
        student_id: PrincipalId,
        course_id: CourseId,
        day: impl Into<String>,
        status: AttendanceStatus,
        marked_by: PrincipalId,
    ) -> Self {
        Self {
            student_id,
            course_id,
            day: day.into(),
            status,
            marked_by,
        }
    }

    /// Validates the day shape prior to persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if !DAY_RE.is_match(&self.day) {
            return Err(ModelValidationError::InvalidDay(self.day.clone()));
        }
        Ok(())
    }
}
