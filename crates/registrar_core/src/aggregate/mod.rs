//! Read-only aggregation engine.
//!
//! # Responsibility
//! - Compute gradebooks, GPA and attendance summaries from raw rows on
//!   demand.
//!
//! # Invariants
//! - Never mutates.
//! - Per-student totals count graded cells only; ungraded assignments
//!   contribute to neither side of the ratio.
//! - Overall GPA is credit-weighted, not a simple average.
//! - `late` does not count as present in the attendance ratio.
//! - Callers must have passed the access guard; the scope they obtained
//!   narrows what these queries return.

use crate::access::AccessScope;
use crate::model::assignment::{Assignment, Submission, SubmissionStatus};
use crate::model::course::CourseId;
use crate::model::principal::PrincipalId;
use crate::repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
use crate::repo::attendance_repo::{AttendanceRepository, SqliteAttendanceRepository};
use crate::repo::course_repo::{CourseRepository, SqliteCourseRepository};
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

/// One gradebook cell: a student crossed with an assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradebookCell {
    pub assignment_id: uuid::Uuid,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub status: SubmissionStatus,
}

/// One gradebook row: a student with cells and derived totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradebookRow {
    pub student_id: PrincipalId,
    pub student_email: String,
    pub cells: Vec<GradebookCell>,
    /// Sum of grades over graded cells.
    pub total_earned: f64,
    /// Sum of max marks over graded cells only.
    pub total_possible: f64,
    /// `total_earned / total_possible * 100`, 0 when nothing is graded.
    pub average_percentage: f64,
    pub letter_grade: &'static str,
}

/// Full gradebook for one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gradebook {
    pub course_id: CourseId,
    pub assignments: Vec<Assignment>,
    pub rows: Vec<GradebookRow>,
}

/// Aggregation queries over one store connection.
pub struct AggregationEngine<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AggregationEngine<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Builds the gradebook for a course, narrowed by the caller's scope.
    ///
    /// An `OwnRows` scope (enrolled student) keeps only that student's row;
    /// faculty and admin scopes see every enrolled student.
    pub fn gradebook(&self, course_id: CourseId, scope: AccessScope) -> RepoResult<Gradebook> {
        let courses = SqliteCourseRepository::new(self.conn);
        let assignments_repo = SqliteAssignmentRepository::new(self.conn);

        if courses.get(course_id)?.is_none() {
            return Err(RepoError::not_found("course", course_id));
        }

        let assignments = assignments_repo.assignments_for_course(course_id)?;
        let mut students = courses.enrolled_students(course_id)?;
        if let AccessScope::OwnRows { student_id, .. } = scope {
            students.retain(|(id, _)| *id == student_id);
        }

        // Index submissions by (assignment, student) once instead of a
        // query per cell.
        let mut by_pair: HashMap<(uuid::Uuid, PrincipalId), Submission> = HashMap::new();
        for submission in assignments_repo.submissions_for_course(course_id)? {
            by_pair.insert((submission.assignment_id, submission.student_id), submission);
        }

        let mut rows = Vec::with_capacity(students.len());
        for (student_id, student_email) in students {
            let mut cells = Vec::with_capacity(assignments.len());
            let mut total_earned = 0.0;
            let mut total_possible = 0.0;

            for assignment in &assignments {
                let submission = by_pair.get(&(assignment.uuid, student_id));
                let status = derive_submission_status(submission, assignment.due_at);
                let (grade, feedback) = match submission {
                    Some(s) => (s.grade, s.feedback.clone()),
                    None => (None, None),
                };
                if let Some(grade) = grade {
                    total_earned += grade;
                    total_possible += assignment.max_marks;
                }
                cells.push(GradebookCell {
                    assignment_id: assignment.uuid,
                    grade,
                    feedback,
                    status,
                });
            }

            let average_percentage = percentage(total_earned, total_possible);
            rows.push(GradebookRow {
                student_id,
                student_email,
                cells,
                total_earned,
                total_possible,
                average_percentage,
                letter_grade: letter_grade(average_percentage),
            });
        }

        Ok(Gradebook {
            course_id,
            assignments,
            rows,
        })
    }

    /// Credit-weighted GPA over courses where the student has at least one
    /// graded submission; 0 when no credits are counted.
    pub fn overall_gpa(&self, student_id: PrincipalId) -> RepoResult<f64> {
        let courses = SqliteCourseRepository::new(self.conn);
        let assignments = SqliteAssignmentRepository::new(self.conn);

        let mut weighted_points = 0.0;
        let mut credits_counted = 0u32;

        for course in courses.enrolled_courses(student_id)? {
            let graded = assignments.graded_submissions_for_student(student_id, course.uuid)?;
            if graded.is_empty() {
                continue;
            }

            let mut earned = 0.0;
            let mut possible = 0.0;
            for (submission, max_marks) in &graded {
                if let Some(grade) = submission.grade {
                    earned += grade;
                    possible += max_marks;
                }
            }

            let course_pct = percentage(earned, possible);
            weighted_points += gpa_points(course_pct) * f64::from(course.credits);
            credits_counted += u32::from(course.credits);
        }

        if credits_counted == 0 {
            return Ok(0.0);
        }
        Ok(weighted_points / f64::from(credits_counted))
    }

    /// Present days over total marked days, as a percentage rounded to the
    /// nearest integer. No marked days yields 0.
    pub fn attendance_percentage(
        &self,
        student_id: PrincipalId,
        course_id: CourseId,
    ) -> RepoResult<u32> {
        let attendance = SqliteAttendanceRepository::new(self.conn);
        let counts = attendance.counts_for_student(student_id, course_id)?;
        if counts.total_marked == 0 {
            return Ok(0);
        }
        let ratio = f64::from(counts.present) / f64::from(counts.total_marked) * 100.0;
        Ok(ratio.round() as u32)
    }
}

/// Derives the hand-in state for one (submission, due date) pair.
pub fn derive_submission_status(
    submission: Option<&Submission>,
    due_at: i64,
) -> SubmissionStatus {
    match submission {
        None => SubmissionStatus::NotSubmitted,
        Some(s) if s.is_graded() => SubmissionStatus::Graded,
        Some(s) if s.submitted_at > due_at => SubmissionStatus::LateSubmitted,
        Some(_) => SubmissionStatus::Submitted,
    }
}

/// Fixed descending letter-grade thresholds.
pub fn letter_grade(percentage: f64) -> &'static str {
    match percentage {
        p if p >= 97.0 => "A+",
        p if p >= 93.0 => "A",
        p if p >= 90.0 => "A-",
        p if p >= 87.0 => "B+",
        p if p >= 83.0 => "B",
        p if p >= 80.0 => "B-",
        p if p >= 77.0 => "C+",
        p if p >= 73.0 => "C",
        p if p >= 70.0 => "C-",
        p if p >= 67.0 => "D+",
        p if p >= 65.0 => "D",
        _ => "F",
    }
}

/// Fixed 4.0-scale points from a course average percentage.
pub fn gpa_points(percentage: f64) -> f64 {
    match percentage {
        p if p >= 97.0 => 4.0,
        p if p >= 93.0 => 3.7,
        p if p >= 90.0 => 3.3,
        p if p >= 87.0 => 3.0,
        p if p >= 83.0 => 2.7,
        p if p >= 80.0 => 2.3,
        p if p >= 77.0 => 2.0,
        p if p >= 73.0 => 1.7,
        p if p >= 70.0 => 1.3,
        p if p >= 67.0 => 1.0,
        p if p >= 65.0 => 0.7,
        _ => 0.0,
    }
}

fn percentage(earned: f64, possible: f64) -> f64 {
    if possible == 0.0 {
        return 0.0;
    }
    earned / possible * 100.0
}

#[cfg(test)]
mod tests {
    use super::{derive_submission_status, gpa_points, letter_grade, percentage};
    use crate::model::assignment::{Submission, SubmissionStatus};
    use uuid::Uuid;

    #[test]
    fn letter_grade_threshold_edges() {
        assert_eq!(letter_grade(100.0), "A+");
        assert_eq!(letter_grade(97.0), "A+");
        assert_eq!(letter_grade(96.9), "A");
        assert_eq!(letter_grade(93.0), "A");
        assert_eq!(letter_grade(90.0), "A-");
        assert_eq!(letter_grade(87.0), "B+");
        assert_eq!(letter_grade(83.0), "B");
        assert_eq!(letter_grade(80.0), "B-");
        assert_eq!(letter_grade(77.0), "C+");
        assert_eq!(letter_grade(73.0), "C");
        assert_eq!(letter_grade(70.0), "C-");
        assert_eq!(letter_grade(67.0), "D+");
        assert_eq!(letter_grade(65.0), "D");
        assert_eq!(letter_grade(64.9), "F");
        assert_eq!(letter_grade(0.0), "F");
    }

    #[test]
    fn gpa_points_threshold_edges() {
        assert_eq!(gpa_points(98.0), 4.0);
        assert_eq!(gpa_points(95.0), 3.7);
        assert_eq!(gpa_points(91.0), 3.3);
        assert_eq!(gpa_points(85.0), 2.7);
        assert_eq!(gpa_points(66.0), 0.7);
        assert_eq!(gpa_points(50.0), 0.0);
    }

    #[test]
    fn empty_denominator_yields_zero_percentage() {
        assert_eq!(percentage(0.0, 0.0), 0.0);
    }

    #[test]
    fn status_derivation_covers_all_states() {
        let due_at = 1_000;
        assert_eq!(
            derive_submission_status(None, due_at),
            SubmissionStatus::NotSubmitted
        );

        let mut submission = Submission::new(Uuid::new_v4(), Uuid::new_v4(), 900);
        assert_eq!(
            derive_submission_status(Some(&submission), due_at),
            SubmissionStatus::Submitted
        );

        submission.submitted_at = 1_001;
        assert_eq!(
            derive_submission_status(Some(&submission), due_at),
            SubmissionStatus::LateSubmitted
        );

        submission.grade = Some(9.0);
        submission.graded_at = Some(1_100);
        assert_eq!(
            derive_submission_status(Some(&submission), due_at),
            SubmissionStatus::Graded
        );
    }
}
