//! Assignment and submission repository.
//!
//! # Invariants
//! - One submission per (assignment, student) pair, enforced by the store
//!   and surfaced as `Duplicate`.
//! - `set_grade` writes grade, feedback and `graded_at` in one statement;
//!   the upper grade bound is checked by the caller against the owning
//!   assignment before the write.

use super::{is_unique_violation, parse_uuid, RepoError, RepoResult};
use crate::model::assignment::{Assignment, AssignmentId, Submission, SubmissionId};
use crate::model::principal::PrincipalId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    uuid,
    course_uuid,
    title,
    description,
    due_at,
    max_marks,
    filename
FROM assignments";

const SUBMISSION_SELECT_SQL: &str = "SELECT
    uuid,
    assignment_uuid,
    student_uuid,
    grade,
    feedback,
    submitted_at,
    graded_at,
    filename
FROM submissions";

/// Repository interface for assignments and submissions.
pub trait AssignmentRepository {
    fn create_assignment(&self, assignment: &Assignment) -> RepoResult<AssignmentId>;
    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>>;
    /// Assignments of a course ordered by due date for stable gradebook
    /// columns.
    fn assignments_for_course(&self, course_id: uuid::Uuid) -> RepoResult<Vec<Assignment>>;

    fn create_submission(&self, submission: &Submission) -> RepoResult<SubmissionId>;
    fn get_submission(&self, id: SubmissionId) -> RepoResult<Option<Submission>>;
    fn submissions_for_course(&self, course_id: uuid::Uuid) -> RepoResult<Vec<Submission>>;
    /// Graded submissions of one student in one course.
    fn graded_submissions_for_student(
        &self,
        student_id: PrincipalId,
        course_id: uuid::Uuid,
    ) -> RepoResult<Vec<(Submission, f64)>>;
    fn set_grade(
        &self,
        id: SubmissionId,
        grade: f64,
        feedback: Option<&str>,
        graded_at: i64,
    ) -> RepoResult<()>;
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn create_assignment(&self, assignment: &Assignment) -> RepoResult<AssignmentId> {
        assignment.validate()?;

        self.conn.execute(
            "INSERT INTO assignments
                 (uuid, course_uuid, title, description, due_at, max_marks, filename)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                assignment.uuid.to_string(),
                assignment.course_id.to_string(),
                assignment.title.as_str(),
                assignment.description.as_deref(),
                assignment.due_at,
                assignment.max_marks,
                assignment.filename.as_deref(),
            ],
        )?;

        Ok(assignment.uuid)
    }

    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>> {
        let row = self
            .conn
            .query_row(
                &format!("{ASSIGNMENT_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_assignment_row(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn assignments_for_course(&self, course_id: uuid::Uuid) -> RepoResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL} WHERE course_uuid = ?1 ORDER BY due_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([course_id.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }

    fn create_submission(&self, submission: &Submission) -> RepoResult<SubmissionId> {
        submission.validate()?;

        let result = self.conn.execute(
            "INSERT INTO submissions
                 (uuid, assignment_uuid, student_uuid, grade, feedback, submitted_at, graded_at,
                  filename)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                submission.uuid.to_string(),
                submission.assignment_id.to_string(),
                submission.student_id.to_string(),
                submission.grade,
                submission.feedback.as_deref(),
                submission.submitted_at,
                submission.graded_at,
                submission.filename.as_deref(),
            ],
        );

        match result {
            Ok(_) => Ok(submission.uuid),
            Err(err) if is_unique_violation(&err) => Err(RepoError::duplicate(
                "submission",
                format!(
                    "student {} already submitted assignment {}",
                    submission.student_id, submission.assignment_id
                ),
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn get_submission(&self, id: SubmissionId) -> RepoResult<Option<Submission>> {
        let row = self
            .conn
            .query_row(
                &format!("{SUBMISSION_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_submission_row(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn submissions_for_course(&self, course_id: uuid::Uuid) -> RepoResult<Vec<Submission>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SUBMISSION_SELECT_SQL}
             WHERE assignment_uuid IN (SELECT uuid FROM assignments WHERE course_uuid = ?1);"
        ))?;
        let mut rows = stmt.query([course_id.to_string()])?;
        let mut submissions = Vec::new();
        while let Some(row) = rows.next()? {
            submissions.push(parse_submission_row(row)?);
        }
        Ok(submissions)
    }

    fn graded_submissions_for_student(
        &self,
        student_id: PrincipalId,
        course_id: uuid::Uuid,
    ) -> RepoResult<Vec<(Submission, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                s.uuid,
                s.assignment_uuid,
                s.student_uuid,
                s.grade,
                s.feedback,
                s.submitted_at,
                s.graded_at,
                s.filename,
                a.max_marks
             FROM submissions s
             JOIN assignments a ON a.uuid = s.assignment_uuid
             WHERE s.student_uuid = ?1
               AND a.course_uuid = ?2
               AND s.grade IS NOT NULL;",
        )?;
        let mut rows = stmt.query(params![student_id.to_string(), course_id.to_string()])?;
        let mut graded = Vec::new();
        while let Some(row) = rows.next()? {
            let max_marks: f64 = row.get("max_marks")?;
            graded.push((parse_submission_row(row)?, max_marks));
        }
        Ok(graded)
    }

    fn set_grade(
        &self,
        id: SubmissionId,
        grade: f64,
        feedback: Option<&str>,
        graded_at: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE submissions
             SET grade = ?1, feedback = ?2, graded_at = ?3
             WHERE uuid = ?4;",
            params![grade, feedback, graded_at, id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("submission", id));
        }
        Ok(())
    }
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<Assignment> {
    let uuid_text: String = row.get("uuid")?;
    let course_text: String = row.get("course_uuid")?;

    Ok(Assignment {
        uuid: parse_uuid(&uuid_text, "assignments.uuid")?,
        course_id: parse_uuid(&course_text, "assignments.course_uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        due_at: row.get("due_at")?,
        max_marks: row.get("max_marks")?,
        filename: row.get("filename")?,
    })
}

fn parse_submission_row(row: &Row<'_>) -> RepoResult<Submission> {
    let uuid_text: String = row.get("uuid")?;
    let assignment_text: String = row.get("assignment_uuid")?;
    let student_text: String = row.get("student_uuid")?;

    let submission = Submission {
        uuid: parse_uuid(&uuid_text, "submissions.uuid")?,
        assignment_id: parse_uuid(&assignment_text, "submissions.assignment_uuid")?,
        student_id: parse_uuid(&student_text, "submissions.student_uuid")?,
        grade: row.get("grade")?,
        feedback: row.get("feedback")?,
        submitted_at: row.get("submitted_at")?,
        graded_at: row.get("graded_at")?,
        filename: row.get("filename")?,
    };
    submission.validate()?;
    Ok(submission)
}
