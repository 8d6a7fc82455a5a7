//! Course, faculty-assignment and enrollment repository.
//!
//! # Responsibility
//! - Persist courses and the two edges hanging off them (teaching rights
//!   and registrations).
//!
//! # Invariants
//! - `code` uniqueness is enforced by the store and surfaced as
//!   `Duplicate`; so is the (student, course) enrollment pair.
//! - Primary-flag transitions are done demote-first by the lifecycle
//!   layer; this repository only exposes the individual steps.

use super::{is_unique_violation, parse_uuid, RepoError, RepoResult};
use crate::model::course::{Course, CourseId, Enrollment, FacultyAssignment};
use crate::model::principal::PrincipalId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COURSE_SELECT_SQL: &str = "SELECT
    uuid,
    code,
    name,
    credits,
    description
FROM courses";

/// Repository interface for courses and their edges.
pub trait CourseRepository {
    fn create(&self, course: &Course) -> RepoResult<CourseId>;
    fn get(&self, id: CourseId) -> RepoResult<Option<Course>>;

    /// Inserts or re-flags a teaching edge. The pair is upserted so that
    /// promoting an existing edge does not duplicate it.
    fn upsert_faculty_assignment(&self, edge: &FacultyAssignment) -> RepoResult<()>;
    /// Clears the primary flag on every edge of the course; returns the
    /// number of demoted rows.
    fn demote_primaries(&self, course_id: CourseId) -> RepoResult<usize>;
    fn list_faculty_assignments(&self, course_id: CourseId) -> RepoResult<Vec<FacultyAssignment>>;
    fn has_faculty_edge(&self, course_id: CourseId, faculty_id: PrincipalId) -> RepoResult<bool>;

    fn enroll(&self, enrollment: &Enrollment) -> RepoResult<()>;
    fn is_enrolled(&self, student_id: PrincipalId, course_id: CourseId) -> RepoResult<bool>;
    /// Enrolled students of a course, ordered by email for deterministic
    /// gradebook rows. Returns (student id, email) pairs.
    fn enrolled_students(&self, course_id: CourseId) -> RepoResult<Vec<(PrincipalId, String)>>;
    /// Courses a student is enrolled in.
    fn enrolled_courses(&self, student_id: PrincipalId) -> RepoResult<Vec<Course>>;
}

/// SQLite-backed course repository.
pub struct SqliteCourseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCourseRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CourseRepository for SqliteCourseRepository<'_> {
    fn create(&self, course: &Course) -> RepoResult<CourseId> {
        course.validate()?;

        let result = self.conn.execute(
            "INSERT INTO courses (uuid, code, name, credits, description)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                course.uuid.to_string(),
                course.code.as_str(),
                course.name.as_str(),
                course.credits,
                course.description.as_deref(),
            ],
        );

        match result {
            Ok(_) => Ok(course.uuid),
            Err(err) if is_unique_violation(&err) => Err(RepoError::duplicate(
                "course",
                format!("code `{}` already exists", course.code),
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn get(&self, id: CourseId) -> RepoResult<Option<Course>> {
        let row = self
            .conn
            .query_row(
                &format!("{COURSE_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_course_row(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn upsert_faculty_assignment(&self, edge: &FacultyAssignment) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO faculty_assignments (course_uuid, faculty_uuid, is_primary)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (course_uuid, faculty_uuid)
             DO UPDATE SET is_primary = excluded.is_primary;",
            params![
                edge.course_id.to_string(),
                edge.faculty_id.to_string(),
                edge.is_primary as i64,
            ],
        )?;
        Ok(())
    }

    fn demote_primaries(&self, course_id: CourseId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE faculty_assignments SET is_primary = 0
             WHERE course_uuid = ?1 AND is_primary = 1;",
            [course_id.to_string()],
        )?;
        Ok(changed)
    }

    fn list_faculty_assignments(&self, course_id: CourseId) -> RepoResult<Vec<FacultyAssignment>> {
        let mut stmt = self.conn.prepare(
            "SELECT course_uuid, faculty_uuid, is_primary
             FROM faculty_assignments
             WHERE course_uuid = ?1
             ORDER BY faculty_uuid ASC;",
        )?;
        let mut rows = stmt.query([course_id.to_string()])?;
        let mut edges = Vec::new();
        while let Some(row) = rows.next()? {
            let course_text: String = row.get("course_uuid")?;
            let faculty_text: String = row.get("faculty_uuid")?;
            edges.push(FacultyAssignment {
                course_id: parse_uuid(&course_text, "faculty_assignments.course_uuid")?,
                faculty_id: parse_uuid(&faculty_text, "faculty_assignments.faculty_uuid")?,
                is_primary: row.get::<_, i64>("is_primary")? != 0,
            });
        }
        Ok(edges)
    }

    fn has_faculty_edge(&self, course_id: CourseId, faculty_id: PrincipalId) -> RepoResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM faculty_assignments
             WHERE course_uuid = ?1 AND faculty_uuid = ?2;",
            params![course_id.to_string(), faculty_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn enroll(&self, enrollment: &Enrollment) -> RepoResult<()> {
        let result = self.conn.execute(
            "INSERT INTO enrollments (student_uuid, course_uuid) VALUES (?1, ?2);",
            params![
                enrollment.student_id.to_string(),
                enrollment.course_id.to_string(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(RepoError::duplicate(
                "enrollment",
                format!(
                    "student {} already enrolled in course {}",
                    enrollment.student_id, enrollment.course_id
                ),
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn is_enrolled(&self, student_id: PrincipalId, course_id: CourseId) -> RepoResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM enrollments
             WHERE student_uuid = ?1 AND course_uuid = ?2;",
            params![student_id.to_string(), course_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn enrolled_students(&self, course_id: CourseId) -> RepoResult<Vec<(PrincipalId, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.uuid, p.email
             FROM enrollments e
             JOIN principals p ON p.uuid = e.student_uuid
             WHERE e.course_uuid = ?1
             ORDER BY p.email ASC;",
        )?;
        let mut rows = stmt.query([course_id.to_string()])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            students.push((
                parse_uuid(&uuid_text, "principals.uuid")?,
                row.get("email")?,
            ));
        }
        Ok(students)
    }

    fn enrolled_courses(&self, student_id: PrincipalId) -> RepoResult<Vec<Course>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.uuid, c.code, c.name, c.credits, c.description
             FROM enrollments e
             JOIN courses c ON c.uuid = e.course_uuid
             WHERE e.student_uuid = ?1
             ORDER BY c.code ASC;",
        )?;
        let mut rows = stmt.query([student_id.to_string()])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            courses.push(parse_course_row(row)?);
        }
        Ok(courses)
    }
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<Course> {
    let uuid_text: String = row.get("uuid")?;
    let credits: i64 = row.get("credits")?;
    let credits = u8::try_from(credits).map_err(|_| {
        RepoError::InvalidData(format!("invalid credits value `{credits}` in courses.credits"))
    })?;

    Ok(Course {
        uuid: parse_uuid(&uuid_text, "courses.uuid")?,
        code: row.get("code")?,
        name: row.get("name")?,
        credits,
        description: row.get("description")?,
    })
}
