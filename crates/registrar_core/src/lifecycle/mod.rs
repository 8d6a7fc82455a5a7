//! Referential lifecycle manager.
//!
//! # Responsibility
//! - Execute compound create/delete sequences that must leave the entity
//!   graph consistent, because the store enforces no cascade.
//!
//! # Invariants
//! - Cascade steps run strictly sequentially in registry order: every step
//!   removes leaf references before the node they point to, so a crash
//!   mid-sequence leaves an orphan-free (if incomplete) graph.
//! - Every step is idempotent; deleting zero matching rows is success, so
//!   the whole operation can be retried from the top.
//! - Primary-flag transitions demote before they promote, so two primaries
//!   never coexist.

use crate::db::DbError;
use crate::model::attendance::AttendanceRecord;
use crate::model::course::{CourseId, FacultyAssignment};
use crate::model::principal::{PrincipalId, Role};
use crate::repo::attendance_repo::{AttendanceRepository, SqliteAttendanceRepository};
use crate::repo::course_repo::{CourseRepository, SqliteCourseRepository};
use crate::repo::principal_repo::{PrincipalRepository, SqlitePrincipalRepository};
use crate::repo::RepoError;
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// One ordered delete step in a cascade registry.
///
/// `sql` binds the root entity id as `?1`. Adding a new dependent entity is
/// a one-line registration here, not a hunt through delete endpoints.
#[derive(Debug, Clone, Copy)]
struct CascadeStep {
    name: &'static str,
    sql: &'static str,
}

/// Deletion order for a principal: leaf references first, root row last.
/// Removing a faculty's only primary edge deliberately does not promote a
/// replacement; a faculty-less course is a valid terminal state.
const PRINCIPAL_CASCADE: &[CascadeStep] = &[
    CascadeStep {
        name: "attendance_as_student_or_marker",
        sql: "DELETE FROM attendance_records WHERE student_uuid = ?1 OR marked_by = ?1;",
    },
    // Runs while the rows it inspects still exist: a file goes when every
    // assignment/submission naming it is about to be deleted by this
    // cascade and nothing surviving still names it.
    CascadeStep {
        name: "files_orphaned_by_deleted_content",
        sql: "DELETE FROM stored_files WHERE filename IN (
                  SELECT filename FROM submissions
                  WHERE student_uuid = ?1 AND filename IS NOT NULL
                  UNION
                  SELECT filename FROM submissions
                  WHERE filename IS NOT NULL AND assignment_uuid IN (
                      SELECT a.uuid FROM assignments a
                      JOIN faculty_assignments fa ON fa.course_uuid = a.course_uuid
                      WHERE fa.faculty_uuid = ?1)
                  UNION
                  SELECT filename FROM assignments
                  WHERE filename IS NOT NULL AND course_uuid IN (
                      SELECT course_uuid FROM faculty_assignments WHERE faculty_uuid = ?1))
              AND filename NOT IN (
                  SELECT filename FROM assignments
                  WHERE filename IS NOT NULL AND course_uuid NOT IN (
                      SELECT course_uuid FROM faculty_assignments WHERE faculty_uuid = ?1)
                  UNION
                  SELECT filename FROM submissions
                  WHERE filename IS NOT NULL AND student_uuid <> ?1 AND assignment_uuid NOT IN (
                      SELECT a.uuid FROM assignments a
                      JOIN faculty_assignments fa ON fa.course_uuid = a.course_uuid
                      WHERE fa.faculty_uuid = ?1));",
    },
    CascadeStep {
        name: "own_submissions",
        sql: "DELETE FROM submissions WHERE student_uuid = ?1;",
    },
    CascadeStep {
        name: "submissions_under_taught_courses",
        sql: "DELETE FROM submissions WHERE assignment_uuid IN (
                  SELECT a.uuid FROM assignments a
                  JOIN faculty_assignments fa ON fa.course_uuid = a.course_uuid
                  WHERE fa.faculty_uuid = ?1);",
    },
    CascadeStep {
        name: "assignments_of_taught_courses",
        sql: "DELETE FROM assignments WHERE course_uuid IN (
                  SELECT course_uuid FROM faculty_assignments WHERE faculty_uuid = ?1);",
    },
    CascadeStep {
        name: "enrollments",
        sql: "DELETE FROM enrollments WHERE student_uuid = ?1;",
    },
    CascadeStep {
        name: "faculty_assignment_edges",
        sql: "DELETE FROM faculty_assignments WHERE faculty_uuid = ?1;",
    },
    CascadeStep {
        name: "authored_notifications",
        sql: "DELETE FROM notifications WHERE author_uuid = ?1;",
    },
    CascadeStep {
        name: "owned_stored_files",
        sql: "DELETE FROM stored_files WHERE owner_uuid = ?1;",
    },
    CascadeStep {
        name: "principal_row",
        sql: "DELETE FROM principals WHERE uuid = ?1;",
    },
];

/// Deletion order for a course.
const COURSE_CASCADE: &[CascadeStep] = &[
    CascadeStep {
        name: "attendance_records",
        sql: "DELETE FROM attendance_records WHERE course_uuid = ?1;",
    },
    // Must precede the assignment/submission steps for the same reason as
    // the principal registry's file step.
    CascadeStep {
        name: "files_orphaned_by_deleted_content",
        sql: "DELETE FROM stored_files WHERE filename IN (
                  SELECT filename FROM assignments
                  WHERE course_uuid = ?1 AND filename IS NOT NULL
                  UNION
                  SELECT s.filename FROM submissions s
                  JOIN assignments a ON a.uuid = s.assignment_uuid
                  WHERE a.course_uuid = ?1 AND s.filename IS NOT NULL)
              AND filename NOT IN (
                  SELECT filename FROM assignments
                  WHERE course_uuid <> ?1 AND filename IS NOT NULL
                  UNION
                  SELECT s.filename FROM submissions s
                  JOIN assignments a ON a.uuid = s.assignment_uuid
                  WHERE a.course_uuid <> ?1 AND s.filename IS NOT NULL);",
    },
    CascadeStep {
        name: "submissions_via_assignments",
        sql: "DELETE FROM submissions WHERE assignment_uuid IN (
                  SELECT uuid FROM assignments WHERE course_uuid = ?1);",
    },
    CascadeStep {
        name: "assignments",
        sql: "DELETE FROM assignments WHERE course_uuid = ?1;",
    },
    CascadeStep {
        name: "enrollments",
        sql: "DELETE FROM enrollments WHERE course_uuid = ?1;",
    },
    CascadeStep {
        name: "faculty_assignment_edges",
        sql: "DELETE FROM faculty_assignments WHERE course_uuid = ?1;",
    },
    CascadeStep {
        name: "course_row",
        sql: "DELETE FROM courses WHERE uuid = ?1;",
    },
];

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Failures raised by lifecycle operations.
#[derive(Debug)]
pub enum LifecycleError {
    /// Admin principals are not deletable through this path.
    AdminNotDeletable(PrincipalId),
    /// A referenced root entity does not exist (creation paths only;
    /// deletion treats a missing root as a no-op).
    NotFound { kind: &'static str, id: Uuid },
    /// A cross-entity rule would be broken; rejected before any write.
    InvariantViolation { which: String },
    /// A multi-step sequence stopped partway. `completed_steps` counts the
    /// steps that finished; re-invoking the operation is safe because every
    /// step is idempotent.
    Partial {
        operation: &'static str,
        completed_steps: usize,
        failed_step: &'static str,
        source: DbError,
    },
    /// Store failure before the first mutating step.
    Store(RepoError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdminNotDeletable(id) => {
                write!(f, "admin principal {id} is not deletable through this path")
            }
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvariantViolation { which } => write!(f, "invariant violation: {which}"),
            Self::Partial {
                operation,
                completed_steps,
                failed_step,
                source,
            } => write!(
                f,
                "{operation} stopped after {completed_steps} steps at `{failed_step}`: {source}; \
                 safe to retry"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Partial { source, .. } => Some(source),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LifecycleError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Outcome of one cascade run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeReport {
    /// Rows removed across all steps, root row included.
    pub rows_deleted: usize,
    /// Whether the root row itself existed and was removed. `false` means
    /// the whole run was a no-op (already deleted), which is success.
    pub root_deleted: bool,
}

/// Lifecycle orchestrator over one store connection.
pub struct LifecycleManager<'conn> {
    conn: &'conn Connection,
}

impl<'conn> LifecycleManager<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Deletes a principal and every row referencing it, in registry order.
    ///
    /// Admins are rejected before any write. A missing principal is a
    /// no-op success so that concurrent duplicate deletes stay idempotent.
    pub fn delete_principal(&self, id: PrincipalId) -> LifecycleResult<CascadeReport> {
        let principals = SqlitePrincipalRepository::new(self.conn);
        if let Some(principal) = principals.get(id)? {
            if principal.role == Role::Admin {
                return Err(LifecycleError::AdminNotDeletable(id));
            }
        }

        self.run_cascade("delete_principal", PRINCIPAL_CASCADE, id)
    }

    /// Deletes a course and every row referencing it, in registry order.
    pub fn delete_course(&self, id: CourseId) -> LifecycleResult<CascadeReport> {
        self.run_cascade("delete_course", COURSE_CASCADE, id)
    }

    /// Replaces the full attendance row set for one (course, day) pair.
    ///
    /// Destructive overwrite, not a merge: students absent from the new
    /// batch silently lose their rows for that day. A batch listing the
    /// same student twice is rejected before the existing rows are touched;
    /// letting it through would fail on the (student, course, day) key
    /// mid-insert after the old rows are already gone.
    pub fn replace_attendance(
        &self,
        course_id: CourseId,
        day: &str,
        records: &[AttendanceRecord],
    ) -> LifecycleResult<usize> {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        for record in records {
            record
                .validate()
                .map_err(|err| LifecycleError::InvariantViolation {
                    which: err.to_string(),
                })?;
            if record.course_id != course_id || record.day != day {
                return Err(LifecycleError::InvariantViolation {
                    which: format!(
                        "attendance batch row for student {} does not match (course, day) target",
                        record.student_id
                    ),
                });
            }
            if !seen.insert(record.student_id) {
                return Err(LifecycleError::InvariantViolation {
                    which: format!(
                        "attendance batch lists student {} more than once",
                        record.student_id
                    ),
                });
            }
        }

        let attendance = SqliteAttendanceRepository::new(self.conn);
        let removed = attendance.delete_for_day(course_id, day).map_err(|err| {
            partial_from_repo("replace_attendance", 0, "delete_existing_day_rows", err)
        })?;
        let inserted = attendance.insert_batch(records).map_err(|err| {
            partial_from_repo("replace_attendance", 1, "insert_new_day_rows", err)
        })?;

        info!(
            "event=attendance_replace module=lifecycle status=ok course={} day={} removed={} inserted={}",
            course_id, day, removed, inserted
        );
        Ok(inserted)
    }

    /// Creates or re-flags a teaching edge.
    ///
    /// A primary request demotes any existing primary first, so the course
    /// never has two primaries, though it may transiently have zero. The
    /// first edge on a course must be primary.
    pub fn assign_faculty(
        &self,
        course_id: CourseId,
        faculty_id: PrincipalId,
        is_primary: bool,
    ) -> LifecycleResult<()> {
        let courses = SqliteCourseRepository::new(self.conn);
        let principals = SqlitePrincipalRepository::new(self.conn);

        if courses.get(course_id)?.is_none() {
            return Err(LifecycleError::NotFound {
                kind: "course",
                id: course_id,
            });
        }
        let faculty = principals.get(faculty_id)?.ok_or(LifecycleError::NotFound {
            kind: "principal",
            id: faculty_id,
        })?;
        if faculty.role != Role::Faculty {
            return Err(LifecycleError::InvariantViolation {
                which: format!(
                    "faculty assignment target {} has role `{}`, expected `faculty`",
                    faculty_id,
                    faculty.role.as_str()
                ),
            });
        }

        let existing = courses.list_faculty_assignments(course_id)?;
        if !is_primary {
            let other_primary_exists = existing
                .iter()
                .any(|edge| edge.is_primary && edge.faculty_id != faculty_id);
            if !other_primary_exists {
                return Err(LifecycleError::InvariantViolation {
                    which: format!(
                        "course {course_id} needs a primary faculty before non-primary edges"
                    ),
                });
            }
        }

        if is_primary {
            courses
                .demote_primaries(course_id)
                .map_err(|err| partial_from_repo("assign_faculty", 0, "demote_primaries", err))?;
        }
        courses
            .upsert_faculty_assignment(&FacultyAssignment {
                course_id,
                faculty_id,
                is_primary,
            })
            .map_err(|err| {
                partial_from_repo("assign_faculty", usize::from(is_primary), "upsert_edge", err)
            })?;

        info!(
            "event=faculty_assign module=lifecycle status=ok course={} faculty={} primary={}",
            course_id, faculty_id, is_primary
        );
        Ok(())
    }

    fn run_cascade(
        &self,
        operation: &'static str,
        steps: &[CascadeStep],
        root_id: Uuid,
    ) -> LifecycleResult<CascadeReport> {
        let id_text = root_id.to_string();
        let mut rows_deleted = 0usize;
        let mut root_deleted = false;
        let last = steps.len() - 1;

        for (index, step) in steps.iter().enumerate() {
            match self.conn.execute(step.sql, [id_text.as_str()]) {
                Ok(changed) => {
                    rows_deleted += changed;
                    if index == last {
                        root_deleted = changed > 0;
                    }
                }
                Err(err) => {
                    warn!(
                        "event=cascade module=lifecycle status=error operation={} step={} completed={} error={}",
                        operation, step.name, index, err
                    );
                    return Err(LifecycleError::Partial {
                        operation,
                        completed_steps: index,
                        failed_step: step.name,
                        source: DbError::Sqlite(err),
                    });
                }
            }
        }

        info!(
            "event=cascade module=lifecycle status=ok operation={} root={} rows_deleted={} root_deleted={}",
            operation, root_id, rows_deleted, root_deleted
        );
        Ok(CascadeReport {
            rows_deleted,
            root_deleted,
        })
    }
}

fn partial_from_repo(
    operation: &'static str,
    completed_steps: usize,
    failed_step: &'static str,
    err: RepoError,
) -> LifecycleError {
    match err {
        // Validation failures happen before any write in that step.
        RepoError::Validation(v) => LifecycleError::InvariantViolation {
            which: v.to_string(),
        },
        RepoError::Db(source) => LifecycleError::Partial {
            operation,
            completed_steps,
            failed_step,
            source,
        },
        other => LifecycleError::Store(other),
    }
}
