//! Records boundary facade.
//!
//! # Responsibility
//! - Expose one operation per engine capability, each authorized before it
//!   runs and each returning a tagged success or failure.
//!
//! # Invariants
//! - `Denied` and `InvariantViolation` are detected before any store
//!   mutation.
//! - `PartialLifecycleFailure` is returned after some mutation occurred and
//!   the same call is safe to retry.
//! - Dispatch failures never surface here; notification delivery is
//!   best-effort and never blocks or rolls back the triggering write.

use crate::access::{AccessError, AccessGuard, AccessScope, DenyReason};
use crate::aggregate::{AggregationEngine, Gradebook};
use crate::dispatch::{DomainEvent, EventSink};
use crate::lifecycle::{CascadeReport, LifecycleError, LifecycleManager};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::course::{CourseId, Enrollment};
use crate::model::notification::{Notification, NotificationId, Priority, RecipientRole};
use crate::model::principal::{Actor, PrincipalId, Role};
use crate::model::assignment::SubmissionId;
use crate::model::now_epoch_ms;
use crate::repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
use crate::repo::course_repo::{CourseRepository, SqliteCourseRepository};
use crate::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use crate::repo::principal_repo::{PrincipalRepository, SqlitePrincipalRepository};
use crate::repo::RepoError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

/// Tagged failure taxonomy returned by every boundary operation.
#[derive(Debug)]
pub enum EngineError {
    /// Authorization failure; the requested mutation never started.
    Denied { reason: DenyReason },
    /// A referenced entity does not exist. Reads treat this as an error;
    /// idempotent deletes treat it as success and never raise it.
    NotFound { kind: &'static str, id: Uuid },
    /// A cross-entity rule would be broken; rejected before any write.
    InvariantViolation { which: String },
    /// A multi-step lifecycle sequence stopped partway; retrying the whole
    /// operation is safe.
    PartialLifecycleFailure {
        operation: &'static str,
        completed_steps: usize,
    },
    /// Store transport failure or unreadable persisted state.
    Store(RepoError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied { reason } => write!(f, "denied: {}", reason.as_str()),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvariantViolation { which } => write!(f, "invariant violation: {which}"),
            Self::PartialLifecycleFailure {
                operation,
                completed_steps,
            } => write!(
                f,
                "{operation} stopped after {completed_steps} completed steps; safe to retry"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AccessError> for EngineError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::Denied(reason) => Self::Denied { reason },
            AccessError::Store(err) => err.into(),
        }
    }
}

impl From<LifecycleError> for EngineError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::AdminNotDeletable(id) => Self::InvariantViolation {
                which: format!("admin principal {id} is not deletable"),
            },
            LifecycleError::NotFound { kind, id } => Self::NotFound { kind, id },
            LifecycleError::InvariantViolation { which } => Self::InvariantViolation { which },
            LifecycleError::Partial {
                operation,
                completed_steps,
                ..
            } => Self::PartialLifecycleFailure {
                operation,
                completed_steps,
            },
            LifecycleError::Store(err) => err.into(),
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::InvariantViolation {
                which: err.to_string(),
            },
            RepoError::Duplicate { kind, detail } => Self::InvariantViolation {
                which: format!("duplicate {kind}: {detail}"),
            },
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::Store(other),
        }
    }
}

/// One attendance entry in a marking batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceEntry {
    pub student_id: PrincipalId,
    pub status: AttendanceStatus,
}

/// Boundary facade over one store connection and one event sink.
pub struct RecordsService<'conn, S: EventSink> {
    conn: &'conn Connection,
    sink: S,
}

impl<'conn, S: EventSink> RecordsService<'conn, S> {
    pub fn new(conn: &'conn Connection, sink: S) -> Self {
        Self { conn, sink }
    }

    fn guard(&self) -> AccessGuard<'conn> {
        AccessGuard::new(self.conn)
    }

    /// Deletes a principal with full cascade. Admin-only; deleting an
    /// already-deleted principal is a no-op success.
    pub fn delete_principal(&self, actor: Actor, id: PrincipalId) -> EngineResult<CascadeReport> {
        let guard = self.guard();
        guard.resolve(actor)?;
        guard.require_role(actor, &[])?;

        let report = LifecycleManager::new(self.conn).delete_principal(id)?;
        Ok(report)
    }

    /// Deletes a course with full cascade. Admin or assigned faculty.
    pub fn delete_course(&self, actor: Actor, id: CourseId) -> EngineResult<CascadeReport> {
        let guard = self.guard();
        guard.resolve(actor)?;
        if actor.role != Role::Admin {
            guard.require_course_write(actor, id)?;
        }

        let report = LifecycleManager::new(self.conn).delete_course(id)?;
        Ok(report)
    }

    /// Creates or re-flags a teaching edge. Admin-only. A primary request
    /// demotes the current primary first.
    pub fn assign_faculty(
        &self,
        actor: Actor,
        course_id: CourseId,
        faculty_id: PrincipalId,
        is_primary: bool,
    ) -> EngineResult<()> {
        let guard = self.guard();
        guard.resolve(actor)?;
        guard.require_role(actor, &[])?;

        LifecycleManager::new(self.conn).assign_faculty(course_id, faculty_id, is_primary)?;
        Ok(())
    }

    /// Registers a student in a course. Admin-only; a duplicate pair is an
    /// invariant violation.
    pub fn enroll_student(
        &self,
        actor: Actor,
        student_id: PrincipalId,
        course_id: CourseId,
    ) -> EngineResult<()> {
        let guard = self.guard();
        guard.resolve(actor)?;
        guard.require_role(actor, &[])?;

        let principals = SqlitePrincipalRepository::new(self.conn);
        let courses = SqliteCourseRepository::new(self.conn);
        let student = principals.get(student_id)?.ok_or(EngineError::NotFound {
            kind: "principal",
            id: student_id,
        })?;
        if student.role != Role::Student {
            return Err(EngineError::InvariantViolation {
                which: format!(
                    "enrollment target {student_id} has role `{}`, expected `student`",
                    student.role.as_str()
                ),
            });
        }
        if courses.get(course_id)?.is_none() {
            return Err(EngineError::NotFound {
                kind: "course",
                id: course_id,
            });
        }

        courses.enroll(&Enrollment {
            student_id,
            course_id,
        })?;
        Ok(())
    }

    /// Replaces the attendance row set for (course, day) and notifies the
    /// students marked absent. Faculty-of-course or admin.
    pub fn mark_attendance_batch(
        &self,
        actor: Actor,
        course_id: CourseId,
        day: &str,
        entries: &[AttendanceEntry],
    ) -> EngineResult<usize> {
        let guard = self.guard();
        guard.require_course_write(actor, course_id)?;

        let courses = SqliteCourseRepository::new(self.conn);
        let course = courses.get(course_id)?.ok_or(EngineError::NotFound {
            kind: "course",
            id: course_id,
        })?;

        // Fail fast on rows for students who are not registered; writing
        // them would leave attendance pointing outside the course.
        let enrolled = courses.enrolled_students(course_id)?;
        let mut email_by_id = std::collections::HashMap::new();
        for (student_id, email) in &enrolled {
            email_by_id.insert(*student_id, email.clone());
        }
        for entry in entries {
            if !email_by_id.contains_key(&entry.student_id) {
                return Err(EngineError::InvariantViolation {
                    which: format!(
                        "student {} is not enrolled in course {course_id}",
                        entry.student_id
                    ),
                });
            }
        }

        let records: Vec<AttendanceRecord> = entries
            .iter()
            .map(|entry| {
                AttendanceRecord::new(entry.student_id, course_id, day, entry.status, actor.id)
            })
            .collect();

        let inserted =
            LifecycleManager::new(self.conn).replace_attendance(course_id, day, &records)?;

        let absent_emails: Vec<String> = entries
            .iter()
            .filter(|entry| entry.status == AttendanceStatus::Absent)
            .filter_map(|entry| email_by_id.get(&entry.student_id).cloned())
            .collect();
        if !absent_emails.is_empty() {
            self.sink.emit(DomainEvent::AbsencesMarked {
                author: actor.id,
                course_name: course.name.clone(),
                day: day.to_string(),
                absent_emails,
            });
        }

        Ok(inserted)
    }

    /// Posts a grade with feedback onto one submission, then notifies the
    /// student best-effort. Faculty-of-course or admin; the grade bound is
    /// checked before the write.
    pub fn post_grade(
        &self,
        actor: Actor,
        submission_id: SubmissionId,
        grade: f64,
        feedback: Option<&str>,
    ) -> EngineResult<()> {
        let guard = self.guard();
        guard.resolve(actor)?;
        guard.require_role(actor, &[Role::Faculty])?;

        let assignments = SqliteAssignmentRepository::new(self.conn);
        let submission =
            assignments
                .get_submission(submission_id)?
                .ok_or(EngineError::NotFound {
                    kind: "submission",
                    id: submission_id,
                })?;
        let assignment = assignments
            .get_assignment(submission.assignment_id)?
            .ok_or(EngineError::NotFound {
                kind: "assignment",
                id: submission.assignment_id,
            })?;

        guard.require_course_write(actor, assignment.course_id)?;

        if grade < 0.0 || grade > assignment.max_marks {
            return Err(EngineError::InvariantViolation {
                which: format!(
                    "grade {grade} outside [0, {}] for assignment {}",
                    assignment.max_marks, assignment.uuid
                ),
            });
        }

        let graded_at = now_epoch_ms();
        assignments.set_grade(submission_id, grade, feedback, graded_at)?;

        let principals = SqlitePrincipalRepository::new(self.conn);
        if let Some(student) = principals.get(submission.student_id)? {
            self.sink.emit(DomainEvent::GradePosted {
                author: actor.id,
                student_email: student.email,
                assignment_title: assignment.title.clone(),
                grade,
                max_marks: assignment.max_marks,
                feedback: feedback.map(str::to_string),
            });
        }

        Ok(())
    }

    /// Computes the gradebook for a course, scoped to the caller: faculty
    /// and admin see every enrolled student, an enrolled student sees only
    /// their own row. Unassigned faculty are rejected outright.
    pub fn compute_gradebook(&self, actor: Actor, course_id: CourseId) -> EngineResult<Gradebook> {
        let scope = self.guard().course_scope(actor, course_id)?;
        let gradebook = AggregationEngine::new(self.conn).gradebook(course_id, scope)?;
        Ok(gradebook)
    }

    /// Credit-weighted overall GPA. Admin or the student themself.
    pub fn overall_gpa(&self, actor: Actor, student_id: PrincipalId) -> EngineResult<f64> {
        let guard = self.guard();
        guard.resolve(actor)?;
        if actor.role != Role::Admin && actor.id != student_id {
            return Err(EngineError::Denied {
                reason: DenyReason::NotOwner,
            });
        }

        let gpa = AggregationEngine::new(self.conn).overall_gpa(student_id)?;
        Ok(gpa)
    }

    /// Attendance percentage for one student in one course. Admin, the
    /// course's faculty, or the student themself.
    pub fn attendance_percentage(
        &self,
        actor: Actor,
        student_id: PrincipalId,
        course_id: CourseId,
    ) -> EngineResult<u32> {
        let guard = self.guard();
        let scope = guard.course_scope(actor, course_id)?;
        if let AccessScope::OwnRows {
            student_id: own, ..
        } = scope
        {
            if own != student_id {
                return Err(EngineError::Denied {
                    reason: DenyReason::NotOwner,
                });
            }
        }

        let pct = AggregationEngine::new(self.conn).attendance_percentage(student_id, course_id)?;
        Ok(pct)
    }

    /// Posts a role-addressed broadcast announcement. Faculty or admin.
    pub fn announce(
        &self,
        actor: Actor,
        title: &str,
        body: &str,
        recipient_role: RecipientRole,
        priority: Priority,
    ) -> EngineResult<()> {
        let guard = self.guard();
        guard.resolve(actor)?;
        guard.require_role(actor, &[Role::Faculty])?;

        self.sink.emit(DomainEvent::Announcement {
            author: actor.id,
            title: title.to_string(),
            body: body.to_string(),
            recipient_role,
            priority,
        });
        Ok(())
    }

    /// Notifies every enrolled student (high priority) and every assigned
    /// faculty member (medium) that a course timetable changed.
    pub fn notify_timetable_change(&self, actor: Actor, course_id: CourseId) -> EngineResult<()> {
        let guard = self.guard();
        guard.require_course_write(actor, course_id)?;

        let courses = SqliteCourseRepository::new(self.conn);
        let principals = SqlitePrincipalRepository::new(self.conn);
        let course = courses.get(course_id)?.ok_or(EngineError::NotFound {
            kind: "course",
            id: course_id,
        })?;

        let student_emails: Vec<String> = courses
            .enrolled_students(course_id)?
            .into_iter()
            .map(|(_, email)| email)
            .collect();
        let mut faculty_emails = Vec::new();
        for edge in courses.list_faculty_assignments(course_id)? {
            if let Some(faculty) = principals.get(edge.faculty_id)? {
                faculty_emails.push(faculty.email);
            }
        }

        self.sink.emit(DomainEvent::TimetableChanged {
            author: actor.id,
            course_name: course.name,
            student_emails,
            faculty_emails,
        });
        Ok(())
    }

    /// Notifications visible to the acting principal, newest first.
    pub fn visible_notifications(&self, actor: Actor) -> EngineResult<Vec<Notification>> {
        let principal = self.guard().resolve(actor)?;
        let notifications = SqliteNotificationRepository::new(self.conn)
            .list_visible(&principal.email, principal.role)?;
        Ok(notifications)
    }

    /// Acknowledges one notification. Only a principal the row is visible
    /// to may mark it read; the transition never reverts.
    pub fn mark_notification_read(&self, actor: Actor, id: NotificationId) -> EngineResult<()> {
        let principal = self.guard().resolve(actor)?;
        let repo = SqliteNotificationRepository::new(self.conn);
        let notification = repo.get(id)?.ok_or(EngineError::NotFound {
            kind: "notification",
            id,
        })?;
        if !notification.visible_to(&principal.email, principal.role) {
            return Err(EngineError::Denied {
                reason: DenyReason::NotOwner,
            });
        }

        repo.mark_read(id)?;
        Ok(())
    }
}
