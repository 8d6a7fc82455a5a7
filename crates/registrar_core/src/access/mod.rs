//! Identity & access gate.
//!
//! # Responsibility
//! - Decide allow/deny for one acting principal against one resource.
//! - Hand back the visibility scope to apply to any subsequent read.
//!
//! # Invariants
//! - Pure predicate: never mutates state.
//! - Admin passes every check. Faculty passes where a faculty-assignment
//!   edge to the resource's course exists. Students pass where an
//!   enrollment edge exists, and for submission writes only on their own
//!   submission.
//! - Denial is a value with a stable reason code, never a panic.

use crate::model::course::CourseId;
use crate::model::principal::{Actor, Principal, PrincipalId, Role};
use crate::repo::course_repo::{CourseRepository, SqliteCourseRepository};
use crate::repo::principal_repo::{PrincipalRepository, SqlitePrincipalRepository};
use crate::repo::RepoError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable denial reason codes surfaced to the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The acting principal does not resolve to a stored row (stale
    /// session, deleted account, forged id).
    NotAuthenticated,
    /// The principal's role is not allowed to perform the operation.
    WrongRole,
    /// The principal's role could pass, but it lacks the ownership edge to
    /// this resource.
    NotOwner,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::WrongRole => "wrong_role",
            Self::NotOwner => "not_owner",
        }
    }
}

/// Access failure: a denial decision or a store read failure.
#[derive(Debug)]
pub enum AccessError {
    Denied(DenyReason),
    Store(RepoError),
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied(reason) => write!(f, "access denied: {}", reason.as_str()),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Denied(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<RepoError> for AccessError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Visibility scope a passing check grants to subsequent reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Admin view: nothing filtered.
    Unrestricted,
    /// Full view of one course (assigned faculty).
    Course { course_id: CourseId },
    /// One course narrowed to the student's own rows.
    OwnRows {
        course_id: CourseId,
        student_id: PrincipalId,
    },
}

/// Read-only authorization gate over the store.
pub struct AccessGuard<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AccessGuard<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Resolves the acting principal against the store.
    ///
    /// A missing row or a role mismatch against the stored row is
    /// `NotAuthenticated`: the session boundary handed us a pair the store
    /// no longer vouches for.
    pub fn resolve(&self, actor: Actor) -> Result<Principal, AccessError> {
        let repo = SqlitePrincipalRepository::new(self.conn);
        match repo.get(actor.id)? {
            Some(principal) if principal.role == actor.role => Ok(principal),
            _ => Err(AccessError::Denied(DenyReason::NotAuthenticated)),
        }
    }

    /// Requires the actor's role to be one of `allowed`.
    pub fn require_role(&self, actor: Actor, allowed: &[Role]) -> Result<(), AccessError> {
        if actor.role == Role::Admin || allowed.contains(&actor.role) {
            return Ok(());
        }
        Err(AccessError::Denied(DenyReason::WrongRole))
    }

    /// Course-scoped read check returning the scope for the caller's reads.
    pub fn course_scope(
        &self,
        actor: Actor,
        course_id: CourseId,
    ) -> Result<AccessScope, AccessError> {
        self.resolve(actor)?;
        let courses = SqliteCourseRepository::new(self.conn);
        match actor.role {
            Role::Admin => Ok(AccessScope::Unrestricted),
            Role::Faculty => {
                if courses.has_faculty_edge(course_id, actor.id)? {
                    Ok(AccessScope::Course { course_id })
                } else {
                    Err(AccessError::Denied(DenyReason::NotOwner))
                }
            }
            Role::Student => {
                if courses.is_enrolled(actor.id, course_id)? {
                    Ok(AccessScope::OwnRows {
                        course_id,
                        student_id: actor.id,
                    })
                } else {
                    Err(AccessError::Denied(DenyReason::NotOwner))
                }
            }
        }
    }

    /// Write check for course-scoped mutations (grading, attendance,
    /// timetable): admin, or faculty assigned to the course.
    pub fn require_course_write(
        &self,
        actor: Actor,
        course_id: CourseId,
    ) -> Result<(), AccessError> {
        self.resolve(actor)?;
        match actor.role {
            Role::Admin => Ok(()),
            Role::Faculty => {
                let courses = SqliteCourseRepository::new(self.conn);
                if courses.has_faculty_edge(course_id, actor.id)? {
                    Ok(())
                } else {
                    Err(AccessError::Denied(DenyReason::NotOwner))
                }
            }
            Role::Student => Err(AccessError::Denied(DenyReason::WrongRole)),
        }
    }

    /// Write check for a student touching one submission: students may only
    /// write their own; faculty/admin fall back to course-write rules.
    pub fn require_submission_write(
        &self,
        actor: Actor,
        course_id: CourseId,
        submission_owner: PrincipalId,
    ) -> Result<(), AccessError> {
        match actor.role {
            Role::Student => {
                self.resolve(actor)?;
                if actor.id == submission_owner {
                    Ok(())
                } else {
                    Err(AccessError::Denied(DenyReason::NotOwner))
                }
            }
            _ => self.require_course_write(actor, course_id),
        }
    }
}
