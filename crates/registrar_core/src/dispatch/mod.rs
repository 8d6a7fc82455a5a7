//! Notification dispatcher.
//!
//! # Responsibility
//! - Turn domain events into addressed notification rows and guarantee
//!   each intended recipient sees exactly one relevant entry.
//!
//! # Invariants
//! - Dispatch is best-effort: a delivery failure is logged and swallowed,
//!   never propagated, and never rolls back the triggering write.
//! - Absence fan-out covers `absent` students only; a batch of 30 with 3
//!   absences yields exactly 3 rows.
//! - Broadcasts stay one role-addressed row resolved at read time; they
//!   are never fanned out into per-user rows.

use crate::db::open_db;
use crate::model::notification::{Notification, Priority, RecipientRole};
use crate::model::principal::PrincipalId;
use crate::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use crate::repo::RepoError;
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Sender};
use std::thread::JoinHandle;

/// Domain event emitted by a mutating boundary operation.
///
/// Events carry resolved recipient emails so delivery needs no further
/// graph reads; the triggering operation already held them.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A grade was posted on one student's submission.
    GradePosted {
        author: PrincipalId,
        student_email: String,
        assignment_title: String,
        grade: f64,
        max_marks: f64,
        feedback: Option<String>,
    },
    /// An attendance batch was recorded; `absent_emails` lists only the
    /// students marked absent.
    AbsencesMarked {
        author: PrincipalId,
        course_name: String,
        day: String,
        absent_emails: Vec<String>,
    },
    /// A course timetable changed.
    TimetableChanged {
        author: PrincipalId,
        course_name: String,
        student_emails: Vec<String>,
        faculty_emails: Vec<String>,
    },
    /// A role-addressed announcement.
    Announcement {
        author: PrincipalId,
        title: String,
        body: String,
        recipient_role: RecipientRole,
        priority: Priority,
    },
}

impl DomainEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::GradePosted { .. } => "grade_posted",
            Self::AbsencesMarked { .. } => "absences_marked",
            Self::TimetableChanged { .. } => "timetable_changed",
            Self::Announcement { .. } => "announcement",
        }
    }
}

/// Delivery failure. Contained inside the dispatcher: logged, never
/// surfaced to the caller that triggered the event.
#[derive(Debug)]
pub enum DispatchError {
    Store(RepoError),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
        }
    }
}

impl From<RepoError> for DispatchError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Seam between mutating operations and notification delivery.
pub trait EventSink {
    /// Accepts one event. Must not fail and must not block the caller on
    /// delivery problems.
    fn emit(&self, event: DomainEvent);
}

/// Writes notification rows for one event; returns the row count.
pub fn deliver(conn: &Connection, event: &DomainEvent) -> Result<usize, DispatchError> {
    let repo = SqliteNotificationRepository::new(conn);
    let rows = build_notifications(event);
    for notification in &rows {
        repo.insert(notification)?;
    }
    info!(
        "event=dispatch module=dispatch status=ok kind={} rows={}",
        event.kind(),
        rows.len()
    );
    Ok(rows.len())
}

fn build_notifications(event: &DomainEvent) -> Vec<Notification> {
    match event {
        DomainEvent::GradePosted {
            author,
            student_email,
            assignment_title,
            grade,
            max_marks,
            feedback,
        } => {
            let pct = grade / max_marks * 100.0;
            let mut body = format!("{assignment_title}: {grade}/{max_marks} ({pct:.1}%)");
            if let Some(feedback) = feedback {
                body.push_str(&format!(" - {feedback}"));
            }
            vec![Notification::targeted(
                *author,
                student_email.clone(),
                "Grade posted",
                body,
                Priority::Medium,
            )]
        }
        DomainEvent::AbsencesMarked {
            author,
            course_name,
            day,
            absent_emails,
        } => absent_emails
            .iter()
            .map(|email| {
                Notification::targeted(
                    *author,
                    email.clone(),
                    "Absence recorded",
                    format!("You were marked absent in {course_name} on {day}."),
                    Priority::High,
                )
            })
            .collect(),
        DomainEvent::TimetableChanged {
            author,
            course_name,
            student_emails,
            faculty_emails,
        } => {
            let mut rows: Vec<Notification> = student_emails
                .iter()
                .map(|email| {
                    Notification::targeted(
                        *author,
                        email.clone(),
                        "Timetable changed",
                        format!("The timetable for {course_name} has changed."),
                        Priority::High,
                    )
                })
                .collect();
            rows.extend(faculty_emails.iter().map(|email| {
                Notification::targeted(
                    *author,
                    email.clone(),
                    "Timetable changed",
                    format!("The timetable for {course_name} has changed."),
                    Priority::Medium,
                )
            }));
            rows
        }
        DomainEvent::Announcement {
            author,
            title,
            body,
            recipient_role,
            priority,
        } => vec![Notification::broadcast(
            *author,
            *recipient_role,
            title.clone(),
            body.clone(),
            *priority,
        )],
    }
}

/// Synchronous best-effort sink sharing the caller's connection.
pub struct InlineDispatcher<'conn> {
    conn: &'conn Connection,
}

impl<'conn> InlineDispatcher<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EventSink for InlineDispatcher<'_> {
    fn emit(&self, event: DomainEvent) {
        if let Err(err) = deliver(self.conn, &event) {
            warn!(
                "event=dispatch module=dispatch status=error kind={} error={} swallowed=true",
                event.kind(),
                err
            );
        }
    }
}

/// Fire-and-forget sink feeding a background worker thread.
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: Sender<DomainEvent>,
}

impl EventSink for ChannelDispatcher {
    fn emit(&self, event: DomainEvent) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            warn!(
                "event=dispatch module=dispatch status=error kind={kind} error=worker_gone swallowed=true"
            );
        }
    }
}

/// Spawns a dispatch worker with its own connection to the database file.
///
/// The worker drains events until every `ChannelDispatcher` clone is
/// dropped, then exits. Delivery failures are logged and skipped.
pub fn spawn_dispatch_worker(
    db_path: PathBuf,
) -> Result<(ChannelDispatcher, JoinHandle<()>), crate::db::DbError> {
    let conn = open_db(&db_path)?;
    let (tx, rx) = channel::<DomainEvent>();

    let handle = std::thread::spawn(move || {
        while let Ok(event) = rx.recv() {
            if let Err(err) = deliver(&conn, &event) {
                warn!(
                    "event=dispatch module=dispatch status=error kind={} error={} swallowed=true",
                    event.kind(),
                    err
                );
            }
        }
        info!("event=dispatch_worker module=dispatch status=stopped");
    });

    Ok((ChannelDispatcher { tx }, handle))
}

/// Sink that drops every event. Used where a caller explicitly opts out of
/// notifications.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DomainEvent) {}
}

#[cfg(test)]
mod tests {
    use super::{build_notifications, DomainEvent};
    use crate::model::notification::Priority;
    use uuid::Uuid;

    #[test]
    fn absence_event_fans_out_per_absent_student_only() {
        let event = DomainEvent::AbsencesMarked {
            author: Uuid::new_v4(),
            course_name: "Algorithms".to_string(),
            day: "2024-03-01".to_string(),
            absent_emails: vec!["a@x.edu".to_string(), "b@x.edu".to_string()],
        };
        let rows = build_notifications(&event);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|n| n.priority == Priority::High));
        assert_eq!(rows[0].target_email.as_deref(), Some("a@x.edu"));
        assert_eq!(rows[1].target_email.as_deref(), Some("b@x.edu"));
    }

    #[test]
    fn grade_event_includes_percentage_and_feedback() {
        let event = DomainEvent::GradePosted {
            author: Uuid::new_v4(),
            student_email: "ada@x.edu".to_string(),
            assignment_title: "Quiz 1".to_string(),
            grade: 18.0,
            max_marks: 20.0,
            feedback: Some("solid work".to_string()),
        };
        let rows = build_notifications(&event);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].priority, Priority::Medium);
        assert!(rows[0].body.contains("90.0%"));
        assert!(rows[0].body.contains("solid work"));
    }

    #[test]
    fn timetable_event_splits_priorities_by_audience() {
        let event = DomainEvent::TimetableChanged {
            author: Uuid::new_v4(),
            course_name: "Databases".to_string(),
            student_emails: vec!["s1@x.edu".to_string(), "s2@x.edu".to_string()],
            faculty_emails: vec!["prof@x.edu".to_string()],
        };
        let rows = build_notifications(&event);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].priority, Priority::High);
        assert_eq!(rows[2].priority, Priority::Medium);
        assert_eq!(rows[2].target_email.as_deref(), Some("prof@x.edu"));
    }

    #[test]
    fn announcement_stays_a_single_broadcast_row() {
        let event = DomainEvent::Announcement {
            author: Uuid::new_v4(),
            title: "Exam week".to_string(),
            body: "Schedule posted.".to_string(),
            recipient_role: crate::model::notification::RecipientRole::Student,
            priority: Priority::Urgent,
        };
        let rows = build_notifications(&event);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].target_email.is_none());
    }
}
