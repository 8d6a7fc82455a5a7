//! Core consistency engine for academic records.
//! This crate is the single source of truth for cross-entity invariants:
//! cascade ordering, grade bounds, primary-faculty uniqueness and
//! notification fan-out all live here, never in the storage schema.

pub mod access;
pub mod aggregate;
pub mod db;
pub mod dispatch;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use access::{AccessError, AccessGuard, AccessScope, DenyReason};
pub use aggregate::{
    derive_submission_status, gpa_points, letter_grade, AggregationEngine, Gradebook,
    GradebookCell, GradebookRow,
};
pub use dispatch::{
    spawn_dispatch_worker, ChannelDispatcher, DomainEvent, EventSink, InlineDispatcher, NullSink,
};
pub use lifecycle::{CascadeReport, LifecycleError, LifecycleManager};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::assignment::{Assignment, AssignmentId, Submission, SubmissionId, SubmissionStatus};
pub use model::attendance::{AttendanceRecord, AttendanceStatus};
pub use model::course::{Course, CourseId, Enrollment, FacultyAssignment};
pub use model::notification::{Notification, NotificationId, Priority, RecipientRole};
pub use model::principal::{Actor, Principal, PrincipalId, Role};
pub use model::stored_file::{FileId, StoredFile};
pub use repo::{RepoError, RepoResult};
pub use service::records_service::{AttendanceEntry, EngineError, EngineResult, RecordsService};

/// Returns the engine crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
