//! Notification model and read-time visibility resolution.
//!
//! # Invariants
//! - `read` transitions `false -> true` exactly once and never reverts.
//! - A non-null `target_email` narrows visibility to one principal; a null
//!   target with a non-`all` role is visible to every principal of that
//!   role. Broadcasts are one row resolved at read time, never fanned out
//!   into per-user rows at write time.

use super::principal::{PrincipalId, Role};
use super::{now_epoch_ms, require_non_empty, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable notification identifier.
pub type NotificationId = Uuid;

/// Delivery urgency attached to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Role-level audience for notifications without a target email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRole {
    Student,
    Faculty,
    All,
}

impl RecipientRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Faculty => "faculty",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "faculty" => Some(Self::Faculty),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn matches(self, role: Role) -> bool {
        match self {
            Self::All => true,
            Self::Student => role == Role::Student,
            Self::Faculty => role == Role::Faculty,
        }
    }
}

/// Canonical notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub uuid: NotificationId,
    pub title: String,
    pub body: String,
    pub author_id: PrincipalId,
    pub recipient_role: RecipientRole,
    pub target_email: Option<String>,
    pub priority: Priority,
    pub read: bool,
    /// Creation instant in epoch milliseconds; newest-first read ordering
    /// keys on this.
    pub created_at: i64,
}

impl Notification {
    /// Creates a notification addressed to exactly one principal's email.
    pub fn targeted(
        author_id: PrincipalId,
        target_email: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            author_id,
            recipient_role: RecipientRole::All,
            target_email: Some(target_email.into()),
            priority,
            read: false,
            created_at: now_epoch_ms(),
        }
    }

    /// Creates a role-addressed broadcast notification.
    pub fn broadcast(
        author_id: PrincipalId,
        recipient_role: RecipientRole,
        title: impl Into<String>,
        body: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            author_id,
            recipient_role,
            target_email: None,
            priority,
            read: false,
            created_at: now_epoch_ms(),
        }
    }

    /// Validates field shapes prior to persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("title", &self.title)?;
        require_non_empty("body", &self.body)?;
        Ok(())
    }

    /// Read-time visibility rule.
    pub fn visible_to(&self, email: &str, role: Role) -> bool {
        match &self.target_email {
            Some(target) => target == email,
            None => self.recipient_role.matches(role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Notification, Priority, RecipientRole};
    use crate::model::principal::Role;
    use uuid::Uuid;

    #[test]
    fn targeted_notification_is_visible_only_to_target() {
        let n = Notification::targeted(
            Uuid::new_v4(),
            "ada@example.edu",
            "Grade posted",
            "95%",
            Priority::Medium,
        );
        assert!(n.visible_to("ada@example.edu", Role::Student));
        assert!(!n.visible_to("bob@example.edu", Role::Student));
        // A targeted row never widens to role visibility.
        assert!(!n.visible_to("bob@example.edu", Role::Admin));
    }

    #[test]
    fn role_broadcast_is_visible_to_that_role_only() {
        let n = Notification::broadcast(
            Uuid::new_v4(),
            RecipientRole::Faculty,
            "Staff meeting",
            "Friday 10:00",
            Priority::Low,
        );
        assert!(n.visible_to("prof@example.edu", Role::Faculty));
        assert!(!n.visible_to("ada@example.edu", Role::Student));
    }

    #[test]
    fn all_broadcast_is_visible_to_everyone() {
        let n = Notification::broadcast(
            Uuid::new_v4(),
            RecipientRole::All,
            "Campus closed",
            "Snow day",
            Priority::Urgent,
        );
        assert!(n.visible_to("anyone@example.edu", Role::Student));
        assert!(n.visible_to("prof@example.edu", Role::Faculty));
        assert!(n.visible_to("root@example.edu", Role::Admin));
    }
}
