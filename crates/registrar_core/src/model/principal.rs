//! Principal domain model.
//!
//! # Invariants
//! - `email` is unique across principals and shaped like an address.
//! - `role` is immutable once the principal is created in this engine's
//!   scope; role changes happen elsewhere.

use super::{require_non_empty, ModelValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for any authenticated actor.
pub type PrincipalId = Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Role of an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Faculty,
    Admin,
}

impl Role {
    /// Stable string id used in storage and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Faculty => "faculty",
            Self::Admin => "admin",
        }
    }

    /// Parses a stored role value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "faculty" => Some(Self::Faculty),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Resolved acting principal handed in by the session boundary.
///
/// The engine never sees raw credentials; upstream resolves a session token
/// to this pair before any operation is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: PrincipalId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: PrincipalId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Canonical principal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uuid: PrincipalId,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub credential_hash: String,
}

impl Principal {
    /// Creates a principal with a generated stable ID.
    pub fn new(role: Role, email: impl Into<String>, credential_hash: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            email: email.into(),
            role,
            department: None,
            credential_hash: credential_hash.into(),
        }
    }

    /// Validates field shapes prior to persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ModelValidationError::InvalidEmail(self.email.clone()));
        }
        require_non_empty("credential_hash", &self.credential_hash)?;
        Ok(())
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.uuid, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::{Principal, Role};
    use crate::model::ModelValidationError;

    #[test]
    fn accepts_plain_address() {
        let principal = Principal::new(Role::Student, "ada@example.edu", "hash");
        assert!(principal.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_email() {
        let principal = Principal::new(Role::Student, "not-an-address", "hash");
        assert!(matches!(
            principal.validate(),
            Err(ModelValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn rejects_blank_credential_hash() {
        let principal = Principal::new(Role::Faculty, "g@example.edu", "  ");
        assert!(matches!(
            principal.validate(),
            Err(ModelValidationError::EmptyField("credential_hash"))
        ));
    }

    #[test]
    fn role_round_trips_through_storage_strings() {
        for role in [Role::Student, Role::Faculty, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }
}
