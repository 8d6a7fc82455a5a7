//! Principal repository contract and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Principal::validate()` before SQL mutations.
//! - `email` uniqueness is enforced by the store and surfaced as
//!   `Duplicate`.

use super::{is_unique_violation, parse_uuid, RepoError, RepoResult};
use crate::model::principal::{Principal, PrincipalId, Role};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PRINCIPAL_SELECT_SQL: &str = "SELECT
    uuid,
    email,
    role,
    department,
    credential_hash
FROM principals";

/// Repository interface for principal records.
pub trait PrincipalRepository {
    fn create(&self, principal: &Principal) -> RepoResult<PrincipalId>;
    fn get(&self, id: PrincipalId) -> RepoResult<Option<Principal>>;
    fn get_by_email(&self, email: &str) -> RepoResult<Option<Principal>>;
    fn list_by_role(&self, role: Role) -> RepoResult<Vec<Principal>>;
    /// Deletes the row if present; returns whether a row was removed.
    fn delete(&self, id: PrincipalId) -> RepoResult<bool>;
}

/// SQLite-backed principal repository.
pub struct SqlitePrincipalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePrincipalRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PrincipalRepository for SqlitePrincipalRepository<'_> {
    fn create(&self, principal: &Principal) -> RepoResult<PrincipalId> {
        principal.validate()?;

        let result = self.conn.execute(
            "INSERT INTO principals (uuid, email, role, department, credential_hash)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                principal.uuid.to_string(),
                principal.email.as_str(),
                principal.role.as_str(),
                principal.department.as_deref(),
                principal.credential_hash.as_str(),
            ],
        );

        match result {
            Ok(_) => Ok(principal.uuid),
            Err(err) if is_unique_violation(&err) => Err(RepoError::duplicate(
                "principal",
                format!("email `{}` already registered", principal.email),
            )),
            Err(err) => Err(err.into()),
        }
    }

    fn get(&self, id: PrincipalId) -> RepoResult<Option<Principal>> {
        let row = self
            .conn
            .query_row(
                &format!("{PRINCIPAL_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                map_principal_row,
            )
            .optional()?;
        row.transpose()
    }

    fn get_by_email(&self, email: &str) -> RepoResult<Option<Principal>> {
        let row = self
            .conn
            .query_row(
                &format!("{PRINCIPAL_SELECT_SQL} WHERE email = ?1;"),
                [email],
                map_principal_row,
            )
            .optional()?;
        row.transpose()
    }

    fn list_by_role(&self, role: Role) -> RepoResult<Vec<Principal>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PRINCIPAL_SELECT_SQL} WHERE role = ?1 ORDER BY email ASC;"
        ))?;
        let mut rows = stmt.query([role.as_str()])?;
        let mut principals = Vec::new();
        while let Some(row) = rows.next()? {
            principals.push(parse_principal_row(row)?);
        }
        Ok(principals)
    }

    fn delete(&self, id: PrincipalId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM principals WHERE uuid = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }
}

fn map_principal_row(row: &Row<'_>) -> rusqlite::Result<RepoResult<Principal>> {
    Ok(parse_principal_row(row))
}

fn parse_principal_row(row: &Row<'_>) -> RepoResult<Principal> {
    let uuid_text: String = row.get("uuid")?;
    let role_text: String = row.get("role")?;
    let role = Role::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in principals.role"))
    })?;

    Ok(Principal {
        uuid: parse_uuid(&uuid_text, "principals.uuid")?,
        email: row.get("email")?,
        role,
        department: row.get("department")?,
        credential_hash: row.get("credential_hash")?,
    })
}
