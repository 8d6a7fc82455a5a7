//! Notification repository.
//!
//! # Invariants
//! - Visibility filtering happens in the read query, mirroring the model's
//!   `visible_to` rule: targeted email match, or null target with matching
//!   or `all` recipient role.
//! - `mark_read` is a one-way transition; there is no unread path.

use super::{parse_uuid, RepoError, RepoResult};
use crate::model::notification::{Notification, NotificationId, Priority, RecipientRole};
use crate::model::principal::Role;
use rusqlite::{params, Connection, OptionalExtension, Row};

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    body,
    author_uuid,
    recipient_role,
    target_email,
    priority,
    read,
    created_at
FROM notifications";

/// Repository interface for notification rows.
pub trait NotificationRepository {
    fn insert(&self, notification: &Notification) -> RepoResult<NotificationId>;
    fn get(&self, id: NotificationId) -> RepoResult<Option<Notification>>;
    /// Rows visible to one principal, newest first.
    fn list_visible(&self, email: &str, role: Role) -> RepoResult<Vec<Notification>>;
    fn mark_read(&self, id: NotificationId) -> RepoResult<()>;
    /// Deletes the row if present; deletion is terminal, no tombstone.
    fn delete(&self, id: NotificationId) -> RepoResult<bool>;
}

/// SQLite-backed notification repository.
pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn insert(&self, notification: &Notification) -> RepoResult<NotificationId> {
        notification.validate()?;

        self.conn.execute(
            "INSERT INTO notifications
                 (uuid, title, body, author_uuid, recipient_role, target_email, priority, read,
                  created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                notification.uuid.to_string(),
                notification.title.as_str(),
                notification.body.as_str(),
                notification.author_id.to_string(),
                notification.recipient_role.as_str(),
                notification.target_email.as_deref(),
                notification.priority.as_str(),
                notification.read as i64,
                notification.created_at,
            ],
        )?;

        Ok(notification.uuid)
    }

    fn get(&self, id: NotificationId) -> RepoResult<Option<Notification>> {
        let row = self
            .conn
            .query_row(
                &format!("{NOTIFICATION_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_notification_row(row)),
            )
            .optional()?;
        row.transpose()
    }

    fn list_visible(&self, email: &str, role: Role) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL}
             WHERE target_email = ?1
                OR (target_email IS NULL AND (recipient_role = ?2 OR recipient_role = 'all'))
             ORDER BY created_at DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![email, role.as_str()])?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }
        Ok(notifications)
    }

    fn mark_read(&self, id: NotificationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notifications SET read = 1 WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("notification", id));
        }
        Ok(())
    }

    fn delete(&self, id: NotificationId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM notifications WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let uuid_text: String = row.get("uuid")?;
    let author_text: String = row.get("author_uuid")?;
    let role_text: String = row.get("recipient_role")?;
    let recipient_role = RecipientRole::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid recipient role `{role_text}` in notifications.recipient_role"
        ))
    })?;
    let priority_text: String = row.get("priority")?;
    let priority = Priority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in notifications.priority"
        ))
    })?;

    Ok(Notification {
        uuid: parse_uuid(&uuid_text, "notifications.uuid")?,
        title: row.get("title")?,
        body: row.get("body")?,
        author_id: parse_uuid(&author_text, "notifications.author_uuid")?,
        recipient_role,
        target_email: row.get("target_email")?,
        priority,
        read: row.get::<_, i64>("read")? != 0,
        created_at: row.get("created_at")?,
    })
}
