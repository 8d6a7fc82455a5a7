//! Stored-file repository.
//!
//! Files are referenced by filename from assignments and submissions, never
//! by a strong foreign key, so owner deletion sweeps them wholesale.

use super::{parse_uuid, RepoResult};
use crate::model::principal::PrincipalId;
use crate::model::stored_file::{FileId, StoredFile};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for stored blobs.
pub trait FileRepository {
    fn insert(&self, file: &StoredFile) -> RepoResult<FileId>;
    fn get(&self, id: FileId) -> RepoResult<Option<StoredFile>>;
    fn count_owned_by(&self, owner_id: PrincipalId) -> RepoResult<u32>;
    /// Removes every file owned by the principal; returns removed count.
    fn delete_owned_by(&self, owner_id: PrincipalId) -> RepoResult<usize>;
}

/// SQLite-backed stored-file repository.
pub struct SqliteFileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFileRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl FileRepository for SqliteFileRepository<'_> {
    fn insert(&self, file: &StoredFile) -> RepoResult<FileId> {
        file.validate()?;

        self.conn.execute(
            "INSERT INTO stored_files (uuid, filename, mime_type, size, owner_uuid, blob)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                file.uuid.to_string(),
                file.filename.as_str(),
                file.mime_type.as_str(),
                file.size,
                file.owner_id.to_string(),
                file.blob.as_slice(),
            ],
        )?;

        Ok(file.uuid)
    }

    fn get(&self, id: FileId) -> RepoResult<Option<StoredFile>> {
        let row = self
            .conn
            .query_row(
                "SELECT uuid, filename, mime_type, size, owner_uuid, blob
                 FROM stored_files WHERE uuid = ?1;",
                [id.to_string()],
                |row| {
                    let uuid_text: String = row.get("uuid")?;
                    let owner_text: String = row.get("owner_uuid")?;
                    Ok((
                        uuid_text,
                        owner_text,
                        row.get::<_, String>("filename")?,
                        row.get::<_, String>("mime_type")?,
                        row.get::<_, i64>("size")?,
                        row.get::<_, Vec<u8>>("blob")?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((uuid_text, owner_text, filename, mime_type, size, blob)) => {
                Ok(Some(StoredFile {
                    uuid: parse_uuid(&uuid_text, "stored_files.uuid")?,
                    filename,
                    mime_type,
                    size,
                    owner_id: parse_uuid(&owner_text, "stored_files.owner_uuid")?,
                    blob,
                }))
            }
        }
    }

    fn count_owned_by(&self, owner_id: PrincipalId) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM stored_files WHERE owner_uuid = ?1;",
            [owner_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_owned_by(&self, owner_id: PrincipalId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM stored_files WHERE owner_uuid = ?1;",
            [owner_id.to_string()],
        )?;
        Ok(changed)
    }
}
