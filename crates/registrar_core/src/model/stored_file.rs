//! Stored file model.
//!
//! Assignments and submissions reference files by filename only, never by a
//! strong foreign key, so deleting an owner must also sweep the files it
//! owns (handled by the lifecycle layer).

use super::principal::PrincipalId;
use super::{require_non_empty, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable stored-file identifier.
pub type FileId = Uuid;

/// Uploaded blob with ownership metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub uuid: FileId,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub owner_id: PrincipalId,
    #[serde(skip)]
    pub blob: Vec<u8>,
}

impl StoredFile {
    pub fn new(
        owner_id: PrincipalId,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        blob: Vec<u8>,
    ) -> Self {
        let size = blob.len() as i64;
        Self {
            uuid: Uuid::new_v4(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            size,
            owner_id,
            blob,
        }
    }

    /// Validates field shapes prior to persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("filename", &self.filename)?;
        require_non_empty("mime_type", &self.mime_type)?;
        if self.size < 0 {
            return Err(ModelValidationError::NegativeFileSize(self.size));
        }
        Ok(())
    }
}
