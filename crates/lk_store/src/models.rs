//! Database row models — these map to/from SQL rows.

use chrono::{DateTime, Utc};
use lk_proto::{
    ConflictEntity, ConflictInfo, ConflictStatus, EntityVersion, MessageStatus, QueuedMessage,
};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueuedMessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    /// Base64 ciphertext — opaque to this crate.
    pub encrypted_content: String,
    /// Base64 12-byte IV.
    pub iv: String,
    /// MessageStatus as string
    pub status: String,
    pub synced: bool,
    pub retries: i64,
    pub sequence_number: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueuedMessageRow {
    pub fn into_message(self) -> Result<QueuedMessage, StoreError> {
        let status = MessageStatus::parse(&self.status).ok_or_else(|| StoreError::Malformed {
            id: self.id.clone(),
            reason: format!("unknown status {:?}", self.status),
        })?;
        Ok(QueuedMessage {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            encrypted_content: self.encrypted_content,
            initialization_vector: self.iv,
            status,
            synced: self.synced,
            retries: self.retries as u32,
            created_at: self.created_at,
            sequence_number: self.sequence_number,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConflictRow {
    pub id: String,
    /// ConflictEntity as string
    pub entity_type: String,
    pub entity_id: String,
    /// EntityVersion JSON
    pub base_version: String,
    pub local_version: String,
    pub remote_version: String,
    /// ConflictStatus as string
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ConflictRow {
    pub fn into_conflict(self) -> Result<ConflictInfo, StoreError> {
        let entity_type =
            ConflictEntity::parse(&self.entity_type).ok_or_else(|| StoreError::Malformed {
                id: self.id.clone(),
                reason: format!("unknown entity type {:?}", self.entity_type),
            })?;
        let status = ConflictStatus::parse(&self.status).ok_or_else(|| StoreError::Malformed {
            id: self.id.clone(),
            reason: format!("unknown status {:?}", self.status),
        })?;
        let base_version: EntityVersion = serde_json::from_str(&self.base_version)?;
        let local_version: EntityVersion = serde_json::from_str(&self.local_version)?;
        let remote_version: EntityVersion = serde_json::from_str(&self.remote_version)?;
        Ok(ConflictInfo {
            id: self.id,
            entity_type,
            entity_id: self.entity_id,
            base_version,
            local_version,
            remote_version,
            status,
            created_at: self.created_at,
        })
    }
}
