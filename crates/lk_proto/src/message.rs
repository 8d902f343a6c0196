//! Message types: the locally queued record and its authoritative remote
//! counterpart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ciphertext plus its detached initialization vector, both opaque base64.
/// This is the only message body format the sync layer ever sees — plaintext
/// stops at the encryption service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub ciphertext: String,
    pub iv: String,
}

/// Delivery state of a locally queued message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    Pending,
    Processing,
    Sent,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A message in the local durable send queue.
///
/// Created on a send attempt (immediate or deferred), mutated only by sync
/// passes and explicit user actions, removed once synced or cleared.
/// `sequence_number` stays empty until the authoritative store assigns one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    /// Client-generated UUID — also the remote row's id, which is what
    /// makes a retried insert idempotent.
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    /// Base64 ciphertext — already end-to-end encrypted when enqueued.
    pub encrypted_content: String,
    /// Base64 12-byte IV belonging to `encrypted_content`.
    pub initialization_vector: String,
    pub status: MessageStatus,
    /// True once the authoritative store holds a row with this id.
    pub synced: bool,
    pub retries: u32,
    pub created_at: DateTime<Utc>,
    /// Assigned by the authoritative store on successful insert.
    pub sequence_number: Option<i64>,
}

impl QueuedMessage {
    /// New pending entry, client UUID assigned here.
    pub fn new(
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        payload: EncryptedPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            encrypted_content: payload.ciphertext,
            initialization_vector: payload.iv,
            status: MessageStatus::Pending,
            synced: false,
            retries: 0,
            created_at: Utc::now(),
            sequence_number: None,
        }
    }

    pub fn payload(&self) -> EncryptedPayload {
        EncryptedPayload {
            ciphertext: self.encrypted_content.clone(),
            iv: self.initialization_vector.clone(),
        }
    }
}

/// Authoritative message row as the remote store returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub encrypted_content: String,
    pub iv: String,
    /// Strictly increasing per conversation, assigned at insert time.
    pub sequence_number: i64,
    pub delivered_at: DateTime<Utc>,
    pub edited: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_ids: Vec<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}
