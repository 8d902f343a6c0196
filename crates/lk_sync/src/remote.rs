//! Consumed collaborator contracts.
//!
//! Implementations live with the host application (HTTP, WebSocket,
//! whatever transport it picked) — this layer only defines the seams it
//! needs and consumes them as `Arc<dyn …>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lk_proto::{KeyRecord, Message, QueuedMessage};

use crate::error::SyncError;

/// The signed-in identity, or nothing.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

/// What a sync attempt hands to the authoritative store.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Client-generated UUID; doubles as the remote row id.
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub encrypted_content: String,
    pub iv: String,
    pub sequence_number: i64,
}

impl OutboundMessage {
    pub fn from_queued(msg: &QueuedMessage, sequence_number: i64) -> Self {
        Self {
            id: msg.id.clone(),
            conversation_id: msg.conversation_id.clone(),
            sender_id: msg.sender_id.clone(),
            encrypted_content: msg.encrypted_content.clone(),
            iv: msg.initialization_vector.clone(),
            sequence_number,
        }
    }
}

/// Authoritative message store.
#[async_trait]
pub trait RemoteMessageStore: Send + Sync {
    /// Insert a message row.
    ///
    /// Implementations MUST be idempotent in `message.id`: inserting an id
    /// that already exists returns the existing row unchanged, so a retried
    /// send whose previous acknowledgement was lost is indistinguishable
    /// from a success.
    async fn insert(&self, message: OutboundMessage) -> Result<Message, SyncError>;

    /// Next sequence number for a conversation (max existing + 1). Only
    /// meaningful at the authoritative store — it alone assigns order.
    async fn next_sequence_number(&self, conversation_id: &str) -> Result<i64, SyncError>;

    async fn update_last_message_at(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError>;
}

/// Remote public-key directory.
#[async_trait]
pub trait RemoteKeyStore: Send + Sync {
    /// Create or replace a user's published key material.
    async fn upsert(&self, record: KeyRecord) -> Result<(), SyncError>;

    /// A user's current non-revoked record, if any.
    async fn get(&self, user_id: &str) -> Result<Option<KeyRecord>, SyncError>;
}

/// Session identity.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self) -> Option<CurrentUser>;
}

/// Per-user one-time welcome flag.
#[async_trait]
pub trait WelcomeLedger: Send + Sync {
    async fn is_welcomed(&self, user_id: &str) -> Result<bool, SyncError>;
    async fn mark_welcomed(&self, user_id: &str) -> Result<(), SyncError>;
}
