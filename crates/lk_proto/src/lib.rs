//! lk_proto — Shared data types for the Larkline messaging core
//!
//! Everything here is a plain serde type: what the local queue persists,
//! what the remote stores hand back, and the three-way conflict model.
//! No I/O and no crypto logic — those live in lk_store and lk_crypto.
//!
//! # Modules
//! - `message`  — queued + authoritative messages, conversations, payloads
//! - `keys`     — remote key records
//! - `conflict` — three-way conflict model

pub mod conflict;
pub mod keys;
pub mod message;

pub use conflict::{ConflictChoice, ConflictEntity, ConflictInfo, ConflictStatus, EntityVersion};
pub use keys::KeyRecord;
pub use message::{Conversation, EncryptedPayload, Message, MessageStatus, QueuedMessage};
