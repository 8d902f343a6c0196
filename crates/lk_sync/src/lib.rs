//! lk_sync — Larkline messaging services
//!
//! The end-to-end encrypted messaging core: key lifecycle, payload
//! encryption, the offline-durable send queue with backoff retry, three-way
//! conflict resolution, and the system-sender welcome bootstrap.
//!
//! Every service is a constructor-injected instance owning its own state —
//! no singletons, no module-level mutable globals. Remote collaborators
//! (message store, key store, auth) are consumed through `remote` traits as
//! `Arc<dyn …>`; their implementations live with the host application.
//!
//! # Modules
//! - `keys`       — per-user key lifecycle (derive / initialise / migrate)
//! - `encryption` — payload encrypt/decrypt bound to one user's key pair
//! - `queue`      — offline queue + background sync with exponential backoff
//! - `conflict`   — three-way conflict engine (always-manual resolution)
//! - `welcome`    — system-sender bootstrap + one-time greeting
//! - `remote`     — consumed collaborator contracts
//! - `config`     — sync + welcome tuning knobs
//! - `error`      — unified error taxonomy

pub mod config;
pub mod conflict;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod queue;
pub mod remote;
pub mod welcome;

pub use config::{SyncConfig, WelcomeConfig};
pub use conflict::ConflictResolutionEngine;
pub use encryption::EncryptionService;
pub use error::SyncError;
pub use keys::{KeyManagementService, UserKeyPair};
pub use queue::{OfflineQueueService, SyncReport};
pub use welcome::WelcomeService;
