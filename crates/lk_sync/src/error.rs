//! Unified error taxonomy for the sync layer.
//!
//! Per-message failures (connection, timeout) stay local to the sync pass
//! and feed the retry counter; identity and configuration failures
//! propagate to the caller and abort the batch.

use lk_crypto::CryptoError;
use lk_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No signed-in identity")]
    Authentication,

    #[error("Remote store unavailable: {0}")]
    Connection(String),

    #[error("Remote operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Keys not initialised for user {0}")]
    KeysNotInitialized(String),

    #[error("Key record for user {0} predates salted derivation — migration required")]
    LegacyKeys(String),

    #[error(
        "Derived public key does not match stored key for user {user_id} \
         (stored {stored}, derived {derived}) — wrong password or account needs update"
    )]
    KeyMismatch {
        user_id: String,
        /// Fingerprint of the stored public key.
        stored: String,
        /// Fingerprint of the freshly derived public key.
        derived: String,
    },

    #[error("Conflict {0} is already resolved")]
    ConflictAlreadyResolved(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Whether a failed send attempt should feed the retry/backoff
    /// mechanism. Cipher failures are deliberately NOT retryable: retrying
    /// with identical key and IV cannot succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}
