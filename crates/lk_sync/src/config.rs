//! Service configuration.
//!
//! Plain serde structs the host application deserialises from wherever it
//! keeps settings; everything has a usable default and is injected through
//! service constructors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Offline queue tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Attempts before a message is parked as permanently failed.
    pub max_retries: u32,
    /// Base backoff delay in milliseconds; attempt r waits base * 2^(r-1).
    pub base_delay_ms: u64,
    /// Bound on every individual remote-store call.
    pub op_timeout_ms: u64,
    /// Background sync drain period.
    pub sync_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1_000,
            op_timeout_ms: 10_000,
            sync_interval_ms: 30_000,
        }
    }
}

impl SyncConfig {
    /// Backoff before attempt `retries` (1-based): 1s, 2s, 4s, 8s, 16s with
    /// the defaults. Caps the worst-case pre-failure wait at ~31s across
    /// five attempts.
    pub fn backoff_delay(&self, retries: u32) -> Duration {
        let factor = 1u64 << retries.saturating_sub(1).min(32);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }
}

/// Welcome bootstrap settings for the fixed system sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WelcomeConfig {
    /// User id of the system participant that greets new users.
    pub admin_user_id: String,
    pub admin_device_id: String,
    /// Secret the admin key pair derives from. Configured by the host;
    /// never logged, never persisted remotely.
    pub admin_secret: String,
    /// The canned greeting sent exactly once per user.
    pub greeting: String,
    /// Bound on every individual remote-store call.
    pub op_timeout_ms: u64,
}

impl Default for WelcomeConfig {
    fn default() -> Self {
        Self {
            admin_user_id: "system".to_string(),
            admin_device_id: "system-primary".to_string(),
            admin_secret: String::new(),
            greeting: "Welcome to Larkline! Your messages here are end-to-end encrypted."
                .to_string(),
            op_timeout_ms: 10_000,
        }
    }
}

impl WelcomeConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}
