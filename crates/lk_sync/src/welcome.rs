//! System-sender bootstrap and one-time greeting.
//!
//! A fixed system participant greets every new user exactly once. Its key
//! pair derives from a host-configured secret the same way user keys derive
//! from passwords, so the bootstrap is idempotent and restart-safe: as long
//! as the stored public key still re-derives from the secret, nothing is
//! touched.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use lk_crypto::{keys::derive_keypair, PublicKeyJwk};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::WelcomeConfig,
    encryption::EncryptionService,
    error::SyncError,
    keys::{assemble_keypair, parse_salt, UserKeyPair},
    remote::{OutboundMessage, RemoteKeyStore, RemoteMessageStore, WelcomeLedger},
};

#[derive(Clone)]
pub struct WelcomeService {
    remote_keys: Arc<dyn RemoteKeyStore>,
    remote_messages: Arc<dyn RemoteMessageStore>,
    ledger: Arc<dyn WelcomeLedger>,
    config: WelcomeConfig,
}

impl WelcomeService {
    pub fn new(
        remote_keys: Arc<dyn RemoteKeyStore>,
        remote_messages: Arc<dyn RemoteMessageStore>,
        ledger: Arc<dyn WelcomeLedger>,
        config: WelcomeConfig,
    ) -> Self {
        Self {
            remote_keys,
            remote_messages,
            ledger,
            config,
        }
    }

    /// Idempotent bootstrap of the system sender's keys.
    ///
    /// An existing stored public key is verified against what the
    /// configured secret derives — a mismatch means the record is corrupt
    /// or was written by a different secret, and triggers re-derivation
    /// with a fresh salt rather than silent acceptance.
    pub async fn initialize_admin_keys(&self) -> Result<UserKeyPair, SyncError> {
        let admin_id = &self.config.admin_user_id;

        if let Some(record) = self.remote_keys.get(admin_id).await? {
            if let Some(salt_hex) = record.salt.as_deref().filter(|_| !record.is_legacy()) {
                let salt = parse_salt(admin_id, salt_hex)?;
                let derived = derive_keypair(self.config.admin_secret.as_bytes(), &salt)?;
                if derived.public_jwk()? == record.public_key {
                    return assemble_keypair(
                        admin_id,
                        record.device_id.as_deref().unwrap_or(&self.config.admin_device_id),
                        &self.config.admin_secret,
                        salt,
                        record.created_at,
                        record.expires_at,
                    );
                }
                warn!("[welcome] stored system key does not re-derive — rotating");
            } else {
                warn!("[welcome] legacy system key record — rotating");
            }
        }

        let salt = lk_crypto::kdf::generate_salt();
        let pair = assemble_keypair(
            admin_id,
            &self.config.admin_device_id,
            &self.config.admin_secret,
            salt,
            Utc::now(),
            None,
        )?;
        self.remote_keys.upsert(pair.to_record()).await?;
        info!("[welcome] initialised system sender keys for {admin_id}");
        Ok(pair)
    }

    /// Greet a new user exactly once.
    ///
    /// Guarded by the per-user welcome flag: returns `Ok(false)` without
    /// touching the message store when the flag is already set, no matter
    /// how often it is invoked. The flag is only set after the greeting
    /// actually reached the authoritative store.
    pub async fn send_welcome_message(
        &self,
        user_id: &str,
        user_key: &PublicKeyJwk,
    ) -> Result<bool, SyncError> {
        if self.ledger.is_welcomed(user_id).await? {
            debug!("[welcome] user {user_id} already greeted");
            return Ok(false);
        }

        let admin = self.initialize_admin_keys().await?;
        let admin_id = admin.user_id.clone();
        let payload = EncryptionService::new(Arc::new(admin)).encrypt(&self.config.greeting, user_key)?;

        // Deterministic conversation id for the (system, user) pair.
        let conversation_id = Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("{admin_id}:{user_id}").as_bytes(),
        )
        .to_string();

        let seq = self
            .bounded(self.remote_messages.next_sequence_number(&conversation_id))
            .await?;
        let outbound = OutboundMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.clone(),
            sender_id: admin_id,
            encrypted_content: payload.ciphertext,
            iv: payload.iv,
            sequence_number: seq,
        };
        let inserted = self.bounded(self.remote_messages.insert(outbound)).await?;
        if let Err(e) = self
            .bounded(
                self.remote_messages
                    .update_last_message_at(&conversation_id, inserted.delivered_at),
            )
            .await
        {
            warn!("[welcome] update_last_message_at failed for {conversation_id}: {e}");
        }

        self.ledger.mark_welcomed(user_id).await?;
        info!("[welcome] greeted user {user_id}");
        Ok(true)
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, SyncError>>,
    ) -> Result<T, SyncError> {
        match tokio::time::timeout(self.config.op_timeout(), fut).await {
            Ok(res) => res,
            Err(_) => Err(SyncError::Timeout(self.config.op_timeout_ms)),
        }
    }
}
