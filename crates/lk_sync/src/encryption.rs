//! Payload encryption bound to one user's key pair.
//!
//! Static-static ECDH: both directions of a conversation pair derive the
//! same shared secret, so either side can decrypt what the other encrypted.
//! Plaintext and key material never reach a log line in this module.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use lk_crypto::{cipher, CryptoError, PublicKeyJwk};
use lk_proto::EncryptedPayload;

use crate::{error::SyncError, keys::UserKeyPair};

/// Associated data binding ciphertexts to this payload format version.
const PAYLOAD_AAD: &[u8] = b"lk-payload-v1";

#[derive(Clone)]
pub struct EncryptionService {
    keys: Arc<UserKeyPair>,
}

impl EncryptionService {
    pub fn new(keys: Arc<UserKeyPair>) -> Self {
        Self { keys }
    }

    /// Encrypt a plaintext for `recipient`. Every call draws a fresh random
    /// IV; two calls with identical inputs yield different ciphertexts.
    pub fn encrypt(
        &self,
        plaintext: &str,
        recipient: &PublicKeyJwk,
    ) -> Result<EncryptedPayload, SyncError> {
        let peer = recipient.to_public_key()?;
        let shared = self.keys.keypair().diffie_hellman(&peer);
        let key = cipher::message_key(&shared)?;
        let (ciphertext, iv) = cipher::encrypt(&key, plaintext.as_bytes(), PAYLOAD_AAD)?;
        Ok(EncryptedPayload {
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(iv),
        })
    }

    /// Decrypt a payload encrypted to us by `sender`. Tampering, a wrong
    /// key, or a foreign IV all surface as `CryptoError::Decrypt` — fatal
    /// for the message, since retrying with identical inputs cannot help.
    pub fn decrypt(
        &self,
        payload: &EncryptedPayload,
        sender: &PublicKeyJwk,
    ) -> Result<String, SyncError> {
        let peer = sender.to_public_key()?;
        let shared = self.keys.keypair().diffie_hellman(&peer);
        let key = cipher::message_key(&shared)?;

        let ciphertext = STANDARD
            .decode(&payload.ciphertext)
            .map_err(CryptoError::Base64Decode)?;
        let iv = STANDARD.decode(&payload.iv).map_err(CryptoError::Base64Decode)?;

        let plaintext = cipher::decrypt(&key, &ciphertext, &iv, PAYLOAD_AAD)?;
        String::from_utf8(plaintext.to_vec())
            .map_err(|_| SyncError::Crypto(CryptoError::InvalidPlaintext))
    }
}
