//! Authenticated payload encryption
//!
//! AES-256-GCM with a detached 96-bit IV. Key size: 32 bytes, derived from
//! an ECDH shared secret via HKDF-SHA256. Tag: 16 bytes, appended to the
//! ciphertext by the AEAD.
//!
//! The IV is generated fresh from OS randomness on EVERY call and travels
//! beside the ciphertext — IV reuse under the same key voids GCM's
//! confidentiality and authenticity, so there is deliberately no API that
//! accepts a caller-supplied IV for encryption.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::{error::CryptoError, kdf};

/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

const MESSAGE_KEY_INFO: &[u8] = b"lk-message-key-v1";

/// Derive the 32-byte symmetric message key for one conversation pair
/// from an ECDH shared secret.
pub fn message_key(shared_secret: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let mut key = Zeroizing::new([0u8; 32]);
    kdf::hkdf_expand(
        shared_secret,
        Some(b"lk-messaging"),
        MESSAGE_KEY_INFO,
        key.as_mut_slice(),
    )?;
    Ok(key)
}

/// Encrypt `plaintext`, returning `(ciphertext+tag, iv)` with a fresh
/// random IV. `aad` — additional associated data (authenticated but not
/// encrypted).
pub fn encrypt(
    key: &[u8; 32],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, [u8; IV_LEN]), CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Encrypt)?;

    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::Encrypt)?;

    Ok((ciphertext, iv))
}

/// Decrypt a ciphertext with its detached IV. Fails on tag mismatch —
/// tampering, wrong key, or an IV that does not belong to this ciphertext.
pub fn decrypt(
    key: &[u8; 32],
    ciphertext: &[u8],
    iv: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if iv.len() != IV_LEN {
        return Err(CryptoError::InvalidIv {
            expected: IV_LEN,
            got: iv.len(),
        });
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Decrypt)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::Decrypt)?;

    Ok(Zeroizing::new(plaintext))
}
