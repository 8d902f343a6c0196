//! Key derivation functions
//!
//! `seed_from_password` — Argon2id, stretches a user password + stored salt
//!   into the 32-byte seed every per-user key pair is derived from.
//!
//! `hkdf_expand` — HKDF-SHA256, used to turn ECDH shared secrets into
//!   symmetric message keys and KDF seeds into curve scalars.

use argon2::{Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// Salt length in bytes. Stored beside the public key (not secret).
pub const SALT_LEN: usize = 16;

// ── Password seed (Argon2id) ──────────────────────────────────────────────────

/// 32-byte seed derived from a user password. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct KdfSeed(pub [u8; 32]);

/// Argon2id parameters — tuned for interactive use.
fn argon2_params() -> Params {
    Params::new(
        64 * 1024, // m_cost: 64 MiB
        3,         // t_cost: 3 iterations
        1,         // p_cost: 1 thread
        Some(32),  // output len
    )
    .expect("Static Argon2 params are always valid")
}

/// Stretch a user password + 16-byte salt into a key-derivation seed.
///
/// Deterministic: identical password and salt always produce the same seed,
/// which is what makes zero-knowledge key re-derivation possible.
pub fn seed_from_password(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<KdfSeed, CryptoError> {
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon2_params());
    let mut output = [0u8; 32];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(KdfSeed(output))
}

/// Generate a fresh random 16-byte salt (call once per user; store remotely).
pub fn generate_salt() -> [u8; SALT_LEN] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

// ── HKDF-SHA256 ───────────────────────────────────────────────────────────────

/// Expand `ikm` + `info` into `output.len()` bytes of key material.
///
/// `salt` may be empty (HKDF will use a zeroed salt).
pub fn hkdf_expand(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    output: &mut [u8],
) -> Result<(), CryptoError> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    hk.expand(info, output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        let a = seed_from_password(b"correct horse battery staple", &salt).unwrap();
        let b = seed_from_password(b"correct horse battery staple", &salt).unwrap();
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn seed_differs_per_salt_and_password() {
        let a = seed_from_password(b"password", &[1u8; SALT_LEN]).unwrap();
        let b = seed_from_password(b"password", &[2u8; SALT_LEN]).unwrap();
        let c = seed_from_password(b"passwore", &[1u8; SALT_LEN]).unwrap();
        assert_ne!(a.0, b.0);
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn generated_salts_are_unique() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
