//! ECDH P-256 key pairs and their JWK encoding
//!
//! Each user has one asymmetric pair derived deterministically from their
//! password seed (see `kdf`). Only the public half ever leaves the process,
//! serialised as JWK `{kty:"EC", crv:"P-256", x, y}` — the format every
//! peer and the remote key store speak.
//!
//! Scalar derivation is hash-to-scalar by rejection: HKDF output is tried
//! as a P-256 scalar and re-derived with an incremented counter until it
//! falls in the valid range. The counter makes the loop deterministic, so
//! the same seed always lands on the same key.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::{
    elliptic_curve::generic_array::GenericArray,
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
    EncodedPoint, PublicKey, SecretKey,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{error::CryptoError, kdf, kdf::KdfSeed};

const SCALAR_INFO: &[u8] = b"lk-p256-scalar-v1";

// ── JWK public key ────────────────────────────────────────────────────────────

/// P-256 public key in JWK form. `x` and `y` are base64url (unpadded)
/// 32-byte affine coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

impl PublicKeyJwk {
    /// Encode a curve point as JWK.
    pub fn from_public_key(public: &PublicKey) -> Result<Self, CryptoError> {
        let point = public.to_encoded_point(false);
        let x = point
            .x()
            .ok_or_else(|| CryptoError::InvalidKey("point has no x coordinate".into()))?;
        let y = point
            .y()
            .ok_or_else(|| CryptoError::InvalidKey("point has no y coordinate".into()))?;
        Ok(Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
        })
    }

    /// Decode back into a curve point. Rejects off-curve coordinates and
    /// any key type other than EC/P-256.
    pub fn to_public_key(&self) -> Result<PublicKey, CryptoError> {
        if self.kty != "EC" || self.crv != "P-256" {
            return Err(CryptoError::InvalidKey(format!(
                "Unsupported key type {}/{}",
                self.kty, self.crv
            )));
        }
        let x = URL_SAFE_NO_PAD.decode(&self.x)?;
        let y = URL_SAFE_NO_PAD.decode(&self.y)?;
        if x.len() != 32 || y.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "JWK coordinates must be 32 bytes, got {}/{}",
                x.len(),
                y.len()
            )));
        }
        let point = EncodedPoint::from_affine_coordinates(
            GenericArray::from_slice(&x),
            GenericArray::from_slice(&y),
            false,
        );
        Option::<PublicKey>::from(PublicKey::from_encoded_point(&point))
            .ok_or_else(|| CryptoError::InvalidKey("coordinates are not on P-256".into()))
    }

    /// Human-readable fingerprint: BLAKE3 of x||y, truncated to 20 bytes
    /// (160 bits), hex-encoded in groups of 4 for display.
    ///
    /// Example: "a1b2 c3d4 e5f6 7890 abcd ef01 2345 6789 0abc def0"
    pub fn fingerprint(&self) -> Result<String, CryptoError> {
        let mut material = URL_SAFE_NO_PAD.decode(&self.x)?;
        material.extend(URL_SAFE_NO_PAD.decode(&self.y)?);
        let hash = blake3::hash(&material);
        let hex = hex::encode(&hash.as_bytes()[..20]);
        Ok(hex
            .chars()
            .collect::<Vec<_>>()
            .chunks(4)
            .map(|c| c.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(" "))
    }
}

// ── ECDH key pair ─────────────────────────────────────────────────────────────

/// P-256 key pair. The secret scalar zeroizes on drop (guaranteed by the
/// underlying `SecretKey`), so pairs can be derived transiently per login
/// without leaving scalar material behind.
pub struct EcdhKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl EcdhKeyPair {
    /// Derive the pair belonging to a password seed. Deterministic:
    /// identical seeds always yield identical key pairs.
    pub fn from_seed(seed: &KdfSeed) -> Result<Self, CryptoError> {
        for counter in 0u8..=255 {
            let mut candidate = Zeroizing::new([0u8; 32]);
            kdf::hkdf_expand(
                &seed.0,
                Some(SCALAR_INFO),
                &[b"scalar".as_slice(), &[counter]].concat(),
                candidate.as_mut_slice(),
            )?;
            // Rejected candidates (zero or >= group order) re-derive with the
            // next counter; probability per round is ~2^-32.
            if let Ok(secret) = SecretKey::from_slice(candidate.as_slice()) {
                let public = secret.public_key();
                return Ok(Self { secret, public });
            }
        }
        Err(CryptoError::KeyDerivation(
            "no valid P-256 scalar after 256 attempts".into(),
        ))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn public_jwk(&self) -> Result<PublicKeyJwk, CryptoError> {
        PublicKeyJwk::from_public_key(&self.public)
    }

    /// ECDH shared secret with a peer's public key. Static-static, so both
    /// directions of a conversation agree on the same secret.
    pub fn diffie_hellman(&self, peer: &PublicKey) -> Zeroizing<[u8; 32]> {
        let shared = p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), peer.as_affine());
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        out
    }
}

/// Convenience: derive a pair straight from password + salt.
/// The intermediate seed zeroizes when it drops.
pub fn derive_keypair(
    password: &[u8],
    salt: &[u8; kdf::SALT_LEN],
) -> Result<EcdhKeyPair, CryptoError> {
    let seed = kdf::seed_from_password(password, salt)?;
    EcdhKeyPair::from_seed(&seed)
}
