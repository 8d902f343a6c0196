//! lk_crypto — Larkline cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Public keys travel as JWK; everything secret stays in this process.
//!
//! # Module layout
//! - `kdf`    — Argon2id password stretching + HKDF-SHA256 expansion
//! - `keys`   — deterministic ECDH P-256 key pairs + JWK encoding
//! - `cipher` — AES-256-GCM payload encryption with detached IV
//! - `error`  — unified error type

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod keys;

pub use error::CryptoError;
pub use keys::{EcdhKeyPair, PublicKeyJwk};
