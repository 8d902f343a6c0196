use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed (authentication tag mismatch — possible tampering or wrong key)")]
    Decrypt,

    #[error("Invalid initialization vector: expected {expected} bytes, got {got}")]
    InvalidIv { expected: usize, got: usize },

    #[error("Decrypted payload is not valid UTF-8")]
    InvalidPlaintext,

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
