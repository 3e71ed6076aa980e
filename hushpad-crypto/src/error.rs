//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during envelope encryption and decryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed (bad parameters or internal failure).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Authentication tag mismatch: the password is wrong or the data
    /// was tampered with. Deliberately carries no detail.
    #[error("decryption failed (wrong password or tampered data)")]
    AuthenticationFailed,

    /// Stored envelope is structurally invalid. Raised before any key
    /// derivation or decryption is attempted.
    #[error("corrupted envelope: {0}")]
    CorruptedEnvelope(String),

    /// Serialization error while producing the storage form.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
