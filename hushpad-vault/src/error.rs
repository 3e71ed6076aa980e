//! Error types for the vault session.

use hushpad_crypto::CryptoError;
use thiserror::Error;

use crate::store::StoreError;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur in vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Operation requires an unlocked vault.
    #[error("vault is locked")]
    Locked,

    /// Unlock requested while already unlocked.
    #[error("vault is already unlocked")]
    AlreadyUnlocked,

    /// Unlock requested while another unlock is running.
    #[error("unlock already in progress")]
    UnlockInProgress,

    /// No password was supplied.
    #[error("password is required")]
    PasswordRequired,

    /// Password does not meet the minimum length.
    #[error("password must be at least 6 characters")]
    PasswordTooShort,

    /// Password does not decrypt the stored envelope.
    #[error("incorrect password")]
    IncorrectPassword,

    /// Current password given to a password change is wrong.
    #[error("incorrect current password")]
    IncorrectCurrentPassword,

    /// New password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// A save ran without a session password. Contract violation; never
    /// expected while the state machine is intact.
    #[error("no session password available")]
    NoPassword,

    /// Stored envelope is structurally invalid. The stored blob is left
    /// untouched; recovery is the caller's decision.
    #[error("corrupted vault data: {0}")]
    Corrupted(String),

    /// The store backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Crypto failure that is neither an authentication nor a corruption
    /// outcome.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::AuthenticationFailed => VaultError::IncorrectPassword,
            CryptoError::CorruptedEnvelope(msg) => VaultError::Corrupted(msg),
            other => VaultError::Crypto(other.to_string()),
        }
    }
}
