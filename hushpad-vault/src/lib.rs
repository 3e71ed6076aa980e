//! Encrypted notes vault for Hushpad.
//!
//! Holds the user's secret notes as a single encrypted envelope in a
//! key-value store. Notes are decrypted into memory for the lifetime of
//! an unlocked session and never persisted in the clear.
//!
//! # Architecture
//!
//! - **Session**: the lock state machine. Owns the session password and
//!   the plaintext buffer, zeroizes both on lock, locks itself after an
//!   idle period.
//! - **Coalescer**: the debounced save pipeline. Edits restart a quiet-
//!   period timer; overlapping save requests collapse into at most one
//!   follow-up, so exactly one save is ever in flight.
//! - **Store**: persistence seam ([`KeyValueStore`]). The extension
//!   backs this with browser storage; tests use [`MemoryStore`].
//! - **Status**: UI feedback seam ([`StatusSink`]) for save-status labels
//!   and the auto-lock notice.
//!
//! Encryption itself lives in `hushpad-crypto`; this crate re-exports
//! the pieces embedders need ([`Envelope`], [`KdfParams`]).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hushpad_vault::{KdfParams, MemoryStore, NullStatusSink, VaultConfig, VaultSession};
//!
//! # tokio_test::block_on(async {
//! let config = VaultConfig {
//!     kdf: KdfParams { memory_cost: 1024, time_cost: 1, parallelism: 1 },
//!     ..VaultConfig::default()
//! };
//! let session = VaultSession::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(NullStatusSink),
//!     config,
//! );
//!
//! session.unlock("hunter22").await.unwrap();
//! session.edit("rotate the backup key on friday").unwrap();
//! session.lock().await;
//! assert!(!session.is_unlocked());
//! # });
//! ```

mod coalescer;
mod error;
mod session;
mod status;
mod store;

pub use coalescer::{SaveCoalescer, SaveOp};
pub use error::{VaultError, VaultResult};
pub use session::{
    VaultConfig, VaultSession, VaultState, AUTO_LOCK_AFTER, AUTO_LOCK_NOTICE, MIN_PASSWORD_LEN,
    SAVE_DEBOUNCE, VAULT_STORAGE_KEY,
};
pub use status::{NullStatusSink, SaveStatus, StatusSink};
pub use store::{KeyValueStore, MemoryStore, StoreError, StoreResult};

pub use hushpad_crypto::{Envelope, KdfParams};
