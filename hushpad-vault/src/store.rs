//! Key-value store seam.
//!
//! The vault persists exactly one value (the encrypted envelope) under a
//! fixed key. The backing store is whatever the embedder provides: the
//! extension storage area in production, [`MemoryStore`] in tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading a value failed (backend unavailable).
    #[error("store read failed: {0}")]
    Read(String),

    /// Writing a value failed (backend unavailable, quota exceeded).
    #[error("store write failed: {0}")]
    Write(String),
}

/// An async string key-value store.
///
/// Both operations may suspend and may fail; the vault treats failures as
/// recoverable and reports them on its status surface.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetches the value stored under `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any existing value.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// In-memory store backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
