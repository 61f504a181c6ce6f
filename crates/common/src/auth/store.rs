//! Session storage primitives
//!
//! [`SessionStore`](super::SessionStore) implementations persist named string
//! values. [`MemorySessionStore`] keeps them in process memory, which suits
//! browser-hosted builds and tests; native shells use
//! [`KeychainSessionStore`](super::KeychainSessionStore).

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::traits::SessionStore;

/// Errors surfaced by a session store backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt value for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// In-process session store
///
/// Batches are applied under a single write lock.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.write().await.remove(key);
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let mut values = self.values.write().await;
        for (key, value) in entries {
            values.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut values = self.values.write().await;
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }

    async fn apply(&self, set: &[(&str, String)], remove: &[&str]) -> Result<(), StoreError> {
        let mut values = self.values.write().await;
        for (key, value) in set {
            values.insert((*key).to_string(), value.clone());
        }
        for key in remove {
            values.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        store.set("fitbit.user_id", "ABC123").await.unwrap();

        assert_eq!(store.get("fitbit.user_id").await.unwrap().as_deref(), Some("ABC123"));
        assert_eq!(store.get("fitbit.missing").await.unwrap(), None);

        store.remove("fitbit.user_id").await.unwrap();
        assert!(store.is_empty().await);
    }

    /// Validates `MemorySessionStore::remove_many` behavior for a mixed set
    /// of present and absent keys.
    ///
    /// Assertions:
    /// - Ensures only the named keys are removed and absent keys are ignored.
    #[tokio::test]
    async fn test_batch_operations() {
        let store = MemorySessionStore::new();
        store
            .set_many(&[("a", "1".to_string()), ("b", "2".to_string()), ("c", "3".to_string())])
            .await
            .unwrap();
        assert_eq!(store.len().await, 3);

        store.remove_many(&["a", "b", "zzz"]).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("c").await.unwrap().as_deref(), Some("3"));
    }
}
