//! Session storage backed by the platform keychain
//!
//! Layering:
//! - `security::keychain`: generic secret storage
//! - `auth::keychain` (this module): adapts it to [`SessionStore`]
//!
//! Keychain calls are blocking and run on the blocking pool.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::store::StoreError;
use super::traits::SessionStore;
use crate::security::{KeychainError, KeychainProvider};

/// [`SessionStore`] that keeps every session key as a keychain secret
#[derive(Debug, Clone)]
pub struct KeychainSessionStore {
    keychain: Arc<KeychainProvider>,
}

impl KeychainSessionStore {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::from_provider(KeychainProvider::new(service_name))
    }

    #[must_use]
    pub fn from_provider(keychain: KeychainProvider) -> Self {
        Self { keychain: Arc::new(keychain) }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&KeychainProvider) -> Result<T, KeychainError> + Send + 'static,
    {
        let keychain = Arc::clone(&self.keychain);
        tokio::task::spawn_blocking(move || op(&keychain))
            .await
            .map_err(|e| StoreError::Unavailable(format!("keychain task failed: {e}")))?
            .map_err(StoreError::from)
    }
}

impl From<KeychainError> for StoreError {
    fn from(err: KeychainError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[async_trait]
impl SessionStore for KeychainSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.blocking(move |keychain| keychain.find_secret(&key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (key, value) = (key.to_string(), value.to_string());
        self.blocking(move |keychain| keychain.set_secret(&key, &value)).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.blocking(move |keychain| keychain.delete_secret(&key)).await
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let owned: Vec<(String, String)> =
            entries.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect();
        debug!(count = owned.len(), "Writing session batch to keychain");

        self.blocking(move |keychain| {
            let mut written: Vec<String> = Vec::with_capacity(owned.len());
            for (key, value) in &owned {
                if let Err(e) = keychain.set_secret(key, value) {
                    // Roll back so a failed batch leaves no partial session behind
                    for done in &written {
                        if let Err(rollback) = keychain.delete_secret(done) {
                            warn!(key = %done, error = %rollback, "Keychain rollback failed");
                        }
                    }
                    return Err(e);
                }
                written.push(key.clone());
            }
            Ok(())
        })
        .await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let owned: Vec<String> = keys.iter().map(|key| (*key).to_string()).collect();
        self.blocking(move |keychain| {
            // Attempt every key before reporting the first failure
            let mut first_error = None;
            for key in &owned {
                if let Err(e) = keychain.delete_secret(key) {
                    first_error.get_or_insert(e);
                }
            }
            first_error.map_or(Ok(()), Err)
        })
        .await
    }

    async fn apply(&self, set: &[(&str, String)], remove: &[&str]) -> Result<(), StoreError> {
        let writes: Vec<(String, String)> =
            set.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect();
        let deletes: Vec<String> = remove.iter().map(|key| (*key).to_string()).collect();
        debug!(writes = writes.len(), deletes = deletes.len(), "Applying session batch to keychain");

        self.blocking(move |keychain| {
            let mut previous: Vec<(String, Option<String>)> = Vec::new();
            for key in writes.iter().map(|(key, _)| key).chain(&deletes) {
                previous.push((key.clone(), keychain.find_secret(key)?));
            }

            let outcome = writes
                .iter()
                .try_for_each(|(key, value)| keychain.set_secret(key, value))
                .and_then(|()| deletes.iter().try_for_each(|key| keychain.delete_secret(key)));

            if outcome.is_err() {
                for (key, value) in &previous {
                    let restored = match value {
                        Some(value) => keychain.set_secret(key, value),
                        None => keychain.delete_secret(key),
                    };
                    if let Err(e) = restored {
                        warn!(key = %key, error = %e, "Keychain rollback failed");
                    }
                }
            }
            outcome
        })
        .await
    }
}
