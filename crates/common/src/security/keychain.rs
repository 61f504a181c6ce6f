//! Generic keychain provider for secret strings
//!
//! ```no_run
//! use mealscribe_common::security::KeychainProvider;
//!
//! let keychain = KeychainProvider::new("MealScribe.fitbit");
//! keychain.set_secret("fitbit.user_id", "ABC123")?;
//! assert_eq!(keychain.get_secret("fitbit.user_id")?, "ABC123");
//! # Ok::<(), mealscribe_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

/// Keychain access scoped to one service name
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Store a secret, replacing any existing value.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if keychain access fails
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {key}: {e}"))
        })
    }

    /// Retrieve a secret.
    ///
    /// # Errors
    /// `KeychainError::NotFound` if the secret does not exist,
    /// `KeychainError::AccessFailed` if keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => KeychainError::NotFound,
            other => {
                KeychainError::AccessFailed(format!("Failed to retrieve secret for {key}: {other}"))
            }
        })
    }

    /// Like [`get_secret`](Self::get_secret) but maps `NotFound` to `None`.
    ///
    /// # Errors
    /// `KeychainError::AccessFailed` if keychain access fails
    pub fn find_secret(&self, key: &str) -> Result<Option<String>, KeychainError> {
        match self.get_secret(key) {
            Ok(value) => Ok(Some(value)),
            Err(KeychainError::NotFound) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Delete a secret (idempotent).
    ///
    /// # Errors
    /// `KeychainError::AccessFailed` if keychain access fails
    pub fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                Err(KeychainError::AccessFailed(format!("Failed to delete secret for {key}: {e}")))
            }
        }
    }

    #[must_use]
    pub fn secret_exists(&self, key: &str) -> bool {
        self.create_entry(key).is_ok_and(|entry| entry.get_password().is_ok())
    }

    fn create_entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {e}"))
        })
    }
}

/// Keychain errors
#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    #[error("Entry not found")]
    NotFound,
}

#[cfg(test)]
mod tests {
    //! These tests talk to the real OS keychain and are ignored by default.
    use super::*;

    const SERVICE: &str = "MealScribe.test";

    #[test]
    #[ignore = "requires a platform keychain"]
    fn test_secret_roundtrip() {
        let keychain = KeychainProvider::new(SERVICE);
        keychain.set_secret("roundtrip", "value").unwrap();

        assert_eq!(keychain.get_secret("roundtrip").unwrap(), "value");
        assert!(keychain.secret_exists("roundtrip"));

        keychain.delete_secret("roundtrip").unwrap();
        assert!(matches!(keychain.get_secret("roundtrip"), Err(KeychainError::NotFound)));
    }

    /// Validates `KeychainProvider::delete_secret` behavior for a key that
    /// was never stored.
    ///
    /// Assertions:
    /// - Ensures deletion is idempotent.
    /// - Ensures `find_secret` reports `None`.
    #[test]
    #[ignore = "requires a platform keychain"]
    fn test_delete_missing_secret_is_ok() {
        let keychain = KeychainProvider::new(SERVICE);
        keychain.delete_secret("never-stored").unwrap();
        assert_eq!(keychain.find_secret("never-stored").unwrap(), None);
    }
}
