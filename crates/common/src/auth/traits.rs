//! Traits for session storage, provider calls and the auth capability
//!
//! These seams let the session manager run against mocks in tests and let
//! API clients depend on "something that can hand out a token" rather than on
//! a concrete manager.

use async_trait::async_trait;
use tracing::warn;
use url::Url;

use super::client::ProviderClientError;
use super::redirect::TokenExtractionError;
use super::store::StoreError;
use super::types::{AuthenticationStatus, Session, TokenIntrospection, TokenResponse};

/// Scoped, durable key-value storage for session data
///
/// Batch operations default to sequential single-key calls; backends that
/// can apply a batch atomically should override them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value; absent keys are not an error
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }

    /// Write `set` and delete `remove` as one batch: either both take
    /// effect or the store is left as it was.
    ///
    /// The default snapshots every touched key and restores it when a step
    /// fails. Stores with a single lock should override it.
    ///
    /// # Errors
    /// The first failing step; the snapshot has been restored (best effort).
    async fn apply(&self, set: &[(&str, String)], remove: &[&str]) -> Result<(), StoreError> {
        let mut previous = Vec::with_capacity(set.len() + remove.len());
        for key in set.iter().map(|(key, _)| *key).chain(remove.iter().copied()) {
            previous.push((key, self.get(key).await?));
        }

        let outcome = match self.set_many(set).await {
            Ok(()) => self.remove_many(remove).await,
            Err(err) => Err(err),
        };

        if outcome.is_err() {
            for (key, value) in &previous {
                let restored = match value {
                    Some(value) => self.set(key, value).await,
                    None => self.remove(key).await,
                };
                if let Err(err) = restored {
                    warn!(key = *key, error = %err, "Failed to restore key after failed batch");
                }
            }
        }
        outcome
    }
}

/// Network operations against the provider's OAuth endpoints
#[async_trait]
pub trait ProviderClientTrait: Send + Sync {
    /// Ask the provider whether `access_token` is still active.
    ///
    /// # Errors
    /// Transport failure, a status other than 200, or an undecodable body.
    async fn introspect(&self, access_token: &str)
        -> Result<TokenIntrospection, ProviderClientError>;

    /// Revoke `access_token`.
    ///
    /// # Errors
    /// Transport failure or a non-success status.
    async fn revoke(&self, access_token: &str) -> Result<(), ProviderClientError>;

    /// Exchange an authorization code (code flow only).
    ///
    /// # Errors
    /// Transport failure, a non-success status, or an undecodable body.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, ProviderClientError>;
}

/// Authentication capability consumed by API clients and the UI
///
/// One implementation per provider, used through generics.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Build the provider authorization URL and persist a fresh nonce.
    ///
    /// # Errors
    /// The nonce could not be stored.
    async fn build_auth_url(&self) -> Result<Url, StoreError>;

    /// Validate a redirect and persist the session it carries.
    ///
    /// # Errors
    /// See [`TokenExtractionError`]; nothing is written on failure.
    async fn extract_token(&self, redirect: &Url) -> Result<Session, TokenExtractionError>;

    /// Online check of the stored token; never fails.
    async fn authentication_status(&self) -> AuthenticationStatus;

    /// Revoke (best effort) and clear every session key.
    async fn logout(&self);

    /// Current, unexpired access token
    async fn get_access_token(&self) -> Option<String>;

    async fn get_active_user(&self) -> Option<String>;
}
