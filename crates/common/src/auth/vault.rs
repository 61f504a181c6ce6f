//! Typed access to the session keys held in a [`SessionStore`]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use super::store::StoreError;
use super::traits::SessionStore;
use super::types::{Session, SessionKey};

/// Reads and writes the auth manager's keys as one unit
pub struct SessionVault<S> {
    store: Arc<S>,
}

impl<S> Clone for SessionVault<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: SessionStore> SessionVault<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn read(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        self.store.get(key.as_str()).await
    }

    pub async fn access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read(SessionKey::AccessToken).await?.filter(|token| !token.is_empty()))
    }

    pub async fn user_id(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read(SessionKey::UserId).await?.filter(|id| !id.is_empty()))
    }

    /// Stored expiry; `Corrupt` when the value is not epoch milliseconds
    pub async fn expires_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.read(SessionKey::ExpiresAt).await?.map(|raw| parse_expiry(&raw)).transpose()
    }

    pub async fn pending_state(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read(SessionKey::State).await?.filter(|state| !state.is_empty()))
    }

    pub async fn code_verifier(&self) -> Result<Option<String>, StoreError> {
        self.read(SessionKey::CodeVerifier).await
    }

    /// Full stored session, `None` when token or user id is missing
    pub async fn load_session(&self) -> Result<Option<Session>, StoreError> {
        let Some(access_token) = self.access_token().await? else {
            return Ok(None);
        };
        let Some(user_id) = self.user_id().await? else {
            return Ok(None);
        };
        let Some(expires_at) = self.expires_at().await? else {
            return Ok(None);
        };
        let scope = self.read(SessionKey::Scope).await?;

        Ok(Some(Session { access_token, user_id, expires_at, scope }))
    }

    /// Record a new authorization attempt, replacing any earlier nonce.
    pub async fn begin_attempt(
        &self,
        state: &str,
        code_verifier: Option<&str>,
    ) -> Result<(), StoreError> {
        match code_verifier {
            Some(verifier) => {
                self.store
                    .set_many(&[
                        (SessionKey::State.as_str(), state.to_string()),
                        (SessionKey::CodeVerifier.as_str(), verifier.to_string()),
                    ])
                    .await
            }
            None => {
                self.store
                    .apply(
                        &[(SessionKey::State.as_str(), state.to_string())],
                        &[SessionKey::CodeVerifier.as_str()],
                    )
                    .await
            }
        }
    }

    /// Persist `session` and consume the pending attempt.
    ///
    /// Session values and the consumed nonce go in one batch, so a failure
    /// leaves the store untouched. Values from an earlier session are
    /// overwritten, never merged.
    pub async fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut entries = vec![
            (SessionKey::UserId.as_str(), session.user_id.clone()),
            (SessionKey::AccessToken.as_str(), session.access_token.clone()),
            (SessionKey::ExpiresAt.as_str(), session.expires_at.timestamp_millis().to_string()),
        ];
        if let Some(scope) = &session.scope {
            entries.push((SessionKey::Scope.as_str(), scope.clone()));
        }
        let mut stale = vec![SessionKey::State.as_str(), SessionKey::CodeVerifier.as_str()];
        if session.scope.is_none() {
            stale.push(SessionKey::Scope.as_str());
        }
        self.store.apply(&entries, &stale).await?;

        debug!(user_id = %session.user_id, expires_at = %session.expires_at, "Session persisted");
        Ok(())
    }

    pub async fn clear_attempt(&self) -> Result<(), StoreError> {
        self.store
            .remove_many(&[SessionKey::State.as_str(), SessionKey::CodeVerifier.as_str()])
            .await
    }

    /// Remove every session key as one set.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.store.remove_many(&SessionKey::all_keys()).await
    }
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        key: SessionKey::ExpiresAt.as_str().to_string(),
        reason,
    };
    let millis = raw.trim().parse::<i64>().map_err(|e| corrupt(e.to_string()))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| corrupt(format!("timestamp {millis} out of range")))
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::vault.
    use super::*;
    use crate::auth::MemorySessionStore;

    fn vault() -> SessionVault<MemorySessionStore> {
        SessionVault::new(Arc::new(MemorySessionStore::new()))
    }

    /// Validates `SessionVault::save_session` behavior for the overwrite
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the loaded session equals the saved one at millisecond
    ///   precision.
    /// - Ensures the pending nonce and verifier are consumed.
    /// - Ensures a scope from an earlier session is not carried over.
    #[tokio::test]
    async fn test_save_overwrites_and_consumes_attempt() {
        let vault = vault();
        vault.begin_attempt("nonce", Some("verifier")).await.unwrap();
        let first = Session::issued("tok-1", "U1", 3600, Some("nutrition".into()), Utc::now());
        vault.save_session(&first).await.unwrap();

        let second = Session::issued("tok-2", "U2", 3600, None, Utc::now());
        vault.save_session(&second).await.unwrap();

        let loaded = vault.load_session().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "tok-2");
        assert_eq!(loaded.user_id, "U2");
        assert_eq!(loaded.expires_at.timestamp_millis(), second.expires_at.timestamp_millis());
        assert_eq!(loaded.scope, None);
        assert_eq!(vault.pending_state().await.unwrap(), None);
        assert_eq!(vault.code_verifier().await.unwrap(), None);
    }

    /// Store that cannot delete the nonce, so batches fail halfway through
    /// the default `apply`.
    struct StickyNonceStore(MemorySessionStore);

    #[async_trait::async_trait]
    impl SessionStore for StickyNonceStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.0.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StoreError> {
            if key == SessionKey::State.as_str() {
                return Err(StoreError::Unavailable("delete refused".into()));
            }
            self.0.remove(key).await
        }
    }

    /// Validates `SessionVault::save_session` behavior when the nonce cannot
    /// be consumed.
    ///
    /// Assertions:
    /// - Ensures the save fails with the store error.
    /// - Ensures the earlier session and the pending nonce are restored.
    #[tokio::test]
    async fn test_failed_save_restores_previous_values() {
        let store = Arc::new(StickyNonceStore(MemorySessionStore::new()));
        store.set(SessionKey::AccessToken.as_str(), "old-token").await.unwrap();
        store.set(SessionKey::UserId.as_str(), "OLD").await.unwrap();
        store.set(SessionKey::State.as_str(), "nonce").await.unwrap();
        let vault = SessionVault::new(Arc::clone(&store));

        let session = Session::issued("new-token", "NEW", 3600, Some("nutrition".into()), Utc::now());
        let err = vault.save_session(&session).await.unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(vault.access_token().await.unwrap().as_deref(), Some("old-token"));
        assert_eq!(vault.user_id().await.unwrap().as_deref(), Some("OLD"));
        assert_eq!(vault.expires_at().await.unwrap(), None);
        assert_eq!(vault.store().get(SessionKey::Scope.as_str()).await.unwrap(), None);
        assert_eq!(vault.pending_state().await.unwrap().as_deref(), Some("nonce"));
    }

    #[tokio::test]
    async fn test_corrupt_expiry_is_reported() {
        let vault = vault();
        vault.store().set(SessionKey::ExpiresAt.as_str(), "tomorrow").await.unwrap();

        let err = vault.expires_at().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_clear_all_removes_every_key() {
        let vault = vault();
        vault.begin_attempt("nonce", None).await.unwrap();
        vault
            .save_session(&Session::issued("tok", "U1", 3600, Some("nutrition".into()), Utc::now()))
            .await
            .unwrap();
        vault.begin_attempt("nonce-2", Some("v")).await.unwrap();

        vault.clear_all().await.unwrap();

        assert!(vault.store().is_empty().await);
    }
}
