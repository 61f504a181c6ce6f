//! Auth session manager for the nutrition provider
//!
//! Owns the implicit-flow state machine:
//!
//! ```text
//! UNAUTHENTICATED ──build_auth_url──► PENDING_REDIRECT ──extract_token──► AUTHENTICATED
//!        ▲                                (nonce stored)                        │
//!        └────────────────────────── expiry | logout ───────────────────────────┘
//! ```
//!
//! Nothing here keeps session state in memory; every read goes to the store,
//! so several managers over one store agree on the current session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use mealscribe_domain::{MealscribeError, ProviderConfig, Result};

use super::client::ProviderClient;
use super::keychain::KeychainSessionStore;
use super::pkce::{generate_state, validate_state, PkceChallenge};
use super::redirect::{ensure_scope, ImplicitGrant, RedirectParams, TokenExtractionError};
use super::store::StoreError;
use super::traits::{AuthProvider, ProviderClientTrait, SessionStore};
use super::types::{AuthenticationStatus, Session};
use super::vault::SessionVault;

/// OAuth2 session manager for one provider account
///
/// Generic over the provider client (mocked in tests) and the session store.
/// Auth operations that touch the nonce or the session are serialized by an
/// internal lock; plain reads are not.
pub struct AuthSessionManager<C = ProviderClient, S = KeychainSessionStore> {
    config: ProviderConfig,
    authorize_url: Url,
    client: Arc<C>,
    vault: SessionVault<S>,
    flow_lock: Mutex<()>,
}

impl<S: SessionStore> AuthSessionManager<ProviderClient, S> {
    /// Manager with the reqwest-backed provider client
    ///
    /// # Errors
    /// `MealscribeError::Config` if the authorize URL is malformed.
    pub fn for_provider(config: ProviderConfig, store: Arc<S>) -> Result<Self> {
        let client = ProviderClient::new(&config);
        Self::new(config, client, store)
    }
}

impl<C, S> AuthSessionManager<C, S>
where
    C: ProviderClientTrait,
    S: SessionStore,
{
    /// Construct without touching the store or the network; call
    /// [`initialize`](Self::initialize) afterwards.
    ///
    /// # Errors
    /// `MealscribeError::Config` if the authorize URL is malformed or the
    /// client id is empty.
    pub fn new(config: ProviderConfig, client: C, store: Arc<S>) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(MealscribeError::Config("provider client_id is empty".into()));
        }
        let authorize_url = Url::parse(&config.authorize_url).map_err(|e| {
            MealscribeError::Config(format!("invalid authorize URL {}: {e}", config.authorize_url))
        })?;

        Ok(Self {
            config,
            authorize_url,
            client: Arc::new(client),
            vault: SessionVault::new(store),
            flow_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Startup hook.
    ///
    /// Keeps a valid stored session. Otherwise clears every session key and,
    /// when the app was launched from a redirect, tries to extract a session
    /// from it using the nonce that was pending before the clear.
    ///
    /// Returns whether a valid session is current afterwards.
    pub async fn initialize(&self, current_url: Option<&Url>) -> bool {
        let _guard = self.flow_lock.lock().await;

        match self.vault.load_session().await {
            Ok(Some(session)) if session.is_valid() => {
                info!(
                    user_id = %session.user_id,
                    expires_in_secs = session.seconds_until_expiry(),
                    "Restored stored session"
                );
                return true;
            }
            Ok(Some(session)) => {
                info!(user_id = %session.user_id, "Stored session expired");
            }
            Ok(None) => debug!("No stored session"),
            Err(e) => warn!(error = %e, "Stored session unreadable, discarding"),
        }

        let pending = self.vault.pending_state().await.unwrap_or_else(|e| {
            warn!(error = %e, "Pending authorization state unreadable");
            None
        });

        if let Err(e) = self.vault.clear_all().await {
            warn!(error = %e, "Failed to clear session keys");
        }

        let Some(url) = current_url.filter(|url| url.fragment().is_some_and(|f| !f.is_empty()))
        else {
            return false;
        };

        match self.extract_with(url, pending.as_deref()).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "Signed in from launch redirect");
                session.is_valid()
            }
            Err(e) => {
                warn!(error = %e, "Launch URL did not yield a session");
                false
            }
        }
    }

    /// Implicit-flow authorization URL; persists a fresh nonce.
    ///
    /// # Errors
    /// The nonce could not be stored.
    pub async fn build_auth_url(&self) -> std::result::Result<Url, StoreError> {
        let _guard = self.flow_lock.lock().await;

        let state = generate_state();
        self.vault.begin_attempt(&state, None).await?;

        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "token")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect.redirect_uri())
            .append_pair("scope", &self.config.scope)
            .append_pair("expires_in", &self.config.token_lifetime_secs.to_string())
            .append_pair("state", &state);

        info!(native = self.config.redirect.is_native(), "Authorization requested");
        Ok(url)
    }

    /// Authorization-code URL with a PKCE S256 challenge; persists the nonce
    /// and the verifier.
    ///
    /// # Errors
    /// The nonce or verifier could not be stored.
    pub async fn build_code_auth_url(&self) -> std::result::Result<Url, StoreError> {
        let _guard = self.flow_lock.lock().await;

        let pkce = PkceChallenge::generate();
        self.vault.begin_attempt(&pkce.state, Some(&pkce.code_verifier)).await?;

        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect.redirect_uri())
            .append_pair("scope", &self.config.scope)
            .append_pair("code_challenge", &pkce.code_challenge)
            .append_pair("code_challenge_method", pkce.challenge_method())
            .append_pair("state", &pkce.state);

        info!("Authorization (code flow) requested");
        Ok(url)
    }

    /// Validate an implicit-flow redirect and persist its session.
    ///
    /// # Errors
    /// See [`TokenExtractionError`]. The store is not written on failure.
    pub async fn extract_token(
        &self,
        redirect: &Url,
    ) -> std::result::Result<Session, TokenExtractionError> {
        let _guard = self.flow_lock.lock().await;

        let pending = self.vault.pending_state().await?;
        let session = self.extract_with(redirect, pending.as_deref()).await?;

        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    async fn extract_with(
        &self,
        redirect: &Url,
        expected_state: Option<&str>,
    ) -> std::result::Result<Session, TokenExtractionError> {
        let params =
            RedirectParams::from_fragment(redirect).ok_or(TokenExtractionError::MissingFragment)?;
        verify_state(&params, expected_state)?;
        if let Some(denied) = params.denial() {
            return Err(denied);
        }

        let grant = ImplicitGrant::from_params(&params)?;
        ensure_scope(&self.config.scope, &grant.scope)?;

        let session = Session::issued(
            grant.access_token,
            grant.user_id,
            grant.expires_in,
            Some(grant.scope),
            Utc::now(),
        );
        self.vault.save_session(&session).await?;
        Ok(session)
    }

    /// Complete the code flow from a redirect carrying `code` and `state` in
    /// its query.
    ///
    /// # Errors
    /// Same validation failures as [`extract_token`](Self::extract_token),
    /// plus `Exchange` when the token endpoint call fails.
    pub async fn exchange_code(
        &self,
        redirect: &Url,
    ) -> std::result::Result<Session, TokenExtractionError> {
        let _guard = self.flow_lock.lock().await;

        let params = RedirectParams::from_query(redirect);
        let expected = self.vault.pending_state().await?;
        verify_state(&params, expected.as_deref())?;
        if let Some(denied) = params.denial() {
            return Err(denied);
        }
        let code = params.required("code")?;

        let verifier =
            self.vault.code_verifier().await?.ok_or(TokenExtractionError::NoPendingState)?;

        let tokens = self.client.exchange_code(code, &verifier).await?;

        let scope = tokens.scope.clone().unwrap_or_else(|| self.config.scope.clone());
        ensure_scope(&self.config.scope, &scope)?;
        if tokens.access_token.is_empty() {
            return Err(TokenExtractionError::MissingField("access_token"));
        }
        let user_id = tokens
            .user_id
            .filter(|id| !id.is_empty())
            .ok_or(TokenExtractionError::MissingField("user_id"))?;

        let session =
            Session::issued(tokens.access_token, user_id, tokens.expires_in, Some(scope), Utc::now());
        self.vault.save_session(&session).await?;

        info!(user_id = %session.user_id, "Signed in (code flow)");
        Ok(session)
    }

    /// Online status check against the introspection endpoint.
    pub async fn authentication_status(&self) -> AuthenticationStatus {
        let Some(token) = self.get_access_token().await else {
            debug!("No usable access token, skipping introspection");
            return AuthenticationStatus::NotAuthenticated;
        };

        match self.client.introspect(&token).await {
            Ok(introspection) if introspection.active => AuthenticationStatus::Authenticated,
            Ok(_) => {
                info!("Provider reports token inactive");
                AuthenticationStatus::NotAuthenticated
            }
            Err(e) => {
                warn!(error = %e, "Token introspection failed");
                AuthenticationStatus::NotAuthenticated
            }
        }
    }

    /// Offline status: a valid stored session, else `SigningIn` while a
    /// nonce is pending.
    pub async fn local_status(&self) -> AuthenticationStatus {
        if self.get_access_token().await.is_some() {
            AuthenticationStatus::Authenticated
        } else if self.has_pending_login().await {
            AuthenticationStatus::SigningIn
        } else {
            AuthenticationStatus::NotAuthenticated
        }
    }

    pub async fn get_access_token(&self) -> Option<String> {
        let token = match self.vault.access_token().await {
            Ok(token) => token?,
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                return None;
            }
        };

        match self.vault.expires_at().await {
            Ok(Some(expires_at)) if Utc::now() >= expires_at => {
                debug!(%expires_at, "Stored access token expired");
                None
            }
            Ok(_) => Some(token),
            Err(e) => {
                warn!(error = %e, "Failed to read token expiry");
                None
            }
        }
    }

    pub async fn get_active_user(&self) -> Option<String> {
        self.vault.user_id().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read active user");
            None
        })
    }

    /// The stored session if it is still valid
    pub async fn session(&self) -> Option<Session> {
        match self.vault.load_session().await {
            Ok(session) => session.filter(Session::is_valid),
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                None
            }
        }
    }

    pub async fn has_pending_login(&self) -> bool {
        matches!(self.vault.pending_state().await, Ok(Some(_)))
    }

    /// Abandon an outstanding authorization request.
    pub async fn cancel_login(&self) {
        let _guard = self.flow_lock.lock().await;
        match self.vault.clear_attempt().await {
            Ok(()) => debug!("Pending authorization cancelled"),
            Err(e) => warn!(error = %e, "Failed to clear pending authorization"),
        }
    }

    /// Revoke the current token (best effort) and clear every session key.
    pub async fn logout(&self) {
        let _guard = self.flow_lock.lock().await;

        match self.vault.access_token().await {
            Ok(Some(token)) => match self.client.revoke(&token).await {
                Ok(()) => debug!("Access token revoked"),
                Err(e) => warn!(error = %e, "Token revocation failed, clearing session anyway"),
            },
            Ok(None) => debug!("No access token to revoke"),
            Err(e) => warn!(error = %e, "Failed to read access token for revocation"),
        }

        if let Err(e) = self.vault.clear_all().await {
            warn!(error = %e, "Failed to clear session keys");
        }
        info!("Signed out");
    }
}

/// CSRF check, run before anything else in a redirect is trusted. An
/// absent `state` counts as a mismatch.
fn verify_state(
    params: &RedirectParams,
    expected: Option<&str>,
) -> std::result::Result<(), TokenExtractionError> {
    let expected = expected.ok_or(TokenExtractionError::NoPendingState)?;
    if validate_state(expected, params.get("state").unwrap_or_default()) {
        Ok(())
    } else {
        Err(TokenExtractionError::StateMismatch)
    }
}

#[async_trait]
impl<C, S> AuthProvider for AuthSessionManager<C, S>
where
    C: ProviderClientTrait,
    S: SessionStore,
{
    async fn build_auth_url(&self) -> std::result::Result<Url, StoreError> {
        Self::build_auth_url(self).await
    }

    async fn extract_token(
        &self,
        redirect: &Url,
    ) -> std::result::Result<Session, TokenExtractionError> {
        Self::extract_token(self, redirect).await
    }

    async fn authentication_status(&self) -> AuthenticationStatus {
        Self::authentication_status(self).await
    }

    async fn logout(&self) {
        Self::logout(self).await;
    }

    async fn get_access_token(&self) -> Option<String> {
        Self::get_access_token(self).await
    }

    async fn get_active_user(&self) -> Option<String> {
        Self::get_active_user(self).await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::service. Flow-level scenarios live in
    //! `tests/auth_session.rs`.
    use mealscribe_domain::RedirectTarget;

    use super::*;
    use crate::auth::{MemorySessionStore, SessionKey};
    use crate::testing::MockProviderClient;

    fn config() -> ProviderConfig {
        ProviderConfig::new(
            "23ABCD",
            RedirectTarget::Native { scheme: "mealscribe".into(), path: "auth".into() },
        )
    }

    fn manager() -> AuthSessionManager<MockProviderClient, MemorySessionStore> {
        AuthSessionManager::new(config(), MockProviderClient::new(), Arc::new(MemorySessionStore::new()))
            .unwrap()
    }

    /// Validates `AuthSessionManager::build_auth_url` behavior for the
    /// implicit-flow query.
    ///
    /// Assertions:
    /// - Confirms response type, client id, redirect URI, scope and lifetime.
    /// - Confirms the `state` parameter equals the persisted nonce.
    #[tokio::test]
    async fn test_build_auth_url_persists_nonce() {
        let manager = manager();
        let url = manager.build_auth_url().await.unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("www.fitbit.com"));
        assert_eq!(query["response_type"], "token");
        assert_eq!(query["client_id"], "23ABCD");
        assert_eq!(query["redirect_uri"], "mealscribe://auth");
        assert_eq!(query["scope"], "nutrition");
        assert_eq!(query["expires_in"], "86400");

        let stored = manager.vault.store().get(SessionKey::State.as_str()).await.unwrap();
        assert_eq!(stored.as_deref(), Some(query["state"].as_str()));
    }

    #[tokio::test]
    async fn test_nonce_is_never_reused() {
        let manager = manager();
        let first = manager.build_auth_url().await.unwrap();
        let second = manager.build_auth_url().await.unwrap();

        let state = |url: &Url| url.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.into_owned());
        assert_ne!(state(&first), state(&second));
    }

    #[tokio::test]
    async fn test_browser_redirect_uses_origin() {
        let config = ProviderConfig::new(
            "23ABCD",
            RedirectTarget::Browser { origin: "http://localhost:8100/".into() },
        );
        let manager = AuthSessionManager::new(
            config,
            MockProviderClient::new(),
            Arc::new(MemorySessionStore::new()),
        )
        .unwrap();

        let url = manager.build_auth_url().await.unwrap();
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "redirect_uri" && v == "http://localhost:8100"));
    }

    #[test]
    fn test_new_rejects_malformed_authorize_url() {
        let mut config = config();
        config.authorize_url = "not a url".into();
        let result =
            AuthSessionManager::new(config, MockProviderClient::new(), Arc::new(MemorySessionStore::new()));
        assert!(matches!(result, Err(MealscribeError::Config(_))));
    }

    #[tokio::test]
    async fn test_local_status_reports_signing_in() {
        let manager = manager();
        assert_eq!(manager.local_status().await, AuthenticationStatus::NotAuthenticated);

        manager.build_auth_url().await.unwrap();
        assert_eq!(manager.local_status().await, AuthenticationStatus::SigningIn);

        manager.cancel_login().await;
        assert!(!manager.has_pending_login().await);
    }

    /// Validates `AuthSessionManager::build_code_auth_url` behavior for the
    /// PKCE parameters.
    ///
    /// Assertions:
    /// - Confirms the challenge is the S256 hash of the stored verifier.
    #[tokio::test]
    async fn test_code_auth_url_carries_pkce_challenge() {
        let manager = manager();
        let url = manager.build_code_auth_url().await.unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        let verifier = manager.vault.code_verifier().await.unwrap().unwrap();
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["code_challenge"], crate::auth::pkce::generate_code_challenge(&verifier));
    }
}
