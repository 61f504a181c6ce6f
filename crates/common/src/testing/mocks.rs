//! Mock implementations of the auth traits
//!
//! All mocks are cheap to clone and share state between clones, so a test
//! can keep a handle after moving one into a manager.

// Mocks are simple; errors are clear from their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use crate::auth::{
    AuthProvider, AuthenticationStatus, ProviderClientError, ProviderClientTrait, Session,
    SessionStore, StoreError, TokenExtractionError, TokenIntrospection, TokenResponse,
};

type StorageData = Arc<Mutex<HashMap<String, String>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory session store with failure injection and write counting
///
/// # Examples
///
/// ```
/// use mealscribe_common::auth::SessionStore;
/// use mealscribe_common::testing::MockSessionStore;
///
/// # tokio_test_block(async {
/// let store = MockSessionStore::new();
/// store.set("fitbit.user_id", "ABC123").await.unwrap();
/// assert_eq!(store.write_count(), 1);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    storage: StorageData,
    writes: Arc<AtomicUsize>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    fail_removals: Arc<AtomicBool>,
}

impl MockSessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`; the seed does not count as writes
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        lock(&store.storage).extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        store
    }

    /// Make every read fail with `StoreError::Unavailable`
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every mutation fail with `StoreError::Unavailable`
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every batch that deletes a key fail; plain writes still succeed
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    /// Successful mutating calls so far (a batch counts once)
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_write_count(&self) {
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Direct read that bypasses failure injection
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        lock(&self.storage).get(key).cloned()
    }

    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        lock(&self.storage).clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.storage).is_empty()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    fn check_removal(&self) -> Result<(), StoreError> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected removal failure".into()));
        }
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut HashMap<String, String>)) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        apply(&mut lock(&self.storage));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_read()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.mutate(|storage| {
            storage.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_removal()?;
        self.mutate(|storage| {
            storage.remove(key);
        })
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        self.mutate(|storage| {
            for (key, value) in entries {
                storage.insert((*key).to_string(), value.clone());
            }
        })
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.check_removal()?;
        self.mutate(|storage| {
            for key in keys {
                storage.remove(*key);
            }
        })
    }

    async fn apply(&self, set: &[(&str, String)], remove: &[&str]) -> Result<(), StoreError> {
        if !remove.is_empty() {
            self.check_removal()?;
        }
        self.mutate(|storage| {
            for (key, value) in set {
                storage.insert((*key).to_string(), value.clone());
            }
            for key in remove {
                storage.remove(*key);
            }
        })
    }
}

/// Scripted introspection outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrospectionScript {
    Active(bool),
    /// Respond with this non-200 status
    Status(u16),
    /// Respond 200 with an undecodable body
    Malformed,
}

/// Provider client double with call counters
#[derive(Debug, Clone)]
pub struct MockProviderClient {
    introspection: Arc<Mutex<IntrospectionScript>>,
    revoke_failure: Arc<Mutex<Option<u16>>>,
    token_response: Arc<Mutex<Option<TokenResponse>>>,
    introspect_calls: Arc<AtomicUsize>,
    revoke_calls: Arc<AtomicUsize>,
    exchange_calls: Arc<AtomicUsize>,
    revoked_tokens: Arc<Mutex<Vec<String>>>,
    exchanged: Arc<Mutex<Vec<(String, String)>>>,
}

impl Default for MockProviderClient {
    fn default() -> Self {
        Self {
            introspection: Arc::new(Mutex::new(IntrospectionScript::Active(true))),
            revoke_failure: Arc::default(),
            token_response: Arc::default(),
            introspect_calls: Arc::default(),
            revoke_calls: Arc::default(),
            exchange_calls: Arc::default(),
            revoked_tokens: Arc::default(),
            exchanged: Arc::default(),
        }
    }
}

impl MockProviderClient {
    /// Client that reports tokens active and revokes successfully
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_introspection(self, script: IntrospectionScript) -> Self {
        *lock(&self.introspection) = script;
        self
    }

    /// Make revocation fail with `status`
    #[must_use]
    pub fn failing_revoke(self, status: u16) -> Self {
        *lock(&self.revoke_failure) = Some(status);
        self
    }

    /// Response for `exchange_code`; without one the exchange fails with 400
    #[must_use]
    pub fn with_token_response(self, response: TokenResponse) -> Self {
        *lock(&self.token_response) = Some(response);
        self
    }

    #[must_use]
    pub fn introspect_calls(&self) -> usize {
        self.introspect_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn revoked_tokens(&self) -> Vec<String> {
        lock(&self.revoked_tokens).clone()
    }

    /// `(code, code_verifier)` pairs passed to `exchange_code`
    #[must_use]
    pub fn exchanged(&self) -> Vec<(String, String)> {
        lock(&self.exchanged).clone()
    }
}

#[async_trait]
impl ProviderClientTrait for MockProviderClient {
    async fn introspect(
        &self,
        _access_token: &str,
    ) -> Result<TokenIntrospection, ProviderClientError> {
        self.introspect_calls.fetch_add(1, Ordering::SeqCst);
        match *lock(&self.introspection) {
            IntrospectionScript::Active(active) => {
                Ok(TokenIntrospection { active, ..TokenIntrospection::default() })
            }
            IntrospectionScript::Status(status) => {
                Err(ProviderClientError::Status { status, body: String::new() })
            }
            IntrospectionScript::Malformed => {
                Err(ProviderClientError::Decode("expected value at line 1".into()))
            }
        }
    }

    async fn revoke(&self, access_token: &str) -> Result<(), ProviderClientError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.revoked_tokens).push(access_token.to_string());
        match *lock(&self.revoke_failure) {
            Some(status) => Err(ProviderClientError::Status { status, body: String::new() }),
            None => Ok(()),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, ProviderClientError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.exchanged).push((code.to_string(), code_verifier.to_string()));
        lock(&self.token_response).clone().ok_or_else(|| ProviderClientError::Status {
            status: 400,
            body: r#"{"errors":[{"errorType":"invalid_grant"}]}"#.into(),
        })
    }
}

/// Auth provider double holding a fixed session
///
/// API clients under test read the token through [`AuthProvider`]; this
/// mock lets them run without a store or a provider round trip.
#[derive(Debug, Clone, Default)]
pub struct MockAuthProvider {
    session: Arc<Mutex<Option<(String, String)>>>,
    token_reads: Arc<AtomicUsize>,
    logged_out: Arc<AtomicBool>,
}

impl MockAuthProvider {
    /// Provider without a session
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn signed_in(access_token: impl Into<String>, user_id: impl Into<String>) -> Self {
        let mock = Self::default();
        *lock(&mock.session) = Some((access_token.into(), user_id.into()));
        mock
    }

    /// Number of `get_access_token` calls
    #[must_use]
    pub fn token_reads(&self) -> usize {
        self.token_reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn build_auth_url(&self) -> Result<Url, StoreError> {
        Url::parse("https://www.fitbit.com/oauth2/authorize?response_type=token")
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    async fn extract_token(&self, _redirect: &Url) -> Result<Session, TokenExtractionError> {
        let (token, user_id) =
            lock(&self.session).clone().ok_or(TokenExtractionError::NoPendingState)?;
        Ok(Session::issued(token, user_id, 3600, None, Utc::now()))
    }

    async fn authentication_status(&self) -> AuthenticationStatus {
        if lock(&self.session).is_some() {
            AuthenticationStatus::Authenticated
        } else {
            AuthenticationStatus::NotAuthenticated
        }
    }

    async fn logout(&self) {
        self.logged_out.store(true, Ordering::SeqCst);
        *lock(&self.session) = None;
    }

    async fn get_access_token(&self) -> Option<String> {
        self.token_reads.fetch_add(1, Ordering::SeqCst);
        lock(&self.session).as_ref().map(|(token, _)| token.clone())
    }

    async fn get_active_user(&self) -> Option<String> {
        lock(&self.session).as_ref().map(|(_, user_id)| user_id.clone())
    }
}
