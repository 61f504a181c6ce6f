//! Integration tests for the auth session manager
//!
//! Exercises the implicit flow end to end against mock stores, the mock
//! provider client and a wiremock-backed provider.

use std::sync::Arc;

use chrono::{Duration, Utc};
use mealscribe_common::auth::{
    AuthProvider, AuthSessionManager, AuthenticationStatus, MemorySessionStore, SessionKey,
    TokenExtractionError, TokenResponse,
};
use mealscribe_common::testing::{
    code_redirect, implicit_redirect, IntrospectionScript, MockProviderClient, MockSessionStore,
};
use mealscribe_domain::{ProviderConfig, RedirectTarget};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type MockManager = AuthSessionManager<MockProviderClient, MockSessionStore>;

fn provider_config() -> ProviderConfig {
    ProviderConfig::new(
        "23ABCD",
        RedirectTarget::Native { scheme: "mealscribe".into(), path: "auth".into() },
    )
}

fn manager_with(client: MockProviderClient, store: MockSessionStore) -> MockManager {
    AuthSessionManager::new(provider_config(), client, Arc::new(store)).unwrap()
}

fn state_of(url: &Url) -> String {
    url.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.into_owned()).unwrap()
}

fn seeded_session(expires_in_secs: i64) -> MockSessionStore {
    let expires_at = Utc::now() + Duration::seconds(expires_in_secs);
    MockSessionStore::with_entries([
        (SessionKey::AccessToken.as_str(), "stored-token".to_string()),
        (SessionKey::UserId.as_str(), "ABC123".to_string()),
        (SessionKey::ExpiresAt.as_str(), expires_at.timestamp_millis().to_string()),
    ])
}

/// Validates the happy-path implicit flow against the mock provider.
///
/// Assertions:
/// - Confirms the session carries the fragment's token and user id.
/// - Confirms `expires_at` is `now + expires_in - 30s` within tolerance.
/// - Ensures the nonce is consumed and the session keys are stored.
#[tokio::test]
async fn test_extract_token_persists_session() {
    let store = MockSessionStore::new();
    let manager = manager_with(MockProviderClient::new(), store.clone());

    let auth_url = manager.build_auth_url().await.unwrap();
    let redirect =
        implicit_redirect(&state_of(&auth_url)).with("access_token", "fresh-token").build();

    let before = Utc::now();
    let session = manager.extract_token(&redirect).await.unwrap();
    let after = Utc::now();

    assert_eq!(session.access_token, "fresh-token");
    assert_eq!(session.user_id, "ABC123");
    assert!(session.expires_at >= before + Duration::seconds(86_400 - 30));
    assert!(session.expires_at <= after + Duration::seconds(86_400 - 30));

    assert_eq!(store.value(SessionKey::AccessToken.as_str()).as_deref(), Some("fresh-token"));
    assert_eq!(store.value(SessionKey::UserId.as_str()).as_deref(), Some("ABC123"));
    assert_eq!(store.value(SessionKey::State.as_str()), None);
    assert_eq!(manager.get_active_user().await.as_deref(), Some("ABC123"));
}

/// Validates that a redirect with a foreign `state` is rejected.
///
/// Assertions:
/// - Ensures `StateMismatch` is returned.
/// - Ensures no store write happens during extraction.
#[tokio::test]
async fn test_state_mismatch_writes_nothing() {
    let store = MockSessionStore::new();
    let manager = manager_with(MockProviderClient::new(), store.clone());
    manager.build_auth_url().await.unwrap();
    store.reset_write_count();

    let result = manager.extract_token(&implicit_redirect("forged-state").build()).await;

    assert!(matches!(result, Err(TokenExtractionError::StateMismatch)));
    assert_eq!(store.write_count(), 0);
    assert_eq!(manager.get_access_token().await, None);
}

/// Validates that incomplete fragments never leave partial sessions behind.
///
/// Assertions:
/// - Ensures a missing `access_token` and a missing `user_id` both fail.
/// - Ensures no session key is written in either case.
#[tokio::test]
async fn test_missing_fields_leave_no_partial_session() {
    let store = MockSessionStore::new();
    let manager = manager_with(MockProviderClient::new(), store.clone());
    let state = state_of(&manager.build_auth_url().await.unwrap());
    store.reset_write_count();

    for missing in ["access_token", "user_id"] {
        let redirect = implicit_redirect(&state).without(missing).build();
        let result = manager.extract_token(&redirect).await;
        assert!(
            matches!(result, Err(TokenExtractionError::MissingField(field)) if field == missing),
            "expected MissingField({missing}), got {result:?}"
        );
    }

    assert_eq!(store.write_count(), 0);
    assert_eq!(store.value(SessionKey::AccessToken.as_str()), None);
    assert_eq!(store.value(SessionKey::UserId.as_str()), None);
}

#[tokio::test]
async fn test_scope_mismatch_is_rejected() {
    let store = MockSessionStore::new();
    let manager = manager_with(MockProviderClient::new(), store.clone());
    let state = state_of(&manager.build_auth_url().await.unwrap());
    store.reset_write_count();

    let redirect = implicit_redirect(&state).with("scope", "nutrition activity").build();
    let result = manager.extract_token(&redirect).await;

    assert!(matches!(result, Err(TokenExtractionError::ScopeMismatch { .. })));
    assert_eq!(store.write_count(), 0);
}

/// Validates that a session is not kept when the nonce cannot be consumed.
///
/// Assertions:
/// - Ensures extraction fails with `Storage`.
/// - Ensures no token is readable afterwards and the nonce is still pending.
#[tokio::test]
async fn test_failed_nonce_consumption_persists_nothing() {
    let store = MockSessionStore::new();
    let manager = manager_with(MockProviderClient::new(), store.clone());
    let state = state_of(&manager.build_auth_url().await.unwrap());
    store.fail_removals(true);

    let result = manager.extract_token(&implicit_redirect(&state).build()).await;

    assert!(matches!(result, Err(TokenExtractionError::Storage(_))), "got {result:?}");
    store.fail_removals(false);
    assert_eq!(manager.get_access_token().await, None);
    assert_eq!(store.value(SessionKey::AccessToken.as_str()), None);
    assert_eq!(store.value(SessionKey::UserId.as_str()), None);
    assert_eq!(store.value(SessionKey::State.as_str()).as_deref(), Some(state.as_str()));
}

/// Validates that an `error=` redirect is trusted only after the CSRF check.
///
/// Assertions:
/// - Ensures a denial with no login in progress fails with `NoPendingState`.
/// - Ensures a denial without the pending state fails with `StateMismatch`,
///   in both the implicit and the code flow.
/// - Ensures a denial carrying the pending state surfaces as `Denied`.
#[tokio::test]
async fn test_denial_is_checked_after_state() {
    let store = MockSessionStore::new();
    let manager = manager_with(MockProviderClient::new(), store.clone());
    let forged = Url::parse("mealscribe://auth#error=access_denied").unwrap();

    let result = manager.extract_token(&forged).await;
    assert!(matches!(result, Err(TokenExtractionError::NoPendingState)), "got {result:?}");

    let state = state_of(&manager.build_auth_url().await.unwrap());
    let result = manager.extract_token(&forged).await;
    assert!(matches!(result, Err(TokenExtractionError::StateMismatch)), "got {result:?}");

    let denied = Url::parse(&format!("mealscribe://auth#error=access_denied&state={state}")).unwrap();
    let result = manager.extract_token(&denied).await;
    assert!(
        matches!(result, Err(TokenExtractionError::Denied { ref error, .. }) if error == "access_denied"),
        "got {result:?}"
    );

    manager.build_code_auth_url().await.unwrap();
    let forged_code = Url::parse("mealscribe://auth?error=access_denied").unwrap();
    let result = manager.exchange_code(&forged_code).await;
    assert!(matches!(result, Err(TokenExtractionError::StateMismatch)), "got {result:?}");
    assert_eq!(store.value(SessionKey::AccessToken.as_str()), None);
}

/// Validates that a redirect can only be redeemed once.
///
/// Assertions:
/// - Ensures the first extraction succeeds.
/// - Ensures replaying the same redirect fails with `NoPendingState`.
#[tokio::test]
async fn test_replayed_redirect_fails() {
    let manager = manager_with(MockProviderClient::new(), MockSessionStore::new());
    let redirect = implicit_redirect(&state_of(&manager.build_auth_url().await.unwrap())).build();

    manager.extract_token(&redirect).await.unwrap();
    let replay = manager.extract_token(&redirect).await;

    assert!(matches!(replay, Err(TokenExtractionError::NoPendingState)));
}

#[tokio::test]
async fn test_extraction_without_pending_request_fails() {
    let manager = manager_with(MockProviderClient::new(), MockSessionStore::new());
    let result = manager.extract_token(&implicit_redirect("anything").build()).await;
    assert!(matches!(result, Err(TokenExtractionError::NoPendingState)));
}

#[tokio::test]
async fn test_store_write_failure_surfaces_as_storage_error() {
    let store = MockSessionStore::new();
    let manager = manager_with(MockProviderClient::new(), store.clone());
    let redirect = implicit_redirect(&state_of(&manager.build_auth_url().await.unwrap())).build();
    store.fail_writes(true);

    let result = manager.extract_token(&redirect).await;

    assert!(matches!(result, Err(TokenExtractionError::Storage(_))));
}

/// Validates that status checks skip the network without a token.
///
/// Assertions:
/// - Confirms `NotAuthenticated` is returned.
/// - Confirms the introspection endpoint was never called.
#[tokio::test]
async fn test_status_without_token_skips_introspection() {
    let client = MockProviderClient::new();
    let manager = manager_with(client.clone(), MockSessionStore::new());

    assert_eq!(manager.authentication_status().await, AuthenticationStatus::NotAuthenticated);
    assert_eq!(client.introspect_calls(), 0);
}

#[tokio::test]
async fn test_status_reflects_introspection_outcome() {
    for (script, expected) in [
        (IntrospectionScript::Active(true), AuthenticationStatus::Authenticated),
        (IntrospectionScript::Active(false), AuthenticationStatus::NotAuthenticated),
        (IntrospectionScript::Status(500), AuthenticationStatus::NotAuthenticated),
        (IntrospectionScript::Malformed, AuthenticationStatus::NotAuthenticated),
    ] {
        let client = MockProviderClient::new().with_introspection(script);
        let manager = manager_with(client.clone(), seeded_session(3600));

        assert_eq!(manager.authentication_status().await, expected, "script {script:?}");
        assert_eq!(client.introspect_calls(), 1);
    }
}

#[tokio::test]
async fn test_store_read_failure_reads_as_signed_out() {
    let store = seeded_session(3600);
    store.fail_reads(true);
    let client = MockProviderClient::new();
    let manager = manager_with(client.clone(), store);

    assert_eq!(manager.get_access_token().await, None);
    assert_eq!(manager.get_active_user().await, None);
    assert_eq!(manager.authentication_status().await, AuthenticationStatus::NotAuthenticated);
    assert_eq!(client.introspect_calls(), 0);
}

/// Validates that logout clears storage even when revocation fails.
///
/// Assertions:
/// - Confirms revoke was attempted with the stored token.
/// - Ensures every session key is gone afterwards.
#[tokio::test]
async fn test_logout_clears_store_when_revoke_fails() {
    let store = seeded_session(3600);
    let client = MockProviderClient::new().failing_revoke(503);
    let manager = manager_with(client.clone(), store.clone());
    manager.build_auth_url().await.unwrap();

    manager.logout().await;

    assert_eq!(client.revoked_tokens(), vec!["stored-token".to_string()]);
    assert!(store.is_empty());
    assert_eq!(manager.authentication_status().await, AuthenticationStatus::NotAuthenticated);
}

#[tokio::test]
async fn test_logout_without_token_skips_revoke() {
    let client = MockProviderClient::new();
    let manager = manager_with(client.clone(), MockSessionStore::new());

    manager.logout().await;

    assert_eq!(client.revoke_calls(), 0);
}

#[tokio::test]
async fn test_logout_tolerates_store_failure() {
    let store = seeded_session(3600);
    store.fail_writes(true);
    let manager = manager_with(MockProviderClient::new(), store.clone());

    manager.logout().await;

    assert!(!store.is_empty());
}

#[tokio::test]
async fn test_get_access_token_is_stable() {
    let manager = manager_with(MockProviderClient::new(), seeded_session(3600));

    let first = manager.get_access_token().await;
    let second = manager.get_access_token().await;

    assert_eq!(first.as_deref(), Some("stored-token"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_token_is_not_returned() {
    let manager = manager_with(MockProviderClient::new(), seeded_session(-60));

    assert_eq!(manager.get_access_token().await, None);
    assert!(manager.session().await.is_none());
    assert_eq!(manager.get_active_user().await.as_deref(), Some("ABC123"));
}

/// Validates startup cleanup of an expired session.
///
/// Assertions:
/// - Ensures `initialize` reports no session.
/// - Ensures every session key is removed.
/// - Confirms the status is `NotAuthenticated`.
#[tokio::test]
async fn test_initialize_clears_expired_session() {
    let store = seeded_session(-60);
    let manager = manager_with(MockProviderClient::new(), store.clone());

    assert!(!manager.initialize(None).await);
    assert!(store.is_empty());
    assert_eq!(manager.authentication_status().await, AuthenticationStatus::NotAuthenticated);
}

#[tokio::test]
async fn test_initialize_keeps_valid_session() {
    let store = seeded_session(3600);
    let manager = manager_with(MockProviderClient::new(), store.clone());

    assert!(manager.initialize(None).await);
    assert_eq!(store.write_count(), 0);
    assert!(manager.session().await.is_some());
}

/// Validates sign-in from the URL the app was launched with.
///
/// Assertions:
/// - Ensures the pending nonce survives the startup cleanup long enough to
///   validate the redirect.
/// - Confirms the resulting session is stored.
#[tokio::test]
async fn test_initialize_extracts_launch_redirect() {
    let store = MockSessionStore::new();
    let manager = manager_with(MockProviderClient::new(), store.clone());
    let state = state_of(&manager.build_auth_url().await.unwrap());
    let launch = implicit_redirect(&state).base("http://localhost:8100/").build();

    assert!(manager.initialize(Some(&launch)).await);
    assert_eq!(manager.get_access_token().await.as_deref(), Some("test-access-token"));
    assert!(!manager.has_pending_login().await);
}

#[tokio::test]
async fn test_initialize_rejects_forged_launch_redirect() {
    let store = MockSessionStore::new();
    let manager = manager_with(MockProviderClient::new(), store.clone());
    manager.build_auth_url().await.unwrap();

    let launch = implicit_redirect("forged").build();

    assert!(!manager.initialize(Some(&launch)).await);
    assert!(store.is_empty());
}

/// Validates the PKCE code flow against the mock provider.
///
/// Assertions:
/// - Confirms the stored verifier is sent with the code.
/// - Confirms the exchanged token becomes the current session.
#[tokio::test]
async fn test_code_flow_exchange() {
    let client = MockProviderClient::new().with_token_response(TokenResponse {
        access_token: "code-token".into(),
        token_type: "Bearer".into(),
        expires_in: 28_800,
        scope: Some("nutrition".into()),
        user_id: Some("ABC123".into()),
        refresh_token: None,
    });
    let store = MockSessionStore::new();
    let manager = manager_with(client.clone(), store.clone());

    let auth_url = manager.build_code_auth_url().await.unwrap();
    let verifier = store.value(SessionKey::CodeVerifier.as_str()).unwrap();
    let redirect = code_redirect("mealscribe://auth", "the-code", &state_of(&auth_url));

    let session = manager.exchange_code(&redirect).await.unwrap();

    assert_eq!(session.access_token, "code-token");
    assert_eq!(client.exchanged(), vec![("the-code".to_string(), verifier)]);
    assert_eq!(store.value(SessionKey::CodeVerifier.as_str()), None);
    assert_eq!(manager.get_access_token().await.as_deref(), Some("code-token"));
}

#[tokio::test]
async fn test_code_flow_exchange_failure() {
    let client = MockProviderClient::new();
    let manager = manager_with(client.clone(), MockSessionStore::new());
    let auth_url = manager.build_code_auth_url().await.unwrap();
    let redirect = code_redirect("mealscribe://auth", "bad-code", &state_of(&auth_url));

    let result = manager.exchange_code(&redirect).await;

    assert!(matches!(result, Err(TokenExtractionError::Exchange(_))));
    assert_eq!(manager.get_access_token().await, None);
}

#[tokio::test]
async fn test_code_flow_rejects_forged_state() {
    let client = MockProviderClient::new();
    let manager = manager_with(client.clone(), MockSessionStore::new());
    manager.build_code_auth_url().await.unwrap();

    let result =
        manager.exchange_code(&code_redirect("mealscribe://auth", "code", "forged")).await;

    assert!(matches!(result, Err(TokenExtractionError::StateMismatch)));
    assert_eq!(client.exchange_calls(), 0);
}

/// Validates the full flow against an HTTP provider.
///
/// Assertions:
/// - Confirms build URL, redirect and extraction lead to `Authenticated`
///   when introspection reports `{active: true}`.
/// - Confirms logout revokes over HTTP and signs out.
#[tokio::test]
async fn test_end_to_end_against_http_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1.1/oauth2/introspect"))
        .and(header("authorization", "Bearer e2e-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"active": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/revoke"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = provider_config().with_api_base_url(server.uri());
    let manager =
        AuthSessionManager::for_provider(config, Arc::new(MemorySessionStore::new())).unwrap();

    assert!(!manager.initialize(None).await);
    let auth_url = AuthProvider::build_auth_url(&manager).await.unwrap();
    let redirect = implicit_redirect(&state_of(&auth_url)).with("access_token", "e2e-token").build();

    AuthProvider::extract_token(&manager, &redirect).await.unwrap();
    assert_eq!(
        AuthProvider::authentication_status(&manager).await,
        AuthenticationStatus::Authenticated
    );

    AuthProvider::logout(&manager).await;
    assert_eq!(AuthProvider::get_access_token(&manager).await, None);
}
