//! Session types for the nutrition provider's OAuth 2.0 implicit flow
//!
//! A [`Session`] is the only credential the app holds. It is created from a
//! redirect fragment, persisted through a [`SessionStore`](super::SessionStore)
//! under the keys in [`SessionKey`], and destroyed as a whole.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use mealscribe_domain::constants::TOKEN_EXPIRY_MARGIN_SECS;

/// Authenticated session with the nutrition provider
///
/// Valid iff the access token is non-empty and `now < expires_at`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer credential
    pub access_token: String,

    /// Provider-assigned user id
    pub user_id: String,

    /// Absolute expiry, already shortened by the safety margin
    pub expires_at: DateTime<Utc>,

    /// Granted scope as reported by the provider (informational)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Session {
    /// Build a session from a freshly issued token.
    ///
    /// `expires_at` is `issued_at + expires_in - 30s` so callers stop using
    /// the token a little before the provider does.
    #[must_use]
    pub fn issued(
        access_token: impl Into<String>,
        user_id: impl Into<String>,
        expires_in: u64,
        scope: Option<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = i64::try_from(expires_in)
            .ok()
            .and_then(|secs| Duration::try_seconds(secs - TOKEN_EXPIRY_MARGIN_SECS))
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self { access_token: access_token.into(), user_id: user_id.into(), expires_at, scope }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && now < self.expires_at
    }

    /// Seconds until expiry; negative once expired
    #[must_use]
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

// Tokens never reach logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Authentication state as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationStatus {
    NotAuthenticated,
    Authenticated,
    /// An authorization request is outstanding (a nonce is pending)
    SigningIn,
}

impl AuthenticationStatus {
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for AuthenticationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::Authenticated => "authenticated",
            Self::SigningIn => "signing_in",
        };
        f.write_str(label)
    }
}

/// Store keys owned by the auth manager
///
/// All keys share the `fitbit.` namespace and are always cleared together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    State,
    CodeVerifier,
    UserId,
    AccessToken,
    ExpiresAt,
    Scope,
}

impl SessionKey {
    pub const ALL: [Self; 6] = [
        Self::State,
        Self::CodeVerifier,
        Self::UserId,
        Self::AccessToken,
        Self::ExpiresAt,
        Self::Scope,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "fitbit.state",
            Self::CodeVerifier => "fitbit.code_verifier",
            Self::UserId => "fitbit.user_id",
            Self::AccessToken => "fitbit.access_token",
            Self::ExpiresAt => "fitbit.expires_at",
            Self::Scope => "fitbit.scope",
        }
    }

    /// Every key as a string slice, for batch removal
    #[must_use]
    pub fn all_keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|key| key.as_str()).collect()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response from the provider's token introspection endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenIntrospection {
    pub active: bool,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    /// Expiry as epoch milliseconds
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Response from the provider's token endpoint (authorization-code flow)
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("user_id", &self.user_id)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
