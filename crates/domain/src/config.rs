//! Configuration structures
//!
//! Loaded by `mealscribe_infra::config` from environment variables or a
//! TOML/JSON file. Every optional field has a default so a minimal file only
//! needs the client id, the redirect target and the completion API key.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COMPLETION_MAX_TOKENS, DEFAULT_COMPLETION_MODEL, DEFAULT_COMPLETION_TEMPERATURE,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_KEYCHAIN_SERVICE, DEFAULT_TOKEN_LIFETIME_SECS,
    FITBIT_API_BASE_URL, FITBIT_AUTHORIZE_URL, FITBIT_DEFAULT_SCOPE,
    OPENAI_CHAT_COMPLETIONS_URL,
};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    pub completion: CompletionConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Where the provider sends the user back after authorization.
///
/// A native shell registers a custom URI scheme; a browser build redirects
/// to its own origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RedirectTarget {
    Native {
        scheme: String,
        #[serde(default = "default_native_path")]
        path: String,
    },
    Browser {
        origin: String,
    },
}

impl RedirectTarget {
    /// The `redirect_uri` sent to the provider.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        match self {
            Self::Native { scheme, path } => {
                format!("{}://{}", scheme, path.trim_start_matches('/'))
            }
            Self::Browser { origin } => origin.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Native { .. })
    }
}

fn default_native_path() -> String {
    "auth".to_string()
}

/// Nutrition provider (Fitbit) OAuth and API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    pub redirect: RedirectTarget,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Lifetime hint sent as `expires_in` on the authorization request
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: u64,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect: RedirectTarget) -> Self {
        Self {
            client_id: client_id.into(),
            redirect,
            scope: default_scope(),
            authorize_url: default_authorize_url(),
            api_base_url: default_api_base_url(),
            token_lifetime_secs: default_token_lifetime(),
        }
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Base API URL without a trailing slash
    #[must_use]
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

fn default_scope() -> String {
    FITBIT_DEFAULT_SCOPE.to_string()
}

fn default_authorize_url() -> String {
    FITBIT_AUTHORIZE_URL.to_string()
}

fn default_api_base_url() -> String {
    FITBIT_API_BASE_URL.to_string()
}

const fn default_token_lifetime() -> u64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

/// Language-completion service settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_completion_url")]
    pub api_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl CompletionConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            api_url: default_completion_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

// Keeps the API key out of logs
impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

fn default_model() -> String {
    DEFAULT_COMPLETION_MODEL.to_string()
}

fn default_completion_url() -> String {
    OPENAI_CHAT_COMPLETIONS_URL.to_string()
}

const fn default_max_tokens() -> u32 {
    DEFAULT_COMPLETION_MAX_TOKENS
}

const fn default_temperature() -> f32 {
    DEFAULT_COMPLETION_TEMPERATURE
}

/// Outbound HTTP settings shared by every client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Total attempts per request (initial try + retries)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout(), max_attempts: default_max_attempts() }
    }
}

const fn default_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

const fn default_max_attempts() -> usize {
    2
}

/// Session persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_keychain_service")]
    pub keychain_service: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { keychain_service: default_keychain_service() }
    }
}

fn default_keychain_service() -> String {
    DEFAULT_KEYCHAIN_SERVICE.to_string()
}
