//! HTTP client for the provider's OAuth endpoints
//!
//! - `POST {api}/1.1/oauth2/introspect`: bearer auth, form field `token`
//! - `POST {api}/oauth2/revoke`: form fields `token`, `client_id`
//! - `POST {api}/oauth2/token`: authorization-code exchange with PKCE,
//!   public client (no secret)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tracing::debug;

use mealscribe_domain::constants::DEFAULT_HTTP_TIMEOUT_SECS;
use mealscribe_domain::ProviderConfig;

use super::traits::ProviderClientTrait;
use super::types::{TokenIntrospection, TokenResponse};

const INTROSPECT_PATH: &str = "/1.1/oauth2/introspect";
const REVOKE_PATH: &str = "/oauth2/revoke";
const TOKEN_PATH: &str = "/oauth2/token";
const MAX_ERROR_BODY: usize = 512;

/// Transport-level failures talking to the provider
#[derive(Debug, Error)]
pub enum ProviderClientError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

impl ProviderClientError {
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// reqwest-backed [`ProviderClientTrait`] implementation
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: Client,
    api_base: String,
    client_id: String,
    redirect_uri: String,
}

impl ProviderClient {
    /// Client with the default request timeout
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        Self::with_timeout(config, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn with_timeout(config: &ProviderConfig, timeout: Duration) -> Self {
        let http = Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new());
        Self::with_http_client(config, http)
    }

    /// Reuse an existing reqwest client (connection pool, proxy settings)
    #[must_use]
    pub fn with_http_client(config: &ProviderConfig, http: Client) -> Self {
        Self {
            http,
            api_base: config.api_base().to_string(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect.redirect_uri(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// # Errors
    /// See [`ProviderClientTrait::introspect`].
    pub async fn introspect(
        &self,
        access_token: &str,
    ) -> Result<TokenIntrospection, ProviderClientError> {
        let url = self.endpoint(INTROSPECT_PATH);
        debug!(url = %url, "Introspecting access token");

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .form(&[("token", access_token)])
            .send()
            .await?;

        // Only a plain 200 counts; other 2xx codes carry no introspection body
        if response.status() != StatusCode::OK {
            return Err(status_error(response).await);
        }

        response.json().await.map_err(|e| ProviderClientError::Decode(e.to_string()))
    }

    /// # Errors
    /// See [`ProviderClientTrait::revoke`].
    pub async fn revoke(&self, access_token: &str) -> Result<(), ProviderClientError> {
        let url = self.endpoint(REVOKE_PATH);
        debug!(url = %url, "Revoking access token");

        let response = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&[("token", access_token), ("client_id", self.client_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    /// # Errors
    /// See [`ProviderClientTrait::exchange_code`].
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, ProviderClientError> {
        let url = self.endpoint(TOKEN_PATH);
        debug!(url = %url, "Exchanging authorization code");

        let response = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.client_id.as_str()),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        response.json().await.map_err(|e| ProviderClientError::Decode(e.to_string()))
    }
}

async fn status_error(response: Response) -> ProviderClientError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    ProviderClientError::Status { status, body }
}

#[async_trait]
impl ProviderClientTrait for ProviderClient {
    async fn introspect(
        &self,
        access_token: &str,
    ) -> Result<TokenIntrospection, ProviderClientError> {
        self.introspect(access_token).await
    }

    async fn revoke(&self, access_token: &str) -> Result<(), ProviderClientError> {
        self.revoke(access_token).await
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, ProviderClientError> {
        self.exchange_code(code, code_verifier).await
    }
}
