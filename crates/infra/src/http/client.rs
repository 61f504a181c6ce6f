use std::time::Duration;

use mealscribe_domain::{HttpConfig, MealscribeError};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

const USER_AGENT: &str = concat!("mealscribe/", env!("CARGO_PKG_VERSION"));

/// HTTP client with built-in retry and timeout support.
///
/// Retries transport failures and 5xx responses with exponential backoff;
/// 4xx responses are returned to the caller untouched. Only idempotent
/// methods are retried: a POST that timed out may still have been applied
/// upstream, so it is sent exactly once.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// The TLS backend could not be initialised.
    pub fn new() -> Result<Self, MealscribeError> {
        Self::builder().build()
    }

    /// Client honouring the `[http]` config section.
    ///
    /// # Errors
    /// The TLS backend could not be initialised.
    pub fn from_config(config: &HttpConfig) -> Result<Self, MealscribeError> {
        Self::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// The underlying reqwest client, for components that manage their own
    /// requests.
    #[must_use]
    pub const fn inner(&self) -> &ReqwestClient {
        &self.client
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// # Errors
    /// `MealscribeError::Network` once every attempt failed at the transport
    /// level; `Internal` if the request cannot be built or cloned.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, MealscribeError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                MealscribeError::Internal(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let request = cloned_builder
                .build()
                .map_err(|err| MealscribeError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let retryable = is_idempotent(&method);
            // Query strings may carry search terms; log the path only
            let endpoint = format!(
                "{}{}",
                request.url().origin().ascii_serialization(),
                request.url().path()
            );
            debug!(attempt = attempt + 1, %method, url = %endpoint, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(
                        attempt = attempt + 1,
                        %method,
                        url = %endpoint,
                        %status,
                        "received HTTP response"
                    );

                    if retryable && status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(
                        attempt = attempt + 1,
                        %method,
                        url = %endpoint,
                        error = %err,
                        "HTTP request failed"
                    );

                    if retryable && attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(InfraError::from(err).into());
                }
            }
        }

        Err(MealscribeError::Internal(
            "http client exhausted retries without producing a result".into(),
        ))
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = u32::try_from(retry_number.saturating_sub(1).min(8)).unwrap_or(8);
        self.base_backoff.saturating_mul(1u32 << shift)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 2,
            base_backoff: Duration::from_millis(200),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    #[must_use]
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub const fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// # Errors
    /// The TLS backend could not be initialised.
    pub fn build(self) -> Result<HttpClient, MealscribeError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .build()
            .map_err(|err| MealscribeError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS)
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
