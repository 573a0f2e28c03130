//! Request executor
//!
//! Every Ad Manager call goes through [`HttpClient::request`]: the rate
//! limiter is awaited, the bearer token applied, and transient failures
//! (timeouts, connect errors, 429, 5xx gateway statuses) are retried with
//! backoff. Any other response is handed back untouched.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::types::BackoffType;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Executor settings
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Prefix for relative resource paths
    pub base_url: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Upper bound for any retry delay, including `Retry-After`
    pub max_backoff: Duration,
    pub backoff_type: BackoffType,
    /// `None` disables rate limiting
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
        }
    }
}

impl HttpClientConfig {
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Query string and JSON body of one call
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge query parameters, typically a paginator's page params
    #[must_use]
    pub fn queries(mut self, params: HashMap<String, String>) -> Self {
        self.query.extend(params);
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Result of a single attempt
enum Attempt {
    Done(Response),
    Retry { delay: Duration, reason: String },
    Fail(Error),
}

/// Rate-limited, retrying executor holding the credential
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Unauthenticated executor
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        })
    }

    /// Executor that attaches a bearer token to every request
    pub fn with_auth(config: HttpClientConfig, authenticator: Authenticator) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.authenticator = Some(authenticator);
        Ok(client)
    }

    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    pub async fn get_with_config(&self, path: &str, config: RequestConfig) -> Result<Response> {
        self.request(Method::GET, path, config).await
    }

    pub async fn post_with_config(&self, path: &str, config: RequestConfig) -> Result<Response> {
        self.request(Method::POST, path, config).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json_with_config(path, RequestConfig::new()).await
    }

    pub async fn get_json_with_config<T: DeserializeOwned>(
        &self,
        path: &str,
        config: RequestConfig,
    ) -> Result<T> {
        read_json(self.request(Method::GET, path, config).await?).await
    }

    pub async fn post_json_with_config<T: DeserializeOwned>(
        &self,
        path: &str,
        config: RequestConfig,
    ) -> Result<T> {
        read_json(self.request(Method::POST, path, config).await?).await
    }

    /// Execute a call, retrying transient failures
    ///
    /// Errors once retries are exhausted. Credential failures are returned
    /// on the first attempt. A 4xx response is `Ok`.
    pub async fn request(&self, method: Method, path: &str, config: RequestConfig) -> Result<Response> {
        let url = self.build_url(path);
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let sent = self.prepare(method.clone(), &url, &config).await?.send().await;
            let last = attempt >= self.config.max_retries;

            match self.assess(sent, attempt, last).await {
                Attempt::Done(response) => {
                    debug!(%method, %url, status = response.status().as_u16(), "Request completed");
                    return Ok(response);
                }
                Attempt::Fail(error) => return Err(error),
                Attempt::Retry { delay, reason } => {
                    warn!(
                        %method,
                        %url,
                        attempt = attempt + 1,
                        max_attempts,
                        ?delay,
                        "{}, retrying",
                        reason
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn prepare(&self, method: Method, url: &str, config: &RequestConfig) -> Result<RequestBuilder> {
        let mut request = self.client.request(method, url);
        if !config.query.is_empty() {
            request = request.query(&config.query);
        }
        if let Some(body) = &config.body {
            request = request.json(body);
        }
        match &self.authenticator {
            Some(auth) => auth.apply(request).await,
            None => Ok(request),
        }
    }

    async fn assess(&self, sent: reqwest::Result<Response>, attempt: u32, last: bool) -> Attempt {
        let response = match sent {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                if last {
                    return Attempt::Fail(Error::Timeout {
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    });
                }
                return Attempt::Retry {
                    delay: self.calculate_backoff(attempt),
                    reason: "Request timed out".to_string(),
                };
            }
            Err(e) if e.is_connect() && !last => {
                return Attempt::Retry {
                    delay: self.calculate_backoff(attempt),
                    reason: format!("Connection failed: {e}"),
                };
            }
            Err(e) => return Attempt::Fail(Error::Http(e)),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = retry_after(&response).min(self.config.max_backoff);
            if last {
                return Attempt::Fail(Error::RateLimited {
                    retry_after_seconds: wait.as_secs(),
                });
            }
            return Attempt::Retry {
                delay: wait,
                reason: "Rate limited (429)".to_string(),
            };
        }

        if is_retryable_status(status) && !last {
            return Attempt::Retry {
                delay: self.calculate_backoff(attempt),
                reason: format!("Server returned {}", status.as_u16()),
            };
        }

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Attempt::Fail(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Attempt::Done(response)
    }

    /// Resolve a resource path against the base URL; absolute URLs pass through
    pub(crate) fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }

    /// Delay before retry number `attempt + 1`, capped at `max_backoff`
    pub(crate) fn calculate_backoff(&self, attempt: u32) -> Duration {
        let initial = self.config.initial_backoff;
        let delay = match self.config.backoff_type {
            BackoffType::Constant => initial,
            BackoffType::Linear => initial * (attempt + 1),
            BackoffType::Exponential => initial * 2u32.saturating_pow(attempt),
        };
        delay.min(self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Decode a JSON body; a non-success status becomes `HttpStatus`
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await.map_err(Error::Http)?;

    if !status.is_success() {
        return Err(Error::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::malformed(url, e.to_string()))
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status.as_u16(),
        429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// `Retry-After` in seconds, 60 when absent or unparseable
fn retry_after(response: &Response) -> Duration {
    let seconds = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);
    Duration::from_secs(seconds)
}
