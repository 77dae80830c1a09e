//! HTTP client with retry and rate limiting
//!
//! Provides the OpenProject API client that handles:
//! - Basic authentication with the API key
//! - Base URL confinement of every request path
//! - Automatic retries with capped backoff
//! - Optional rate limiting
//! - JSON body parsing

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{is_retryable_status, is_transient_transport, Error, Result};
use crate::types::BackoffType;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default OpenProject API root
pub const DEFAULT_BASE_URL: &str = "https://community.openproject.org/api/v3";

/// Fixed Basic auth username; the API key is the password
pub const API_KEY_USERNAME: &str = "apikey";

const API_PATH_SUFFIX: &str = "/api/v3";

/// Source of JSON pages.
///
/// Implemented by [`HttpClient`]; the sync engine only depends on this
/// trait, so any page source can drive it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `path` (relative to the API root) with `query` and parse the body
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value>;
}

/// Configuration for the HTTP client
#[derive(Clone)]
pub struct HttpClientConfig {
    /// API root all paths are joined onto
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
    /// API key sent as the Basic auth password
    pub api_key: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: None,
            user_agent: default_user_agent(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("backoff_type", &self.backoff_type)
            .field("rate_limit", &self.rate_limit)
            .field("user_agent", &self.user_agent)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Default `User-Agent` header value
pub fn default_user_agent() -> String {
    format!("tap-openproject/{}", env!("CARGO_PKG_VERSION"))
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the API key used for Basic auth
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Normalize an API root: must be http(s) with a host, loses its trailing
/// slash and gains `/api/v3` when missing.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let mut url = Url::parse(trimmed)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_value(
            "base_url",
            format!("unsupported scheme '{}', expected http or https", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::invalid_value("base_url", "missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::invalid_value(
            "base_url",
            "must not contain a query or fragment",
        ));
    }

    let path = url.path().trim_end_matches('/').to_string();
    if !path.ends_with(API_PATH_SUFFIX) {
        url.set_path(&format!("{path}{API_PATH_SUFFIX}"));
    } else {
        url.set_path(&path);
    }
    Ok(url)
}

/// Reject request paths that could escape the API root
pub fn validate_path(path: &str) -> Result<()> {
    let lowered = path.to_ascii_lowercase();
    let reason = if path.contains("..") || lowered.contains("%2e") {
        Some("path traversal")
    } else if path.contains('\\') || lowered.contains("%5c") {
        Some("backslash")
    } else if path.contains("://") {
        Some("absolute URL")
    } else if path.contains('?') || path.contains('#') {
        Some("query or fragment")
    } else if path.starts_with("//") {
        Some("protocol-relative path")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::validation(format!(
            "unsafe request path '{path}': {reason}"
        ))),
        None => Ok(()),
    }
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    base_url: Url,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            base_url,
            rate_limiter,
        })
    }

    /// Normalized API root
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Join a request path onto the API root, refusing anything that
    /// would leave it
    pub fn build_url(&self, path: &str) -> Result<Url> {
        validate_path(path)?;

        let base = self.base_url.as_str().trim_end_matches('/');
        let relative = path.trim_start_matches('/');
        let joined = Url::parse(&format!("{base}/{relative}"))?;

        let prefix = format!("{base}/");
        let confined = joined.scheme() == self.base_url.scheme()
            && joined.host_str() == self.base_url.host_str()
            && joined.port_or_known_default() == self.base_url.port_or_known_default()
            && (joined.as_str() == base || joined.as_str().starts_with(&prefix));
        if !confined {
            return Err(Error::validation(format!(
                "request path '{path}' resolves outside {base}"
            )));
        }
        Ok(joined)
    }

    /// Send a GET request and read its body, retrying transient failures.
    ///
    /// Dropped connections and interrupted body reads count as transient,
    /// alongside timeouts, connect failures and retryable statuses.
    async fn fetch_text(&self, url: &Url, query: &[(String, String)]) -> Result<String> {
        let max_retries = self.config.max_retries;
        let mut last_error = None;
        let mut attempt = 0;

        while attempt <= max_retries {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let mut req = self.client.get(url.clone());
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(ref key) = self.config.api_key {
                req = req.basic_auth(API_KEY_USERNAME, Some(key));
            }

            let failure = match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        debug!("GET {} -> {}", url, status.as_u16());
                        let content_type = response
                            .headers()
                            .get(CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok());
                        if !is_json_content_type(content_type) {
                            warn!(
                                "GET {} returned Content-Type {}, parsing as JSON anyway",
                                url,
                                content_type.unwrap_or("<none>")
                            );
                        }
                        match response.text().await {
                            Ok(text) => return Ok(text),
                            Err(e) => e,
                        }
                    } else if is_retryable_status(status.as_u16()) && attempt < max_retries {
                        let delay = if status == StatusCode::TOO_MANY_REQUESTS {
                            extract_retry_after(&response)
                                .map(|secs| {
                                    std::cmp::min(
                                        Duration::from_secs(secs),
                                        self.config.max_backoff,
                                    )
                                })
                                .unwrap_or_else(|| self.calculate_backoff(attempt))
                        } else {
                            self.calculate_backoff(attempt)
                        };
                        warn!(
                            "Request failed with {}, attempt {}/{}, retrying in {:?}",
                            status.as_u16(),
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(Error::http_status(status.as_u16(), ""));
                        continue;
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::http_status(status.as_u16(), body));
                    }
                }
                Err(e) => e,
            };

            let transient = is_transient_transport(&failure);
            let error = self.classify_transport_error(failure);

            if transient && attempt < max_retries {
                let delay = self.calculate_backoff(attempt);
                warn!(
                    "{}, attempt {}/{}, retrying in {:?}",
                    error,
                    attempt + 1,
                    max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                last_error = Some(error);
                continue;
            }

            return Err(error);
        }

        Err(last_error.unwrap_or(Error::MaxRetriesExceeded { max_retries }))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn classify_transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            Error::Http(e)
        }
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self
                .config
                .initial_backoff
                .saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let url = self.build_url(path)?;
        let text = self.fetch_text(&url, query).await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::malformed_body(format!("GET {url}: {e}")))
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("base_url", &self.base_url.as_str())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Check whether a `Content-Type` header value names a JSON media type
pub(crate) fn is_json_content_type(value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    let media_type = value.split(';').next().unwrap_or_default().trim();
    media_type.eq_ignore_ascii_case("application/json")
        || media_type.eq_ignore_ascii_case("application/hal+json")
}

/// Extract the retry-after header value in seconds
fn extract_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}
