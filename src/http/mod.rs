//! HTTP client module
//!
//! Provides the OpenProject API client with retry, rate limiting, and
//! backoff strategies.
//!
//! # Features
//!
//! - **Basic Auth**: fixed `apikey` username with the API key as password
//! - **Path Confinement**: every request stays under the configured API root
//! - **Automatic Retries**: 429/5xx, timeouts, connection failures and dropped
//!   connections with backoff
//! - **Rate Limiting**: optional token bucket rate limiter using governor

mod client;
mod rate_limit;

pub use client::{
    default_user_agent, normalize_base_url, validate_path, Fetcher, HttpClient,
    HttpClientConfig, HttpClientConfigBuilder, API_KEY_USERNAME, DEFAULT_BASE_URL,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
