//! Tap configuration
//!
//! The configuration is a flat JSON object supplied once per run. Unknown
//! keys are ignored; known keys are validated before any request is made.

use crate::error::{Error, Result, ResultExt};
use crate::filter::parse_datetime;
use crate::http::{
    default_user_agent, normalize_base_url, HttpClientConfig, RateLimiterConfig, DEFAULT_BASE_URL,
};
use crate::types::{OptionStringExt, StreamErrorPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Placeholder shipped in sample configs; never a real key
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Largest page size the API accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Runtime configuration of the tap
#[derive(Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// OpenProject API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Earliest replication key value for streams without state
    #[serde(default)]
    pub start_date: Option<String>,

    /// Restrict project-scoped streams to these projects
    #[serde(default)]
    pub project_ids: Option<Vec<i64>>,

    /// Project identifiers resolved to ids before syncing
    #[serde(default)]
    pub project_identifiers: Option<Vec<String>>,

    /// `User-Agent` header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Elements requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Optional client-side request rate limit
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Behaviour when a stream fails
    #[serde(default)]
    pub stream_error_policy: StreamErrorPolicy,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_page_size() -> u32 {
    100
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            start_date: None,
            project_ids: None,
            project_identifiers: None,
            user_agent: default_user_agent(),
            page_size: default_page_size(),
            requests_per_second: None,
            stream_error_policy: StreamErrorPolicy::default(),
        }
    }
}

impl std::fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("start_date", &self.start_date)
            .field("project_ids", &self.project_ids)
            .field("project_identifiers", &self.project_identifiers)
            .field("user_agent", &self.user_agent)
            .field("page_size", &self.page_size)
            .field("requests_per_second", &self.requests_per_second)
            .field("stream_error_policy", &self.stream_error_policy)
            .finish()
    }
}

impl TapConfig {
    /// Create a config for `api_key` with defaults elsewhere
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Parse, normalize and validate a config document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse config: {e}")))?;
        config.normalized()
    }

    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        if is_shared_readable(path) {
            warn!(
                "Config file {} is readable by group or others and holds the API key; run chmod 600 {}",
                path.display(),
                path.display()
            );
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Blank optional strings become absent, the base URL is normalized,
    /// and the result is validated
    pub fn normalized(mut self) -> Result<Self> {
        self.api_key = self.api_key.none_if_blank();
        self.start_date = self.start_date.none_if_blank();
        self.validate()?;
        self.base_url = normalize_base_url(&self.base_url)?
            .as_str()
            .trim_end_matches('/')
            .to_string();
        Ok(self)
    }

    /// Check every field
    pub fn validate(&self) -> Result<()> {
        match self.api_key.as_deref().map(str::trim) {
            None | Some("") => return Err(Error::missing_field("api_key")),
            Some(PLACEHOLDER_API_KEY) => {
                return Err(Error::invalid_value(
                    "api_key",
                    "replace the placeholder with a real API key",
                ))
            }
            Some(_) => {}
        }

        normalize_base_url(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;

        if self.timeout == 0 {
            return Err(Error::invalid_value("timeout", "must be greater than 0"));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::invalid_value(
                "page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "requests_per_second",
                "must be greater than 0",
            ));
        }

        if let Some(start_date) = &self.start_date {
            parse_datetime(start_date)
                .map_err(|e| Error::invalid_value("start_date", e.to_string()))?;
        }

        Ok(())
    }

    /// Parsed `start_date`
    pub fn start_date(&self) -> Result<Option<DateTime<Utc>>> {
        self.start_date.as_deref().map(parse_datetime).transpose()
    }

    /// HTTP client settings derived from this config
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(self.timeout))
            .max_retries(self.max_retries)
            .user_agent(&self.user_agent);
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(rps) = self.requests_per_second {
            builder = builder.rate_limit(RateLimiterConfig::per_second(rps));
        }
        builder.build()
    }
}

/// Check whether group or others may read `path`
#[cfg(unix)]
pub fn is_shared_readable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|metadata| metadata.permissions().mode() & 0o044 != 0)
        .unwrap_or(false)
}

/// Check whether group or others may read `path`
#[cfg(not(unix))]
pub fn is_shared_readable(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_minimal_config_defaults() {
        let config = TapConfig::from_json(r#"{"api_key": "abc"}"#).unwrap();

        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.base_url, "https://community.openproject.org/api/v3");
        assert_eq!(config.timeout, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.stream_error_policy, StreamErrorPolicy::FailRun);
        assert!(config.start_date.is_none());
        assert!(config.project_ids.is_none());
        assert!(config.user_agent.starts_with("tap-openproject/"));
    }

    #[test]
    fn test_full_config() {
        let config = TapConfig::from_json(
            r#"{
                "api_key": "abc",
                "base_url": "https://op.example.com/",
                "timeout": 10,
                "max_retries": 1,
                "start_date": "2024-01-01T00:00:00Z",
                "project_ids": [3, 1],
                "project_identifiers": ["demo"],
                "user_agent": "etl/1.0",
                "page_size": 50,
                "requests_per_second": 5,
                "stream_error_policy": "skip_stream",
                "some_unknown_key": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://op.example.com/api/v3");
        assert_eq!(config.project_ids, Some(vec![3, 1]));
        assert_eq!(config.stream_error_policy, StreamErrorPolicy::SkipStream);
        assert_eq!(
            config.start_date().unwrap().map(|d| d.to_rfc3339()),
            Some("2024-01-01T00:00:00+00:00".to_string())
        );

        let http = config.http_config();
        assert_eq!(http.timeout, Duration::from_secs(10));
        assert_eq!(http.max_retries, 1);
        assert_eq!(http.user_agent, "etl/1.0");
        assert_eq!(http.rate_limit.unwrap().requests_per_second, 5);
    }

    #[test_case(r#"{}"# ; "missing key")]
    #[test_case(r#"{"api_key": "  "}"# ; "blank key")]
    fn test_missing_api_key(json: &str) {
        let err = TapConfig::from_json(json).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { ref field } if field == "api_key"));
    }

    #[test_case(r#"{"api_key": "YOUR_API_KEY_HERE"}"#, "api_key" ; "placeholder key")]
    #[test_case(r#"{"api_key": "k", "base_url": "ftp://op.example.com"}"#, "base_url" ; "bad scheme")]
    #[test_case(r#"{"api_key": "k", "base_url": "not a url"}"#, "base_url" ; "not a url")]
    #[test_case(r#"{"api_key": "k", "timeout": 0}"#, "timeout" ; "zero timeout")]
    #[test_case(r#"{"api_key": "k", "page_size": 0}"#, "page_size" ; "zero page size")]
    #[test_case(r#"{"api_key": "k", "page_size": 5000}"#, "page_size" ; "huge page size")]
    #[test_case(r#"{"api_key": "k", "requests_per_second": 0}"#, "requests_per_second" ; "zero rate")]
    #[test_case(r#"{"api_key": "k", "start_date": "2024-13-45"}"#, "start_date" ; "bad date")]
    #[test_case(r#"{"api_key": "k", "start_date": "'; DROP TABLE projects; --"}"#, "start_date" ; "injection")]
    fn test_invalid_value(json: &str, expected_field: &str) {
        let err = TapConfig::from_json(json).unwrap_err();
        match err {
            Error::InvalidConfigValue { field, .. } => assert_eq!(field, expected_field),
            other => panic!("Expected InvalidConfigValue, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json() {
        let err = TapConfig::from_json("{ not json").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_blank_start_date_is_absent() {
        let config = TapConfig::from_json(r#"{"api_key": "k", "start_date": ""}"#).unwrap();
        assert!(config.start_date.is_none());
        assert!(config.start_date().unwrap().is_none());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = TapConfig::new("very-secret-key");
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_key": "k"}"#).unwrap();

        assert!(TapConfig::from_file(&path).is_ok());
        assert!(matches!(
            TapConfig::from_file(dir.path().join("missing.json")),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_unreadable_config_has_context() {
        let dir = tempfile::tempdir().unwrap();

        // a directory exists but cannot be read as a file
        let err = TapConfig::from_file(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Other(_)));
        assert!(err.to_string().starts_with("Failed to read config"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shared_readable_config() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_key": "k"}"#).unwrap();

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(is_shared_readable(&path));
        assert!(TapConfig::from_file(&path).is_ok());

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();
        assert!(is_shared_readable(&path));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert!(!is_shared_readable(&path));
        assert!(!is_shared_readable(&dir.path().join("missing.json")));
    }
}
