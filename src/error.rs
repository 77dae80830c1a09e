//! Error types for tap-openproject
//!
//! This module defines the error hierarchy for the whole tap.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the tap
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid catalog: {message}")]
    Catalog { message: String },

    #[error("State error: {message}")]
    State { message: String },

    #[error("Invalid schema for stream '{stream}': {message}")]
    Schema { stream: String, message: String },

    // ============================================================================
    // Validation Errors
    // ============================================================================
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Malformed response body: {message}")]
    MalformedBody { message: String },

    // ============================================================================
    // Stream Errors
    // ============================================================================
    #[error("Stream '{stream}' not found")]
    StreamNotFound { stream: String },

    #[error("Undefined path parameter: {variable}")]
    UndefinedVariable { variable: String },

    #[error("Sync failed for streams: {}", streams.join(", "))]
    StreamsFailed { streams: Vec<String> },

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed body error
    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self::MalformedBody {
            message: message.into(),
        }
    }

    /// Create a catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a schema error
    pub fn schema(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Http(e) => is_transient_transport(e),
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if this error is an HTTP 403
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::HttpStatus { status: 403, .. })
    }

    /// Check if this error was raised before any request could be issued
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::MissingConfigField { .. }
                | Error::InvalidConfigValue { .. }
                | Error::Catalog { .. }
                | Error::State { .. }
                | Error::Schema { .. }
        )
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Check if a transport failure may succeed on a fresh attempt: connect
/// failures, timeouts, dropped connections and interrupted body reads
pub(crate) fn is_transient_transport(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
}

/// Result type alias for the tap
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("api_key");
        assert_eq!(err.to_string(), "Missing required config field: api_key");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::StreamsFailed {
            streams: vec!["users".to_string(), "roles".to_string()],
        };
        assert_eq!(err.to_string(), "Sync failed for streams: users, roles");
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(500, "").is_retryable());
        assert!(Error::http_status(502, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());
        assert!(Error::http_status(504, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(401, "").is_retryable());
        assert!(!Error::http_status(403, "").is_retryable());
        assert!(!Error::http_status(404, "").is_retryable());
        assert!(!Error::malformed_body("eof").is_retryable());
        assert!(!Error::validation("bad date").is_retryable());
    }

    #[test]
    fn test_is_permission_denied() {
        assert!(Error::http_status(403, "Forbidden").is_permission_denied());
        assert!(!Error::http_status(401, "").is_permission_denied());
        assert!(!Error::config("x").is_permission_denied());
    }

    #[test]
    fn test_is_config_error() {
        assert!(Error::missing_field("api_key").is_config_error());
        assert!(Error::catalog("bad").is_config_error());
        assert!(!Error::http_status(500, "").is_config_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
