//! Error types for the fetch client.
//!
//! Provides the error taxonomy the retry loop classifies against: transient
//! errors (timeouts, unavailability) are retried, everything else propagates
//! to the caller unmodified.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Error type for fetch client operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Configuration error (missing credentials, invalid endpoint, etc.)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// Connection error (endpoint unreachable, connection closed or already open).
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
        /// Underlying cause, when known.
        cause: Option<String>,
    },

    /// Authentication failure (invalid or rejected credentials). Never retried.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Error message from the remote service.
        message: String,
        /// Hint about the credential (last 4 chars).
        credential_hint: Option<String>,
    },

    /// The request itself was rejected as malformed (400/422 class). Never retried.
    #[error("Malformed request: {message}")]
    MalformedRequest {
        /// Error message.
        message: String,
        /// The offending parameter, when the service names one.
        param: Option<String>,
    },

    /// The requested resource does not exist. Never retried.
    #[error("Not found: {path}")]
    NotFound {
        /// Request path that produced the 404.
        path: String,
    },

    /// Per-attempt I/O timeout. Retried.
    #[error("Request timeout: {message}")]
    Timeout {
        /// Error message.
        message: String,
    },

    /// The service signalled temporary unavailability (5xx, 429). Retried.
    #[error("Service unavailable (HTTP {status}): {message}")]
    Unavailable {
        /// Error message.
        message: String,
        /// HTTP status code that produced this error.
        status: u16,
        /// Server-requested wait before retrying, if provided.
        retry_after: Option<Duration>,
    },

    /// All retry attempts were consumed; wraps the last transient error.
    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Total attempts made (initial try plus retries).
        attempts: u32,
        /// The last transient error observed.
        #[source]
        source: Box<FetchError>,
    },

    /// Response body could not be mapped to the expected shape.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Error message.
        message: String,
        /// The required field that was absent, when that is the cause.
        field: Option<String>,
    },

    /// Serialization/deserialization error outside required-field validation.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },

    /// The operation was cancelled between attempts.
    #[error("Operation cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns true if the retry loop may try this error again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout { .. } | FetchError::Unavailable { .. }
        )
    }

    /// Returns the server-requested retry delay, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::Unavailable { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short machine-friendly name for the error kind, used in metrics/logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Configuration { .. } => "configuration",
            FetchError::Connection { .. } => "connection",
            FetchError::Authentication { .. } => "authentication",
            FetchError::MalformedRequest { .. } => "malformed_request",
            FetchError::NotFound { .. } => "not_found",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Unavailable { .. } => "unavailable",
            FetchError::RetryExhausted { .. } => "retry_exhausted",
            FetchError::MalformedResponse { .. } => "malformed_response",
            FetchError::Serialization { .. } => "serialization",
            FetchError::Cancelled => "cancelled",
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        FetchError::Configuration {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        FetchError::Connection {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        FetchError::Authentication {
            message: message.into(),
            credential_hint: None,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        FetchError::Timeout {
            message: message.into(),
        }
    }

    /// Creates an unavailable error without a retry-after hint.
    pub fn unavailable(status: u16, message: impl Into<String>) -> Self {
        FetchError::Unavailable {
            message: message.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates a malformed-response error naming the missing field.
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        FetchError::MalformedResponse {
            message: format!("required field '{}' is absent", field),
            field: Some(field),
        }
    }
}

/// Error payload many JSON services return alongside non-2xx statuses.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// The error details.
    pub error: ApiErrorDetail,
}

/// Detailed API error information.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorDetail {
    /// The error type.
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    /// The error message.
    pub message: String,
    /// The parameter that caused the error.
    pub param: Option<String>,
    /// The error code.
    pub code: Option<String>,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_connect() {
            FetchError::Connection {
                message: err.to_string(),
                cause: None,
            }
        } else {
            FetchError::Unavailable {
                message: err.to_string(),
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                retry_after: None,
            }
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}
