//! HTTP transport layer for the fetch client.
//!
//! Provides the transport abstraction the retry loop drives and the
//! reqwest-backed implementation. Per-attempt timeouts are enforced here,
//! not in the retry loop.

mod http;

pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, HttpTransportImpl};

use std::time::Duration;

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Timeout error.
    #[error("Timeout after {timeout:?}")]
    Timeout {
        /// Timeout duration.
        timeout: Duration,
    },

    /// Invalid response.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },
}

impl From<TransportError> for crate::errors::FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connection { message } => crate::errors::FetchError::Connection {
                message,
                cause: None,
            },
            TransportError::Timeout { timeout } => crate::errors::FetchError::Timeout {
                message: format!("request exceeded {:?}", timeout),
            },
            TransportError::InvalidResponse { message } => {
                crate::errors::FetchError::Unavailable {
                    message,
                    status: 0,
                    retry_after: None,
                }
            }
        }
    }
}
