//! Configuration for the fetch client.
//!
//! Holds the endpoint, credentials, and retry policy. A built config is
//! immutable; construction goes through the builder or environment variables.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::errors::{FetchError, FetchResult};

/// Default per-attempt request timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum retry attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base backoff between retries.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Immutable configuration for a fetch client.
#[derive(Clone)]
pub struct FetchConfig {
    /// Credential presented to the remote service (stored securely).
    pub(crate) credentials: SecretString,
    /// Base URL of the remote endpoint.
    pub endpoint: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts after the initial try.
    pub max_retries: u32,
    /// Base backoff; attempt `n` sleeps `backoff * n`.
    pub backoff: Duration,
    /// Custom headers to include in requests.
    pub custom_headers: Vec<(String, String)>,
}

impl FetchConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FETCHKIT_ENDPOINT` (required): base URL of the remote service
    /// - `FETCHKIT_TOKEN` (required): credential for authentication
    /// - `FETCHKIT_TIMEOUT` (optional): per-attempt timeout in seconds
    /// - `FETCHKIT_MAX_RETRIES` (optional): maximum retry attempts
    /// - `FETCHKIT_BACKOFF_MS` (optional): base backoff in milliseconds
    pub fn from_env() -> FetchResult<Self> {
        let endpoint = std::env::var("FETCHKIT_ENDPOINT").map_err(|_| {
            FetchError::configuration("FETCHKIT_ENDPOINT environment variable not set")
        })?;
        let token = std::env::var("FETCHKIT_TOKEN").map_err(|_| {
            FetchError::configuration("FETCHKIT_TOKEN environment variable not set")
        })?;

        let mut builder = FetchConfigBuilder::new().endpoint(endpoint).token(token);

        if let Ok(timeout_str) = std::env::var("FETCHKIT_TIMEOUT") {
            if let Ok(timeout_secs) = timeout_str.parse::<u64>() {
                builder = builder.timeout(Duration::from_secs(timeout_secs));
            }
        }

        if let Ok(retries_str) = std::env::var("FETCHKIT_MAX_RETRIES") {
            if let Ok(retries) = retries_str.parse::<u32>() {
                builder = builder.max_retries(retries);
            }
        }

        if let Ok(backoff_str) = std::env::var("FETCHKIT_BACKOFF_MS") {
            if let Ok(backoff_ms) = backoff_str.parse::<u64>() {
                builder = builder.backoff(Duration::from_millis(backoff_ms));
            }
        }

        builder.build()
    }

    /// Returns the credential (exposing the secret).
    pub(crate) fn credentials(&self) -> &str {
        self.credentials.expose_secret()
    }

    /// Returns a credential hint (last 4 characters) for debugging.
    pub fn credential_hint(&self) -> String {
        let token = self.credentials.expose_secret();
        let count = token.chars().count();
        if count > 4 {
            let tail: String = token.chars().skip(count - 4).collect();
            format!("...{}", tail)
        } else {
            "****".to_string()
        }
    }

    /// Returns the full URL for a request path.
    pub fn request_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }
}

impl std::fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchConfig")
            .field("credentials", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Builder for `FetchConfig`.
#[derive(Default)]
pub struct FetchConfigBuilder {
    endpoint: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    backoff: Option<Duration>,
    custom_headers: Vec<(String, String)>,
}

impl FetchConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint base URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the credential token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the credential token from an environment variable.
    pub fn token_from_env(mut self, var_name: &str) -> FetchResult<Self> {
        let token = std::env::var(var_name).map_err(|_| {
            FetchError::configuration(format!("Environment variable {} not set", var_name))
        })?;
        self.token = Some(token);
        Ok(self)
    }

    /// Sets the per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    /// Sets the maximum retry attempts.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the base backoff between retries.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Adds a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> FetchResult<FetchConfig> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| FetchError::configuration("Endpoint is required"))?
            .trim_end_matches('/')
            .to_string();

        if endpoint.is_empty() {
            return Err(FetchError::configuration("Endpoint cannot be empty"));
        }

        let parsed = url::Url::parse(&endpoint)?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(FetchError::configuration(
                "Endpoint must use http or https",
            ));
        }
        if parsed.scheme() == "http" {
            tracing::warn!(endpoint = %endpoint, "Endpoint is not using HTTPS");
        }

        let token = self
            .token
            .ok_or_else(|| FetchError::configuration("Credential token is required"))?;

        if token.is_empty() {
            return Err(FetchError::configuration("Credential token cannot be empty"));
        }

        Ok(FetchConfig {
            credentials: SecretString::new(token),
            endpoint,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            backoff: self.backoff.unwrap_or(DEFAULT_BACKOFF),
            custom_headers: self.custom_headers,
        })
    }
}
