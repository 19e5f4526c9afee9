//! The fetch client facade.
//!
//! Composes configuration, connection lifecycle, auth, retries, and response
//! mapping into one caller-facing handle: `config → connect → retried fetch →
//! mapped result`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use crate::auth::{AuthProvider, TokenAuth};
use crate::config::{FetchConfig, FetchConfigBuilder};
use crate::connector::{Connection, Connector};
use crate::errors::{ApiErrorResponse, FetchError, FetchResult};
use crate::mapper::{map_as, Record, RecordMapper};
use crate::observability::{InMemoryMetrics, MetricsCollector};
use crate::pagination::{Page, PageEnvelope, PageParams};
use crate::retry::{CancelToken, RetryExecutor, RetryPolicy};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Upper bound on cursor chains drained by `fetch_all`.
const MAX_PAGES: u32 = 1_000;

/// A resilient fetch client.
///
/// # Example
///
/// ```rust,no_run
/// use fetchkit::{FetchClient, RecordMapper};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = FetchClient::builder()
///         .endpoint("https://api.example.com/v1")
///         .token("tk_your_token")
///         .connect()
///         .await?;
///
///     let mapper = RecordMapper::with_required(["id", "name"]);
///     let record = client.fetch("records/42", &mapper).await?;
///     println!("{:?}", record.get_str("name"));
///     Ok(())
/// }
/// ```
pub struct FetchClient {
    config: FetchConfig,
    connection: Connection,
    auth: Arc<dyn AuthProvider>,
    retry: RetryExecutor,
    metrics: Arc<dyn MetricsCollector>,
}

impl FetchClient {
    /// Creates a new client builder.
    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::new()
    }

    /// Creates a client from environment variables and connects.
    ///
    /// Reads `FETCHKIT_ENDPOINT` and `FETCHKIT_TOKEN`, plus the optional
    /// `FETCHKIT_TIMEOUT`, `FETCHKIT_MAX_RETRIES`, and `FETCHKIT_BACKOFF_MS`.
    pub async fn from_env() -> FetchResult<Self> {
        let config = FetchConfig::from_env()?;
        FetchClientBuilder::from_config(config).connect().await
    }

    /// Fetches a single resource and maps it through the given mapper.
    #[instrument(skip(self, mapper), fields(path = %path))]
    pub async fn fetch(&self, path: &str, mapper: &RecordMapper) -> FetchResult<Record> {
        let response = self.execute("fetch", self.build_request(path, &[])).await?;
        mapper.map(&response.body)
    }

    /// Fetches a single resource into a concrete serde type.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn fetch_as<T: serde::de::DeserializeOwned>(&self, path: &str) -> FetchResult<T> {
        let response = self
            .execute("fetch_as", self.build_request(path, &[]))
            .await?;
        map_as(&response.body)
    }

    /// Fetches one page of a cursor-paginated collection.
    #[instrument(skip(self, mapper, params), fields(path = %path))]
    pub async fn fetch_page(
        &self,
        path: &str,
        mapper: &RecordMapper,
        params: &PageParams,
    ) -> FetchResult<Page<Record>> {
        let query = params.to_query();
        let response = self
            .execute("fetch_page", self.build_request(path, &query))
            .await?;

        let envelope: PageEnvelope =
            serde_json::from_slice(&response.body).map_err(|e| FetchError::MalformedResponse {
                message: format!("page envelope: {}", e),
                field: None,
            })?;

        let records = envelope
            .records
            .into_iter()
            .map(|row| mapper.map_value(row))
            .collect::<FetchResult<Vec<_>>>()?;

        let mut page = Page::new(records, envelope.next_cursor);
        if let Some(total) = envelope.total {
            page = page.with_total(total);
        }
        Ok(page)
    }

    /// Drains a cursor-paginated collection into a single vector.
    #[instrument(skip(self, mapper, params), fields(path = %path))]
    pub async fn fetch_all(
        &self,
        path: &str,
        mapper: &RecordMapper,
        params: PageParams,
    ) -> FetchResult<Vec<Record>> {
        let mut all = Vec::new();
        let mut current = params;

        for _ in 0..MAX_PAGES {
            let page = self.fetch_page(path, mapper, &current).await?;
            let next_cursor = page.next_cursor.clone();
            all.extend(page.into_items());

            match next_cursor {
                Some(cursor) => current.cursor = Some(cursor),
                None => return Ok(all),
            }
        }

        Err(FetchError::MalformedResponse {
            message: format!("pagination did not terminate within {} pages", MAX_PAGES),
            field: None,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Returns a cancellation token for this client's retry loops.
    pub fn cancel_token(&self) -> CancelToken {
        self.retry.cancel_token()
    }

    /// Returns a snapshot of the client's metrics.
    pub fn metrics(&self) -> crate::observability::FetchMetrics {
        self.metrics.get_metrics()
    }

    /// Closes the underlying connection. Idempotent.
    pub fn close(&mut self) {
        self.connection.close();
    }

    /// Returns true if the client's connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    fn build_request(&self, path: &str, query: &[(String, String)]) -> HttpRequest {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        for (name, value) in &self.config.custom_headers {
            headers.insert(name.clone(), value.clone());
        }
        self.auth.apply_auth(&mut headers);

        let mut request = HttpRequest::get(path);
        request.headers = headers;
        request.query = query.to_vec();
        request
    }

    /// Sends a request under the retry policy and maps non-2xx statuses into
    /// the error taxonomy.
    async fn execute(&self, operation: &str, request: HttpRequest) -> FetchResult<HttpResponse> {
        let started = Instant::now();
        let attempts = AtomicU32::new(0);

        let result = self
            .retry
            .run(|| {
                let request = request.clone();
                let attempts = &attempts;
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    let response = self.connection.send(request.clone()).await?;
                    if response.is_success() {
                        Ok(response)
                    } else {
                        Err(self.response_error(&request.path, &response))
                    }
                }
            })
            .await;

        let retries = attempts.load(Ordering::SeqCst).saturating_sub(1);
        for _ in 0..retries {
            self.metrics.record_retry(operation);
        }
        self.metrics
            .record_fetch(operation, result.is_ok(), started.elapsed());
        if let Err(err) = &result {
            self.metrics.record_error(err.kind());
        }

        result
    }

    /// Maps a non-2xx response into the error taxonomy.
    fn response_error(&self, path: &str, response: &HttpResponse) -> FetchError {
        let message = serde_json::from_slice::<ApiErrorResponse>(&response.body)
            .map(|body| body.error.message)
            .unwrap_or_else(|_| format!("HTTP error {}", response.status));

        match response.status {
            401 | 403 => FetchError::Authentication {
                message,
                credential_hint: Some(self.config.credential_hint()),
            },
            404 => FetchError::NotFound {
                path: path.to_string(),
            },
            408 => FetchError::Timeout { message },
            400 | 422 => {
                let param = serde_json::from_slice::<ApiErrorResponse>(&response.body)
                    .ok()
                    .and_then(|body| body.error.param);
                FetchError::MalformedRequest { message, param }
            }
            429 => FetchError::Unavailable {
                message,
                status: 429,
                retry_after: response.retry_after(),
            },
            status if status >= 500 => FetchError::Unavailable {
                message,
                status,
                retry_after: response.retry_after(),
            },
            status => FetchError::MalformedRequest {
                message: format!("unexpected HTTP status {}: {}", status, message),
                param: None,
            },
        }
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for the fetch client.
pub struct FetchClientBuilder {
    config_builder: FetchConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
    auth: Option<Arc<dyn AuthProvider>>,
    retry_policy: Option<RetryPolicy>,
    cancel: Option<CancelToken>,
    metrics: Option<Arc<dyn MetricsCollector>>,
    probe: bool,
}

impl FetchClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            config_builder: FetchConfigBuilder::new(),
            transport: None,
            auth: None,
            retry_policy: None,
            cancel: None,
            metrics: None,
            probe: true,
        }
    }

    /// Creates a builder from an existing configuration.
    pub fn from_config(config: FetchConfig) -> Self {
        let mut builder = Self::new();
        let mut config_builder = FetchConfigBuilder::new()
            .endpoint(&config.endpoint)
            .token(config.credentials())
            .timeout(config.timeout)
            .max_retries(config.max_retries)
            .backoff(config.backoff);
        for (name, value) in &config.custom_headers {
            config_builder = config_builder.header(name, value);
        }
        builder.config_builder = config_builder;
        builder
    }

    /// Sets the endpoint base URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.endpoint(endpoint);
        self
    }

    /// Sets the credential token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.token(token);
        self
    }

    /// Sets the credential token from an environment variable.
    pub fn token_from_env(mut self, var_name: &str) -> FetchResult<Self> {
        self.config_builder = self.config_builder.token_from_env(var_name)?;
        Ok(self)
    }

    /// Sets the per-attempt request timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the maximum retry attempts.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config_builder = self.config_builder.max_retries(retries);
        self
    }

    /// Sets the base backoff between retries.
    pub fn backoff(mut self, backoff: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.backoff(backoff);
        self
    }

    /// Adds a custom header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.header(name, value);
        self
    }

    /// Sets a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a custom auth provider.
    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Overrides the retry policy derived from the configuration.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Binds the client's retry loops to an external cancellation token.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sets a custom metrics collector.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Enables or disables the reachability probe on connect.
    pub fn probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    /// Builds the client and opens its connection.
    pub async fn connect(self) -> FetchResult<FetchClient> {
        let config = self.config_builder.build()?;

        let connector = match self.transport {
            Some(transport) => Connector::with_transport(config.clone(), transport),
            None => Connector::new(config.clone()),
        }
        .probe(self.probe);

        let connection = connector.connect().await?;

        let auth: Arc<dyn AuthProvider> = match self.auth {
            Some(a) => a,
            None => Arc::new(TokenAuth::from_string(config.credentials())),
        };
        auth.validate()?;

        let policy = self
            .retry_policy
            .unwrap_or_else(|| RetryPolicy::from_config(&config));
        let retry = match self.cancel {
            Some(cancel) => RetryExecutor::with_cancel_token(policy, cancel),
            None => RetryExecutor::new(policy),
        };

        let metrics: Arc<dyn MetricsCollector> = self
            .metrics
            .unwrap_or_else(|| Arc::new(InMemoryMetrics::new()));

        Ok(FetchClient {
            config,
            connection,
            auth,
            retry,
            metrics,
        })
    }
}

impl Default for FetchClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
