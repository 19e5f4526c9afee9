//! Connection lifecycle management.
//!
//! A `Connector` hands out at most one live `Connection` at a time. Opening
//! probes the endpoint with bounded attempts; closing is idempotent and
//! releases the connector slot so a new connection can be opened.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::FetchConfig;
use crate::errors::{FetchError, FetchResult};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, HttpTransportImpl, TransportError};

/// Establishes and tears down connections to the remote endpoint.
pub struct Connector {
    config: FetchConfig,
    transport_override: Option<Arc<dyn HttpTransport>>,
    probe: bool,
    slot: Arc<AtomicBool>,
}

impl Connector {
    /// Creates a connector for the given configuration.
    pub fn new(config: FetchConfig) -> Self {
        Self {
            config,
            transport_override: None,
            probe: true,
            slot: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a connector backed by a custom transport.
    pub fn with_transport(config: FetchConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport_override: Some(transport),
            probe: true,
            slot: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enables or disables the reachability probe on connect.
    pub fn probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Opens a connection to the endpoint.
    ///
    /// Fails with a `Connection` error when the endpoint is unreachable after
    /// the configured number of attempts, or when this connector already has
    /// an open connection.
    pub async fn connect(&self) -> FetchResult<Connection> {
        if self
            .slot
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FetchError::connection(
                "a connection is already open on this connector",
            ));
        }

        let result = self.open_transport().await;
        match result {
            Ok(transport) => {
                tracing::debug!(endpoint = %self.config.endpoint, "Connection opened");
                Ok(Connection {
                    transport,
                    slot: Arc::clone(&self.slot),
                    closed: false,
                })
            }
            Err(err) => {
                self.slot.store(false, Ordering::Release);
                Err(err)
            }
        }
    }

    async fn open_transport(&self) -> FetchResult<Arc<dyn HttpTransport>> {
        let transport: Arc<dyn HttpTransport> = match &self.transport_override {
            Some(t) => Arc::clone(t),
            None => Arc::new(
                HttpTransportImpl::new(&self.config.endpoint, self.config.timeout).map_err(
                    |e| FetchError::Connection {
                        message: e.to_string(),
                        cause: None,
                    },
                )?,
            ),
        };

        if self.probe {
            self.probe_endpoint(&transport).await?;
        }

        Ok(transport)
    }

    /// Probes the endpoint root, retrying transport failures up to the
    /// configured budget. Any HTTP response, success or not, proves the
    /// endpoint reachable.
    async fn probe_endpoint(&self, transport: &Arc<dyn HttpTransport>) -> FetchResult<()> {
        let executor = RetryExecutor::new(RetryPolicy::from_config(&self.config));

        let outcome = executor
            .run(|| {
                let transport = Arc::clone(transport);
                async move {
                    transport
                        .send(HttpRequest::head(""))
                        .await
                        .map(|_| ())
                        .map_err(|e| match e {
                            TransportError::Timeout { timeout } => FetchError::Timeout {
                                message: format!("probe exceeded {:?}", timeout),
                            },
                            // Retryable within the probe budget.
                            TransportError::Connection { message }
                            | TransportError::InvalidResponse { message } => {
                                FetchError::unavailable(0, message)
                            }
                        })
                }
            })
            .await;

        outcome.map_err(|err| FetchError::Connection {
            message: format!("endpoint {} is unreachable", self.config.endpoint),
            cause: Some(err.to_string()),
        })
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("endpoint", &self.config.endpoint)
            .field("probe", &self.probe)
            .field("open", &self.slot.load(Ordering::Acquire))
            .finish()
    }
}

/// A live connection to the remote endpoint.
///
/// Exclusively owned; dropping or closing it releases the connector slot.
pub struct Connection {
    transport: Arc<dyn HttpTransport>,
    slot: Arc<AtomicBool>,
    closed: bool,
}

impl Connection {
    /// Sends a request over this connection.
    pub async fn send(&self, request: HttpRequest) -> FetchResult<HttpResponse> {
        if self.closed {
            return Err(FetchError::connection("connection is closed"));
        }
        Ok(self.transport.send(request).await?)
    }

    /// Closes the connection. Idempotent: closing twice is a no-op and never
    /// fails.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.slot.store(false, Ordering::Release);
        tracing::debug!("Connection closed");
    }

    /// Returns true if the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.closed)
            .finish()
    }
}
