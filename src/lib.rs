//! Resilient Fetch Client
//!
//! A small async HTTP client built around four pieces: an immutable
//! [`FetchConfig`], a [`Connector`](connector::Connector) that owns the
//! connection lifecycle, a [`RetryExecutor`](retry::RetryExecutor) that
//! retries transient failures with bounded linear backoff, and a
//! [`RecordMapper`] that validates raw responses into typed records at the
//! boundary.
//!
//! # Features
//!
//! - **Bounded retries**: transient failures (timeouts, 5xx, 429) are retried
//!   up to `max_retries`; fatal failures (auth, malformed request) propagate
//!   immediately with no sleep
//! - **Typed results**: required fields are validated up front, unknown extra
//!   fields are preserved rather than dropped
//! - **Cursor pagination**: single-page and drain-the-chain fetches
//! - **Cooperative cancellation**: backoff sleeps are interruptible via a
//!   shared token
//! - **Observability**: structured logging via `tracing`, per-client metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fetchkit::{FetchClient, RecordMapper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FetchClient::builder()
//!         .endpoint("https://api.example.com/v1")
//!         .token("tk_your_token")
//!         .max_retries(3)
//!         .connect()
//!         .await?;
//!
//!     let mapper = RecordMapper::with_required(["id", "name"]);
//!     let record = client.fetch("records/42", &mapper).await?;
//!     println!("{:?}", record.get_str("name"));
//!     Ok(())
//! }
//! ```
//!
//! # Pagination Example
//!
//! ```rust,no_run
//! use fetchkit::{FetchClient, PageParams, RecordMapper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FetchClient::builder()
//!         .endpoint("https://api.example.com/v1")
//!         .token("tk_your_token")
//!         .connect()
//!         .await?;
//!
//!     let mapper = RecordMapper::with_required(["id"]);
//!     let records = client
//!         .fetch_all("records", &mapper, PageParams::new().limit(100))
//!         .await?;
//!     println!("fetched {} records", records.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod connector;
pub mod errors;
pub mod mapper;
pub mod observability;
pub mod pagination;
pub mod retry;
pub mod transport;

// Re-exports for convenience
pub use client::{FetchClient, FetchClientBuilder};
pub use config::FetchConfig;
pub use connector::{Connection, Connector};
pub use errors::{FetchError, FetchResult};
pub use mapper::{Record, RecordMapper};
pub use pagination::{Page, PageParams};
pub use retry::{CancelToken, RetryExecutor, RetryPolicy};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
