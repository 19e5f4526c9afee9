//! Observability for the fetch client.
//!
//! Tracing-subscriber setup, credential redaction for anything headed to
//! logs, and a lightweight metrics collector for fetch outcomes.

mod logging;
mod metrics;

pub use logging::{init_tracing, redact, LogFormat};
pub use metrics::{FetchMetrics, InMemoryMetrics, MetricsCollector, NoopMetrics};
