//! Metrics collection for fetch operations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// Metrics collector interface.
pub trait MetricsCollector: Send + Sync {
    /// Records a completed fetch operation.
    fn record_fetch(&self, operation: &str, success: bool, duration: Duration);

    /// Records a retry of an operation.
    fn record_retry(&self, operation: &str);

    /// Records an error by kind.
    fn record_error(&self, error_kind: &str);

    /// Gets current metrics.
    fn get_metrics(&self) -> FetchMetrics;

    /// Resets all metrics.
    fn reset(&self);
}

/// Snapshot of fetch metrics.
#[derive(Debug, Clone, Default)]
pub struct FetchMetrics {
    /// Total fetch operations.
    pub total_fetches: u64,
    /// Successful fetches.
    pub successful_fetches: u64,
    /// Failed fetches.
    pub failed_fetches: u64,
    /// Retries performed.
    pub retries: u64,
    /// Total latency in milliseconds.
    pub total_latency_ms: u64,
    /// Fetches per operation name.
    pub operations: HashMap<String, u64>,
    /// Error counts by kind.
    pub errors: HashMap<String, u64>,
}

impl FetchMetrics {
    /// Calculates average latency in milliseconds.
    pub fn average_latency_ms(&self) -> f64 {
        if self.total_fetches == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.total_fetches as f64
        }
    }

    /// Calculates success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total_fetches == 0 {
            100.0
        } else {
            (self.successful_fetches as f64 / self.total_fetches as f64) * 100.0
        }
    }
}

/// Atomic in-memory metrics collector.
pub struct InMemoryMetrics {
    total_fetches: AtomicU64,
    successful_fetches: AtomicU64,
    failed_fetches: AtomicU64,
    retries: AtomicU64,
    total_latency_ms: AtomicU64,
    operations: RwLock<HashMap<String, u64>>,
    errors: RwLock<HashMap<String, u64>>,
}

impl InMemoryMetrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self {
            total_fetches: AtomicU64::new(0),
            successful_fetches: AtomicU64::new(0),
            failed_fetches: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            operations: RwLock::new(HashMap::new()),
            errors: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector for InMemoryMetrics {
    fn record_fetch(&self, operation: &str, success: bool, duration: Duration) {
        self.total_fetches.fetch_add(1, Ordering::Relaxed);

        if success {
            self.successful_fetches.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_fetches.fetch_add(1, Ordering::Relaxed);
        }

        self.total_latency_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);

        if let Ok(mut ops) = self.operations.write() {
            *ops.entry(operation.to_string()).or_insert(0) += 1;
        }
    }

    fn record_retry(&self, _operation: &str) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self, error_kind: &str) {
        if let Ok(mut errors) = self.errors.write() {
            *errors.entry(error_kind.to_string()).or_insert(0) += 1;
        }
    }

    fn get_metrics(&self) -> FetchMetrics {
        FetchMetrics {
            total_fetches: self.total_fetches.load(Ordering::Relaxed),
            successful_fetches: self.successful_fetches.load(Ordering::Relaxed),
            failed_fetches: self.failed_fetches.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            total_latency_ms: self.total_latency_ms.load(Ordering::Relaxed),
            operations: self.operations.read().map(|o| o.clone()).unwrap_or_default(),
            errors: self.errors.read().map(|e| e.clone()).unwrap_or_default(),
        }
    }

    fn reset(&self) {
        self.total_fetches.store(0, Ordering::Relaxed);
        self.successful_fetches.store(0, Ordering::Relaxed);
        self.failed_fetches.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.total_latency_ms.store(0, Ordering::Relaxed);

        if let Ok(mut ops) = self.operations.write() {
            ops.clear();
        }
        if let Ok(mut errors) = self.errors.write() {
            errors.clear();
        }
    }
}

impl std::fmt::Debug for InMemoryMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMetrics")
            .field("total_fetches", &self.total_fetches.load(Ordering::Relaxed))
            .field(
                "successful_fetches",
                &self.successful_fetches.load(Ordering::Relaxed),
            )
            .field("failed_fetches", &self.failed_fetches.load(Ordering::Relaxed))
            .finish()
    }
}

/// Metrics collector that discards everything.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsCollector for NoopMetrics {
    fn record_fetch(&self, _operation: &str, _success: bool, _duration: Duration) {}
    fn record_retry(&self, _operation: &str) {}
    fn record_error(&self, _error_kind: &str) {}
    fn get_metrics(&self) -> FetchMetrics {
        FetchMetrics::default()
    }
    fn reset(&self) {}
}
