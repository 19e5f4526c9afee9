//! Bounded retry with linear backoff.
//!
//! The executor runs a caller-supplied operation, retrying only errors the
//! taxonomy classifies as transient. Attempt `n` sleeps `backoff * n` before
//! the next try, a server-provided `Retry-After` overrides the schedule, and
//! exhausting the budget surfaces the last transient error wrapped in
//! `RetryExhausted`. Fatal errors propagate immediately with no sleep.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::instrument;

use crate::config::FetchConfig;
use crate::errors::{FetchError, FetchResult};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: u32,
    /// Base backoff; attempt `n` sleeps `backoff * n`.
    pub backoff: Duration,
    /// Upper bound on any single backoff sleep.
    pub max_backoff: Duration,
    /// Whether to add jitter (0-25% random variation) to each sleep.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a policy from a fetch configuration.
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.backoff,
            ..Self::default()
        }
    }

    /// Sets the maximum number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base backoff.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the maximum backoff.
    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Sets whether to use jitter.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Creates a policy with no retries.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculates the sleep before the retry that follows failed attempt
    /// `attempt` (1-based).
    fn delay_for(&self, attempt: u32, error: &FetchError) -> Duration {
        // Server-requested delay wins over the schedule.
        if let Some(retry_after) = error.retry_after() {
            return retry_after.min(self.max_backoff);
        }

        let base = self.backoff.saturating_mul(attempt);
        let capped = base.min(self.max_backoff);

        if self.jitter {
            let factor = 1.0 + rand::random::<f64>() * 0.25;
            Duration::from_millis((capped.as_millis() as f64 * factor) as u64)
        } else {
            capped
        }
    }
}

/// Outcome of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The operation returned a value.
    Success,
    /// The operation failed with a retryable error.
    Transient,
    /// The operation failed with a non-retryable error.
    Fatal,
}

/// Record of one retry-loop iteration. Created per attempt, logged, and
/// discarded when the loop ends.
#[derive(Debug)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
    /// How the attempt ended.
    pub outcome: AttemptOutcome,
}

impl Attempt {
    fn log(&self, error: Option<&FetchError>) {
        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();
        match self.outcome {
            AttemptOutcome::Success => {
                tracing::debug!(attempt = self.number, elapsed_ms, "Attempt succeeded");
            }
            AttemptOutcome::Transient => {
                tracing::warn!(
                    attempt = self.number,
                    elapsed_ms,
                    error = %error.map(|e| e.to_string()).unwrap_or_default(),
                    "Attempt failed with transient error"
                );
            }
            AttemptOutcome::Fatal => {
                tracing::error!(
                    attempt = self.number,
                    elapsed_ms,
                    error = %error.map(|e| e.to_string()).unwrap_or_default(),
                    "Attempt failed with fatal error"
                );
            }
        }
    }
}

/// Cooperative cancellation token checked between retry attempts.
///
/// Clones share the same cancellation state. Backoff sleeps are interrupted
/// when the token fires; in-flight I/O is not preempted.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Creates a new, un-cancelled token.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(tx),
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        // send_replace updates even when no receiver is subscribed, so a
        // cancel issued while the loop is between sleeps is not lost.
        self.inner.send_replace(true);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.borrow()
    }

    /// Resolves when cancellation is requested.
    pub(crate) async fn cancelled(&self) {
        let mut rx = self.inner.subscribe();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone; cancellation can no longer fire.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Executes operations under a retry policy.
#[derive(Debug)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    cancel: CancelToken,
}

impl RetryExecutor {
    /// Creates a new executor with its own cancellation token.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: CancelToken::new(),
        }
    }

    /// Creates an executor bound to an existing cancellation token.
    pub fn with_cancel_token(policy: RetryPolicy, cancel: CancelToken) -> Self {
        Self { policy, cancel }
    }

    /// Returns a clone of the executor's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns the policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs an operation with bounded retries.
    ///
    /// A permanently transient-failing operation is attempted exactly
    /// `max_retries + 1` times before `RetryExhausted` is returned. Fatal
    /// errors return after exactly one attempt with no sleep.
    #[instrument(skip(self, operation), fields(max_retries = self.policy.max_retries))]
    pub async fn run<F, Fut, T>(&self, operation: F) -> FetchResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let mut attempt: u32 = 1;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let started_at = Utc::now();

            match operation().await {
                Ok(value) => {
                    Attempt {
                        number: attempt,
                        started_at,
                        outcome: AttemptOutcome::Success,
                    }
                    .log(None);
                    return Ok(value);
                }
                Err(err) if err.is_transient() => {
                    Attempt {
                        number: attempt,
                        started_at,
                        outcome: AttemptOutcome::Transient,
                    }
                    .log(Some(&err));

                    if attempt > self.policy.max_retries {
                        return Err(FetchError::RetryExhausted {
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }

                    let delay = self.policy.delay_for(attempt, &err);
                    tracing::info!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before retry"
                    );

                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                    }

                    attempt += 1;
                }
                Err(err) => {
                    Attempt {
                        number: attempt,
                        started_at,
                        outcome: AttemptOutcome::Fatal,
                    }
                    .log(Some(&err));
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;
    use test_case::test_case;

    fn transient() -> FetchError {
        FetchError::unavailable(503, "maintenance")
    }

    fn fatal() -> FetchError {
        FetchError::authentication("bad token")
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new()
            .max_retries(max_retries)
            .backoff(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let executor = RetryExecutor::new(fast_policy(3));

        let result = executor.run(|| async { Ok::<_, FetchError>("ok") }).await;

        assert_eq!(result.unwrap(), "ok");
    }

    #[test_case(0 ; "no retries")]
    #[test_case(1 ; "one retry")]
    #[test_case(3 ; "three retries")]
    #[tokio::test]
    async fn test_exhaustion_attempts_exactly_n_plus_one(max_retries: u32) {
        let executor = RetryExecutor::new(fast_policy(max_retries));
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result = executor
            .run(|| {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(transient())
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), max_retries + 1);
        match result {
            Err(FetchError::RetryExhausted { attempts: n, source }) => {
                assert_eq!(n, max_retries + 1);
                assert!(source.is_transient());
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fatal_single_attempt_no_sleep() {
        let executor = RetryExecutor::new(
            RetryPolicy::new()
                .max_retries(5)
                .backoff(Duration::from_secs(10)),
        );
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let start = Instant::now();
        let result = executor
            .run(|| {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(fatal())
                }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Authentication { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        // A 10s backoff would be observable; fatal errors must not sleep.
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_success_on_third_attempt() {
        let executor = RetryExecutor::new(fast_policy(2));
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result = executor
            .run(|| {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count < 2 {
                        Err(transient())
                    } else {
                        Ok("third time")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "third time");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let cancel = CancelToken::new();
        let executor = RetryExecutor::with_cancel_token(
            RetryPolicy::new()
                .max_retries(5)
                .backoff(Duration::from_secs(30)),
            cancel.clone(),
        );
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let handle = tokio::spawn(async move {
            executor
                .run(|| {
                    let attempts = Arc::clone(&attempts_clone);
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(transient())
                    }
                })
                .await
        });

        // Let the first attempt fail and enter backoff, then cancel.
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let executor = RetryExecutor::with_cancel_token(fast_policy(3), cancel);
        let result = executor
            .run(|| async { Ok::<_, FetchError>("never") })
            .await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[test]
    fn test_linear_delay_schedule() {
        let policy = RetryPolicy::new()
            .backoff(Duration::from_millis(100))
            .max_backoff(Duration::from_secs(10));
        let err = transient();

        assert_eq!(policy.delay_for(1, &err), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2, &err), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3, &err), Duration::from_millis(300));
    }

    #[test]
    fn test_delay_respects_cap() {
        let policy = RetryPolicy::new()
            .backoff(Duration::from_secs(2))
            .max_backoff(Duration::from_secs(3));
        let err = transient();

        assert_eq!(policy.delay_for(5, &err), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_after_overrides_schedule() {
        let policy = RetryPolicy::new().backoff(Duration::from_millis(100));
        let err = FetchError::Unavailable {
            message: "slow down".to_string(),
            status: 429,
            retry_after: Some(Duration::from_secs(7)),
        };

        assert_eq!(policy.delay_for(1, &err), Duration::from_secs(7));
    }

    #[test]
    fn test_cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();

        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        // Cancelling again is a no-op.
        token.cancel();
        assert!(token.is_cancelled());
    }
}
