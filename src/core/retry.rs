//! Call policy for external services: per-attempt timeout plus bounded
//! retries with exponential backoff.
//!
//! Search and generation calls default to a single attempt. Each attempt is
//! wrapped in `tokio::time::timeout`, so a stalled provider surfaces as
//! [`CallError::TimedOut`] instead of hanging the pipeline.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

/// Retry and timeout settings for one external service.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = single attempt).
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Upper bound on any single delay.
    pub max_delay: Duration,

    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,

    /// Add up to 25% jitter to each delay.
    pub jitter: bool,

    /// Deadline for each individual attempt.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
            attempt_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryConfig {
    /// Single attempt with the given deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { attempt_timeout: Some(timeout), ..Default::default() }
    }

    /// Settings for the search backend.
    pub fn search(timeout_secs: u64, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempt_timeout: Some(Duration::from_secs(timeout_secs)),
            ..Default::default()
        }
    }

    /// Settings for generation providers (longer backoff).
    pub fn generation(timeout_secs: u64, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            attempt_timeout: Some(Duration::from_secs(timeout_secs)),
            ..Default::default()
        }
    }

    /// Delay to wait before attempt number `attempt` (1-based, 0 = none).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_millis() as f64);
        let delay = if self.jitter { capped * (1.0 + jitter_fraction() * 0.25) } else { capped };

        Duration::from_millis(delay as u64)
    }
}

/// Clock-derived fraction in [0, 1).
fn jitter_fraction() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}

/// Why a policed call failed.
#[derive(Debug)]
pub enum CallError<E> {
    /// The last attempt exceeded its deadline.
    TimedOut(Duration),
    /// The last attempt returned an error.
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for CallError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut(after) => write!(f, "timed out after {}s", after.as_secs_f64()),
            Self::Failed(e) => write!(f, "{e}"),
        }
    }
}

/// Outcome of [`retry_async`].
#[derive(Debug)]
pub struct RetryResult<T, E> {
    pub result: Result<T, CallError<E>>,

    /// Attempts made, including the first.
    pub attempts: u32,

    /// Wall time including delays.
    pub total_time: Duration,
}

impl<T, E> RetryResult<T, E> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    pub fn into_result(self) -> Result<T, CallError<E>> {
        self.result
    }
}

/// Run `operation` under `config`: each attempt gets the configured deadline
/// and failures are retried up to `max_attempts` times.
pub async fn retry_async<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let total_attempts = config.max_attempts.saturating_add(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        let result = match config.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(inner) => inner.map_err(CallError::Failed),
                Err(_) => Err(CallError::TimedOut(limit)),
            },
            None => operation().await.map_err(CallError::Failed),
        };

        if result.is_ok() || attempts >= total_attempts {
            return RetryResult { result, attempts, total_time: start.elapsed() };
        }

        tracing::debug!(attempt = attempts, "External call failed, retrying");
        tokio::time::sleep(config.delay_for_attempt(attempts)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_is_single_attempt() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 0);
        assert!(config.attempt_timeout.is_some());
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: false,
            ..Default::default()
        };

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 10.0,
            jitter: false,
            ..Default::default()
        };
        assert_eq!(config.delay_for_attempt(6), Duration::from_secs(5));
    }

    #[test]
    fn test_service_presets() {
        let search = RetryConfig::search(30, 0);
        assert_eq!(search.attempt_timeout, Some(Duration::from_secs(30)));

        let generation = RetryConfig::generation(120, 2);
        assert_eq!(generation.max_attempts, 2);
        assert_eq!(generation.attempt_timeout, Some(Duration::from_secs(120)));
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let outcome = retry_async(&fast(3), || async { Ok::<_, &str>("ok") }).await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.was_retried());
    }

    #[tokio::test]
    async fn test_success_after_failures() {
        let calls = AtomicU32::new(0);
        let outcome = retry_async(&fast(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient")
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(outcome.attempts, 3);
        assert!(matches!(outcome.into_result(), Ok(2)));
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let calls = AtomicU32::new(0);
        let outcome = retry_async(&fast(0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("down") }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome.into_result(), Err(CallError::Failed("down"))));
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let config = RetryConfig::with_timeout(Duration::from_millis(20));
        let outcome = retry_async(&config, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, &str>(())
        })
        .await;

        match outcome.into_result() {
            Err(CallError::TimedOut(after)) => assert_eq!(after, Duration::from_millis(20)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
