use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use livebus_core::ConfigSnapshot;
use tracing::{debug, warn};

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Wait after attempt `n` fails is `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Read `retry.max_attempts` and `retry.base_delay_ms`.
    pub fn from_config(config: &ConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: config.get_u32("retry.max_attempts").unwrap_or(defaults.max_attempts),
            base_delay: config
                .get_u64("retry.base_delay_ms")
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// The last error is returned unchanged. There is no jitter and no deadline:
/// the attempt count is the only bound.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt >= attempts => {
                warn!(attempt, error = %err, "retry budget exhausted");
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "operation failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_with_linear_waits() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let seen = Mutex::new(Vec::new());

        let result: Result<&str, String> = retry_with_backoff(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            seen.lock().unwrap().push(started.elapsed());
            async move {
                if n < 3 {
                    Err(format!("failure {n}"))
                } else {
                    Ok("stored")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("stored"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen[0], Duration::ZERO);
        // 1000 * 1 after the first failure, 1000 * 2 after the second
        assert_eq!(seen[1] - seen[0], Duration::from_millis(1000));
        assert_eq!(seen[2] - seen[1], Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_last_error_after_all_attempts() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry_with_backoff(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(format!("failure {n}")) }
        })
        .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let policy = RetryPolicy::default().with_max_attempts(0);
        let calls = AtomicU32::new(0);

        let _: Result<(), &str> = retry_with_backoff(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope") }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_grows_linearly() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
    }
}
