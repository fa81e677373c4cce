//! Exponential backoff around fallible async operations.

use crate::config::RetrySettings;
use crate::error::{Result, ScoutError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How often, and how patiently, an operation is retried.
///
/// The wait after failed attempt `n` (1-based) is `multiplier * 2^(n-1)`,
/// clamped to `[min_wait, max_wait]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    /// Build a policy from validated settings.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            multiplier: Duration::from_secs_f64(settings.multiplier_secs),
            min_wait: Duration::from_secs_f64(settings.min_wait_secs),
            max_wait: Duration::from_secs_f64(settings.max_wait_secs),
        }
    }

    /// Wait before the attempt that follows failed attempt `attempt`.
    pub fn wait_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.multiplier
            .saturating_mul(1u32 << exponent)
            .max(self.min_wait)
            .min(self.max_wait)
    }

    /// Every wait the policy can incur, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|a| self.wait_after(a)).collect()
    }

    /// Run `operation` until it succeeds or the attempts run out.
    ///
    /// The closure receives the 1-based attempt number. The last error is
    /// returned wrapped in [`ScoutError::RetriesExhausted`].
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => {
                    return Err(ScoutError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let wait = self.wait_after(attempt);
                    warn!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "Attempt failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            multiplier: Duration::ZERO,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(
            policy.schedule(),
            vec![Duration::from_secs(2), Duration::from_secs(2)]
        );
    }

    #[test]
    fn test_waits_grow_and_cap() {
        let policy = RetryPolicy::default();
        let waits: Vec<u64> = (1..=7).map(|a| policy.wait_after(a).as_secs()).collect();
        assert_eq!(waits, vec![2, 2, 4, 8, 10, 10, 10]);
        assert!(waits.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.wait_after(u32::MAX), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = instant_policy(3)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(ScoutError::Provider("flaky".to_string()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(assert_ok!(result), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = instant_policy(3)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ScoutError::Provider("down".to_string())) }
            })
            .await;

        match assert_err!(result) {
            ScoutError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, ScoutError::Provider(_)));
            }
            other => panic!("Expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_waits_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            multiplier: Duration::from_millis(10),
            min_wait: Duration::from_millis(20),
            max_wait: Duration::from_millis(100),
        };

        let started = tokio::time::Instant::now();
        let result: Result<()> = policy
            .run(|_| async { Err(ScoutError::Provider("down".to_string())) })
            .await;

        assert!(result.is_err());
        // Two waits of at least 20ms each
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
