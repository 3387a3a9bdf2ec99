//! Bounded retry with exponential backoff around endpoint calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::EndpointError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 2_000;

/// Retry policy shared by every endpoint call in a run.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl Backoff {
    /// Run `op` up to `max_attempts` times.
    ///
    /// A transient failure waits `base_delay * 2^attempt` and tries again;
    /// the final transient failure and every fatal failure propagate
    /// unchanged.
    pub async fn execute<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, EndpointError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EndpointError>>,
    {
        for attempt in 0..self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt);
                    warn!(
                        what,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient endpoint failure, backing off"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
        Err(EndpointError::RetriesExhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn only_rate_limits_resets_and_timeouts_are_transient() {
        assert!(EndpointError::RateLimited("429".into()).is_transient());
        assert!(EndpointError::ConnectionReset("reset".into()).is_transient());
        assert!(EndpointError::TimedOut("slow".into()).is_transient());
        assert!(!EndpointError::Call("reverted".into()).is_transient());
        assert!(!EndpointError::RetriesExhausted { attempts: 5 }.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_with_doubling_delays() {
        let backoff = Backoff {
            max_attempts: 3,
            base_delay: Duration::from_millis(2_000),
        };
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = backoff
            .execute("op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(EndpointError::RateLimited("too many requests".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2000ms after the first failure, 4000ms after the second.
        assert_eq!(start.elapsed(), Duration::from_millis(6_000));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_failures_propagate_without_retry() {
        let backoff = Backoff::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let err = backoff
            .execute("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(EndpointError::Call("execution reverted".into())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::Call(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_surface_the_last_transient_failure() {
        let backoff = Backoff {
            max_attempts: 2,
            base_delay: Duration::from_millis(100),
        };
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let err = backoff
            .execute("op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(EndpointError::ConnectionReset("econnreset".into())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::ConnectionReset(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn zero_attempt_budget_reports_exhaustion() {
        let backoff = Backoff {
            max_attempts: 0,
            base_delay: Duration::from_millis(100),
        };

        let err = backoff
            .execute("op", || async { Ok::<u32, EndpointError>(1) })
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::RetriesExhausted { attempts: 0 }));
    }
}
