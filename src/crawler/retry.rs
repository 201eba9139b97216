//! Retry disciplines
//!
//! Two policies live here:
//! - Fetch retry: a fixed number of immediate attempts for required fetches,
//!   each bounded by the fetch timeout and raced against cancellation
//! - Connect retry: growing delay on a recognized transient error class,
//!   bounded by a wall-clock deadline rather than an attempt count

use crate::crawler::fetcher::{FetchError, FetchRequest, Fetcher};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Total attempts made for a required fetch
pub const REQUIRED_FETCH_ATTEMPTS: u32 = 4;

/// Fetches `request`, retrying immediately when `required`
///
/// Returns the first successful content or the last error. Cancellation
/// aborts between and during attempts.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    request: &FetchRequest,
    required: bool,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, FetchError> {
    let attempts = if required { REQUIRED_FETCH_ATTEMPTS } else { 1 };
    let mut attempt = 1;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled {
                    address: request.address.clone(),
                });
            }
            result = tokio::time::timeout(timeout, fetcher.fetch(request)) => result,
        };

        let error = match outcome {
            Ok(Ok(content)) => {
                if attempt > 1 {
                    tracing::debug!("Fetched {} on attempt {}", request.address, attempt);
                }
                return Ok(content);
            }
            Ok(Err(e)) => e,
            Err(_) => FetchError::Timeout {
                address: request.address.clone(),
                secs: timeout.as_secs(),
            },
        };

        if attempt >= attempts {
            return Err(error);
        }

        tracing::warn!(
            "Fetch attempt {}/{} failed: {}",
            attempt,
            attempts,
            error
        );
        attempt += 1;
    }
}

/// Delay policy for establishing datastore connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRetry {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub deadline: Duration,
}

impl ConnectRetry {
    /// Default delays with the given overall deadline
    pub fn new(deadline: Duration) -> Self {
        Self {
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            deadline,
        }
    }

    /// Wait after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt).min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// next wait would cross the deadline
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_transient: P) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let started = Instant::now();
        let mut attempt = 1;

        loop {
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_transient(&e) => return Err(e),
                Err(e) => e,
            };

            let delay = self.delay_for(attempt);
            if started.elapsed() + delay > self.deadline {
                tracing::warn!(
                    "Giving up on connection after {} attempts in {:?}: {}",
                    attempt,
                    started.elapsed(),
                    error
                );
                return Err(error);
            }

            tracing::debug!(
                "Transient connection failure on attempt {}, retrying in {:?}: {}",
                attempt,
                delay,
                error
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::StaticFetcher;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TIMEOUT: Duration = Duration::from_secs(60);

    struct SlowFetcher {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, _request: &FetchRequest) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_required_fetch_makes_exactly_four_attempts() {
        let fetcher = StaticFetcher::new()
            .with_page("page", "<html></html>")
            .failing("page", u32::MAX);
        let cancel = CancellationToken::new();

        let result =
            fetch_with_retry(&fetcher, &FetchRequest::new("page"), true, TIMEOUT, &cancel).await;

        assert!(matches!(result, Err(FetchError::Browser { .. })));
        assert_eq!(fetcher.attempts("page"), REQUIRED_FETCH_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_optional_fetch_makes_one_attempt() {
        let fetcher = StaticFetcher::new()
            .with_page("page", "<html></html>")
            .failing("page", 1);
        let cancel = CancellationToken::new();

        let result =
            fetch_with_retry(&fetcher, &FetchRequest::new("page"), false, TIMEOUT, &cancel).await;

        assert!(result.is_err());
        assert_eq!(fetcher.attempts("page"), 1);
    }

    #[tokio::test]
    async fn test_returns_first_success() {
        let fetcher = StaticFetcher::new()
            .with_page("page", "<html>ok</html>")
            .failing("page", 2);
        let cancel = CancellationToken::new();

        let content =
            fetch_with_retry(&fetcher, &FetchRequest::new("page"), true, TIMEOUT, &cancel)
                .await
                .unwrap();

        assert_eq!(content, "<html>ok</html>");
        assert_eq!(fetcher.attempts("page"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_is_bounded_by_timeout() {
        let fetcher = SlowFetcher {
            calls: AtomicU32::new(0),
        };
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let result = fetch_with_retry(
            &fetcher,
            &FetchRequest::new("slow"),
            true,
            Duration::from_secs(5),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(FetchError::Timeout { secs: 5, .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), REQUIRED_FETCH_ATTEMPTS);
        assert!(started.elapsed() >= Duration::from_secs(20));
        assert!(started.elapsed() < Duration::from_secs(21));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let fetcher = StaticFetcher::new().with_page("page", "<html></html>");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result =
            fetch_with_retry(&fetcher, &FetchRequest::new("page"), true, TIMEOUT, &cancel).await;

        assert!(matches!(result, Err(FetchError::Cancelled { .. })));
        assert_eq!(fetcher.attempts("page"), 0);
    }

    #[test]
    fn test_connect_delay_grows_and_caps() {
        let policy = ConnectRetry {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
            deadline: Duration::from_secs(10),
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(250));
        assert_eq!(policy.delay_for(40), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retry_stops_at_deadline() {
        let policy = ConnectRetry {
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            deadline: Duration::from_secs(1),
        };
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), String> = policy
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err("busy".to_string()) }
                },
                |_| true,
            )
            .await;

        assert!(result.is_err());
        // waits of 50, 100, 150, 200, 250ms fit; the next 300ms would cross 1s
        assert_eq!(attempts.load(Ordering::SeqCst), 6);
        assert!(started.elapsed() <= policy.deadline);
    }

    #[tokio::test]
    async fn test_connect_retry_fails_fast_on_other_errors() {
        let policy = ConnectRetry::new(Duration::from_secs(60));
        let attempts = AtomicU32::new(0);

        let result: Result<(), String> = policy
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err("corrupt".to_string()) }
                },
                |e| e == "busy",
            )
            .await;

        assert_eq!(result.unwrap_err(), "corrupt");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retry_recovers() {
        let policy = ConnectRetry::new(Duration::from_secs(60));
        let attempts = AtomicU32::new(0);

        let result: Result<u32, String> = policy
            .run(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n < 3 {
                            Err("busy".to_string())
                        } else {
                            Ok(n)
                        }
                    }
                },
                |e| e == "busy",
            )
            .await;

        assert_eq!(result.unwrap(), 3);
    }
}
