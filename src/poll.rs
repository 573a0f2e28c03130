//! Bounded sleep-then-recheck helper
//!
//! Both waits in the report workflow (confirming a freshly created report
//! and polling a run operation) share one shape: check, and if not ready
//! sleep for a fixed interval and check again, until a bound is hit. The
//! bound is either an attempt count or a wall-clock budget.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// What bounds a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollLimit {
    /// At most this many checks; sleeps only between checks
    Attempts(u32),
    /// Keep checking while less than this much time has elapsed
    Elapsed(Duration),
}

/// Interval and bound for a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between checks
    pub interval: Duration,
    /// When to give up
    pub limit: PollLimit,
}

impl PollPolicy {
    /// Attempt-bounded policy
    pub fn attempts(max_attempts: u32, interval: Duration) -> Self {
        Self {
            interval,
            limit: PollLimit::Attempts(max_attempts),
        }
    }

    /// Time-bounded policy
    pub fn elapsed(timeout: Duration, interval: Duration) -> Self {
        Self {
            interval,
            limit: PollLimit::Elapsed(timeout),
        }
    }
}

/// Result of a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The check produced a value
    Ready(T),
    /// The bound was hit first
    Exhausted {
        /// Number of checks performed
        attempts: u32,
    },
}

impl<T> PollOutcome<T> {
    /// Convert into an option, dropping the attempt count
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Run `check` until it yields `Some`, an error, or the policy bound
///
/// `check` receives the 1-based attempt number. Errors from `check` end the
/// loop immediately.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut check: F) -> Result<PollOutcome<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        match policy.limit {
            PollLimit::Attempts(max) if attempt >= max => {
                return Ok(PollOutcome::Exhausted { attempts: attempt });
            }
            PollLimit::Elapsed(timeout) if attempt > 0 && started.elapsed() >= timeout => {
                return Ok(PollOutcome::Exhausted { attempts: attempt });
            }
            _ => {}
        }

        attempt += 1;
        if let Some(value) = check(attempt).await? {
            return Ok(PollOutcome::Ready(value));
        }

        let last_attempt = matches!(policy.limit, PollLimit::Attempts(max) if attempt >= max);
        if !last_attempt {
            trace!(attempt, interval = ?policy.interval, "Not ready, sleeping");
            tokio::time::sleep(policy.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_attempt_does_not_sleep() {
        let started = Instant::now();
        let outcome = poll_until(PollPolicy::attempts(5, Duration::from_secs(2)), |_| async {
            Ok(Some("done"))
        })
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Ready("done"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_sleep_only_between_checks() {
        let started = Instant::now();
        let calls = AtomicU32::new(0);

        let outcome: PollOutcome<()> =
            poll_until(PollPolicy::attempts(5, Duration::from_secs(2)), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 5 });
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_later_attempt() {
        let outcome = poll_until(PollPolicy::attempts(5, Duration::from_secs(2)), |n| async move {
            Ok((n == 2).then_some(n))
        })
        .await
        .unwrap();

        assert_eq!(outcome.ready(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_limit() {
        let outcome: PollOutcome<()> =
            poll_until(PollPolicy::elapsed(Duration::from_secs(300), Duration::from_secs(5)), |_| async {
                Ok(None)
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 60 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_stops_loop() {
        let calls = AtomicU32::new(0);
        let result: Result<PollOutcome<()>> =
            poll_until(PollPolicy::attempts(5, Duration::from_secs(1)), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::decode("bad payload")) }
            })
            .await;

        assert!(matches!(result, Err(Error::Decode { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_never_checks() {
        let outcome: PollOutcome<()> =
            poll_until(PollPolicy::attempts(0, Duration::from_millis(1)), |_| async {
                Err(Error::decode("checked with zero attempts"))
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 0 });
    }
}
