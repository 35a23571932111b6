//! Backoff policy and the retry loop used by [`crate::Client`].
//!
//! The loop never sleeps past the caller's deadline and abandons an
//! in-flight attempt once the deadline passes. Time comes from
//! `tokio::time`, so tests can pause and advance the clock.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, timeout_at, Instant};

use crate::Error;

/// How many times to try a call and how long to wait in between.
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
    /// Upper bound of the random delay added to each backoff.
    pub jitter: Duration,
    /// Budget for the whole call when the caller gives no deadline.
    pub overall_deadline: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
            max_delay: Duration::from_secs(10),
            jitter: Duration::from_millis(250),
            overall_deadline: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Reads overrides from `SEARCHAD_RETRY_*` / `SEARCHAD_DEADLINE_MS`,
    /// falling back to the defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_attempts: env_u64("SEARCHAD_RETRY_MAX", d.max_attempts as u64).max(1) as u32,
            base_delay: Duration::from_millis(env_u64(
                "SEARCHAD_RETRY_BASE_MS",
                d.base_delay.as_millis() as u64,
            )),
            multiplier: d.multiplier,
            max_delay: Duration::from_millis(env_u64(
                "SEARCHAD_RETRY_MAX_MS",
                d.max_delay.as_millis() as u64,
            )),
            jitter: Duration::from_millis(env_u64(
                "SEARCHAD_RETRY_JITTER_MS",
                d.jitter.as_millis() as u64,
            )),
            overall_deadline: Duration::from_millis(env_u64(
                "SEARCHAD_DEADLINE_MS",
                d.overall_deadline.as_millis() as u64,
            )),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_overall_deadline(mut self, overall_deadline: Duration) -> Self {
        self.overall_deadline = overall_deadline;
        self
    }

    /// Exponential delay after the `attempt`-th failure (1-based), capped at
    /// `max_delay`, without jitter.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(30);
        let factor = (self.multiplier.max(1) as u64).saturating_pow(exp);
        let millis = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(millis).min(self.max_delay)
    }

    /// Delay before the next attempt. A provider `Retry-After` hint wins over
    /// the computed backoff; jitter is added either way.
    pub fn delay_for(&self, attempt: u32, err: &Error) -> Duration {
        let base = match err {
            Error::RateLimited {
                retry_after: Some(hint),
            } => *hint,
            _ => self.backoff_for_attempt(attempt),
        };
        base + self.sample_jitter()
    }

    fn sample_jitter(&self) -> Duration {
        let bound = self.jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=bound))
    }
}

/// Counters describing what the client has done so far.
#[derive(Debug, Default)]
pub struct RequestTracker {
    attempts: AtomicU64,
    succeeded: AtomicU64,
    retries: AtomicU64,
    rate_limited: AtomicU64,
    failed: AtomicU64,
    backoff_ms: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self, err: &Error) {
        if matches!(err, Error::RateLimited { .. }) {
            self.rate_limited.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_retry(&self, delay: Duration) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        self.backoff_ms
            .fetch_add(delay.as_millis() as u64, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> TrackerSummary {
        TrackerSummary {
            attempts: self.attempts.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total_backoff_secs: self.backoff_ms.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

/// Snapshot of [`RequestTracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSummary {
    /// HTTP attempts started.
    pub attempts: u64,
    /// Calls that eventually succeeded.
    pub succeeded: u64,
    pub retries: u64,
    /// Attempts answered with a rate-limit response.
    pub rate_limited: u64,
    /// Calls that gave up with an error.
    pub failed: u64,
    pub total_backoff_secs: f64,
}

/// Runs `operation` under `policy` until it succeeds, fails with a
/// non-retryable error, runs out of attempts, or hits `deadline`.
///
/// On exhaustion the last classified error is returned unchanged.
pub async fn with_retry<T, F, Fut>(
    policy: &BackoffPolicy,
    deadline: Instant,
    tracker: &RequestTracker,
    label: &str,
    mut operation: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        if Instant::now() >= deadline {
            tracker.record_failure();
            return Err(Error::deadline_exceeded());
        }

        attempt += 1;
        tracker.record_attempt();

        let outcome = match timeout_at(deadline, operation()).await {
            Ok(result) => result,
            Err(_) => Err(Error::deadline_exceeded()),
        };

        let err = match outcome {
            Ok(value) => {
                tracker.record_success();
                return Ok(value);
            }
            Err(err) => err,
        };
        tracker.record_error(&err);

        if !err.is_retryable() || attempt >= max_attempts {
            tracing::error!(
                "{} failed after {} attempt(s): {}",
                label,
                attempt,
                err
            );
            tracker.record_failure();
            return Err(err);
        }

        let delay = policy.delay_for(attempt, &err);
        if Instant::now() + delay >= deadline {
            tracing::warn!(
                "{} failed (attempt {}/{}), no time left before deadline to retry",
                label,
                attempt,
                max_attempts
            );
            tracker.record_failure();
            return Err(err);
        }

        tracing::warn!(
            "{} failed ({}) (attempt {}/{}), retrying in {:.1}s",
            label,
            err.kind(),
            attempt,
            max_attempts,
            delay.as_secs_f64()
        );
        tracker.record_retry(delay);
        sleep(delay).await;
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    fn quiet_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy::default()
            .with_max_attempts(max_attempts)
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(Duration::ZERO)
    }

    fn transient() -> Error {
        Error::Transient {
            status: Some(503),
            reason: "unavailable".to_string(),
        }
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = BackoffPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            ..BackoffPolicy::default()
        };
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_for_attempt(5), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for_attempt(64), Duration::from_millis(1000));
    }

    #[test]
    fn retry_after_hint_overrides_backoff() {
        let policy = quiet_policy(3);
        let err = Error::RateLimited {
            retry_after: Some(Duration::from_secs(4)),
        };
        assert_eq!(policy.delay_for(1, &err), Duration::from_secs(4));

        let err = Error::RateLimited { retry_after: None };
        assert_eq!(policy.delay_for(2, &err), Duration::from_millis(200));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let policy = quiet_policy(3).with_jitter(Duration::from_millis(50));
        for _ in 0..100 {
            let d = policy.delay_for(1, &transient());
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(150));
        }
    }

    #[test]
    fn from_env_reads_overrides() {
        std::env::set_var("SEARCHAD_RETRY_MAX", "5");
        std::env::set_var("SEARCHAD_RETRY_BASE_MS", "10");
        let policy = BackoffPolicy::from_env();
        std::env::remove_var("SEARCHAD_RETRY_MAX");
        std::env::remove_var("SEARCHAD_RETRY_BASE_MS");
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn succeeds_first_attempt() {
        let tracker = RequestTracker::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let result = with_retry(&quiet_policy(3), deadline, &tracker, "test", || async {
            Ok::<_, Error>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);

        let summary = tracker.summary();
        assert_eq!(summary.attempts, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.retries, 0);
    }

    #[tokio::test]
    async fn always_transient_makes_exactly_max_attempts() {
        tokio::time::pause();

        let calls = Arc::new(AtomicU32::new(0));
        let tracker = RequestTracker::new();
        let deadline = Instant::now() + Duration::from_secs(60);
        let calls_clone = Arc::clone(&calls);

        let result: Result<(), Error> =
            with_retry(&quiet_policy(3), deadline, &tracker, "test", move || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Transient { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let summary = tracker.summary();
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.retries, 2);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_classified_error() {
        tokio::time::pause();

        let tracker = RequestTracker::new();
        let deadline = Instant::now() + Duration::from_secs(60);
        let result: Result<(), Error> =
            with_retry(&quiet_policy(2), deadline, &tracker, "test", || async {
                Err(Error::RateLimited { retry_after: None })
            })
            .await;

        assert!(matches!(result, Err(Error::RateLimited { .. })));
        assert_eq!(tracker.summary().rate_limited, 2);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        tokio::time::pause();

        let calls = Arc::new(AtomicU32::new(0));
        let tracker = RequestTracker::new();
        let deadline = Instant::now() + Duration::from_secs(60);
        let calls_clone = Arc::clone(&calls);

        let result = with_retry(&quiet_policy(3), deadline, &tracker, "test", move || {
            let calls = Arc::clone(&calls_clone);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        let summary = tracker.summary();
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.succeeded, 1);
        assert!((summary.total_backoff_secs - 0.3).abs() < 0.001);
    }

    #[tokio::test]
    async fn auth_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let tracker = RequestTracker::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let calls_clone = Arc::clone(&calls);

        let result: Result<(), Error> =
            with_retry(&quiet_policy(3), deadline, &tracker, "test", move || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::Auth {
                        status: 401,
                        body: String::new(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Auth { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hung_attempt_is_abandoned_at_deadline() {
        tokio::time::pause();

        let tracker = RequestTracker::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        let result: Result<(), Error> =
            with_retry(&quiet_policy(3), deadline, &tracker, "test", || async {
                sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .await;

        match result {
            Err(Error::Transient { reason, .. }) => assert_eq!(reason, "deadline exceeded"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(tracker.summary().attempts, 1);
    }

    #[tokio::test]
    async fn no_retry_when_backoff_crosses_deadline() {
        tokio::time::pause();

        let calls = Arc::new(AtomicU32::new(0));
        let tracker = RequestTracker::new();
        let deadline = Instant::now() + Duration::from_millis(150);
        let calls_clone = Arc::clone(&calls);
        let policy = quiet_policy(5).with_base_delay(Duration::from_millis(200));

        let result: Result<(), Error> =
            with_retry(&policy, deadline, &tracker, "test", move || {
                let calls = Arc::clone(&calls_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Transient { status: Some(503), .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_deadline_makes_no_attempt() {
        let tracker = RequestTracker::new();
        let deadline = Instant::now();
        let result: Result<(), Error> =
            with_retry(&quiet_policy(3), deadline, &tracker, "test", || async { Ok(()) }).await;
        assert!(matches!(result, Err(Error::Transient { .. })));
        assert_eq!(tracker.summary().attempts, 0);
    }
}
