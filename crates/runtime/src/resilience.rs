//! Exponential retry and a consecutive-failure circuit breaker for
//! connector writes.

use std::{future::Future, sync::Mutex, time::Duration};

use {
    rand::Rng,
    tokio::time::Instant,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            multiplier: 2,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `base * multiplier^retry`,
    /// plus up to half of that again when jitter is on.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self
            .base_delay
            .saturating_mul(self.multiplier.saturating_pow(retry));
        if !self.jitter || base.is_zero() {
            return base;
        }
        let extra_ms = rand::rng().random_range(0..=base.as_millis() as u64 / 2);
        base + Duration::from_millis(extra_ms)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget runs out.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            aios_common::ensure_active(cancel)?;
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.class().is_retryable() => {
                    let delay = self.delay_for(attempt - 1);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {},
                        _ = cancel.cancelled() => return Err(aios_common::Cancelled.into()),
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probes_started: u32,
}

/// Opens after `failure_threshold` consecutive transient failures. Once
/// `open_for` has elapsed, up to `half_open_probes` calls are let through;
/// a successful probe closes the breaker, a failed one reopens it.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    open_for: Duration,
    half_open_probes: u32,
    inner: Mutex<BreakerInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5), 2)
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_for: Duration, half_open_probes: u32) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            open_for,
            half_open_probes: half_open_probes.max(1),
            inner: Mutex::new(BreakerInner {
                consecutive_failures: 0,
                opened_at: None,
                probes_started: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn state_of(&self, inner: &BreakerInner) -> BreakerState {
        match inner.opened_at {
            None => BreakerState::Closed,
            Some(at) if at.elapsed() < self.open_for => BreakerState::Open,
            Some(_) => BreakerState::HalfOpen,
        }
    }

    pub fn state(&self) -> BreakerState {
        let inner = self.lock();
        self.state_of(&inner)
    }

    fn try_acquire(&self) -> bool {
        let mut inner = self.lock();
        match self.state_of(&inner) {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen if inner.probes_started < self.half_open_probes => {
                inner.probes_started += 1;
                true
            },
            BreakerState::HalfOpen => false,
        }
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probes_started = 0;
    }

    fn record_failure(&self) {
        let mut inner = self.lock();
        let half_open = self.state_of(&inner) == BreakerState::HalfOpen;
        inner.consecutive_failures += 1;
        if half_open || inner.consecutive_failures >= self.failure_threshold {
            if inner.opened_at.is_none() || half_open {
                warn!(failures = inner.consecutive_failures, "circuit breaker opened");
            }
            inner.opened_at = Some(Instant::now());
            inner.probes_started = 0;
        }
    }

    /// Run `op` unless the breaker is open. Only transient failures count
    /// towards opening it.
    pub async fn call<T, Fut>(&self, op: impl FnOnce() -> Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        if !self.try_acquire() {
            return Err(Error::CircuitOpen);
        }
        match op().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            },
            Err(e) => {
                if e.class().is_retryable() {
                    self.record_failure();
                }
                Err(e)
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::atomic::{AtomicU32, Ordering},
    };

    fn transient() -> Error {
        Error::KeychainTask("locked".into())
    }

    #[test]
    fn delays_grow_exponentially() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(50));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));

        let jittered = RetryPolicy::default().delay_for(1);
        assert!(jittered >= Duration::from_millis(100));
        assert!(jittered <= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_until_success() {
        let calls = &AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run(&CancellationToken::new(), || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget() {
        let calls = &AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(&CancellationToken::new(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(transient())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeychainTask(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run(&CancellationToken::new(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::EmptyKey)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyKey));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_opens_then_half_opens() {
        let breaker = CircuitBreaker::default();
        for _ in 0..3 {
            let _ = breaker.call(|| async { Err::<(), _>(transient()) }).await;
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        let err = breaker.call(|| async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, Error::CircuitOpen));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.call(|| async { Ok(()) }).await.unwrap();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_reopens() {
        let breaker = CircuitBreaker::default();
        for _ in 0..3 {
            let _ = breaker.call(|| async { Err::<(), _>(transient()) }).await;
        }
        tokio::time::advance(Duration::from_secs(6)).await;
        let _ = breaker.call(|| async { Err::<(), _>(transient()) }).await;
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[tokio::test]
    async fn non_transient_failures_do_not_trip() {
        let breaker = CircuitBreaker::default();
        for _ in 0..5 {
            let _ = breaker.call(|| async { Err::<(), _>(Error::EmptyValue) }).await;
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
    }
}
