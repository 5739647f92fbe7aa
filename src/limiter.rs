//! Bounded concurrency for file-handle-consuming operations.
//!
//! Hashing thousands of files at once runs the process out of file
//! descriptors. [`ConcurrencyLimiter`] admits at most `capacity` operations at
//! a time, in submission order. When an admitted operation fails with an
//! error the caller's predicate marks as retryable, the limiter retires that
//! operation's slot, backs off, and queues the operation again behind
//! everything already waiting. Slots come back one at a time once operations
//! succeed again.

use crate::config::RetryPolicy;
use crate::error::LimiterClosed;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

type RetryPredicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

pub struct ConcurrencyLimiter<E> {
    /// FIFO-fair gate. Its total permit count always equals `limit`.
    semaphore: Semaphore,
    capacity: usize,
    min_limit: usize,
    limit: AtomicUsize,
    successes_since_shrink: AtomicUsize,
    in_flight: AtomicUsize,
    retry: RetryPolicy,
    is_retryable: RetryPredicate<E>,
}

impl<E> ConcurrencyLimiter<E> {
    pub fn new(
        capacity: usize,
        retry: RetryPolicy,
        is_retryable: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
            min_limit: 1,
            limit: AtomicUsize::new(capacity),
            successes_since_shrink: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            retry,
            is_retryable: Box::new(is_retryable),
        }
    }

    /// Sets the floor the limit shrinks to. Clamped to `1..=capacity`.
    pub fn with_min_limit(mut self, min_limit: usize) -> Self {
        self.min_limit = min_limit.clamp(1, self.capacity);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of operations currently allowed to run at once.
    pub fn current_limit(&self) -> usize {
        self.limit.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Rejects queued and future operations with [`LimiterClosed`].
    /// Operations already running finish normally.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Runs `operation` once a slot is free, retrying it while it fails with
    /// a retryable error and the retry policy allows another attempt.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LimiterClosed>,
    {
        let mut retries = 0u32;

        loop {
            let permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| E::from(LimiterClosed))?;

            let result = {
                let _slot = InFlightGuard::enter(&self.in_flight);
                operation().await
            };

            match result {
                Ok(value) => {
                    drop(permit);
                    self.record_success();
                    return Ok(value);
                }
                Err(err) if (self.is_retryable)(&err) && self.retry.allows_retry(retries) => {
                    retries += 1;
                    if self.shrink() {
                        permit.forget();
                    } else {
                        drop(permit);
                    }
                    let delay = self.retry.delay_for_retry(retries);
                    log::debug!(
                        "Transient failure, retry {} in {:?} (limit {})",
                        retries,
                        delay,
                        self.current_limit()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Lowers the limit by one unless it is already at the floor. The caller
    /// forgets its permit when this returns true.
    fn shrink(&self) -> bool {
        self.successes_since_shrink.store(0, Ordering::SeqCst);
        let shrunk = self
            .limit
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |limit| {
                (limit > self.min_limit).then(|| limit - 1)
            });

        match shrunk {
            Ok(previous) => {
                log::warn!(
                    "Resource exhaustion, reducing concurrency from {} to {}",
                    previous,
                    previous - 1
                );
                true
            }
            Err(_) => false,
        }
    }

    /// Gives back one slot after `capacity` successes in a row at a reduced limit.
    fn record_success(&self) {
        if self.current_limit() >= self.capacity {
            return;
        }

        let count = self.successes_since_shrink.fetch_add(1, Ordering::SeqCst) + 1;
        if count < self.capacity {
            return;
        }
        if self
            .successes_since_shrink
            .compare_exchange(count, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let grown = self
            .limit
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |limit| {
                (limit < self.capacity).then(|| limit + 1)
            });
        if let Ok(previous) = grown {
            self.semaphore.add_permits(1);
            log::debug!("Restored concurrency from {} to {}", previous, previous + 1);
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Busy,
        Fatal,
        Closed,
    }

    impl From<LimiterClosed> for TestError {
        fn from(_: LimiterClosed) -> Self {
            TestError::Closed
        }
    }

    fn fast_retry(max_retries: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            initial_delay_ms: 1,
            max_delay_ms: 4,
            max_retries,
        }
    }

    fn limiter(capacity: usize, max_retries: Option<u32>) -> ConcurrencyLimiter<TestError> {
        ConcurrencyLimiter::new(capacity, fast_retry(max_retries), |e| *e == TestError::Busy)
    }

    #[tokio::test]
    async fn never_exceeds_capacity() {
        let limiter = limiter(5, None);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..50).map(|i| {
            let running = running.clone();
            let peak = peak.clone();
            let limiter = &limiter;
            async move {
                limiter
                    .run(|| {
                        let running = running.clone();
                        let peak = peak.clone();
                        async move {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            assert!(limiter.in_flight() <= limiter.capacity());
                            tokio::time::sleep(Duration::from_millis(2)).await;
                            running.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, TestError>(i)
                        }
                    })
                    .await
            }
        });

        let results = join_all(tasks).await;
        assert_eq!(results.len(), 50);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(peak.load(Ordering::SeqCst) <= 5);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let limiter = limiter(10, None);

        let tasks = (0..100).map(|i| {
            let failed_once = Arc::new(AtomicBool::new(false));
            let limiter = &limiter;
            async move {
                limiter
                    .run(|| {
                        let failed_once = failed_once.clone();
                        async move {
                            if !failed_once.swap(true, Ordering::SeqCst) {
                                Err(TestError::Busy)
                            } else {
                                Ok(i)
                            }
                        }
                    })
                    .await
            }
        });

        let results: Vec<_> = join_all(tasks).await;
        let values: Vec<usize> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..100).collect::<Vec<_>>());
        assert!(limiter.current_limit() >= 1);
        assert!(limiter.current_limit() <= limiter.capacity());
    }

    #[tokio::test]
    async fn fatal_errors_propagate_without_retry() {
        let limiter = limiter(4, None);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), _> = limiter
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Fatal) }
            })
            .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(limiter.current_limit(), 4);
    }

    #[tokio::test]
    async fn retry_budget_is_honoured() {
        let limiter = limiter(4, Some(2));
        let attempts = AtomicUsize::new(0);

        let result: Result<(), _> = limiter
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Busy) }
            })
            .await;

        assert_eq!(result, Err(TestError::Busy));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn limit_shrinks_on_exhaustion_and_recovers() {
        let limiter = limiter(4, None);
        let attempts = AtomicUsize::new(0);

        let value = limiter
            .run(|| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(TestError::Busy)
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(limiter.current_limit(), 2);

        for _ in 0..4 {
            limiter.run(|| async { Ok::<_, TestError>(()) }).await.unwrap();
        }
        assert_eq!(limiter.current_limit(), 3);

        for _ in 0..4 {
            limiter.run(|| async { Ok::<_, TestError>(()) }).await.unwrap();
        }
        assert_eq!(limiter.current_limit(), 4);
    }

    #[tokio::test]
    async fn limit_never_drops_below_floor() {
        let limiter = limiter(3, Some(10)).with_min_limit(2);

        let _ = limiter
            .run(|| async { Err::<(), _>(TestError::Busy) })
            .await;

        assert_eq!(limiter.current_limit(), 2);
    }

    #[tokio::test]
    async fn closed_limiter_rejects_work() {
        let limiter = limiter(2, None);
        limiter.close();

        let result = limiter.run(|| async { Ok::<_, TestError>(1) }).await;
        assert_eq!(result, Err(TestError::Closed));
    }
}
