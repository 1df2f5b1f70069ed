//! Fixed-window request limiter keyed by client identity.
//!
//! The window algorithm is a plain fixed-window counter: up to
//! `max_requests` per `window`, reset wholesale when the window elapses. A
//! burst straddling a window boundary can therefore see up to twice the
//! configured budget; stricter strategies would slot in as another
//! [`RateLimitStore`] variant without changing the decision shape.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

mod memory;
mod policy;
mod redis_store;

pub use memory::MemoryStore;
pub use policy::{EndpointClass, PolicyTable};
pub use redis_store::RedisStore;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

/// Counter state for one identifier within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at_ms: u64,
}

/// Outcome of a single `check`. Never an error: exhaustion is a normal
/// result the caller translates into a 429.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: u64,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up, for `Retry-After`.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000)
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Backing store for window counters. `Memory` is per-process; `Redis`
/// shares one window space across instances behind a load balancer.
pub enum RateLimitStore {
    Memory(MemoryStore),
    Redis(RedisStore),
}

pub struct RateLimiter {
    store: RateLimitStore,
}

impl RateLimiter {
    pub fn new(store: RateLimitStore) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(RateLimitStore::Memory(MemoryStore::new()))
    }

    /// Counts a request for `identifier` against `policy`.
    ///
    /// A fresh or expired window admits the request with a full new budget;
    /// a live window admits until `max_requests` is reached. The request
    /// that would overflow is rejected without being counted, and the
    /// decision carries the live window's reset time. If the shared store
    /// is unreachable the request is admitted rather than failing closed.
    pub async fn check(&self, identifier: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        match &self.store {
            RateLimitStore::Memory(store) => store.check(identifier, policy),
            RateLimitStore::Redis(store) => match store.check(identifier, policy).await {
                Ok(decision) => decision,
                Err(err) => {
                    warn!("rate limit store unavailable, admitting request: {}", err);
                    RateLimitDecision {
                        allowed: true,
                        limit: policy.max_requests,
                        remaining: policy.max_requests.saturating_sub(1),
                        reset_at_ms: now_ms() + policy.window.as_millis() as u64,
                    }
                }
            },
        }
    }

    /// Drops the identifier's window so it starts fresh immediately.
    /// Administrative/testing override.
    pub async fn reset(&self, identifier: &str) {
        match &self.store {
            RateLimitStore::Memory(store) => store.reset(identifier),
            RateLimitStore::Redis(store) => {
                if let Err(err) = store.reset(identifier).await {
                    warn!("failed to reset rate limit for {}: {}", identifier, err);
                }
            }
        }
    }

    /// Read-only introspection; expired entries are reported as-is until
    /// the sweeper or the next `check` replaces them.
    pub async fn status(&self, identifier: &str) -> Option<RateLimitEntry> {
        match &self.store {
            RateLimitStore::Memory(store) => store.status(identifier),
            RateLimitStore::Redis(store) => match store.status(identifier).await {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("failed to read rate limit status for {}: {}", identifier, err);
                    None
                }
            },
        }
    }

    /// Deletes entries whose window has elapsed, returning how many were
    /// removed. Redis expires its keys itself, so this is a no-op there.
    pub async fn sweep(&self) -> usize {
        match &self.store {
            RateLimitStore::Memory(store) => store.sweep(),
            RateLimitStore::Redis(_) => 0,
        }
    }
}

/// Keeps the background sweep alive; aborts the task when dropped so tests
/// and shutdown paths do not leak timers.
pub struct SweeperHandle(tokio::task::JoinHandle<()>);

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Spawns the periodic sweep that bounds memory growth from identities
/// that stop sending requests. Correctness does not depend on it: `check`
/// treats an expired entry as absent on its own.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) -> SweeperHandle {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep().await;
            if removed > 0 {
                debug!("rate limiter sweep removed {} expired entries", removed);
            }
        }
    });
    SweeperHandle(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_requests: u32, window_ms: u64) -> RateLimitPolicy {
        RateLimitPolicy {
            max_requests,
            window: Duration::from_millis(window_ms),
        }
    }

    #[tokio::test]
    async fn remaining_counts_down_then_rejects() {
        let limiter = RateLimiter::in_memory();
        let policy = policy(3, 1000);

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check("user:abc", &policy).await;
            assert!(decision.allowed);
            assert_eq!(decision.limit, 3);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let denied = limiter.check("user:abc", &policy).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
    }

    #[tokio::test]
    async fn window_elapsing_grants_a_fresh_budget() {
        let limiter = RateLimiter::in_memory();
        let policy = policy(3, 50);

        for _ in 0..3 {
            assert!(limiter.check("user:abc", &policy).await.allowed);
        }
        assert!(!limiter.check("user:abc", &policy).await.allowed);

        tokio::time::sleep(Duration::from_millis(70)).await;

        let fresh = limiter.check("user:abc", &policy).await;
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 2);
    }

    #[tokio::test]
    async fn rejection_reports_the_live_window_not_a_new_one() {
        let limiter = RateLimiter::in_memory();
        let policy = policy(1, 60_000);

        let first = limiter.check("user:abc", &policy).await;
        let denied = limiter.check("user:abc", &policy).await;
        assert!(!denied.allowed);
        assert_eq!(denied.reset_at_ms, first.reset_at_ms);

        // The overflowing request was not counted.
        let entry = limiter.status("user:abc").await.unwrap();
        assert_eq!(entry.count, 1);
    }

    #[tokio::test]
    async fn identifiers_do_not_share_windows() {
        let limiter = RateLimiter::in_memory();
        let policy = policy(1, 60_000);

        assert!(limiter.check("user:abc", &policy).await.allowed);
        assert!(!limiter.check("user:abc", &policy).await.allowed);
        assert!(limiter.check("203.0.113.9", &policy).await.allowed);
    }

    #[tokio::test]
    async fn reset_allows_an_immediate_fresh_window() {
        let limiter = RateLimiter::in_memory();
        let policy = policy(1, 60_000);

        assert!(limiter.check("user:abc", &policy).await.allowed);
        assert!(!limiter.check("user:abc", &policy).await.allowed);

        limiter.reset("user:abc").await;
        assert!(limiter.status("user:abc").await.is_none());

        let fresh = limiter.check("user:abc", &policy).await;
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 0);
    }

    #[tokio::test]
    async fn status_reads_without_counting() {
        let limiter = RateLimiter::in_memory();
        let policy = policy(5, 60_000);

        assert!(limiter.status("user:abc").await.is_none());
        limiter.check("user:abc", &policy).await;
        limiter.status("user:abc").await;
        limiter.status("user:abc").await;

        let entry = limiter.status("user:abc").await.unwrap();
        assert_eq!(entry.count, 1);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let limiter = RateLimiter::in_memory();

        limiter.check("short-lived", &policy(5, 30)).await;
        limiter.check("long-lived", &policy(5, 60_000)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(limiter.sweep().await, 1);
        assert!(limiter.status("short-lived").await.is_none());
        assert!(limiter.status("long-lived").await.is_some());
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset_at_ms: 10_500,
        };
        assert_eq!(decision.retry_after_secs(10_000), 1);
        assert_eq!(decision.retry_after_secs(9_000), 2);
        assert_eq!(decision.retry_after_secs(11_000), 0);
    }
}
