use std::sync::Arc;

use redis::AsyncCommands;

use super::{RateLimitDecision, RateLimitEntry, RateLimitPolicy, now_ms};

/// Shared window counters backed by Redis INCR + PEXPIRE, for deployments
/// where every instance must draw from the same budget.
#[derive(Clone)]
pub struct RedisStore {
    client: Arc<redis::Client>,
}

fn window_key(identifier: &str) -> String {
    format!("rate_limit:{}", identifier)
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Counts via plain INCR, so unlike the memory store a rejected request
    /// still bumps the counter and `status` can report a count above the
    /// policy cap. The key keeps the expiry set by the window's first
    /// request, so the reset schedule is unaffected.
    pub async fn check(
        &self,
        identifier: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = window_key(identifier);

        let count: u32 = conn.incr(&key, 1).await?;
        if count == 1 {
            // First request of the window owns setting its expiry.
            let _: () = conn.pexpire(&key, policy.window.as_millis() as i64).await?;
        }

        let ttl_ms: i64 = conn.pttl(&key).await?;
        let reset_at_ms = now_ms() + ttl_ms.max(0) as u64;

        if count > policy.max_requests {
            Ok(RateLimitDecision {
                allowed: false,
                limit: policy.max_requests,
                remaining: 0,
                reset_at_ms,
            })
        } else {
            Ok(RateLimitDecision {
                allowed: true,
                limit: policy.max_requests,
                remaining: policy.max_requests - count,
                reset_at_ms,
            })
        }
    }

    pub async fn reset(&self, identifier: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(window_key(identifier)).await?;
        Ok(())
    }

    pub async fn status(
        &self,
        identifier: &str,
    ) -> Result<Option<RateLimitEntry>, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = window_key(identifier);

        let count: Option<u32> = conn.get(&key).await?;
        match count {
            Some(count) => {
                let ttl_ms: i64 = conn.pttl(&key).await?;
                Ok(Some(RateLimitEntry {
                    count,
                    reset_at_ms: now_ms() + ttl_ms.max(0) as u64,
                }))
            }
            None => Ok(None),
        }
    }
}
