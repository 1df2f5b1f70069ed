use std::collections::HashMap;
use std::sync::Mutex;

use super::{RateLimitDecision, RateLimitEntry, RateLimitPolicy, now_ms};

/// Per-process window counters. Each server instance keeps its own budget;
/// deployments with several instances behind a load balancer should use the
/// Redis store instead so the limit applies globally.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, identifier: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let now = now_ms();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        match entries.get_mut(identifier) {
            Some(entry) if entry.reset_at_ms > now => {
                if entry.count < policy.max_requests {
                    entry.count += 1;
                    RateLimitDecision {
                        allowed: true,
                        limit: policy.max_requests,
                        remaining: policy.max_requests - entry.count,
                        reset_at_ms: entry.reset_at_ms,
                    }
                } else {
                    RateLimitDecision {
                        allowed: false,
                        limit: policy.max_requests,
                        remaining: 0,
                        reset_at_ms: entry.reset_at_ms,
                    }
                }
            }
            _ => {
                let entry = RateLimitEntry {
                    count: 1,
                    reset_at_ms: now + policy.window.as_millis() as u64,
                };
                entries.insert(identifier.to_string(), entry);
                RateLimitDecision {
                    allowed: true,
                    limit: policy.max_requests,
                    remaining: policy.max_requests.saturating_sub(1),
                    reset_at_ms: entry.reset_at_ms,
                }
            }
        }
    }

    pub fn reset(&self, identifier: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(identifier);
    }

    pub fn status(&self, identifier: &str) -> Option<RateLimitEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(identifier)
            .copied()
    }

    pub fn sweep(&self) -> usize {
        let now = now_ms();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.reset_at_ms > now);
        before - entries.len()
    }
}
