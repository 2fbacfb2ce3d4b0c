//! Token-bucket rate limiting keyed by `client_id`.
//!
//! Each bucket is protected by its own lock (via `DashMap`'s internal
//! sharding) rather than one lock over the whole map, per spec.md §5's
//! "fine-grained locks keyed by client" requirement. Idle buckets are
//! evicted on a TTL so the map cannot be grown without bound by an
//! attacker rotating `client_id`s (spec.md §9 Design Notes).

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::RateLimitConfig;

struct Bucket {
    tokens: f64,
    last_refill_ms: u64,
    last_seen_ms: u64,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, Mutex<Bucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    fn refill_rate_per_ms(&self) -> f64 {
        self.config.max_requests as f64 / self.config.window_ms.max(1) as f64
    }

    /// Attempts to take one token for `client_id` at `now_ms`. Returns
    /// the tokens remaining after the attempt (rounded down), or `None`
    /// if the bucket was empty (request must be rejected).
    pub fn try_acquire(&self, client_id: &str, now_ms: u64) -> Option<u64> {
        let capacity = self.config.max_requests as f64;
        let rate = self.refill_rate_per_ms();

        let entry = self
            .buckets
            .entry(client_id.to_string())
            .or_insert_with(|| {
                Mutex::new(Bucket {
                    tokens: capacity,
                    last_refill_ms: now_ms,
                    last_seen_ms: now_ms,
                })
            });
        let mut bucket = entry.lock();

        let elapsed = now_ms.saturating_sub(bucket.last_refill_ms) as f64;
        bucket.tokens = (bucket.tokens + elapsed * rate).min(capacity);
        bucket.last_refill_ms = now_ms;
        bucket.last_seen_ms = now_ms;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Some(bucket.tokens as u64)
        } else {
            None
        }
    }

    /// Drops buckets whose last activity is older than `idle_ms`.
    pub fn evict_idle(&self, now_ms: u64, idle_ms: u64) {
        self.buckets
            .retain(|_, bucket| now_ms.saturating_sub(bucket.lock().last_seen_ms) < idle_ms);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
