use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::chat::Requester;

#[derive(Debug)]
pub struct TokenBucket {
    last_refill: Instant,
    tokens: u32,
    capacity: u32,
    refill_interval: Duration,
}

impl TokenBucket {
    fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            last_refill: Instant::now(),
            tokens: capacity,
            capacity,
            refill_interval,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// A bucket that is full, or would be refilled on its next use, holds no
    /// state worth keeping.
    fn is_idle(&self, now: Instant) -> bool {
        self.tokens >= self.capacity
            || now.duration_since(self.last_refill) >= self.refill_interval
    }

    /// Refills to capacity once per elapsed interval.
    fn refill(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_refill) >= self.refill_interval {
            self.tokens = self.capacity;
            self.last_refill = now;
        }
    }
}

/// Limits how many games each requester may start per interval.
pub struct RateLimiter {
    buckets: DashMap<Requester, TokenBucket>,
    capacity: u32,
    refill_interval: Duration,
}

impl RateLimiter {
    /// A capacity of zero disables limiting.
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_interval,
        }
    }

    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    pub fn check(&self, requester: &Requester) -> bool {
        if self.capacity == 0 {
            return true;
        }

        let mut bucket = self
            .buckets
            .entry(requester.clone())
            .or_insert_with(|| TokenBucket::new(self.capacity, self.refill_interval));

        let allowed = bucket.try_consume();
        if !allowed {
            debug!("Rate limit exceeded for {}", requester);
        }
        allowed
    }

    /// Forgets requesters whose bucket is back to full. Returns how many
    /// were dropped.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_idle(now));
        before.saturating_sub(self.buckets.len())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
