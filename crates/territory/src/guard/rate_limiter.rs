//! Token-bucket rate limiting for outbound calls.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

const DEFAULT_BURST: f64 = 10.0;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
    per_second: f64,
    capacity: f64,
}

impl Bucket {
    fn new(requests_per_minute: u32, capacity: f64) -> Self {
        Self {
            tokens: capacity,
            refilled_at: Instant::now(),
            per_second: f64::from(requests_per_minute.max(1)) / 60.0,
            capacity,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.refilled_at).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.per_second).min(self.capacity);
        self.refilled_at = now;
    }

    /// Takes a token, or returns how long until one is available.
    fn take(&mut self) -> Result<(), Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / self.per_second))
        }
    }
}

/// Per-source token buckets sharing one requests-per-minute budget.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    requests_per_minute: u32,
    burst: f64,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self::with_burst(requests_per_minute, DEFAULT_BURST)
    }

    pub fn with_burst(requests_per_minute: u32, burst: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            requests_per_minute,
            burst: burst.max(1.0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn take(&self, source: &str) -> Result<(), Duration> {
        let mut buckets = self.lock();
        buckets
            .entry(source.to_string())
            .or_insert_with(|| Bucket::new(self.requests_per_minute, self.burst))
            .take()
    }

    pub fn try_acquire(&self, source: &str) -> bool {
        self.take(source).is_ok()
    }

    /// Waits for a token, giving up if one would not arrive before `deadline`.
    pub async fn acquire_before(&self, source: &str, deadline: Instant) -> bool {
        loop {
            let wait = match self.take(source) {
                Ok(()) => return true,
                Err(wait) => wait,
            };
            if Instant::now() + wait > deadline {
                debug!("Rate limit for '{}' would outlast the deadline", source);
                return false;
            }
            debug!("Rate limited '{}', waiting {:?}", source, wait);
            tokio::time::sleep(wait).await;
        }
    }
}
