//! Token bucket rate limiting for outbound requests.
//!
//! A single [`RateLimiter`] is shared by every check of a run. Tokens refill
//! continuously at `requests_per_second` up to `burst`. Callers reserve their
//! token before waiting, so the bucket may go negative and waiters are
//! released in arrival order instead of racing at each refill.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Slowest sustained rate a config may ask for.
pub const MIN_REQUESTS_PER_SECOND: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("wait for token cancelled")]
    Cancelled,
}

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained requests per second
    pub requests_per_second: f64,
    /// Tokens available at once
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            requests_per_second: 10.0,
            burst: 20,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    /// Available tokens, negative while callers hold reservations
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity: f64, refill_rate: f64) -> Self {
        Bucket {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token and return how long the caller must wait before using it.
    fn reserve(&mut self, now: Instant) -> Duration {
        self.refill(now);
        self.tokens -= 1.0;

        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            // Saturates for rates too slow to express as a Duration.
            Duration::try_from_secs_f64(-self.tokens / self.refill_rate).unwrap_or(Duration::MAX)
        }
    }

    fn refund(&mut self, now: Instant) {
        self.refill(now);
        self.tokens = (self.tokens + 1.0).min(self.capacity);
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        RateLimiter {
            bucket: Mutex::new(Bucket::new(
                f64::from(config.burst.max(1)),
                config.requests_per_second.max(f64::MIN_POSITIVE),
            )),
        }
    }

    /// Wait until a token is available.
    ///
    /// Fails with [`RateLimitError::Cancelled`] if `cancel` fires first; the
    /// reserved token is handed back in that case.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), RateLimitError> {
        if cancel.is_cancelled() {
            return Err(RateLimitError::Cancelled);
        }

        let wait = self.bucket.lock().await.reserve(Instant::now());
        if wait.is_zero() {
            return Ok(());
        }

        trace!(wait_ms = wait.as_millis() as u64, "waiting for rate limiter token");

        tokio::select! {
            _ = sleep(wait) => Ok(()),
            _ = cancel.cancelled() => {
                self.bucket.lock().await.refund(Instant::now());
                Err(RateLimitError::Cancelled)
            }
        }
    }

    /// Tokens available right now; negative while callers are queued.
    pub async fn available_tokens(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(Instant::now());
        bucket.tokens
    }
}
