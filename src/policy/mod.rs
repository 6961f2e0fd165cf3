//! Failure-handling policy shared by every outbound request of a run.
//!
//! [`retry::RetryPolicy`] decides whether and when to try again,
//! [`rate_limit::RateLimiter`] bounds how fast anything goes out at all.

pub mod rate_limit;
pub mod retry;

pub use rate_limit::{MIN_REQUESTS_PER_SECOND, RateLimitConfig, RateLimitError, RateLimiter};
pub use retry::RetryPolicy;
