use std::time::Duration;

use serde::Deserialize;

use crate::config::duration;
use crate::error::ProbeError;

/// Status codes worth another attempt: rate limiting and transient server failures.
const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Exponential backoff parameters.
///
/// `max_retries` counts retries, so a policy with `max_retries = 3` makes at
/// most four attempts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,

    #[serde(deserialize_with = "duration::deserialize")]
    pub initial_backoff: Duration,

    #[serde(deserialize_with = "duration::deserialize")]
    pub max_backoff: Duration,

    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(secs)
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// A transport error decides on its own; without one only the status code counts.
    pub fn is_retryable(error: Option<&ProbeError>, status_code: u16) -> bool {
        match error {
            Some(err) => err.is_transient(),
            None => Self::is_retryable_status(status_code),
        }
    }

    pub fn is_retryable_status(status_code: u16) -> bool {
        RETRYABLE_STATUS_CODES.contains(&status_code)
    }
}
