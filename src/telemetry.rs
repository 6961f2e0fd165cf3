//! Structured events emitted while probing, and the subscriber setup for the binary.

use std::time::Duration;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::http_probe::HealthCheckResult;

/// Receives probe lifecycle events.
///
/// The checker reports through this trait instead of a concrete logger so
/// embedders can collect events their own way. Every method defaults to a no-op.
pub trait ProbeObserver: Send + Sync {
    /// An attempt finished, successfully or not. `attempt` is 0-based.
    fn probe_completed(&self, _result: &HealthCheckResult, _attempt: u32) {}

    /// Another attempt will follow after `backoff`.
    fn retry_scheduled(&self, _domain: &str, _next_attempt: u32, _backoff: Duration, _reason: &str) {}

    /// The last allowed attempt failed; its result stands.
    fn retries_exhausted(&self, _domain: &str, _attempts: u32) {}

    fn certificate_expiring(&self, _domain: &str, _days_left: i64) {}
}

/// Forwards probe events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProbeObserver for TracingObserver {
    fn probe_completed(&self, result: &HealthCheckResult, attempt: u32) {
        debug!(
            domain = %result.domain,
            url = %result.url,
            status = %result.status,
            status_code = result.status_code,
            response_time_ms = result.response_time_ms,
            attempt,
            error = result.error_message.as_deref().unwrap_or_default(),
            "probe completed"
        );
    }

    fn retry_scheduled(&self, domain: &str, next_attempt: u32, backoff: Duration, reason: &str) {
        info!(
            domain,
            next_attempt,
            backoff_ms = backoff.as_millis() as u64,
            reason,
            "retrying probe"
        );
    }

    fn retries_exhausted(&self, domain: &str, attempts: u32) {
        warn!(domain, attempts, "max retries reached");
    }

    fn certificate_expiring(&self, domain: &str, days_left: i64) {
        warn!(domain, days_left, "SSL certificate expiring soon");
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `LOG_LEVEL` (debug, info, warn,
/// error) picks the level. Output is JSON unless `LOG_FORMAT=pretty`.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = match std::env::var("LOG_LEVEL")
        .unwrap_or_default()
        .to_ascii_lowercase()
        .as_str()
    {
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("pretty")) {
        builder.try_init()
    } else {
        builder.json().try_init()
    }
}
