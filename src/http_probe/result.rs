use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// 2xx responses slower than this count as degraded.
pub const ACCEPT_THRESHOLD: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Degraded,
    Down,
}

impl HealthStatus {
    /// Map a response onto a health status.
    ///
    /// 3xx counts as up and every 4xx as degraded, auth failures included.
    pub fn classify(status_code: u16, elapsed: Duration) -> Self {
        match status_code {
            200..=299 if elapsed >= ACCEPT_THRESHOLD => HealthStatus::Degraded,
            200..=299 => HealthStatus::Up,
            300..=399 => HealthStatus::Up,
            400..=499 => HealthStatus::Degraded,
            _ => HealthStatus::Down,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Up => "up",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Down => "down",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of probing one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub domain: String,

    /// URL actually requested after normalization.
    pub url: String,

    pub status: HealthStatus,

    /// 0 when no response was received.
    pub status_code: u16,

    pub response_time_ms: u64,

    pub is_ssl: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_expiry: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_days_left: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub content_length: u64,

    /// When the attempt started.
    #[serde(rename = "timestamp")]
    pub started_at: DateTime<Utc>,

    /// When the attempt finished.
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    /// A fresh result for an attempt starting now; down until a response says otherwise.
    pub fn new(domain: &str, url: &str) -> Self {
        let now = Utc::now();
        HealthCheckResult {
            domain: domain.to_string(),
            url: url.to_string(),
            status: HealthStatus::Down,
            status_code: 0,
            response_time_ms: 0,
            is_ssl: url.to_ascii_lowercase().starts_with("https://"),
            ssl_expiry: None,
            ssl_days_left: None,
            error_message: None,
            content_length: 0,
            started_at: now,
            checked_at: now,
        }
    }

    /// A down result for a domain that never produced a response.
    pub fn failed(domain: &str, url: &str, error: &ProbeError) -> Self {
        let mut result = HealthCheckResult::new(domain, url);
        result.fail(error);
        result
    }

    /// Record a response and classify it.
    pub fn record_response(&mut self, status_code: u16, elapsed: Duration, content_length: u64) {
        self.status_code = status_code;
        self.response_time_ms = duration_ms(elapsed);
        self.content_length = content_length;
        self.status = HealthStatus::classify(status_code, elapsed);
        self.checked_at = Utc::now();
    }

    /// Mark the result down with `error`, keeping whatever was observed so far.
    pub fn fail(&mut self, error: &ProbeError) {
        self.status = HealthStatus::Down;
        self.error_message = Some(error.to_string());
        self.checked_at = Utc::now();
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

pub(crate) fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
