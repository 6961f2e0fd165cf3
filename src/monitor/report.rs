use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http_probe::{HealthCheckResult, HealthStatus};

/// Aggregate of one run, results in input domain order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub service: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub environment: String,

    pub total_checks: usize,

    #[serde(rename = "uptime_count")]
    pub up_count: usize,

    #[serde(rename = "downtime_count")]
    pub down_count: usize,

    pub degraded_count: usize,

    pub uptime_percent: f64,

    pub average_latency_ms: f64,

    pub timestamp: DateTime<Utc>,

    pub results: Vec<HealthCheckResult>,
}

impl MonitorReport {
    /// Fold results into counts, uptime and mean latency, timestamped now.
    ///
    /// Failed checks count towards the latency mean with whatever time they took.
    pub fn from_results(service: &str, environment: &str, results: Vec<HealthCheckResult>) -> Self {
        let mut up_count = 0;
        let mut down_count = 0;
        let mut degraded_count = 0;
        let mut total_latency: u128 = 0;

        for result in &results {
            total_latency += u128::from(result.response_time_ms);
            match result.status {
                HealthStatus::Up => up_count += 1,
                HealthStatus::Down => down_count += 1,
                HealthStatus::Degraded => degraded_count += 1,
            }
        }

        let total_checks = results.len();
        let (uptime_percent, average_latency_ms) = if total_checks == 0 {
            (0.0, 0.0)
        } else {
            (
                up_count as f64 / total_checks as f64 * 100.0,
                total_latency as f64 / total_checks as f64,
            )
        };

        MonitorReport {
            service: service.to_string(),
            environment: environment.to_string(),
            total_checks,
            up_count,
            down_count,
            degraded_count,
            uptime_percent,
            average_latency_ms,
            timestamp: Utc::now(),
            results,
        }
    }

    /// Anything down or degraded warrants a notification.
    pub fn needs_attention(&self) -> bool {
        self.down_count > 0 || self.degraded_count > 0
    }

    /// Results that are not up.
    pub fn failing(&self) -> impl Iterator<Item = &HealthCheckResult> {
        self.results.iter().filter(|result| !result.is_up())
    }
}
