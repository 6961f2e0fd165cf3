//! Everything that happens to a [`MonitorReport`] after a run: a JSON file on
//! disk, a POST to the collector API, chat webhooks and an SMTP fallback.

mod api;
mod email;
mod file;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

pub use email::FILE_FAILURE_SUBJECT;
pub use webhook::{DISCORD_MESSAGE_LIMIT, discord_payload, slack_payload};

use crate::config::{DistributionConfig, MonitorConfig};
use crate::error::DistributionError;
use crate::monitor::MonitorReport;
use crate::policy::{RateLimiter, RetryPolicy};

/// Ships finished reports to every configured destination.
pub struct ReportDistributor {
    config: DistributionConfig,
    client: Client,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
    user_agent: String,
}

impl ReportDistributor {
    pub fn new(config: &MonitorConfig, limiter: Arc<RateLimiter>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(ReportDistributor {
            config: config.distribution.clone(),
            client,
            retry: config.retry.clone(),
            limiter,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Save, submit, then notify. Each failure is logged and never stops the
    /// following step.
    pub async fn distribute(&self, report: &MonitorReport, cancel: &CancellationToken) {
        if let Err(err) = self.save_report(report).await {
            error!(error = %err, "failed to save report");
        }

        match self.submit_to_api(report, cancel).await {
            Ok(()) => {}
            Err(DistributionError::NotConfigured(what)) => {
                info!("{what} is not configured, skipping submission")
            }
            Err(err) => error!(error = %err, "failed to submit report"),
        }

        self.send_notifications(report).await;
    }
}

/// Host part of `url` for logging; webhook paths carry secrets.
fn redacted_host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "<invalid url>".to_string())
}
