use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use super::ReportDistributor;
use crate::error::DistributionError;
use crate::monitor::MonitorReport;
use crate::policy::RetryPolicy;

const TARGET: &str = "report API";

impl ReportDistributor {
    /// POST the report to the collector API.
    ///
    /// Every attempt waits for a rate limiter token. Transport errors and
    /// retryable statuses back off and retry; any other status of 400 or
    /// above fails immediately.
    pub async fn submit_to_api(
        &self,
        report: &MonitorReport,
        cancel: &CancellationToken,
    ) -> Result<(), DistributionError> {
        let raw_url = self
            .config
            .api
            .url
            .as_deref()
            .ok_or(DistributionError::NotConfigured(TARGET))?;
        let url = Url::parse(raw_url).map_err(|source| DistributionError::InvalidUrl {
            url: raw_url.to_string(),
            source,
        })?;
        let body = serde_json::to_vec(report)?;

        let mut attempt = 0;
        loop {
            self.limiter.acquire(cancel).await?;

            let mut request = self
                .client
                .post(url.clone())
                .header(CONTENT_TYPE, "application/json")
                .header(USER_AGENT, &self.user_agent)
                .body(body.clone());
            if let Some(key) = &self.config.api.key {
                request = request.header(AUTHORIZATION, format!("Bearer {key}"));
            }

            let error = match request.send().await {
                Ok(response) if response.status().as_u16() < 400 => {
                    info!(
                        status = response.status().as_u16(),
                        attempts = attempt + 1,
                        "report submitted"
                    );
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    let error = DistributionError::Status {
                        target: TARGET,
                        status,
                        body,
                    };
                    if !RetryPolicy::is_retryable_status(status) {
                        return Err(error);
                    }
                    error
                }
                Err(err) => DistributionError::from(err),
            };

            if attempt >= self.retry.max_retries {
                warn!(attempts = attempt + 1, error = %error, "report submission failed");
                return Err(error);
            }

            let backoff = self.retry.backoff(attempt);
            warn!(
                attempt = attempt + 1,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "retrying report submission"
            );
            tokio::select! {
                _ = sleep(backoff) => {}
                _ = cancel.cancelled() => return Err(DistributionError::Cancelled),
            }
            attempt += 1;
        }
    }
}
