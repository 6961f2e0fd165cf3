use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::redirect::Policy;
use reqwest::tls::TlsInfo;
use reqwest::{Client, Response};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::result::{HealthCheckResult, duration_ms};
use super::tls;
use crate::config::MonitorConfig;
use crate::error::ProbeError;
use crate::monitor::DomainCheck;
use crate::policy::{RateLimiter, RetryPolicy};
use crate::telemetry::ProbeObserver;

const MAX_REDIRECTS: usize = 10;

/// Prepend `https://` unless the domain already carries an http(s) scheme.
pub fn normalize_url(domain: &str) -> String {
    let domain = domain.trim();
    let lower = domain.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

fn build_client(timeout: Duration, user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .use_rustls_tls()
        .tls_info(true)
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
}

/// Probes a single domain over HTTP(S), retrying per the [`RetryPolicy`]
/// and pacing every attempt through the shared [`RateLimiter`].
pub struct HttpChecker {
    client: Client,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
    observer: Arc<dyn ProbeObserver>,
}

impl HttpChecker {
    pub fn new(
        config: &MonitorConfig,
        limiter: Arc<RateLimiter>,
        observer: Arc<dyn ProbeObserver>,
    ) -> Result<Self, reqwest::Error> {
        Ok(HttpChecker {
            client: build_client(config.timeout, &config.user_agent)?,
            retry: config.retry.clone(),
            limiter,
            observer,
        })
    }

    /// Probe `domain` until it is up, fails terminally or runs out of retries.
    ///
    /// Never fails: every outcome, cancellation included, is a populated
    /// result. The last attempt's result is returned.
    pub async fn check_domain(&self, domain: &str, cancel: &CancellationToken) -> HealthCheckResult {
        let url = normalize_url(domain);
        let mut attempt = 0;

        loop {
            if let Err(err) = self.limiter.acquire(cancel).await {
                return HealthCheckResult::failed(domain, &url, &ProbeError::from(err));
            }

            let (mut result, error) = self.attempt(domain, &url, cancel).await;
            self.observer.probe_completed(&result, attempt);

            if result.is_up() || !RetryPolicy::is_retryable(error.as_ref(), result.status_code) {
                return result;
            }
            if attempt >= self.retry.max_retries {
                self.observer.retries_exhausted(domain, attempt + 1);
                return result;
            }

            let backoff = self.retry.backoff(attempt);
            let reason = match &error {
                Some(err) => err.to_string(),
                None => format!("status {}", result.status_code),
            };
            self.observer.retry_scheduled(domain, attempt + 1, backoff, &reason);

            tokio::select! {
                _ = sleep(backoff) => {}
                _ = cancel.cancelled() => {
                    result.fail(&ProbeError::Cancelled);
                    return result;
                }
            }
            attempt += 1;
        }
    }

    /// One GET, with the transport error (if any) alongside the result.
    async fn attempt(
        &self,
        domain: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> (HealthCheckResult, Option<ProbeError>) {
        let mut result = HealthCheckResult::new(domain, url);
        let start = Instant::now();

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            sent = self.client.get(url).send() => sent.map_err(ProbeError::from_reqwest),
        };
        let mut response = match sent {
            Ok(response) => response,
            Err(error) => {
                result.response_time_ms = duration_ms(start.elapsed());
                result.fail(&error);
                return (result, Some(error));
            }
        };

        let elapsed = start.elapsed();
        let status_code = response.status().as_u16();
        let declared_length = response.content_length();
        let expiry = if result.is_ssl {
            response
                .extensions()
                .get::<TlsInfo>()
                .and_then(TlsInfo::peer_certificate)
                .and_then(|der| tls::certificate_expiry(der, Utc::now()))
        } else {
            None
        };

        let drained = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            drained = drain_body(&mut response) => Some(drained),
        };

        result.record_response(
            status_code,
            elapsed,
            declared_length.or(drained).unwrap_or_default(),
        );

        if let Some(expiry) = expiry {
            result.ssl_expiry = Some(expiry.not_after);
            result.ssl_days_left = Some(expiry.days_left);
            if expiry.expiring_soon() {
                self.observer.certificate_expiring(domain, expiry.days_left);
            }
        }

        if drained.is_none() {
            result.fail(&ProbeError::Cancelled);
            return (result, Some(ProbeError::Cancelled));
        }

        (result, None)
    }
}

impl DomainCheck for HttpChecker {
    async fn check(&self, domain: &str, cancel: &CancellationToken) -> HealthCheckResult {
        self.check_domain(domain, cancel).await
    }
}

/// Read and discard the body so the connection can go back to the pool.
async fn drain_body(response: &mut Response) -> u64 {
    let mut total = 0u64;
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => total += chunk.len() as u64,
            Ok(None) => break,
            Err(err) => {
                debug!(url = %response.url(), error = %err, "failed to drain response body");
                break;
            }
        }
    }
    total
}
