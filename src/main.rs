use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use unicode_truncate::UnicodeTruncateStr;

use uptime_monitor::config::load_config;
use uptime_monitor::distribute::ReportDistributor;
use uptime_monitor::http_probe::{HealthStatus, HttpChecker};
use uptime_monitor::monitor::{CheckOrchestrator, MonitorReport, RunSettings};
use uptime_monitor::policy::RateLimiter;
use uptime_monitor::telemetry::{TracingObserver, init_tracing};

fn to_fixed_width(input: &str, width: usize) -> String {
    let (truncated, _) = input.unicode_truncate(width);
    format!("{:<width$}", truncated, width = width)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    if let Err(err) = init_tracing() {
        eprintln!("failed to initialise logging: {err}");
    }

    match run().await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %format!("{err:#}"), "uptime monitor failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let config = load_config().context("failed to load configuration")?;

    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    let checker = HttpChecker::new(&config, Arc::clone(&limiter), Arc::new(TracingObserver))
        .context("failed to build HTTP client")?;
    let distributor = ReportDistributor::new(&config, Arc::clone(&limiter))
        .context("failed to build distribution client")?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling outstanding checks");
            shutdown.cancel();
        }
    });

    let orchestrator = CheckOrchestrator::new(Arc::new(checker), RunSettings::from(&config));
    let report = orchestrator.run(&config.domains, &cancel).await;

    log_results(&report);

    // Distribution still runs after Ctrl-C so the partial report is kept.
    distributor.distribute(&report, &CancellationToken::new()).await;

    info!(
        total = report.total_checks,
        up = report.up_count,
        down = report.down_count,
        degraded = report.degraded_count,
        uptime_percent = %format!("{:.2}", report.uptime_percent),
        average_latency_ms = %format!("{:.2}", report.average_latency_ms),
        "monitoring complete"
    );

    Ok(if report.down_count > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn log_results(report: &MonitorReport) {
    let width = report
        .results
        .iter()
        .map(|result| result.domain.len())
        .max()
        .unwrap_or(10);

    for result in &report.results {
        let domain = to_fixed_width(&result.domain, width);
        let ssl = result
            .ssl_days_left
            .map(|days| format!("{days}d"))
            .unwrap_or_else(|| "N/A".to_string());
        match result.status {
            HealthStatus::Up => info!(
                "✅ {domain} status: {}, elapsed: {}ms, cert: {ssl}",
                result.status_code, result.response_time_ms
            ),
            HealthStatus::Degraded => warn!(
                "⚠️ {domain} status: {}, elapsed: {}ms, cert: {ssl}",
                result.status_code, result.response_time_ms
            ),
            HealthStatus::Down => warn!(
                "❌ {domain} status: {}, error: {}",
                result.status_code,
                result.error_message.as_deref().unwrap_or("none")
            ),
        }
    }
}
