use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::report::MonitorReport;
use crate::config::MonitorConfig;
use crate::error::ProbeError;
use crate::http_probe::{HealthCheckResult, normalize_url};

/// Checks one domain to completion.
///
/// Implementations must always produce a result; failures are data, not errors.
pub trait DomainCheck: Send + Sync + 'static {
    fn check(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = HealthCheckResult> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub service: String,
    pub environment: String,
    /// Maximum number of checks in flight.
    pub concurrency: usize,
    /// Budget for the whole run.
    pub run_deadline: Duration,
}

impl From<&MonitorConfig> for RunSettings {
    fn from(config: &MonitorConfig) -> Self {
        RunSettings {
            service: config.service.clone(),
            environment: config.environment.clone(),
            concurrency: config.concurrency,
            run_deadline: config.run_deadline,
        }
    }
}

/// Runs a [`DomainCheck`] over every domain with bounded parallelism and
/// folds the results into a [`MonitorReport`].
pub struct CheckOrchestrator<C> {
    checker: Arc<C>,
    settings: RunSettings,
}

impl<C: DomainCheck> CheckOrchestrator<C> {
    pub fn new(checker: Arc<C>, settings: RunSettings) -> Self {
        CheckOrchestrator { checker, settings }
    }

    /// Check every domain and build the report.
    ///
    /// Returns once every domain has a result. When the run deadline elapses,
    /// or `cancel` fires, outstanding checks are cancelled and recorded as
    /// down. Result order always matches `domains`.
    pub async fn run(&self, domains: &[String], cancel: &CancellationToken) -> MonitorReport {
        let started = Instant::now();
        let concurrency = self.settings.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let run_token = cancel.child_token();

        info!(
            domains = domains.len(),
            concurrency,
            deadline_ms = self.settings.run_deadline.as_millis() as u64,
            "starting health checks"
        );

        let mut tasks = JoinSet::new();
        for (index, domain) in domains.iter().cloned().enumerate() {
            let checker = Arc::clone(&self.checker);
            let semaphore = Arc::clone(&semaphore);
            let run_token = run_token.clone();
            let parent = cancel.clone();

            tasks.spawn(async move {
                let result = tokio::select! {
                    biased;
                    _ = run_token.cancelled() => {
                        let reason = if parent.is_cancelled() {
                            ProbeError::Cancelled
                        } else {
                            ProbeError::DeadlineExceeded
                        };
                        HealthCheckResult::failed(&domain, &normalize_url(&domain), &reason)
                    }
                    result = async {
                        match semaphore.acquire_owned().await {
                            Ok(_permit) => checker.check(&domain, &run_token).await,
                            Err(_) => HealthCheckResult::failed(
                                &domain,
                                &normalize_url(&domain),
                                &ProbeError::Cancelled,
                            ),
                        }
                    } => result,
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<HealthCheckResult>> = vec![None; domains.len()];
        let deadline = sleep(self.settings.run_deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, result))) => slots[index] = Some(result),
                    Some(Err(err)) => error!(error = %err, "health check task failed"),
                    None => break,
                },
                _ = &mut deadline, if !run_token.is_cancelled() => {
                    warn!(
                        deadline_ms = self.settings.run_deadline.as_millis() as u64,
                        pending = tasks.len(),
                        "run deadline exceeded, cancelling outstanding checks"
                    );
                    run_token.cancel();
                }
            }
        }

        let results = slots
            .into_iter()
            .zip(domains)
            .map(|(slot, domain)| {
                slot.unwrap_or_else(|| {
                    HealthCheckResult::failed(
                        domain,
                        &normalize_url(domain),
                        &ProbeError::TaskFailed("no result recorded".to_string()),
                    )
                })
            })
            .collect();

        let report =
            MonitorReport::from_results(&self.settings.service, &self.settings.environment, results);

        info!(
            total = report.total_checks,
            up = report.up_count,
            down = report.down_count,
            degraded = report.degraded_count,
            uptime_percent = report.uptime_percent,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "health checks completed"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::http_probe::HealthStatus;

    /// Answers 200 after a per-domain delay, tracking how many checks overlap.
    struct SimulatedCheck {
        delays: HashMap<String, Duration>,
        default_delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        completion_order: std::sync::Mutex<Vec<String>>,
    }

    impl SimulatedCheck {
        fn uniform(delay: Duration) -> Self {
            SimulatedCheck {
                delays: HashMap::new(),
                default_delay: delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                completion_order: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn with_delays(delays: &[(&str, Duration)]) -> Self {
            SimulatedCheck {
                delays: delays
                    .iter()
                    .map(|(domain, delay)| (domain.to_string(), *delay))
                    .collect(),
                ..Self::uniform(Duration::ZERO)
            }
        }
    }

    impl DomainCheck for SimulatedCheck {
        async fn check(&self, domain: &str, cancel: &CancellationToken) -> HealthCheckResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = self.delays.get(domain).copied().unwrap_or(self.default_delay);
            let mut result = HealthCheckResult::new(domain, &normalize_url(domain));
            tokio::select! {
                _ = sleep(delay) => result.record_response(200, delay.min(Duration::from_millis(100)), 0),
                _ = cancel.cancelled() => result.fail(&ProbeError::Cancelled),
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completion_order.lock().unwrap().push(domain.to_string());
            result
        }
    }

    fn settings(concurrency: usize, run_deadline: Duration) -> RunSettings {
        RunSettings {
            service: "Uptime Monitor".to_string(),
            environment: "test".to_string(),
            concurrency,
            run_deadline,
        }
    }

    fn domains(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        let checker = Arc::new(SimulatedCheck::uniform(Duration::from_secs(1)));
        let orchestrator =
            CheckOrchestrator::new(Arc::clone(&checker), settings(2, Duration::from_secs(60)));
        let domains = domains(&["a", "b", "c", "d", "e"]);

        let start = Instant::now();
        let report = orchestrator.run(&domains, &CancellationToken::new()).await;
        let elapsed = start.elapsed();

        assert_eq!(checker.peak.load(Ordering::SeqCst), 2);
        assert_eq!(report.total_checks, 5);
        assert_eq!(report.up_count, 5);
        // ceil(5 / 2) rounds of one second each
        assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(3100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn results_keep_input_order() {
        let checker = Arc::new(SimulatedCheck::with_delays(&[
            ("a", Duration::from_millis(300)),
            ("b", Duration::from_millis(200)),
            ("c", Duration::from_millis(100)),
        ]));
        let orchestrator =
            CheckOrchestrator::new(Arc::clone(&checker), settings(3, Duration::from_secs(60)));

        let report = orchestrator
            .run(&domains(&["a", "b", "c"]), &CancellationToken::new())
            .await;

        assert_eq!(*checker.completion_order.lock().unwrap(), vec!["c", "b", "a"]);
        let order: Vec<_> = report.results.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_slow_checks() {
        let checker = Arc::new(SimulatedCheck::with_delays(&[
            ("fast", Duration::from_millis(10)),
            ("slow", Duration::from_secs(30)),
        ]));
        let orchestrator =
            CheckOrchestrator::new(checker, settings(2, Duration::from_millis(500)));

        let start = Instant::now();
        let report = orchestrator
            .run(&domains(&["fast", "slow"]), &CancellationToken::new())
            .await;
        let elapsed = start.elapsed();

        assert!(elapsed < Duration::from_secs(1), "elapsed {elapsed:?}");
        assert_eq!(report.results[0].status, HealthStatus::Up);
        assert_eq!(report.results[1].status, HealthStatus::Down);
        assert_eq!(
            report.results[1].error_message.as_deref(),
            Some("run deadline exceeded")
        );
        assert_eq!(report.up_count, 1);
        assert_eq!(report.down_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_also_covers_queued_checks() {
        let checker = Arc::new(SimulatedCheck::uniform(Duration::from_secs(10)));
        let orchestrator =
            CheckOrchestrator::new(Arc::clone(&checker), settings(1, Duration::from_secs(1)));

        let report = orchestrator
            .run(&domains(&["a", "b", "c"]), &CancellationToken::new())
            .await;

        assert_eq!(report.down_count, 3);
        assert!(
            report
                .results
                .iter()
                .all(|r| r.error_message.as_deref() == Some("run deadline exceeded"))
        );
        assert_eq!(checker.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn external_cancellation_is_reported_as_cancelled() {
        let checker = Arc::new(SimulatedCheck::uniform(Duration::from_secs(10)));
        let orchestrator = CheckOrchestrator::new(checker, settings(2, Duration::from_secs(60)));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let report = orchestrator.run(&domains(&["a", "b"]), &cancel).await;

        assert_eq!(report.down_count, 2);
        assert_eq!(
            report.results[0].error_message.as_deref(),
            Some("check cancelled")
        );
    }

    #[tokio::test]
    async fn empty_domain_list_yields_empty_report() {
        let checker = Arc::new(SimulatedCheck::uniform(Duration::ZERO));
        let orchestrator = CheckOrchestrator::new(checker, settings(5, Duration::from_secs(1)));

        let report = orchestrator.run(&[], &CancellationToken::new()).await;

        assert_eq!(report.total_checks, 0);
        assert_eq!(report.uptime_percent, 0.0);
    }
}
