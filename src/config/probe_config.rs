use std::time::Duration;

use serde::Deserialize;

use super::duration;
use super::sink_config::DistributionConfig;
use crate::error::ConfigError;
use crate::policy::{MIN_REQUESTS_PER_SECOND, RateLimitConfig, RetryPolicy};

pub const DEFAULT_USER_AGENT: &str = "Monitoring Client/1.0";

/// Everything one monitoring run needs.
///
/// Deserialized from the YAML config file, then overridden from the
/// environment by [`super::apply_env_overrides`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Service name stamped on every report.
    pub service: String,

    /// Environment label, e.g. "production".
    pub environment: String,

    /// Bare hostnames or full URLs, checked in this order.
    pub domains: Vec<String>,

    /// Maximum number of checks in flight.
    pub concurrency: usize,

    /// Per-request timeout.
    #[serde(deserialize_with = "duration::deserialize")]
    pub timeout: Duration,

    pub user_agent: String,

    /// Budget for the whole run; checks still pending when it elapses are cancelled.
    #[serde(deserialize_with = "duration::deserialize")]
    pub run_deadline: Duration,

    pub retry: RetryPolicy,

    pub rate_limit: RateLimitConfig,

    #[serde(flatten)]
    pub distribution: DistributionConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            service: "Uptime Monitor".to_string(),
            environment: "production".to_string(),
            domains: Vec::new(),
            concurrency: 5,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            run_deadline: Duration::from_secs(5 * 60),
            retry: RetryPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            distribution: DistributionConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domains.iter().all(|domain| domain.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "no domains configured (set MONITOR_DOMAINS or `domains`)".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be greater than zero".to_string()));
        }
        let rate = self.rate_limit.requests_per_second;
        if !rate.is_finite() || rate < MIN_REQUESTS_PER_SECOND {
            return Err(ConfigError::Invalid(format!(
                "rate_limit.requests_per_second must be a finite number of at least {MIN_REQUESTS_PER_SECOND}"
            )));
        }
        if self.rate_limit.burst == 0 {
            return Err(ConfigError::Invalid("rate_limit.burst must be at least 1".to_string()));
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid("retry.multiplier must be at least 1.0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MonitorConfig::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.run_deadline, Duration::from_secs(300));
        assert_eq!(config.user_agent, "Monitoring Client/1.0");
        assert_eq!(config.rate_limit.requests_per_second, 10.0);
        assert_eq!(config.rate_limit.burst, 20);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.distribution.output_dir, PathBuf::from("./reports"));
        assert_eq!(config.distribution.email.smtp_port, 587);
    }

    #[test]
    fn test_monitor_config_deserialization() {
        let yaml = r#"
            service: Edge Monitor
            environment: staging
            domains:
                - example.com
                - https://api.example.com/health
            concurrency: 8
            timeout: 10s
            run_deadline: 2m
            retry:
                max_retries: 2
                initial_backoff: 500ms
            rate_limit:
                requests_per_second: 5
                burst: 5
            output_dir: /var/reports
            api:
                url: https://collector.example.com/reports
                key: secret
            notifications:
                slack_webhook: https://hooks.slack.com/services/x
            email:
                user: monitor@example.com
                password: hunter2
                to: [ops@example.com]
        "#;

        let config = MonitorConfig::from_yaml(yaml).expect("Invalid YAML");
        assert_eq!(config.service, "Edge Monitor");
        assert_eq!(config.environment, "staging");
        assert_eq!(config.domains.len(), 2);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.run_deadline, Duration::from_secs(120));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(500));
        assert_eq!(config.retry.max_backoff, Duration::from_secs(30));
        assert_eq!(config.rate_limit.burst, 5);
        assert_eq!(config.distribution.output_dir, PathBuf::from("/var/reports"));
        assert_eq!(config.distribution.api.key.as_deref(), Some("secret"));
        assert!(config.distribution.notifications.discord_webhook.is_none());
        assert!(config.distribution.email.is_enabled());
        assert_eq!(config.distribution.email.smtp_host, "smtp.gmail.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_invalid_duration() {
        let yaml = "timeout: whenever\n";
        assert!(MonitorConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn validation_requires_domains() {
        let config = MonitorConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validation_rejects_zero_concurrency_and_rate() {
        let mut config = MonitorConfig {
            domains: vec!["example.com".to_string()],
            concurrency: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());

        config.concurrency = 1;
        config.rate_limit.requests_per_second = 0.0;
        assert!(config.validate().is_err());

        config.rate_limit.requests_per_second = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_unusable_rates() {
        let mut config = MonitorConfig {
            domains: vec!["example.com".to_string()],
            ..MonitorConfig::default()
        };

        for rate in [1e-20, f64::NAN, f64::INFINITY, -3.0] {
            config.rate_limit.requests_per_second = rate;
            assert!(config.validate().is_err(), "rate {rate} accepted");
        }

        config.rate_limit.requests_per_second = MIN_REQUESTS_PER_SECOND;
        assert!(config.validate().is_ok());
    }
}
