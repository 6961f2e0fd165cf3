use std::env;
use std::path::PathBuf;

use tracing::info;

use super::duration::parse_duration;
use super::probe_config::MonitorConfig;
use crate::error::ConfigError;

const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Load the monitor configuration from a YAML file and environment variables.
///
/// The file named by `CONFIG_FILE` (default `config.yml`) is read first. A
/// missing default file is not an error, so a deployment can be configured
/// from the environment alone. Environment variables then override the file
/// and the result is validated.
pub fn load_config() -> Result<MonitorConfig, ConfigError> {
    let explicit_file = env::var("CONFIG_FILE").ok().filter(|path| !path.is_empty());
    let path = PathBuf::from(
        explicit_file
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string()),
    );

    let mut config = match std::fs::read_to_string(&path) {
        Ok(contents) => MonitorConfig::from_yaml(&contents)
            .map_err(|source| ConfigError::Parse { path: path.clone(), source })?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && explicit_file.is_none() => {
            MonitorConfig::default()
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    config.validate()?;

    info!(
        domains = config.domains.len(),
        concurrency = config.concurrency,
        environment = %config.environment,
        "configuration loaded"
    );

    Ok(config)
}

/// Override `config` with values from `lookup`; empty values count as unset.
pub fn apply_env_overrides<F>(config: &mut MonitorConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(domains) = get("MONITOR_DOMAINS") {
        config.domains = split_list(&domains);
    }
    if let Some(value) = get("MONITOR_TIMEOUT") {
        config.timeout = parse_duration(&value).ok_or(ConfigError::InvalidValue {
            key: "MONITOR_TIMEOUT",
            value,
        })?;
    }
    if let Some(value) = get("MONITOR_DEADLINE") {
        config.run_deadline = parse_duration(&value).ok_or(ConfigError::InvalidValue {
            key: "MONITOR_DEADLINE",
            value,
        })?;
    }
    if let Some(value) = get("MONITOR_CONCURRENT") {
        config.concurrency = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: "MONITOR_CONCURRENT",
            value,
        })?;
    }
    if let Some(value) = get("USER_AGENT") {
        config.user_agent = value;
    }
    if let Some(value) = get("ENVIRONMENT") {
        config.environment = value;
    }

    let distribution = &mut config.distribution;
    if let Some(value) = get("OUTPUT_DIR") {
        distribution.output_dir = PathBuf::from(value);
    }
    if let Some(value) = get("API_URL") {
        distribution.api.url = Some(value);
    }
    if let Some(value) = get("API_KEY") {
        distribution.api.key = Some(value);
    }
    if let Some(value) = get("SLACK_WEBHOOK_URL") {
        distribution.notifications.slack_webhook = Some(value);
    }
    if let Some(value) = get("DISCORD_WEBHOOK_URL") {
        distribution.notifications.discord_webhook = Some(value);
    }
    if let Some(value) = get("EMAIL_USER") {
        distribution.email.user = Some(value);
    }
    if let Some(value) = get("EMAIL_AUTH") {
        distribution.email.password = Some(value);
    }
    if let Some(value) = get("EMAIL_TO") {
        distribution.email.to = split_list(&value);
    }
    if let Some(value) = get("SMTP_HOST") {
        distribution.email.smtp_host = value;
    }
    if let Some(value) = get("SMTP_PORT") {
        distribution.email.smtp_port = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: "SMTP_PORT",
            value,
        })?;
    }

    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = MonitorConfig::from_yaml("domains: [from-file.example]\nconcurrency: 2\n")
            .expect("Invalid YAML");

        apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("MONITOR_DOMAINS", " a.example, https://b.example ,,c.example "),
                ("MONITOR_TIMEOUT", "15s"),
                ("MONITOR_CONCURRENT", "12"),
                ("MONITOR_DEADLINE", "90"),
                ("ENVIRONMENT", "staging"),
                ("API_URL", "https://collector.example/api"),
                ("EMAIL_TO", "a@example.com, b@example.com"),
                ("SMTP_PORT", "465"),
            ]),
        )
        .expect("valid overrides");

        assert_eq!(
            config.domains,
            vec!["a.example", "https://b.example", "c.example"]
        );
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.concurrency, 12);
        assert_eq!(config.run_deadline, Duration::from_secs(90));
        assert_eq!(config.environment, "staging");
        assert_eq!(
            config.distribution.api.url.as_deref(),
            Some("https://collector.example/api")
        );
        assert_eq!(config.distribution.email.to.len(), 2);
        assert_eq!(config.distribution.email.smtp_port, 465);
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut config = MonitorConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[("USER_AGENT", ""), ("ENVIRONMENT", "  ")]),
        )
        .expect("valid overrides");

        assert_eq!(config.user_agent, "Monitoring Client/1.0");
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let mut config = MonitorConfig::default();
        let err = apply_env_overrides(&mut config, lookup_from(&[("MONITOR_CONCURRENT", "many")]))
            .expect_err("should reject");

        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "MONITOR_CONCURRENT", .. }
        ));
    }
}
