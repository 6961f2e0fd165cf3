use std::path::PathBuf;

use serde::Deserialize;

/// Where a finished report goes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Directory receiving one JSON file per run.
    pub output_dir: PathBuf,

    pub api: ApiConfig,

    pub notifications: NotificationConfig,

    pub email: EmailConfig,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        DistributionConfig {
            output_dir: PathBuf::from("./reports"),
            api: ApiConfig::default(),
            notifications: NotificationConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

/// Remote collector receiving the report as JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: Option<String>,

    /// Sent as `Authorization: Bearer <key>`.
    pub key: Option<String>,
}

/// Chat webhooks notified when anything is down or degraded.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub slack_webhook: Option<String>,
    pub discord_webhook: Option<String>,
}

/// SMTP fallback used when a report cannot be written to disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Sender address, also the SMTP username.
    pub user: Option<String>,

    /// SMTP password or app token.
    pub password: Option<String>,

    pub to: Vec<String>,

    pub smtp_host: String,

    pub smtp_port: u16,
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            user: None,
            password: None,
            to: Vec::new(),
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
        }
    }
}

impl EmailConfig {
    /// Email is only attempted with a sender, a password and at least one recipient.
    pub fn is_enabled(&self) -> bool {
        self.user.is_some() && self.password.is_some() && !self.to.is_empty()
    }
}
