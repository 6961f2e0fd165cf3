use serde_json::{Value, json};
use tracing::{error, info};
use unicode_truncate::UnicodeTruncateStr;

use super::{ReportDistributor, redacted_host};
use crate::error::DistributionError;
use crate::http_probe::HealthStatus;
use crate::monitor::MonitorReport;

/// Discord rejects messages longer than this.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

const ELLIPSIS: &str = "...";

/// Slack incoming-webhook payload: one attachment coloured by severity.
pub fn slack_payload(report: &MonitorReport) -> Value {
    let color = if report.down_count > 0 { "danger" } else { "warning" };
    let failed: Vec<String> = report
        .failing()
        .map(|result| format!("{} ({})", result.domain, result.status))
        .collect();

    json!({
        "text": format!(
            "🚨 Uptime Alert - {} service(s) down, {} degraded",
            report.down_count, report.degraded_count
        ),
        "attachments": [{
            "color": color,
            "fields": [
                { "title": "Environment", "value": report.environment, "short": true },
                { "title": "Uptime", "value": format!("{:.2}%", report.uptime_percent), "short": true },
                { "title": "Down", "value": report.down_count.to_string(), "short": true },
                { "title": "Degraded", "value": report.degraded_count.to_string(), "short": true },
                { "title": "Failed Services", "value": failed.join("\n"), "short": false },
            ],
            "footer": report.service,
            "ts": report.timestamp.timestamp(),
        }],
    })
}

/// Discord webhook payload: a markdown summary within [`DISCORD_MESSAGE_LIMIT`].
pub fn discord_payload(report: &MonitorReport) -> Value {
    let failed: Vec<String> = report
        .failing()
        .map(|result| {
            let marker = match result.status {
                HealthStatus::Degraded => "🟡",
                _ => "🔴",
            };
            format!("{marker} **{}** - {}", result.domain, result.status)
        })
        .collect();

    let content = format!(
        "🚨 **Uptime Alert**\n\n\
         **Environment:** {}\n\
         **Uptime:** {:.2}%\n\
         **Down:** {} | **Degraded:** {}\n\n\
         **Failed Services:**\n{}",
        report.environment,
        report.uptime_percent,
        report.down_count,
        report.degraded_count,
        failed.join("\n"),
    );

    json!({
        "content": truncate_message(&content, DISCORD_MESSAGE_LIMIT),
        "username": report.service,
    })
}

fn truncate_message(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content.to_string();
    }
    let (head, _) = content.unicode_truncate(limit - ELLIPSIS.len());
    // Zero-width characters count for Discord but not for display width.
    let head: String = head.chars().take(limit - ELLIPSIS.len()).collect();
    format!("{head}{ELLIPSIS}")
}

impl ReportDistributor {
    /// Alert Slack and Discord when anything is down or degraded.
    ///
    /// Channels are independent: a failing webhook is logged and the other is
    /// still tried.
    pub async fn send_notifications(&self, report: &MonitorReport) {
        if !report.needs_attention() {
            return;
        }

        let notifications = &self.config.notifications;
        if let Some(webhook) = &notifications.slack_webhook {
            if let Err(err) = self.post_webhook(webhook, &slack_payload(report)).await {
                error!(error = %err, "failed to send Slack notification");
            }
        }
        if let Some(webhook) = &notifications.discord_webhook {
            if let Err(err) = self.post_webhook(webhook, &discord_payload(report)).await {
                error!(error = %err, "failed to send Discord notification");
            }
        }
    }

    async fn post_webhook(&self, webhook: &str, payload: &Value) -> Result<(), DistributionError> {
        let response = self.client.post(webhook).json(payload).send().await?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(DistributionError::Status {
                target: "webhook",
                status,
                body,
            });
        }

        info!(webhook = %redacted_host(webhook), "notification sent");
        Ok(())
    }
}
