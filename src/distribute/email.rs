use std::fmt::Write as _;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::ReportDistributor;
use crate::config::EmailConfig;
use crate::error::DistributionError;
use crate::http_probe::HealthStatus;
use crate::monitor::MonitorReport;

pub const FILE_FAILURE_SUBJECT: &str = "Uptime Monitor File Report Creation Failed";

const SENDER_NAME: &str = "Uptime Monitor";

impl ReportDistributor {
    /// Mail the report over SMTP with STARTTLS.
    ///
    /// Silently does nothing unless sender, password and recipients are all
    /// configured. `subject` defaults to [`FILE_FAILURE_SUBJECT`].
    pub async fn send_email(
        &self,
        report: &MonitorReport,
        subject: Option<&str>,
    ) -> Result<(), DistributionError> {
        let email = &self.config.email;
        if !email.is_enabled() {
            return Ok(());
        }
        let (Some(user), Some(password)) = (&email.user, &email.password) else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(report)?;
        let message = build_message(email, user, subject.unwrap_or(FILE_FAILURE_SUBJECT), report, &json)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.smtp_host)
            .map_err(|err| DistributionError::Email(err.to_string()))?
            .port(email.smtp_port)
            .credentials(Credentials::new(user.clone(), password.clone()))
            .build();

        mailer
            .send(message)
            .await
            .map_err(|err| DistributionError::Email(err.to_string()))?;

        info!(data_size = json.len(), recipients = email.to.len(), "report email sent");
        Ok(())
    }
}

fn build_message(
    email: &EmailConfig,
    user: &str,
    subject: &str,
    report: &MonitorReport,
    json: &str,
) -> Result<Message, DistributionError> {
    let from = user
        .parse()
        .map(|address| Mailbox::new(Some(SENDER_NAME.to_string()), address))
        .map_err(|err| DistributionError::Email(format!("invalid sender {user:?}: {err}")))?;

    let mut builder = Message::builder().from(from).subject(subject);
    for recipient in &email.to {
        let to: Mailbox = recipient
            .parse()
            .map_err(|err| DistributionError::Email(format!("invalid recipient {recipient:?}: {err}")))?;
        builder = builder.to(to);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            plain_body(json),
            html_report(report, subject),
        ))
        .map_err(|err| DistributionError::Email(err.to_string()))
}

fn plain_body(json: &str) -> String {
    format!(
        "Failed to create JSON file for report\n\n\
         The report data is attached below:\n\n\
         === BEGIN JSON DATA ===\n\
         {json}\n\
         === END JSON DATA ===\n"
    )
}

/// Summary cards and a per-domain table.
fn html_report(report: &MonitorReport, subject: &str) -> String {
    let mut rows = String::new();
    for result in &report.results {
        let class = match result.status {
            HealthStatus::Up => "status-up",
            HealthStatus::Degraded => "status-degraded",
            HealthStatus::Down => "status-down",
        };
        let ssl = match result.ssl_days_left {
            Some(days) => format!("{days} days"),
            None if result.is_ssl => "unknown".to_string(),
            None => "-".to_string(),
        };
        let _ = write!(
            rows,
            "<tr><td>{}</td><td class=\"{class}\">{}</td><td>{}</td><td>{} ms</td><td>{}</td><td>{}</td></tr>",
            escape_html(&result.domain),
            result.status,
            result.status_code,
            result.response_time_ms,
            ssl,
            escape_html(result.error_message.as_deref().unwrap_or("")),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>
body {{ font-family: "Segoe UI", Roboto, Arial, sans-serif; background-color: #f8f9fb; margin: 0; color: #333; }}
.container {{ max-width: 850px; margin: 30px auto; background: #fff; border-radius: 10px; overflow: hidden; }}
.header {{ background: #2f2e41; color: #fff; padding: 20px 30px; }}
.section {{ padding: 20px 30px; }}
.stats {{ display: flex; flex-wrap: wrap; gap: 15px; }}
.stat {{ flex: 1 1 150px; background: #f5f6f9; padding: 10px; border-radius: 8px; text-align: center; }}
.stat span {{ display: block; font-size: 1.3em; font-weight: bold; }}
table {{ width: 100%; border-collapse: collapse; }}
th, td {{ padding: 10px; text-align: left; border-bottom: 1px solid #eee; }}
.status-up {{ color: #2ecc71; font-weight: bold; }}
.status-down {{ color: #e74c3c; font-weight: bold; }}
.status-degraded {{ color: #f39c12; font-weight: bold; }}
</style>
</head>
<body>
<div class="container">
<div class="header">
<h1>{title}</h1>
<p>{service} ({environment}) at {timestamp}</p>
</div>
<div class="section">
<h2>Summary</h2>
<div class="stats">
<div class="stat">Total checks<span>{total}</span></div>
<div class="stat">Up<span>{up}</span></div>
<div class="stat">Down<span>{down}</span></div>
<div class="stat">Degraded<span>{degraded}</span></div>
<div class="stat">Uptime<span>{uptime:.2}%</span></div>
<div class="stat">Average latency<span>{latency:.0} ms</span></div>
</div>
</div>
<div class="section">
<h2>Results</h2>
<table>
<tr><th>Domain</th><th>Status</th><th>Code</th><th>Response time</th><th>SSL expiry</th><th>Error</th></tr>
{rows}
</table>
</div>
</div>
</body>
</html>
"#,
        title = escape_html(subject),
        service = escape_html(&report.service),
        environment = escape_html(&report.environment),
        timestamp = report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        total = report.total_checks,
        up = report.up_count,
        down = report.down_count,
        degraded = report.degraded_count,
        uptime = report.uptime_percent,
        latency = report.average_latency_ms,
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
