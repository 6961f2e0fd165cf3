use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info};

use super::ReportDistributor;
use crate::error::DistributionError;
use crate::monitor::MonitorReport;

/// `uptime_report_<YYYYmmdd_HHMMSS>.json`, stamped in local time.
pub(super) fn report_file_name() -> String {
    format!("uptime_report_{}.json", Local::now().format("%Y%m%d_%H%M%S"))
}

impl ReportDistributor {
    /// Write the report as pretty JSON under the output directory, creating it
    /// when missing.
    ///
    /// On any failure the report is mailed instead (when email is configured)
    /// and the original error is still returned.
    pub async fn save_report(&self, report: &MonitorReport) -> Result<PathBuf, DistributionError> {
        match write_report(&self.config.output_dir, report).await {
            Ok(path) => {
                info!(file = %path.display(), "report saved");
                Ok(path)
            }
            Err(err) => {
                error!(error = %err, "failed to save report, sending it by email");
                if let Err(email_err) = self.send_email(report, None).await {
                    error!(error = %email_err, "failed to send report email");
                }
                Err(err)
            }
        }
    }
}

async fn write_report(dir: &Path, report: &MonitorReport) -> Result<PathBuf, DistributionError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| DistributionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let json = serde_json::to_vec_pretty(report)?;
    let path = dir.join(report_file_name());
    tokio::fs::write(&path, json)
        .await
        .map_err(|source| DistributionError::Io {
            path: path.clone(),
            source,
        })?;

    Ok(path)
}
