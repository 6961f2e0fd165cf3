pub mod app_config;
pub mod duration;
pub mod probe_config;
pub mod sink_config;

pub use app_config::{apply_env_overrides, load_config};
pub use probe_config::MonitorConfig;
pub use sink_config::{ApiConfig, DistributionConfig, EmailConfig, NotificationConfig};
