//! Fan-out of domain checks and aggregation into a report.
//!
//! ```text
//! CheckOrchestrator::run
//!   ├── one task per domain, admitted by a Semaphore(concurrency)
//!   │   └── DomainCheck::check → HealthCheckResult (slot = input index)
//!   ├── run deadline → cancels the run token, pending slots become Down
//!   └── MonitorReport::from_results
//! ```

pub mod orchestrator;
pub mod report;

pub use orchestrator::{CheckOrchestrator, DomainCheck, RunSettings};
pub use report::MonitorReport;
