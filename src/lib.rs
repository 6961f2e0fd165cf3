//! Concurrent HTTP(S) uptime checks with retries, shared rate limiting, TLS
//! expiry tracking and report distribution.

pub mod config;
pub mod distribute;
pub mod error;
pub mod http_probe;
pub mod monitor;
pub mod policy;
pub mod telemetry;
