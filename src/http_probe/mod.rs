pub mod probe;
pub mod result;
pub mod tls;

pub use probe::{HttpChecker, normalize_url};
pub use result::{ACCEPT_THRESHOLD, HealthCheckResult, HealthStatus};

use std::fmt::Write;

/// Flatten an error and its `source()` chain into one line.
pub(crate) fn error_chain(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}
