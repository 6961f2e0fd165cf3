use std::path::PathBuf;

use thiserror::Error;

use crate::http_probe::error_chain;
use crate::policy::rate_limit::RateLimitError;

/// Substrings marking a transport failure as permanent even though it
/// surfaced at the transport layer. Matched against the cause only, never
/// the request URL.
const TERMINAL_MARKERS: [&str; 3] = ["marshal", "invalid", "context cancelled"];

/// Why a single probe attempt failed before a usable response was read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("too many redirects: {0}")]
    RedirectLimit(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limiter error: {0}")]
    RateLimiter(#[from] RateLimitError),

    #[error("check cancelled")]
    Cancelled,

    #[error("run deadline exceeded")]
    DeadlineExceeded,

    #[error("check task failed: {0}")]
    TaskFailed(String),
}

impl ProbeError {
    /// Map a reqwest failure onto the probe error taxonomy.
    ///
    /// The URL is stripped so a domain or path can never decide retryability.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let err = err.without_url();
        let message = error_chain(&err);
        if err.is_redirect() {
            ProbeError::RedirectLimit(message)
        } else if err.is_builder() {
            ProbeError::InvalidRequest(message)
        } else if err.is_timeout() {
            ProbeError::Timeout(message)
        } else {
            ProbeError::Transport(message)
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProbeError::Transport(message) => {
                let message = message.to_ascii_lowercase();
                !TERMINAL_MARKERS.iter().any(|marker| message.contains(marker))
            }
            ProbeError::Timeout(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("{target} responded with status {status}: {body}")]
    Status {
        target: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to send email: {0}")]
    Email(String),

    #[error("rate limiter error: {0}")]
    RateLimiter(#[from] RateLimitError),

    #[error("cancelled during retry")]
    Cancelled,
}

impl From<reqwest::Error> for DistributionError {
    fn from(err: reqwest::Error) -> Self {
        DistributionError::Http(error_chain(&err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient_by_default() {
        let err = ProbeError::Transport("error trying to connect: connection refused".into());
        assert!(err.is_transient());
        assert!(ProbeError::Timeout("operation timed out".into()).is_transient());
    }

    #[test]
    fn terminal_markers_make_transport_errors_permanent() {
        for message in [
            "failed to marshal payload",
            "Invalid header value",
            "context cancelled while connecting",
        ] {
            assert!(
                !ProbeError::Transport(message.into()).is_transient(),
                "{message} should be terminal"
            );
        }
    }

    #[test]
    fn other_cancel_wording_stays_transient() {
        let err = ProbeError::Transport("connection reset: stream cancelled by peer".into());
        assert!(err.is_transient());
    }

    #[test]
    fn non_transport_errors_are_terminal() {
        assert!(!ProbeError::RedirectLimit("stopped after 10 redirects".into()).is_transient());
        assert!(!ProbeError::InvalidRequest("relative URL".into()).is_transient());
        assert!(!ProbeError::Cancelled.is_transient());
        assert!(!ProbeError::DeadlineExceeded.is_transient());
        assert!(!ProbeError::RateLimiter(RateLimitError::Cancelled).is_transient());
    }
}
