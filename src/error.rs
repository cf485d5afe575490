//! Error types for publishing Allure results to Zephyr.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for publish operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A remote call returned something other than 200.
    #[error("{operation} failed: expected code 200, got {status}")]
    RemoteCall { operation: String, status: u16 },

    /// A named version or cycle could not be resolved.
    #[error(
        "{kind} '{name}' couldn't be found{}",
        .context.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
    )]
    NotFound {
        kind: &'static str,
        name: String,
        context: Option<String>,
    },

    /// Job-progress polling ran past the configured timeout.
    #[error(
        "waiting for job with token {token} timed out after {:.1} seconds",
        .elapsed.as_secs_f64()
    )]
    JobTimeout { token: String, elapsed: Duration },

    /// Polling was cancelled before the job finished.
    #[error("waiting for job with token {0} was cancelled")]
    Cancelled(String),

    /// The report's test-case directory could not be read.
    #[error("failed to read report directory {path}: {source}")]
    ReportDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body did not have the expected shape.
    #[error("unexpected response from {operation}: {reason}")]
    UnexpectedResponse { operation: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for publish operations.
pub type Result<T> = std::result::Result<T, Error>;
