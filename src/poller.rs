//! Polling of asynchronous Zephyr jobs.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::model::JobToken;

/// Waits for Zephyr jobs to report full progress.
pub struct JobPoller {
    gateway: Arc<dyn Gateway>,
    config: PollConfig,
    cancel: CancellationToken,
}

impl JobPoller {
    /// Creates a poller with the given settings.
    pub fn new(gateway: Arc<dyn Gateway>, config: PollConfig) -> Self {
        Self {
            gateway,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to abort waits early.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Polls `token` until progress is exactly 1.0.
    ///
    /// Fails with [`Error::JobTimeout`] once the time since the first poll
    /// reaches the configured timeout, and with [`Error::Cancelled`] if the
    /// cancellation token fires during a wait.
    pub async fn wait_for(&self, token: &JobToken) -> Result<()> {
        let start = Instant::now();
        let timeout = self.config.timeout();
        let interval = self.config.interval();

        loop {
            let progress = self.gateway.job_progress(token).await?;
            tracing::debug!(token = %token, ?progress, "job progress");
            if progress == Some(1.0) {
                tracing::info!(token = %token, elapsed = ?start.elapsed(), "job finished");
                return Ok(());
            }

            // Timeout is checked only after a poll, so at least one always runs
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(Error::JobTimeout {
                    token: token.to_string(),
                    elapsed,
                });
            }

            // Wait for the next poll unless cancelled
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.cancel.cancelled() => {
                    return Err(Error::Cancelled(token.to_string()));
                }
            }
        }
    }
}
