//! Publishing engine tying scan, resolution and publishing together.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{CycleDetails, PollConfig, PublishTarget};
use crate::cycle::CycleResolver;
use crate::error::Result;
use crate::gateway::Gateway;
use crate::poller::JobPoller;
use crate::publish::{ExecutionPublisher, PublishSummary};
use crate::report::{scan_report, CorrelatedResults};

/// Publishes one Allure report to Zephyr.
///
/// The report is scanned once, when the publisher is built. [`publish`]
/// then resolves the version, resolves or creates the cycle, creates one
/// execution per correlated issue and pushes grouped status updates, in
/// that order.
///
/// Every call to [`publish`] creates fresh executions, so running it twice
/// against the same cycle leaves duplicate executions behind.
///
/// [`publish`]: Publisher::publish
pub struct Publisher {
    resolver: CycleResolver,
    executions: ExecutionPublisher,
    target: PublishTarget,
    details: CycleDetails,
    results: CorrelatedResults,
}

impl Publisher {
    /// Scans the report in `target` and prepares to publish it.
    pub fn new(
        gateway: Arc<dyn Gateway>,
        project: &str,
        target: PublishTarget,
        details: CycleDetails,
        polling: PollConfig,
    ) -> Result<Self> {
        Self::with_cancellation(
            gateway,
            project,
            target,
            details,
            polling,
            CancellationToken::new(),
        )
    }

    /// Like [`Publisher::new`], with a token that aborts job polling.
    pub fn with_cancellation(
        gateway: Arc<dyn Gateway>,
        project: &str,
        target: PublishTarget,
        details: CycleDetails,
        polling: PollConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let results = scan_report(&target.report_path, target.limit_by_project.as_deref())?;
        let poller = JobPoller::new(gateway.clone(), polling).with_cancellation(cancel);

        Ok(Self {
            resolver: CycleResolver::new(gateway.clone(), poller, project),
            executions: ExecutionPublisher::new(gateway, project),
            target,
            details,
            results,
        })
    }

    /// Issue outcomes found in the report, with execution ids once published.
    pub fn results(&self) -> &CorrelatedResults {
        &self.results
    }

    /// Publishes every correlated result to the configured cycle.
    pub async fn publish(&mut self) -> Result<PublishSummary> {
        let version_id = self.resolver.resolve_version(&self.target.version).await?;
        let cycle_id = self
            .resolver
            .resolve_cycle(&self.target.cycle, &version_id, &self.details)
            .await?;

        tracing::info!(
            cycle = %cycle_id,
            version = %version_id,
            issues = self.results.len(),
            "publishing results"
        );
        self.executions
            .publish(&mut self.results, &cycle_id, &version_id)
            .await
    }
}
