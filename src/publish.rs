//! Execution creation and bulk status updates.

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::gateway::{BulkStatusUpdate, Gateway, NewExecution};
use crate::model::{CycleId, ExecutionId, IssueKey, TestOutcome, VersionId};
use crate::report::CorrelatedResults;

/// Outcome of a publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishSummary {
    /// Version the cycle belongs to.
    pub version_id: String,
    /// Cycle the executions were created in.
    pub cycle_id: CycleId,
    /// Executions marked as passed.
    pub passed: usize,
    /// Executions marked as failed.
    pub failed: usize,
    /// Executions marked with the catch-all status.
    pub other: usize,
}

impl PublishSummary {
    /// Total executions created.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.other
    }
}

/// Creates executions for correlated issues and sets their statuses.
pub struct ExecutionPublisher {
    gateway: Arc<dyn Gateway>,
    project: String,
}

impl ExecutionPublisher {
    /// Creates a publisher for `project`.
    pub fn new(gateway: Arc<dyn Gateway>, project: impl Into<String>) -> Self {
        Self {
            gateway,
            project: project.into(),
        }
    }

    /// Creates one execution per issue and pushes one status update per outcome.
    ///
    /// Execution ids are recorded on `results`. Any remote failure aborts
    /// the run; executions created before it are left in place.
    pub async fn publish(
        &self,
        results: &mut CorrelatedResults,
        cycle_id: &CycleId,
        version_id: &VersionId,
    ) -> Result<PublishSummary> {
        // Create executions first, in key order
        let keys: Vec<IssueKey> = results.iter().map(|(key, _)| key.clone()).collect();
        for key in keys {
            let execution_id = self.create_execution(&key, cycle_id, version_id).await?;
            results.record_execution(&key, execution_id);
        }

        let mut groups = results.executions_by_outcome();
        let mut summary = PublishSummary {
            version_id: version_id.to_string(),
            cycle_id: cycle_id.clone(),
            passed: 0,
            failed: 0,
            other: 0,
        };

        // One bulk update per non-empty group
        for outcome in TestOutcome::ALL {
            let Some(executions) = groups.remove(&outcome).filter(|e| !e.is_empty()) else {
                continue;
            };
            match outcome {
                TestOutcome::Passed => summary.passed = executions.len(),
                TestOutcome::Failed => summary.failed = executions.len(),
                TestOutcome::Other => summary.other = executions.len(),
            }
            self.update_status(outcome, executions).await?;
        }

        Ok(summary)
    }

    async fn create_execution(
        &self,
        key: &IssueKey,
        cycle_id: &CycleId,
        version_id: &VersionId,
    ) -> Result<ExecutionId> {
        tracing::info!(issue = %key, "creating execution");
        let issue_id = self.gateway.issue_id(key).await?;
        let body = NewExecution {
            cycle_id: cycle_id.clone(),
            issue_id,
            project_id: self.project.clone(),
            version_id: version_id.clone(),
        };
        let execution_id = self.gateway.create_execution(&body).await?;
        tracing::debug!(issue = %key, execution = %execution_id, "execution created");
        Ok(execution_id)
    }

    async fn update_status(
        &self,
        outcome: TestOutcome,
        executions: Vec<ExecutionId>,
    ) -> Result<()> {
        tracing::info!(
            outcome = %outcome,
            count = executions.len(),
            "setting execution status for all tests"
        );
        let update = BulkStatusUpdate {
            executions,
            status: outcome.status_code(),
        };
        self.gateway.update_bulk_status(&update).await
    }
}
