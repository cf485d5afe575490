//! Remote gateway to the JIRA and Zephyr REST APIs.
//!
//! The [`Gateway`] trait is the seam between the publishing engine and the
//! network. [`HttpGateway`] is the `reqwest` implementation.

mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{CycleId, ExecutionId, IssueId, IssueKey, JobToken, VersionId};

/// A JIRA project version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// JIRA version id.
    pub id: String,
    /// Version name.
    pub name: String,
}

/// Raw cycle listing: cycle id to cycle object, plus a `recordsCount` entry.
pub type CycleListing = serde_json::Map<String, serde_json::Value>;

/// Body of a cycle-creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCycle {
    /// Cycle to clone executions from.
    pub cloned_cycle_id: Option<CycleId>,
    /// Cycle name.
    pub name: String,
    /// Build label.
    pub build: Option<String>,
    /// Environment label.
    pub environment: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// JIRA project id.
    pub project_id: String,
    /// Version the cycle belongs to.
    pub version_id: VersionId,
    /// Always empty.
    pub start_date: String,
    /// Always empty.
    pub end_date: String,
    /// Always false.
    pub clone_custom_fields: bool,
}

/// Response to a cycle-creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCycle {
    /// Present when Zephyr creates the cycle asynchronously.
    #[serde(default)]
    pub job_progress_token: Option<JobToken>,
}

/// Body of an execution-creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExecution {
    /// Cycle the execution belongs to.
    pub cycle_id: CycleId,
    /// JIRA issue id of the test.
    pub issue_id: IssueId,
    /// JIRA project id.
    pub project_id: String,
    /// Version of the cycle.
    pub version_id: VersionId,
}

/// Body of a bulk status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkStatusUpdate {
    /// Executions to update.
    pub executions: Vec<ExecutionId>,
    /// Zephyr status code.
    pub status: u8,
}

/// Remote operations needed to publish results.
///
/// Implementations turn any non-200 response into
/// [`Error::RemoteCall`](crate::Error::RemoteCall).
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Lists the versions of a JIRA project.
    async fn list_versions(&self, project: &str) -> Result<Vec<Version>>;

    /// Resolves an issue key to its internal id.
    async fn issue_id(&self, key: &IssueKey) -> Result<IssueId>;

    /// Lists cycles of a project version.
    async fn list_cycles(&self, project: &str, version: &VersionId) -> Result<CycleListing>;

    /// Creates a cycle.
    async fn create_cycle(&self, cycle: &NewCycle) -> Result<CreatedCycle>;

    /// Creates an execution and returns its id.
    async fn create_execution(&self, execution: &NewExecution) -> Result<ExecutionId>;

    /// Sets the status of many executions at once.
    async fn update_bulk_status(&self, update: &BulkStatusUpdate) -> Result<()>;

    /// Fetches the progress of an asynchronous job, from 0.0 to 1.0.
    async fn job_progress(&self, token: &JobToken) -> Result<Option<f64>>;
}
