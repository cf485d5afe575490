//! `reqwest`-backed gateway with basic authentication.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{BulkStatusUpdate, CreatedCycle, CycleListing, Gateway, NewCycle, NewExecution, Version};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::model::{ExecutionId, IssueId, IssueKey, JobToken, VersionId};

#[derive(Debug, Deserialize)]
struct IssueRef {
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JobProgress {
    #[serde(default)]
    progress: Option<f64>,
}

/// HTTP gateway talking to live JIRA and Zephyr instances.
pub struct HttpGateway {
    client: Client,
    jira_api: String,
    zephyr_api: String,
    username: String,
    password: String,
}

impl HttpGateway {
    /// Creates a gateway from connection settings.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            jira_api: config.jira_api_url.trim_end_matches('/').to_string(),
            zephyr_api: config.zephyr_api_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn jira_url(&self, path: &str) -> String {
        format!("{}/{}", self.jira_api, path)
    }

    fn zephyr_url(&self, path: &str) -> String {
        format!("{}/{}", self.zephyr_api, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    /// Sends a request and returns the body of a 200 response.
    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<String> {
        let response = self.authed(request).send().await?;
        let status = response.status();
        tracing::debug!(operation, status = status.as_u16(), url = %response.url(), "remote call");

        if status != StatusCode::OK {
            return Err(Error::RemoteCall {
                operation: operation.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let body = self.send(operation, request).await?;
        parse_body(operation, &body)
    }
}

fn parse_body<T: DeserializeOwned>(operation: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::UnexpectedResponse {
        operation: operation.to_string(),
        reason: e.to_string(),
    })
}

/// JIRA returns ids as strings, but tolerate bare numbers.
fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_versions(&self, project: &str) -> Result<Vec<Version>> {
        let operation = format!("get versions of project {}", project);
        let url = self.jira_url(&format!("project/{}/versions", project));
        self.send_json(&operation, self.client.get(url)).await
    }

    async fn issue_id(&self, key: &IssueKey) -> Result<IssueId> {
        let operation = format!("get ticket ID of '{}'", key);
        let url = self.jira_url(&format!("issue/{}", key));
        let issue: IssueRef = self.send_json(&operation, self.client.get(url)).await?;
        id_string(&issue.id)
            .map(IssueId)
            .ok_or_else(|| Error::UnexpectedResponse {
                operation,
                reason: "issue id is not a string or number".to_string(),
            })
    }

    async fn list_cycles(&self, project: &str, version: &VersionId) -> Result<CycleListing> {
        let operation = format!("get cycles of project {} with version {}", project, version);
        let request = self
            .client
            .get(self.zephyr_url("cycle"))
            .query(&[("projectId", project.to_string()), ("versionId", version.to_string())]);
        self.send_json(&operation, request).await
    }

    async fn create_cycle(&self, cycle: &NewCycle) -> Result<CreatedCycle> {
        let operation = format!("create cycle '{}'", cycle.name);
        let request = self.client.post(self.zephyr_url("cycle")).json(cycle);
        self.send_json(&operation, request).await
    }

    async fn create_execution(&self, execution: &NewExecution) -> Result<ExecutionId> {
        let operation = format!("create execution for {} cycle", execution.cycle_id);
        let request = self.client.post(self.zephyr_url("execution")).json(execution);
        let created: serde_json::Map<String, serde_json::Value> =
            self.send_json(&operation, request).await?;
        // Body is keyed by the new execution id
        created
            .keys()
            .next()
            .map(|id| ExecutionId(id.clone()))
            .ok_or_else(|| Error::UnexpectedResponse {
                operation,
                reason: "response has no execution id".to_string(),
            })
    }

    async fn update_bulk_status(&self, update: &BulkStatusUpdate) -> Result<()> {
        let operation = format!(
            "set status {} on {} executions",
            update.status,
            update.executions.len()
        );
        let request = self
            .client
            .put(self.zephyr_url("execution/updateBulkStatus"))
            .json(update);
        self.send(&operation, request).await.map(|_| ())
    }

    async fn job_progress(&self, token: &JobToken) -> Result<Option<f64>> {
        let operation = format!("get progress of job {}", token);
        let url = self.zephyr_url(&format!("execution/jobProgress/{}", token));
        let progress: JobProgress = self.send_json(&operation, self.client.get(url)).await?;
        Ok(progress.progress)
    }
}
