//! Shared helpers: an in-memory Zephyr/JIRA gateway and report fixtures.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use allure_zephyr::{
    BulkStatusUpdate, CreatedCycle, CycleListing, Error, ExecutionId, Gateway, IssueId,
    IssueKey, JobToken, NewCycle, NewExecution, Result, Version, VersionId,
};

/// A remote call as seen by the fake gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListVersions(String),
    IssueId(String),
    ListCycles(String, String),
    CreateCycle(NewCycle),
    CreateExecution(NewExecution),
    UpdateBulkStatus(BulkStatusUpdate),
    JobProgress(String),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    versions: Vec<Version>,
    cycles: BTreeMap<String, String>,
    next_cycle_id: u32,
    next_execution_id: u32,
    job_token: Option<String>,
    progress: VecDeque<f64>,
    hide_created_cycles: bool,
    failing: Option<(&'static str, u16)>,
}

/// In-memory gateway that records every call.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<State>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        {
            let mut state = gateway.state.lock().unwrap();
            state.next_cycle_id = 100;
            state.next_execution_id = 500;
        }
        gateway
    }

    pub fn with_version(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().versions.push(Version {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_cycle(self, id: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .cycles
            .insert(id.to_string(), name.to_string());
        self
    }

    /// Makes cycle creation asynchronous, reporting `progress` in turn.
    pub fn with_async_creation(self, token: &str, progress: &[f64]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.job_token = Some(token.to_string());
            state.progress = progress.iter().copied().collect();
        }
        self
    }

    /// Created cycles never show up in listings.
    pub fn hiding_created_cycles(self) -> Self {
        self.state.lock().unwrap().hide_created_cycles = true;
        self
    }

    /// Makes `operation` fail with `status`.
    pub fn failing(self, operation: &'static str, status: u16) -> Self {
        self.state.lock().unwrap().failing = Some((operation, status));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(
        &self,
        call: Call,
        operation: &'static str,
    ) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if let Some((failing, status)) = state.failing {
            if failing == operation {
                return Err(Error::RemoteCall {
                    operation: operation.to_string(),
                    status,
                });
            }
        }
        Ok(state)
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn list_versions(&self, project: &str) -> Result<Vec<Version>> {
        let state = self.record(Call::ListVersions(project.to_string()), "list_versions")?;
        Ok(state.versions.clone())
    }

    async fn issue_id(&self, key: &IssueKey) -> Result<IssueId> {
        self.record(Call::IssueId(key.to_string()), "issue_id")?;
        Ok(IssueId(format!("id-{}", key)))
    }

    async fn list_cycles(&self, project: &str, version: &VersionId) -> Result<CycleListing> {
        let state = self.record(
            Call::ListCycles(project.to_string(), version.to_string()),
            "list_cycles",
        )?;
        let mut listing = CycleListing::new();
        for (id, name) in &state.cycles {
            listing.insert(id.clone(), serde_json::json!({ "name": name }));
        }
        listing.insert("recordsCount".to_string(), serde_json::json!(state.cycles.len()));
        Ok(listing)
    }

    async fn create_cycle(&self, cycle: &NewCycle) -> Result<CreatedCycle> {
        let mut state = self.record(Call::CreateCycle(cycle.clone()), "create_cycle")?;
        let id = state.next_cycle_id;
        state.next_cycle_id += 1;
        if !state.hide_created_cycles {
            state.cycles.insert(id.to_string(), cycle.name.clone());
        }
        Ok(CreatedCycle {
            job_progress_token: state.job_token.clone().map(JobToken),
        })
    }

    async fn create_execution(&self, execution: &NewExecution) -> Result<ExecutionId> {
        let mut state = self.record(Call::CreateExecution(execution.clone()), "create_execution")?;
        let id = state.next_execution_id;
        state.next_execution_id += 1;
        Ok(ExecutionId(id.to_string()))
    }

    async fn update_bulk_status(&self, update: &BulkStatusUpdate) -> Result<()> {
        self.record(Call::UpdateBulkStatus(update.clone()), "update_bulk_status")?;
        Ok(())
    }

    async fn job_progress(&self, token: &JobToken) -> Result<Option<f64>> {
        let mut state = self.record(Call::JobProgress(token.to_string()), "job_progress")?;
        let progress = if state.progress.len() > 1 {
            state.progress.pop_front()
        } else {
            state.progress.front().copied()
        };
        Ok(progress)
    }
}

/// Allure report directory with a `data/test-cases` folder.
pub struct Report {
    pub dir: TempDir,
}

impl Report {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("data/test-cases"))
            .expect("failed to create test-cases dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a raw test-case file.
    pub fn raw(&self, name: &str, contents: &str) -> &Self {
        std::fs::write(self.dir.path().join("data/test-cases").join(name), contents)
            .expect("failed to write test case");
        self
    }

    /// Writes a pretty-printed Allure test case with the given link URLs.
    pub fn case(&self, name: &str, status: &str, urls: &[&str]) -> &Self {
        let links = urls
            .iter()
            .map(|url| {
                format!(
                    "{{\n    \"name\" : \"link\",\n    \"url\" : \"{}\",\n    \"type\" : \"issue\"\n  }}",
                    url
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let contents = format!(
            "{{\n  \"uid\" : \"{name}\",\n  \"name\" : \"{name}\",\n  \"status\" : \"{status}\",\n  \"testStage\" : {{\n    \"status\" : \"{status}\"\n  }},\n  \"links\" : [ {links} ],\n  \"parameters\" : [ ]\n}}\n"
        );
        self.raw(&format!("{}.json", name), &contents)
    }
}

pub fn browse(key: &str) -> String {
    format!("https://jira.example.com/browse/{}", key)
}
