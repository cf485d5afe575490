//! Version and test-cycle resolution.

use std::sync::Arc;

use crate::config::CycleDetails;
use crate::error::{Error, Result};
use crate::gateway::{CycleListing, Gateway, NewCycle};
use crate::model::{CycleId, VersionId, UNSCHEDULED_VERSION};
use crate::poller::JobPoller;

/// Key of the non-cycle entry in a cycle listing.
const RECORDS_COUNT: &str = "recordsCount";

/// Finds or creates the version and cycle results are published to.
pub struct CycleResolver {
    gateway: Arc<dyn Gateway>,
    poller: JobPoller,
    project: String,
}

impl CycleResolver {
    /// Creates a resolver for `project`.
    pub fn new(gateway: Arc<dyn Gateway>, poller: JobPoller, project: impl Into<String>) -> Self {
        Self {
            gateway,
            poller,
            project: project.into(),
        }
    }

    /// Resolves a version name to its id.
    ///
    /// `Unscheduled` maps to [`VersionId::Unscheduled`] without a remote call.
    pub async fn resolve_version(&self, name: &str) -> Result<VersionId> {
        tracing::info!(version = name, "getting ID of version");
        if name == UNSCHEDULED_VERSION {
            return Ok(VersionId::Unscheduled);
        }

        self.gateway
            .list_versions(&self.project)
            .await?
            .into_iter()
            .find(|v| v.name == name)
            .map(|v| VersionId::Id(v.id))
            .ok_or_else(|| Error::NotFound {
                kind: "version",
                name: name.to_string(),
                context: None,
            })
    }

    /// Looks up an existing cycle by exact name.
    pub async fn find_cycle(&self, name: &str, version: &VersionId) -> Result<Option<CycleId>> {
        tracing::info!(cycle = name, version = %version, "checking if cycle already exists");
        let listing = self.gateway.list_cycles(&self.project, version).await?;
        Ok(cycle_named(&listing, name))
    }

    /// Returns the id of cycle `name`, creating it first if it does not exist.
    pub async fn resolve_cycle(
        &self,
        name: &str,
        version: &VersionId,
        details: &CycleDetails,
    ) -> Result<CycleId> {
        if let Some(id) = self.find_cycle(name, version).await? {
            return Ok(id);
        }

        self.create_cycle(name, version, details).await?;

        // Creation only returns a job token, so look the new cycle up by name
        self.find_cycle(name, version)
            .await?
            .ok_or_else(|| Error::NotFound {
                kind: "cycle",
                name: name.to_string(),
                context: Some("after successful creation".to_string()),
            })
    }

    async fn create_cycle(
        &self,
        name: &str,
        version: &VersionId,
        details: &CycleDetails,
    ) -> Result<()> {
        tracing::info!(cycle = name, "creating cycle");
        let body = NewCycle {
            cloned_cycle_id: details.cloned_cycle_id.clone().map(CycleId),
            name: name.to_string(),
            build: details.build.clone(),
            environment: details.environment.clone(),
            description: details.description.clone(),
            project_id: self.project.clone(),
            version_id: version.clone(),
            start_date: String::new(),
            end_date: String::new(),
            clone_custom_fields: false,
        };

        let created = self.gateway.create_cycle(&body).await?;
        if let Some(token) = created.job_progress_token {
            tracing::info!(token = %token, "waiting for cycle creation job");
            self.poller.wait_for(&token).await?;
        }
        Ok(())
    }
}

/// Finds the id of the cycle called `name`, skipping non-cycle entries.
fn cycle_named(listing: &CycleListing, name: &str) -> Option<CycleId> {
    listing
        .iter()
        .filter(|(id, _)| id.as_str() != RECORDS_COUNT)
        .find(|(_, cycle)| cycle.get("name").and_then(|n| n.as_str()) == Some(name))
        .map(|(id, _)| CycleId(id.clone()))
}
