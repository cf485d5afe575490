//! Configuration for publish runs.
//!
//! Settings come from an optional TOML file, environment overrides for
//! polling, and CLI flags layered on top by the binary. Everything is
//! validated before any remote call is made.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the job-progress timeout, in seconds.
pub const POLL_TIMEOUT_ENV: &str = "ALLURE_ZEPHYR_PULLING_TIMEOUT";

/// Environment variable overriding the job-progress interval, in seconds.
pub const POLL_INTERVAL_ENV: &str = "ALLURE_ZEPHYR_PULLING_INTERVAL";

/// Connection to JIRA and Zephyr.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// JIRA project id.
    #[serde(default)]
    pub project: String,
    /// JIRA REST base URL, e.g. `https://jira.example.com/rest/api/2`.
    #[serde(default)]
    pub jira_api_url: String,
    /// Zephyr REST base URL, e.g. `https://jira.example.com/rest/zapi/latest`.
    #[serde(default)]
    pub zephyr_api_url: String,
    /// JIRA user name.
    #[serde(default)]
    pub username: String,
    /// JIRA password or API token.
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

/// What to publish and where.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishTarget {
    /// Allure report directory.
    #[serde(default)]
    pub report_path: PathBuf,
    /// Version name, or `Unscheduled`.
    #[serde(default)]
    pub version: String,
    /// Test cycle name.
    #[serde(default)]
    pub cycle: String,
    /// Only correlate links to this JIRA project key.
    #[serde(default)]
    pub limit_by_project: Option<String>,
}

/// Extra fields used when the cycle has to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDetails {
    /// Cycle to clone executions from.
    #[serde(default)]
    pub cloned_cycle_id: Option<String>,
    /// Build label.
    #[serde(default)]
    pub build: Option<String>,
    /// Environment label.
    #[serde(default)]
    pub environment: Option<String>,
    /// Cycle description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Job-progress polling settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between polls.
    #[serde(default = "default_poll_interval")]
    pub interval_secs: f64,
    /// Seconds before giving up.
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: f64,
}

fn default_poll_interval() -> f64 {
    2.0
}

fn default_poll_timeout() -> f64 {
    30.0
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            timeout_secs: default_poll_timeout(),
        }
    }
}

impl PollConfig {
    /// Interval between polls.
    pub fn interval(&self) -> Duration {
        saturating_duration(self.interval_secs)
    }

    /// Total time to wait for a job.
    pub fn timeout(&self) -> Duration {
        saturating_duration(self.timeout_secs)
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides looked up through `lookup`. Blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(secs) = parse_seconds(POLL_INTERVAL_ENV, lookup(POLL_INTERVAL_ENV))? {
            self.interval_secs = secs;
        }
        if let Some(secs) = parse_seconds(POLL_TIMEOUT_ENV, lookup(POLL_TIMEOUT_ENV))? {
            self.timeout_secs = secs;
        }
        Ok(self)
    }
}

/// Negative values clamp to zero, values too large for a `Duration` to its max.
fn saturating_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

fn parse_seconds(name: &str, value: Option<String>) -> Result<Option<f64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let secs = value.parse::<f64>().map_err(|_| {
        Error::Config(format!("{} must be a number of seconds, got '{}'", name, value))
    })?;
    // Also rejects NaN, infinities and values past `Duration::MAX`.
    Duration::try_from_secs_f64(secs).map_err(|e| {
        Error::Config(format!("{} is not a usable number of seconds '{}': {}", name, value, e))
    })?;
    Ok(Some(secs))
}

/// Complete configuration for one publish run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Remote connection.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Report and destination.
    #[serde(default)]
    pub target: PublishTarget,
    /// Cycle creation details.
    #[serde(default)]
    pub cycle: CycleDetails,
    /// Job polling.
    #[serde(default)]
    pub polling: PollConfig,
}

impl PublishConfig {
    /// Parses a TOML configuration document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Config(format!("invalid config: {}", e)))
    }

    /// Loads a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

fn require(result: &mut ValidationResult, name: &str, value: &str) {
    if value.trim().is_empty() {
        result.add_error(format!("{} is required", name));
    }
}

impl Validate for ConnectionConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        require(&mut result, "project", &self.project);
        require(&mut result, "username", &self.username);

        for (name, url) in [
            ("jira_api_url", &self.jira_api_url),
            ("zephyr_api_url", &self.zephyr_api_url),
        ] {
            if url.trim().is_empty() {
                result.add_error(format!("{} is required", name));
            } else if !(url.starts_with("http://") || url.starts_with("https://")) {
                result.add_error(format!("{} '{}' must be an http(s) URL", name, url));
            }
        }

        if self.password.is_empty() {
            result.add_warning("password is empty - requests will likely be rejected");
        }

        if self.request_timeout_secs == 0 {
            result.add_error("request_timeout_secs must be at least 1");
        }

        result
    }
}

impl Validate for PublishTarget {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.report_path.as_os_str().is_empty() {
            result.add_error("report_path is required");
        }
        require(&mut result, "version", &self.version);
        require(&mut result, "cycle", &self.cycle);

        if let Some(project) = &self.limit_by_project {
            if project.trim().is_empty() {
                result.add_error("limit_by_project cannot be blank");
            }
        }

        result
    }
}

impl Validate for PollConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (name, secs) in [("interval", self.interval_secs), ("timeout", self.timeout_secs)] {
            // NaN fails this check as well
            if !(secs > 0.0) {
                result.add_error(format!("polling {} must be greater than zero", name));
            } else if Duration::try_from_secs_f64(secs).is_err() {
                result.add_error(format!("polling {} of {} seconds is too large", name, secs));
            }
        }

        // Only worth a warning: the job still gets polled once
        if self.interval_secs > self.timeout_secs {
            result.add_warning(
                "polling interval is longer than the timeout - only one poll will run",
            );
        }

        result
    }
}

impl Validate for PublishConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        result.merge(self.connection.validate());
        result.merge(self.target.validate());
        result.merge(self.polling.validate());
        result
    }
}
