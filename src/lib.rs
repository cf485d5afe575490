//! Allure Zephyr - publish Allure test results to Zephyr test cycles
//!
//! This library scans a generated Allure report for test cases linked to JIRA
//! issues, resolves (or creates) the target Zephyr cycle, creates one
//! execution per linked issue and sets execution statuses in bulk.

pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod model;
pub mod poller;
pub mod publish;
pub mod report;

pub use error::{Error, Result};

pub use config::{
    ConnectionConfig, CycleDetails, PollConfig, PublishConfig, PublishTarget, Validate,
    ValidationResult, POLL_INTERVAL_ENV, POLL_TIMEOUT_ENV,
};
pub use cycle::CycleResolver;
pub use engine::Publisher;
pub use gateway::{
    BulkStatusUpdate, CreatedCycle, CycleListing, Gateway, HttpGateway, NewCycle, NewExecution,
    Version,
};
pub use model::{
    CycleId, ExecutionId, IssueId, IssueKey, JobToken, TestOutcome, VersionId, UNSCHEDULED_VERSION,
};
pub use poller::JobPoller;
pub use publish::{ExecutionPublisher, PublishSummary};
pub use report::{scan_report, CorrelatedResults, Correlation, ReportScanner};
