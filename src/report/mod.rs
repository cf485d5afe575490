//! Allure report scanning.
//!
//! Builds the issue-key to outcome mapping from `data/test-cases` in a
//! generated Allure report.

mod results;
mod scanner;

pub use results::{CorrelatedResults, Correlation};
pub use scanner::{scan_report, FileScan, KeyMatcher, ReportScanner};
