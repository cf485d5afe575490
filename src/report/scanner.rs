//! Line-oriented scanner for Allure test-case files.
//!
//! Test-case files are machine-generated JSON. Only two things matter here:
//! the first `status` field and the `url` values in the `links` array that
//! follows it. The scan runs as a small state machine so the end of the
//! links section is explicit.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::results::CorrelatedResults;
use crate::error::{Error, Result};
use crate::model::{IssueKey, TestOutcome};

/// Directory under the report root holding one file per test case.
const TEST_CASES_DIR: &str = "data/test-cases";

/// Extracts issue keys from link URLs.
#[derive(Debug, Clone)]
pub enum KeyMatcher {
    /// Takes the last path segment of the URL.
    LastSegment,
    /// Takes the first `<PROJECT>-<digits>` token in the URL.
    Project(Regex),
}

impl KeyMatcher {
    /// Builds a matcher, optionally restricted to one JIRA project.
    pub fn new(limit_by_project: Option<&str>) -> Result<Self> {
        match limit_by_project {
            None => Ok(KeyMatcher::LastSegment),
            Some(project) => {
                let pattern = format!(r"{}-\d+", regex::escape(project));
                let regex = Regex::new(&pattern)
                    .map_err(|e| Error::Config(format!("invalid project filter: {}", e)))?;
                Ok(KeyMatcher::Project(regex))
            }
        }
    }

    /// Extracts an issue key from a link URL.
    pub fn extract(&self, url: &str) -> Option<IssueKey> {
        match self {
            KeyMatcher::LastSegment => {
                let (_, segment) = url.rsplit_once('/')?;
                let valid = !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
                valid.then(|| IssueKey::from(segment))
            }
            KeyMatcher::Project(regex) => regex.find(url).map(|m| IssueKey::from(m.as_str())),
        }
    }
}

/// Position of the scanner within a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Looking for the first `status` field.
    SeekStatus,
    /// Status found; looking for the `links` marker.
    SeekLinksStart(TestOutcome),
    /// Inside the links array, `depth` brackets deep.
    InLinks { outcome: TestOutcome, depth: usize },
    /// Links array closed; nothing more to read.
    Done(TestOutcome),
}

/// Finds the `]` that closes the links array in `line`.
///
/// Brackets inside string values are skipped. `depth` carries the bracket
/// nesting over from previous lines and is updated in place.
fn links_end(line: &str, depth: &mut usize) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => *depth += 1,
            ']' if *depth <= 1 => return Some(i),
            ']' => *depth -= 1,
            _ => {}
        }
    }
    None
}

/// What one test-case file contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileScan {
    /// Outcome of the test case.
    pub outcome: TestOutcome,
    /// Issue keys found in its links, in file order.
    pub keys: Vec<IssueKey>,
}

/// Scans Allure report directories into [`CorrelatedResults`].
#[derive(Debug, Clone)]
pub struct ReportScanner {
    status: Regex,
    url: Regex,
    matcher: KeyMatcher,
}

impl ReportScanner {
    /// Creates a scanner, optionally limiting links to one JIRA project.
    pub fn new(limit_by_project: Option<&str>) -> Result<Self> {
        Ok(Self {
            status: Regex::new(r#""status"\s*:\s*"(\w+)""#).expect("status pattern is valid"),
            url: Regex::new(r#""url"\s*:\s*"([^"]*)""#).expect("url pattern is valid"),
            matcher: KeyMatcher::new(limit_by_project)?,
        })
    }

    /// Scans the contents of one test-case file.
    ///
    /// Returns `None` when the file has no status. A file with a status but
    /// no links yields an empty key list.
    pub fn scan_contents(&self, contents: &str) -> Option<FileScan> {
        let mut state = ScanState::SeekStatus;
        let mut keys = Vec::new();

        'lines: for line in contents.lines() {
            let mut rest = line;
            loop {
                match state {
                    ScanState::SeekStatus => {
                        let Some(caps) = self.status.captures(rest) else {
                            continue 'lines;
                        };
                        let whole = caps.get(0).map_or(rest.len(), |m| m.end());
                        state = ScanState::SeekLinksStart(TestOutcome::from_token(&caps[1]));
                        rest = &rest[whole..];
                    }
                    ScanState::SeekLinksStart(outcome) => {
                        let Some(pos) = rest.find("\"links\"") else {
                            continue 'lines;
                        };
                        state = ScanState::InLinks { outcome, depth: 0 };
                        rest = &rest[pos + "\"links\"".len()..];
                    }
                    ScanState::InLinks { outcome, mut depth } => {
                        let end = links_end(rest, &mut depth);
                        let segment = end.map_or(rest, |end| &rest[..end]);
                        keys.extend(
                            self.url
                                .captures_iter(segment)
                                .filter_map(|caps| self.matcher.extract(&caps[1])),
                        );
                        // A closed array ends the file; anything after is not a link.
                        if end.is_some() {
                            state = ScanState::Done(outcome);
                            break 'lines;
                        }
                        state = ScanState::InLinks { outcome, depth };
                        continue 'lines;
                    }
                    ScanState::Done(_) => break 'lines,
                }
            }
        }

        let outcome = match state {
            ScanState::SeekStatus => return None,
            ScanState::SeekLinksStart(outcome)
            | ScanState::InLinks { outcome, .. }
            | ScanState::Done(outcome) => outcome,
        };
        Some(FileScan { outcome, keys })
    }

    /// Scans every test-case file under `report_path` and folds the results.
    ///
    /// Files are visited in name order. Unreadable files are skipped with a
    /// warning; only failing to list the directory is an error.
    pub fn scan(&self, report_path: &Path) -> Result<CorrelatedResults> {
        let dir = report_path.join(TEST_CASES_DIR);
        tracing::info!(path = %report_path.display(), "getting statuses of all tests");

        let entries = fs::read_dir(&dir).map_err(|source| Error::ReportDirectory {
            path: dir.clone(),
            source,
        })?;

        // Sort so duplicate issues merge in a stable order
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        let results = files
            .iter()
            .filter_map(|path| self.scan_file(path))
            .fold(CorrelatedResults::new(), |mut acc, scan| {
                for key in scan.keys {
                    acc.merge(key, scan.outcome);
                }
                acc
            });

        tracing::info!(
            files = files.len(),
            issues = results.len(),
            "finished scanning report"
        );
        Ok(results)
    }

    fn scan_file(&self, path: &Path) -> Option<FileScan> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable test case");
                return None;
            }
        };
        let scan = self.scan_contents(&String::from_utf8_lossy(&bytes));
        if scan.is_none() {
            tracing::debug!(path = %path.display(), "test case has no status");
        }
        scan
    }
}

/// Scans a report directory with an optional project filter.
pub fn scan_report(
    report_path: &Path,
    limit_by_project: Option<&str>,
) -> Result<CorrelatedResults> {
    ReportScanner::new(limit_by_project)?.scan(report_path)
}
