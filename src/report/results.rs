//! Issue-key to outcome mapping built from a report scan.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{ExecutionId, IssueKey, TestOutcome};

/// Outcome of one correlated issue plus the execution created for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correlation {
    /// Merged outcome across every report file linking this issue.
    pub outcome: TestOutcome,
    /// Execution created while publishing, if any.
    pub execution_id: Option<ExecutionId>,
}

/// Issue keys found in a report, with their merged outcomes.
///
/// Keys are unique and iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CorrelatedResults {
    entries: BTreeMap<IssueKey, Correlation>,
}

impl CorrelatedResults {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome for `key`, demoting a stored `Passed` if needed.
    pub fn merge(&mut self, key: IssueKey, outcome: TestOutcome) {
        self.entries
            .entry(key)
            .and_modify(|c| c.outcome = c.outcome.merge(outcome))
            .or_insert(Correlation {
                outcome,
                execution_id: None,
            });
    }

    /// Attaches the execution created for `key`. Returns false for unknown keys.
    pub fn record_execution(&mut self, key: &IssueKey, execution_id: ExecutionId) -> bool {
        match self.entries.get_mut(key) {
            Some(c) => {
                c.execution_id = Some(execution_id);
                true
            }
            None => false,
        }
    }

    /// Looks up one issue.
    pub fn get(&self, key: &IssueKey) -> Option<&Correlation> {
        self.entries.get(key)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&IssueKey, &Correlation)> {
        self.entries.iter()
    }

    /// Number of correlated issues.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no issue was correlated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execution ids grouped by outcome, skipping entries without one.
    pub fn executions_by_outcome(&self) -> BTreeMap<TestOutcome, Vec<ExecutionId>> {
        let mut groups: BTreeMap<TestOutcome, Vec<ExecutionId>> = BTreeMap::new();
        for c in self.entries.values() {
            if let Some(id) = &c.execution_id {
                groups.entry(c.outcome).or_default().push(id.clone());
            }
        }
        groups
    }
}

impl FromIterator<(IssueKey, TestOutcome)> for CorrelatedResults {
    fn from_iter<I: IntoIterator<Item = (IssueKey, TestOutcome)>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), |mut acc, (key, outcome)| {
            acc.merge(key, outcome);
            acc
        })
    }
}
