//! Core identifiers and the test outcome taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Outcome of a test case as reported by Allure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    /// Test passed.
    Passed,
    /// Test failed.
    Failed,
    /// Broken, skipped, unknown, or any other status.
    Other,
}

impl TestOutcome {
    /// All outcomes, in the order their status updates are pushed.
    pub const ALL: [TestOutcome; 3] =
        [TestOutcome::Passed, TestOutcome::Failed, TestOutcome::Other];

    /// Parses an Allure status token. Unrecognized tokens are `Other`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "passed" => TestOutcome::Passed,
            "failed" => TestOutcome::Failed,
            _ => TestOutcome::Other,
        }
    }

    /// Zephyr execution status code for this outcome.
    ///
    /// Fixed by Zephyr: 1 = PASS, 2 = FAIL, 5 = BLOCKED.
    pub fn status_code(&self) -> u8 {
        match self {
            TestOutcome::Passed => 1,
            TestOutcome::Failed => 2,
            TestOutcome::Other => 5,
        }
    }

    /// Combines a stored outcome with one from another report file.
    ///
    /// A stored `Passed` is demoted by any non-passing outcome; anything
    /// else is never overwritten.
    pub fn merge(self, incoming: TestOutcome) -> TestOutcome {
        if self == TestOutcome::Passed && incoming != TestOutcome::Passed {
            incoming
        } else {
            self
        }
    }

    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestOutcome::Passed => "passed",
            TestOutcome::Failed => "failed",
            TestOutcome::Other => "other",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// JIRA issue key, e.g. `PROJ-123`.
    IssueKey
);
string_id!(
    /// JIRA internal numeric issue id.
    IssueId
);
string_id!(
    /// Zephyr cycle id.
    CycleId
);
string_id!(
    /// Zephyr execution id.
    ExecutionId
);
string_id!(
    /// Handle for an asynchronous Zephyr job.
    JobToken
);

/// Version name that maps to the unscheduled sentinel.
pub const UNSCHEDULED_VERSION: &str = "Unscheduled";

/// Release version a cycle belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionId {
    /// No specific version; sent to Zephyr as `-1`.
    Unscheduled,
    /// JIRA version id.
    Id(String),
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionId::Unscheduled => f.write_str("-1"),
            VersionId::Id(id) => f.write_str(id),
        }
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            VersionId::Unscheduled => serializer.serialize_i64(-1),
            VersionId::Id(id) => serializer.serialize_str(id),
        }
    }
}
