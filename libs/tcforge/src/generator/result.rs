//! Generation report objects.
//!
//! Produced fresh per run and never mutated after construction. Loggers and
//! the `--json` report consume these; nothing here formats text.

use crate::verifier::{MultipleTestCasesVerificationResult, VerificationResult};
use serde::{Deserialize, Serialize};
use tcforge_common::types::GroupId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    Verification,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestCaseGenerationFailure {
    /// Bound variables do not match the test case's subtask assignment
    Verification { result: VerificationResult },
    /// Generation logic or environment failed (applier error, I/O, solution)
    Other { message: String },
}

impl TestCaseGenerationFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Verification { .. } => FailureKind::Verification,
            Self::Other { .. } => FailureKind::Other,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseGenerationResult {
    pub id: String,
    pub description: Option<String>,
    pub failure: Option<TestCaseGenerationFailure>,
}

impl TestCaseGenerationResult {
    pub fn successful(id: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            description,
            failure: None,
        }
    }

    pub fn failed(id: impl Into<String>, description: Option<String>, failure: TestCaseGenerationFailure) -> Self {
        Self {
            id: id.into(),
            description,
            failure: Some(failure),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombinationFailure {
    Verification { result: MultipleTestCasesVerificationResult },
    Other { message: String },
}

impl CombinationFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Verification { .. } => FailureKind::Verification,
            Self::Other { .. } => FailureKind::Other,
        }
    }
}

/// Outcome of merging one group into a single multiple-test-case file,
/// reported apart from the individual test cases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleTestCasesCombinationResult {
    pub id: String,
    pub failure: Option<CombinationFailure>,
}

impl MultipleTestCasesCombinationResult {
    pub fn is_successful(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestGroupGenerationResult {
    pub group_id: GroupId,
    pub test_cases: Vec<TestCaseGenerationResult>,
    /// Present when the group was combined in multiple-test-case mode
    pub combination: Option<MultipleTestCasesCombinationResult>,
}

impl TestGroupGenerationResult {
    pub fn is_successful(&self) -> bool {
        self.test_cases.iter().all(TestCaseGenerationResult::is_successful)
            && self
                .combination
                .as_ref()
                .map_or(true, MultipleTestCasesCombinationResult::is_successful)
    }

    pub fn failed_test_cases(&self) -> impl Iterator<Item = &TestCaseGenerationResult> {
        self.test_cases.iter().filter(|r| !r.is_successful())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub groups: Vec<TestGroupGenerationResult>,
}

impl GenerationResult {
    pub fn new(groups: Vec<TestGroupGenerationResult>) -> Self {
        Self { groups }
    }

    pub fn is_successful(&self) -> bool {
        self.groups.iter().all(TestGroupGenerationResult::is_successful)
    }

    pub fn test_case_count(&self) -> usize {
        self.groups.iter().map(|g| g.test_cases.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.groups.iter().map(|g| g.failed_test_cases().count()).sum()
    }
}
