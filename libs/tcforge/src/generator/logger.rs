//! Generator logging collaborator.
//!
//! Receives structured results at each phase; the default implementation
//! turns them into `tracing` events with structured fields.

use super::result::{
    CombinationFailure, GenerationResult, MultipleTestCasesCombinationResult, TestCaseGenerationFailure,
    TestCaseGenerationResult,
};
use tcforge_common::types::GroupId;
use tracing::{error, info, warn};

pub trait GeneratorLogger: Send + Sync {
    fn log_introduction(&self) {}
    fn log_test_group_introduction(&self, _group_id: GroupId) {}
    fn log_test_case_introduction(&self, _id: &str) {}
    fn log_test_case_result(&self, _result: &TestCaseGenerationResult) {}
    fn log_multiple_test_cases_combination_introduction(&self, _id: &str) {}
    fn log_multiple_test_cases_combination_result(&self, _result: &MultipleTestCasesCombinationResult) {}
    fn log_result(&self, _result: &GenerationResult) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingGeneratorLogger;

impl GeneratorLogger for TracingGeneratorLogger {
    fn log_introduction(&self) {
        info!("Generating test cases...");
    }

    fn log_test_group_introduction(&self, group_id: GroupId) {
        if group_id == 0 {
            info!(group_id, "Sample test cases");
        } else {
            info!(group_id, "Official test cases");
        }
    }

    fn log_test_case_result(&self, result: &TestCaseGenerationResult) {
        let description = result.description.as_deref().unwrap_or("");
        match &result.failure {
            None => info!(test_case_id = %result.id, description, "OK"),
            Some(TestCaseGenerationFailure::Verification { result: verification }) => {
                for (subtask_id, constraints) in &verification.unsatisfied_constraints {
                    warn!(
                        test_case_id = %result.id,
                        description,
                        subtask_id,
                        constraints = ?constraints,
                        "FAILED: does not satisfy subtask"
                    );
                }
                for subtask_id in &verification.satisfied_but_not_assigned_subtasks {
                    warn!(
                        test_case_id = %result.id,
                        description,
                        subtask_id,
                        "FAILED: satisfies subtask but is not assigned to it"
                    );
                }
            }
            Some(TestCaseGenerationFailure::Other { message }) => {
                error!(test_case_id = %result.id, description, reason = %message, "FAILED");
            }
        }
    }

    fn log_multiple_test_cases_combination_introduction(&self, id: &str) {
        info!(test_case_id = %id, "Combining test cases into a single file");
    }

    fn log_multiple_test_cases_combination_result(&self, result: &MultipleTestCasesCombinationResult) {
        match &result.failure {
            None => info!(test_case_id = %result.id, "OK"),
            Some(CombinationFailure::Verification { result: verification }) => warn!(
                test_case_id = %result.id,
                constraints = ?verification.unsatisfied_constraints,
                "FAILED: does not satisfy multiple test cases constraints"
            ),
            Some(CombinationFailure::Other { message }) => {
                error!(test_case_id = %result.id, reason = %message, "FAILED")
            }
        }
    }

    fn log_result(&self, result: &GenerationResult) {
        if result.is_successful() {
            info!(test_cases = result.test_case_count(), "Generation finished. All test cases OK.");
        } else {
            warn!(
                test_cases = result.test_case_count(),
                failed = result.failed_count(),
                "Generation finished. Some test cases FAILED."
            );
        }
    }
}
