//! Grader logging collaborator.

use super::{GradingReport, TestCaseGrade};
use tracing::{info, warn};

pub trait GraderLogger: Send + Sync {
    fn log_introduction(&self, _test_cases: usize) {}
    fn log_test_case_grade(&self, _grade: &TestCaseGrade) {}
    fn log_result(&self, _report: &GradingReport) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingGraderLogger;

impl GraderLogger for TracingGraderLogger {
    fn log_introduction(&self, test_cases: usize) {
        info!(test_cases, "Grading...");
    }

    fn log_test_case_grade(&self, grade: &TestCaseGrade) {
        if grade.verdict.is_accepted() {
            info!(
                test_case_id = %grade.id,
                verdict = grade.verdict.code(),
                execution_ms = grade.execution_time_ms,
                "Graded"
            );
        } else {
            warn!(
                test_case_id = %grade.id,
                verdict = grade.verdict.code(),
                execution_ms = grade.execution_time_ms,
                detail = grade.detail.as_deref().unwrap_or(""),
                "Graded"
            );
        }
    }

    fn log_result(&self, report: &GradingReport) {
        for subtask in &report.subtasks {
            info!(
                subtask_id = subtask.subtask_id,
                verdict = subtask.verdict.map(|v| v.code()).unwrap_or("-"),
                score = subtask.score,
                points = subtask.points,
                passed = subtask.passed,
                test_cases = subtask.test_cases,
                "Subtask result"
            );
        }
        info!(
            verdict = report.verdict.map(|v| v.code()).unwrap_or("-"),
            score = report.score,
            "Grading finished"
        );
    }
}
