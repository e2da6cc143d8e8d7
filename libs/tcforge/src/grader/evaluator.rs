/// Batch Evaluator - Runs a Solution Against One Test Case
///
/// **Core Responsibility:**
/// Execute the solution with the test case's input file on stdin under the
/// configured limits, and classify abnormal outcomes.
///
/// **Classification Rules (first match wins):**
/// - Timed out: TimeLimitExceeded
/// - Memory limit hit: MemoryLimitExceeded
/// - Killed by a signal or non-zero exit: RuntimeError
/// - Clean exit: undecided, the output goes to the Scorer
///
/// A process killed on timeout also carries a signal, which is why the
/// limit flags are checked before the exit status.
use super::GradingUnit;
use crate::os::ProcessExecutor;
use anyhow::Result;
use std::sync::Arc;
use tcforge_common::naming;
use tcforge_common::types::{ExecutionRequest, ExecutionResult, GradingConfig, Verdict};

/// Raw evaluation of one test case, before scoring
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// Decided verdict for abnormal runs; `None` means the output must be scored
    pub verdict: Option<Verdict>,
    pub execution: ExecutionResult,
}

/// Decide the verdict implied by the execution alone
pub fn classify_execution(execution: &ExecutionResult) -> Option<Verdict> {
    if execution.timed_out {
        Some(Verdict::TimeLimitExceeded)
    } else if execution.memory_exceeded {
        Some(Verdict::MemoryLimitExceeded)
    } else if execution.signal.is_some() || execution.exit_code != Some(0) {
        Some(Verdict::RuntimeError)
    } else {
        None
    }
}

pub struct BatchEvaluator {
    executor: Arc<dyn ProcessExecutor>,
}

impl BatchEvaluator {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { executor }
    }

    pub async fn evaluate(&self, unit: &GradingUnit, config: &GradingConfig) -> Result<EvaluationResult> {
        let request = ExecutionRequest::new(config.solution_command.as_str())
            .with_stdin(naming::input_path(&config.test_cases_dir, &unit.id))
            .with_time_limit_ms(config.time_limit_ms)
            .with_memory_limit_mb(config.memory_limit_mb);

        let execution = self.executor.execute(&request).await?;

        Ok(EvaluationResult {
            verdict: classify_execution(&execution),
            execution,
        })
    }
}
