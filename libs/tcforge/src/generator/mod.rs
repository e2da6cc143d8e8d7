//! Generation pipeline.
//!
//! Test suite -> test groups -> test cases, each level collecting the
//! results of the level below without ever stopping early. Only
//! collaborator failures that make the whole run meaningless (the output
//! directory cannot be created) abort it.

pub mod combiner;
pub mod logger;
pub mod result;
pub mod test_case;
pub mod test_group;
pub mod test_suite;

pub use combiner::MultipleTestCasesCombiner;
pub use logger::{GeneratorLogger, TracingGeneratorLogger};
pub use result::{
    CombinationFailure, FailureKind, GenerationResult, MultipleTestCasesCombinationResult, TestCaseGenerationFailure,
    TestCaseGenerationResult, TestGroupGenerationResult,
};
pub use test_case::{GeneratedTestCase, TestCaseGenerator};
pub use test_group::TestGroupGenerator;
pub use test_suite::TestSuiteGenerator;

use crate::os::{FileSystem, ProcessExecutor};
use anyhow::{bail, Result};
use std::path::Path;
use tcforge_common::types::{ExecutionRequest, ExecutionResult};

pub(crate) fn describe_failure(result: &ExecutionResult) -> String {
    let reason = if result.timed_out {
        "timed out".to_string()
    } else if let Some(signal) = result.signal {
        format!("killed by signal {}", signal)
    } else {
        match result.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "no exit code".to_string(),
        }
    };

    match result.stderr.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => format!("{} ({})", reason, line.trim()),
        None => reason,
    }
}

/// Run the reference solution on `input_path` and store its output as the
/// expected output
pub(crate) async fn run_solution(
    executor: &dyn ProcessExecutor,
    fs: &dyn FileSystem,
    solution_command: &str,
    input_path: &Path,
    output_path: &Path,
) -> Result<()> {
    let request = ExecutionRequest::new(solution_command).with_stdin(input_path);
    let result = executor.execute(&request).await?;

    if !result.is_success() {
        bail!("Execution of solution failed: {}", describe_failure(&result));
    }

    fs.write_file(output_path, &result.stdout).await
}
