/// Scorers - Decide OK or WRONG_ANSWER for a Cleanly Exited Run
///
/// **Strategies:**
/// - [`DiffScorer`]: token comparison per line, insensitive to whitespace
///   amount and trailing blank lines
/// - [`CustomScorer`]: delegates to a checker program invoked as
///   `<checker> <input> <expected> <actual>` whose first output token is
///   `AC` or `WA`
use super::GradingUnit;
use crate::os::{shell_quote, FileSystem, ProcessExecutor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tcforge_common::naming;
use tcforge_common::types::{ExecutionRequest, GradingConfig, Verdict};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringResult {
    pub verdict: Verdict,
    pub detail: Option<String>,
}

impl ScoringResult {
    pub fn accepted() -> Self {
        Self {
            verdict: Verdict::Ok,
            detail: None,
        }
    }

    pub fn wrong_answer(detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::WrongAnswer,
            detail: Some(detail.into()),
        }
    }
}

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Judge `actual_output` for one unit. An `Err` means the expected
    /// output or checker was unusable, not that the answer is wrong.
    async fn score(&self, unit: &GradingUnit, config: &GradingConfig, actual_output: &str) -> Result<ScoringResult>;
}

/// Split output into lines of whitespace-separated tokens.
/// Leading and trailing blank lines are dropped.
pub fn normalize_output(output: &str) -> Vec<Vec<&str>> {
    let mut lines: Vec<Vec<&str>> = output.lines().map(|l| l.split_whitespace().collect()).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);
    lines
}

/// Compare two outputs; `None` when they match, otherwise a short
/// description of the first difference
pub fn diff_outputs(expected: &str, actual: &str) -> Option<String> {
    let expected = normalize_output(expected);
    let actual = normalize_output(actual);

    for (index, (want, got)) in expected.iter().zip(actual.iter()).enumerate() {
        if want != got {
            return Some(format!(
                "Line {}: expected '{}', got '{}'",
                index + 1,
                want.join(" "),
                got.join(" ")
            ));
        }
    }

    if expected.len() != actual.len() {
        return Some(format!("Expected {} lines, got {}", expected.len(), actual.len()));
    }

    None
}

pub struct DiffScorer {
    fs: Arc<dyn FileSystem>,
}

impl DiffScorer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl Scorer for DiffScorer {
    async fn score(&self, unit: &GradingUnit, config: &GradingConfig, actual_output: &str) -> Result<ScoringResult> {
        let expected_path = naming::output_path(&config.test_cases_dir, &unit.id);
        let expected = self
            .fs
            .read_file(&expected_path)
            .await
            .with_context(|| format!("Missing expected output for {}", unit.id))?;

        Ok(match diff_outputs(&expected, actual_output) {
            None => ScoringResult::accepted(),
            Some(detail) => ScoringResult::wrong_answer(detail),
        })
    }
}

pub struct CustomScorer {
    checker_command: String,
    fs: Arc<dyn FileSystem>,
    executor: Arc<dyn ProcessExecutor>,
}

impl CustomScorer {
    pub fn new(
        checker_command: impl Into<String>,
        fs: Arc<dyn FileSystem>,
        executor: Arc<dyn ProcessExecutor>,
    ) -> Self {
        Self {
            checker_command: checker_command.into(),
            fs,
            executor,
        }
    }

    /// Map the checker's answer to a scoring result
    pub fn parse_checker_output(stdout: &str) -> ScoringResult {
        let mut tokens = stdout.split_whitespace();
        match tokens.next() {
            Some("AC") => ScoringResult::accepted(),
            Some("WA") => {
                let reason = tokens.collect::<Vec<_>>().join(" ");
                if reason.is_empty() {
                    ScoringResult::wrong_answer("Checker rejected the output")
                } else {
                    ScoringResult::wrong_answer(reason)
                }
            }
            Some(other) => ScoringResult::wrong_answer(format!("Checker error: unknown verdict '{}'", other)),
            None => ScoringResult::wrong_answer("Checker error: empty output"),
        }
    }
}

#[async_trait]
impl Scorer for CustomScorer {
    async fn score(&self, unit: &GradingUnit, config: &GradingConfig, actual_output: &str) -> Result<ScoringResult> {
        let input_path = naming::input_path(&config.test_cases_dir, &unit.id);
        let expected_path = naming::output_path(&config.test_cases_dir, &unit.id);
        let actual_path = naming::evaluation_output_path(&config.test_cases_dir, &unit.id);

        self.fs.write_file(&actual_path, actual_output).await?;

        let command = format!(
            "{} {} {} {}",
            self.checker_command,
            shell_quote(&input_path.to_string_lossy()),
            shell_quote(&expected_path.to_string_lossy()),
            shell_quote(&actual_path.to_string_lossy())
        );
        let outcome = self.executor.execute(&ExecutionRequest::new(command)).await;

        if let Err(e) = self.fs.remove_file(&actual_path).await {
            warn!(path = %actual_path.display(), error = %e, "Failed to remove evaluation output");
        }

        let execution = outcome.with_context(|| format!("Failed to run checker for {}", unit.id))?;
        if !execution.is_success() {
            return Ok(ScoringResult::wrong_answer(format!(
                "Checker error: exit code {:?}",
                execution.exit_code
            )));
        }

        Ok(Self::parse_checker_output(&execution.stdout))
    }
}
