//! Test doubles shared by unit tests: an `A B` problem, an in-memory file
//! system and a scripted process executor.

use crate::generator::{GeneratorLogger, TestCaseGenerationResult};
use crate::grader::{GraderLogger, TestCaseGrade};
use crate::io::IoFormat;
use crate::os::{FileSystem, ProcessExecutor};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tcforge_common::types::{ExecutionRequest, ExecutionResult, GeneratorConfig, GradingConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ab {
    pub a: i64,
    pub b: i64,
}

pub struct AbIo;

impl IoFormat<Ab> for AbIo {
    fn write_input(&self, state: &Ab) -> Result<String> {
        Ok(format!("{} {}\n", state.a, state.b))
    }

    fn parse_input(&self, content: &str) -> Result<Ab> {
        let mut tokens = content.split_whitespace();
        let mut next = |name: &str| -> Result<i64> {
            tokens
                .next()
                .ok_or_else(|| anyhow!("Missing variable {}", name))?
                .parse::<i64>()
                .with_context(|| format!("Invalid variable {}", name))
        };
        let a = next("A")?;
        let b = next("B")?;
        Ok(Ab { a, b })
    }
}

pub fn ab_io() -> Arc<dyn IoFormat<Ab>> {
    Arc::new(AbIo)
}

pub fn generator_config(slug: &str) -> GeneratorConfig {
    GeneratorConfig {
        slug: slug.to_string(),
        seed: 0,
        solution_command: "./solution".to_string(),
        output_dir: PathBuf::from("tc"),
        multiple_test_cases: false,
    }
}

pub fn grading_config(slug: &str) -> GradingConfig {
    GradingConfig {
        slug: slug.to_string(),
        solution_command: "./solution".to_string(),
        test_cases_dir: PathBuf::from("tc"),
        time_limit_ms: Some(1000),
        memory_limit_mb: Some(64),
        multiple_test_cases: false,
        workers: 2,
    }
}

#[derive(Default)]
pub struct InMemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    failing: Mutex<BTreeSet<PathBuf>>,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.lock().unwrap().insert(path.into(), content.into());
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn has_dir(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap().contains(path)
    }

    /// Make every write to (or directory creation at) `path` fail
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        self.failing.lock().unwrap().insert(path.into());
    }

    fn check_writable(&self, path: &Path) -> Result<()> {
        if self.failing.lock().unwrap().contains(path) {
            bail!("Permission denied: {}", path.display());
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn force_make_dir(&self, path: &Path) -> Result<()> {
        self.check_writable(path)?;
        self.dirs.lock().unwrap().insert(path.to_path_buf());
        Ok(())
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        self.check_writable(path)?;
        self.insert(path, content);
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        self.content(path)
            .ok_or_else(|| anyhow!("Failed to read {}: no such file", path.display()))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// Sums every `a b` line of the input
    Summing,
    /// Prints the input back
    Echoing,
}

/// Executor double driven by the in-memory file system.
///
/// Solution runs are recognised by their stdin; checker runs (no stdin)
/// compare the expected and actual files named by their last two
/// arguments and print `AC` or `WA`.
pub struct ScriptedExecutor {
    fs: Arc<InMemoryFileSystem>,
    behavior: Behavior,
    overrides: Mutex<HashMap<String, ExecutionResult>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<ExecutionRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    fn with_behavior(fs: Arc<InMemoryFileSystem>, behavior: Behavior) -> Self {
        Self {
            fs,
            behavior,
            overrides: Mutex::new(HashMap::new()),
            delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn summing(fs: Arc<InMemoryFileSystem>) -> Self {
        Self::with_behavior(fs, Behavior::Summing)
    }

    pub fn echoing(fs: Arc<InMemoryFileSystem>) -> Self {
        Self::with_behavior(fs, Behavior::Echoing)
    }

    /// Sleep this long in every execution
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn respond_on(&self, input_name: &str, result: ExecutionResult) {
        self.overrides.lock().unwrap().insert(input_name.to_string(), result);
    }

    pub fn crash_on(&self, input_name: &str) {
        self.respond_on(
            input_name,
            ExecutionResult {
                exit_code: Some(139),
                stderr: "Segmentation fault".to_string(),
                ..Default::default()
            },
        );
    }

    pub fn time_out_on(&self, input_name: &str) {
        self.respond_on(
            input_name,
            ExecutionResult {
                signal: Some(9),
                timed_out: true,
                execution_time_ms: 1000,
                ..Default::default()
            },
        );
    }

    pub fn exhaust_memory_on(&self, input_name: &str) {
        self.respond_on(
            input_name,
            ExecutionResult {
                exit_code: Some(134),
                memory_exceeded: true,
                stderr: "memory allocation of 1073741824 bytes failed".to_string(),
                ..Default::default()
            },
        );
    }

    pub fn answer_on(&self, input_name: &str, stdout: &str) {
        self.respond_on(
            input_name,
            ExecutionResult {
                exit_code: Some(0),
                stdout: stdout.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<ExecutionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn run_solution(&self, stdin: &Path) -> Result<ExecutionResult> {
        let name = stdin
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(result) = self.overrides.lock().unwrap().get(&name) {
            return Ok(result.clone());
        }

        let input = self
            .fs
            .content(stdin)
            .ok_or_else(|| anyhow!("Failed to open input {}", stdin.display()))?;
        let stdout = match self.behavior {
            Behavior::Echoing => input,
            Behavior::Summing => input
                .lines()
                .filter_map(|line| {
                    let numbers: Vec<i64> = line.split_whitespace().filter_map(|t| t.parse().ok()).collect();
                    (numbers.len() == 2).then(|| format!("{}\n", numbers[0] + numbers[1]))
                })
                .collect(),
        };

        Ok(ExecutionResult {
            exit_code: Some(0),
            stdout,
            execution_time_ms: 5,
            ..Default::default()
        })
    }

    fn run_checker(&self, command: &str) -> Result<ExecutionResult> {
        let args: Vec<&str> = command.split_whitespace().collect();
        if args.len() < 4 {
            bail!("Checker expects three arguments: {}", command);
        }
        let read = |arg: &str| {
            self.fs
                .content(Path::new(arg))
                .ok_or_else(|| anyhow!("Checker cannot open {}", arg))
        };
        let expected = read(args[args.len() - 2])?;
        let actual = read(args[args.len() - 1])?;
        let same = expected.split_whitespace().eq(actual.split_whitespace());

        Ok(ExecutionResult {
            exit_code: Some(0),
            stdout: if same { "AC\n" } else { "WA\n" }.to_string(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl ProcessExecutor for ScriptedExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        self.calls.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match &request.stdin_path {
            Some(stdin) => self.run_solution(stdin),
            None => self.run_checker(&request.command),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Records the phases it is told about, in order
#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl GeneratorLogger for RecordingLogger {
    fn log_introduction(&self) {
        self.record("introduction".to_string());
    }

    fn log_test_group_introduction(&self, group_id: u32) {
        self.record(format!("group {}", group_id));
    }

    fn log_test_case_result(&self, result: &TestCaseGenerationResult) {
        let outcome = if result.is_successful() { "OK" } else { "FAILED" };
        self.record(format!("{} {}", result.id, outcome));
    }

    fn log_multiple_test_cases_combination_result(
        &self,
        result: &crate::generator::MultipleTestCasesCombinationResult,
    ) {
        let outcome = if result.is_successful() { "OK" } else { "FAILED" };
        self.record(format!("combined {} {}", result.id, outcome));
    }

    fn log_result(&self, result: &crate::generator::GenerationResult) {
        self.record(format!("result {}", result.is_successful()));
    }
}

impl GraderLogger for RecordingLogger {
    fn log_test_case_grade(&self, grade: &TestCaseGrade) {
        self.record(format!("{} {}", grade.id, grade.verdict.code()));
    }
}
