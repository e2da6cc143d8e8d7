use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Subtask identifier. `0` is reserved for the global constraint set.
pub type SubtaskId = u32;

/// Test group identifier. `0` is the sample group, official groups start at 1.
pub type GroupId = u32;

pub const GLOBAL_SUBTASK_ID: SubtaskId = 0;
pub const SAMPLE_GROUP_ID: GroupId = 0;

/// Outcome of running one solution against one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Ok,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Ok)
    }

    /// Severity used when several verdicts collapse into one (higher wins)
    pub fn priority(&self) -> u8 {
        match self {
            Verdict::Ok => 0,
            Verdict::WrongAnswer => 1,
            Verdict::RuntimeError => 2,
            Verdict::MemoryLimitExceeded => 3,
            Verdict::TimeLimitExceeded => 4,
        }
    }

    /// Short code as printed in judge reports
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::Ok => "AC",
            Verdict::WrongAnswer => "WA",
            Verdict::TimeLimitExceeded => "TLE",
            Verdict::MemoryLimitExceeded => "MLE",
            Verdict::RuntimeError => "RTE",
        }
    }

    /// The most severe verdict of a sequence, `None` when empty
    pub fn worst<I: IntoIterator<Item = Verdict>>(verdicts: I) -> Option<Verdict> {
        verdicts.into_iter().max_by_key(Verdict::priority)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::Ok => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::MemoryLimitExceeded => "Memory Limit Exceeded",
            Verdict::RuntimeError => "Runtime Error",
        };
        write!(f, "{}", name)
    }
}

/// A single process invocation handed to the execution collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Shell command line
    pub command: String,
    /// File redirected to the process's stdin
    pub stdin_path: Option<PathBuf>,
    pub time_limit_ms: Option<u64>,
    pub memory_limit_mb: Option<u64>,
}

impl ExecutionRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stdin_path: None,
            time_limit_ms: None,
            memory_limit_mb: None,
        }
    }

    pub fn with_stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin_path = Some(path.into());
        self
    }

    pub fn with_time_limit_ms(mut self, limit: Option<u64>) -> Self {
        self.time_limit_ms = limit;
        self
    }

    pub fn with_memory_limit_mb(mut self, limit: Option<u64>) -> Self {
        self.memory_limit_mb = limit;
        self
    }
}

/// Raw outcome of a process invocation.
/// Produced by the executor, consumed by the evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub memory_exceeded: bool,
    pub stdout: String,
    pub stderr: String,
    pub execution_time_ms: u64,
}

impl ExecutionResult {
    /// Exited normally with status 0 and no limit was hit
    pub fn is_success(&self) -> bool {
        !self.timed_out && !self.memory_exceeded && self.signal.is_none() && self.exit_code == Some(0)
    }
}

/// Immutable settings for one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub slug: String,
    pub seed: u64,
    pub solution_command: String,
    pub output_dir: PathBuf,
    pub multiple_test_cases: bool,
}

/// Immutable settings for one grading run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    pub slug: String,
    pub solution_command: String,
    pub test_cases_dir: PathBuf,
    pub time_limit_ms: Option<u64>,
    pub memory_limit_mb: Option<u64>,
    pub multiple_test_cases: bool,
    /// Upper bound on concurrently running solution processes
    pub workers: usize,
}
