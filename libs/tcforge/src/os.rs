//! Operating system collaborators - file system and process execution.
//!
//! **Critical Architectural Boundary:**
//! - These know HOW to touch the disk and run processes
//! - They know nothing about verdicts, constraints or scoring
//! - Execution outcomes are returned as raw data for the evaluator to judge
//!
//! Production uses [`LocalFileSystem`] and [`LocalExecutor`]; tests swap in
//! in-memory doubles.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tcforge_common::naming;
use tcforge_common::types::{ExecutionRequest, ExecutionResult};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Markers a process prints when an allocation fails under `ulimit -v`
const ALLOCATION_FAILURE_MARKERS: &[&str] = &[
    "bad_alloc",
    "memory allocation of",
    "MemoryError",
    "Cannot allocate memory",
    "out of memory",
    "OutOfMemoryError",
];

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Create a directory and its parents; succeeds if it already exists
    async fn force_make_dir(&self, path: &Path) -> Result<()>;

    /// Replace a file's content atomically
    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    async fn read_file(&self, path: &Path) -> Result<String>;

    async fn remove_file(&self, path: &Path) -> Result<()>;
}

#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run a command to completion or until a limit is hit.
    ///
    /// Limit violations are reported in the result, never as errors. An
    /// `Err` means the process could not be run at all.
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult>;
}

/// Quote one argument for `sh -c`. Plain paths pass through unchanged.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+,:=@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Temp-file cleanup guard - removes a half-written file on drop.
struct TempFileGuard {
    path: Option<PathBuf>,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove temporary file");
                }
            }
        }
    }
}

fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let temp = naming::temp_path(path);
    let mut guard = TempFileGuard::new(temp.clone());

    std::fs::write(&temp, content).with_context(|| format!("Failed to write {}", temp.display()))?;
    std::fs::rename(&temp, path).with_context(|| format!("Failed to move {} into place", path.display()))?;

    guard.disarm();
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn force_make_dir(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create directory {}", path.display()))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        let path = path.to_path_buf();
        let content = content.to_owned();

        // Write and rename run as one blocking task; dropping this future
        // lets the task finish instead of stranding a temp file
        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .context("File write task panicked")?
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

/// Process group cleanup guard - SIGKILLs everything the command started.
///
/// Declared after the `Child` so it drops first, while the group leader is
/// still unreaped and the group id cannot have been recycled.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory of ours
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let e = std::io::Error::last_os_error();
        if e.raw_os_error() != Some(libc::ESRCH) {
            warn!(pgid, error = %e, "Failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

/// Runs commands through `sh -c` on the local machine.
///
/// **Limit Rules:**
/// - Time: wall clock, enforced via `tokio::time::timeout`; every process
///   in the command's process group is killed when the limit elapses
/// - Memory: address space via `ulimit -v`; exceeding it is detected from
///   an abnormal exit plus an allocation-failure message on stderr
/// - Cancellation: dropping an in-flight execution kills the group as well
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    fn command_line(request: &ExecutionRequest) -> String {
        match request.memory_limit_mb {
            Some(mb) => format!("ulimit -v {}; {}", mb.saturating_mul(1024), request.command),
            None => request.command.clone(),
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

fn reports_allocation_failure(stderr: &str) -> bool {
    ALLOCATION_FAILURE_MARKERS.iter().any(|m| stderr.contains(m))
}

#[async_trait]
impl ProcessExecutor for LocalExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(Self::command_line(request))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        match &request.stdin_path {
            Some(path) => {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("Failed to open input {}", path.display()))?;
                command.stdin(Stdio::from(file));
            }
            None => {
                command.stdin(Stdio::null());
            }
        }

        let start = Instant::now();
        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn '{}'", request.command))?;
        let mut group = ProcessGroupGuard::new(child.id());
        let mut stdout_pipe = child.stdout.take().context("Child stdout was not captured")?;
        let mut stderr_pipe = child.stderr.take().context("Child stderr was not captured")?;

        let mut stdout_bytes = Vec::new();
        let mut stderr_bytes = Vec::new();
        let run = async {
            let (status, _, _) = tokio::try_join!(
                child.wait(),
                stdout_pipe.read_to_end(&mut stdout_bytes),
                stderr_pipe.read_to_end(&mut stderr_bytes),
            )?;
            Ok::<_, std::io::Error>(status)
        };
        let outcome = match request.time_limit_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), run).await.ok(),
            None => Some(run.await),
        };
        let execution_time_ms = start.elapsed().as_millis() as u64;

        let Some(status) = outcome else {
            group.kill();
            if let Err(e) = child.kill().await {
                warn!(command = %request.command, error = %e, "Failed to reap timed out process");
            }
            debug!(command = %request.command, execution_ms = execution_time_ms, "Process group killed on timeout");
            return Ok(ExecutionResult {
                timed_out: true,
                execution_time_ms,
                ..Default::default()
            });
        };
        let status = status.with_context(|| format!("Failed to wait for '{}'", request.command))?;
        group.disarm();

        let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
        let memory_exceeded =
            request.memory_limit_mb.is_some() && !status.success() && reports_allocation_failure(&stderr);

        Ok(ExecutionResult {
            exit_code: status.code(),
            signal: exit_signal(&status),
            timed_out: false,
            memory_exceeded,
            stdout,
            stderr,
            execution_time_ms,
        })
    }
}
