//! Runner module - Execution abstraction layer
//!
//! This module provides a unified interface for running programs under
//! resource limits:
//! - `LimitedRunner`: supervises one process against wall-clock, CPU-time and
//!   memory ceilings and reports what it used
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Know about problem-specific logic
//! - Provide isolation; the service is expected to already run inside one

pub mod limited;
pub mod monitor;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    /// Append arguments after the existing ones
    pub fn append_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        Self::new(program).append_args(iter.cloned())
    }

    /// Program path to exec
    ///
    /// Relative paths such as `./main` are resolved against the working
    /// directory; bare names are left for the `PATH` lookup.
    pub fn resolved_program(&self) -> PathBuf {
        let program = Path::new(&self.program);
        match &self.work_dir {
            Some(dir) if program.is_relative() && self.program.contains('/') => dir.join(program),
            _ => program.to_path_buf(),
        }
    }
}

/// Resource limits for execution
#[derive(Debug, Clone, PartialEq)]
pub struct RunLimits {
    /// Wall-clock limit
    pub wall_time: Duration,
    /// CPU time limit
    pub cpu_time: Duration,
    /// Memory limit in bytes
    pub memory_bytes: u64,
}

impl RunLimits {
    pub fn new(wall_time: Duration, cpu_time: Duration, memory_bytes: u64) -> Self {
        Self {
            wall_time,
            cpu_time,
            memory_bytes,
        }
    }

    /// Same limit for wall-clock and CPU time
    pub fn uniform(time: Duration, memory_bytes: u64) -> Self {
        Self::new(time, time, memory_bytes)
    }
}

/// How the supervised process ended (raw, no verdict interpretation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Program exited by itself with given exit code
    Normal(i32),
    /// Killed by a signal. `None` when the process could not be started.
    Signaled(Option<i32>),
    /// Wall-clock or CPU time limit exceeded
    TimeExceeded,
    /// Memory limit exceeded
    MemoryExceeded,
}

impl ExitKind {
    /// Check if execution was successful (exited with code 0)
    pub fn is_success(&self) -> bool {
        matches!(self, ExitKind::Normal(0))
    }
}

/// Outcome of running a program
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub exit: ExitKind,
    /// CPU time used. Exactly the CPU limit when `exit` is `TimeExceeded`.
    pub time: Duration,
    /// Wall-clock time from spawn to reap
    pub wall_time: Duration,
    /// Peak resident memory in bytes. Exactly the limit when `exit` is
    /// `MemoryExceeded`.
    pub memory: u64,
    /// Stdout content, truncated to the output cap
    pub stdout: Vec<u8>,
    /// Stderr content, truncated to the output cap
    pub stderr: Vec<u8>,
}

impl RunOutcome {
    /// Outcome reported when the process could not even be started
    pub fn failed_to_start() -> Self {
        Self {
            exit: ExitKind::Signaled(None),
            time: Duration::ZERO,
            wall_time: Duration::ZERO,
            memory: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    /// Check if execution was successful
    pub fn is_success(&self) -> bool {
        self.exit.is_success()
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runner trait for executing programs
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run a command with the given limits and optional stdin.
    ///
    /// Never fails: a process that cannot be started is reported as
    /// `ExitKind::Signaled(None)`.
    async fn run(&self, cmd: &CommandSpec, limits: &RunLimits, stdin: Option<&[u8]>) -> RunOutcome;
}

// Re-exports
pub use limited::LimitedRunner;
