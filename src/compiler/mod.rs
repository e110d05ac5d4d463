//! Compiler module - Source code compilation
//!
//! This module turns source text into something runnable:
//! - a fresh workspace directory receives the source file
//! - the language's compile command (if any) runs there through a `Runner`
//!   under the fixed compile limits
//!
//! Both user submissions and checkers are built this way.

use anyhow::{Context, Result};
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::JudgeConfig;
use crate::languages::LanguageConfig;
use crate::runner::{CommandSpec, ExitKind, RunLimits, Runner};

/// Result of a compilation attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CompileResult {
    pub success: bool,
    pub message: Option<String>,
}

impl CompileResult {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }
}

/// A program whose build succeeded
///
/// Owns its workspace; the directory is removed when the value is dropped.
#[derive(Debug)]
pub struct CompiledProgram {
    workspace: TempDir,
    run: CommandSpec,
}

impl CompiledProgram {
    /// Command that runs the program inside its workspace
    pub fn run_spec(&self) -> &CommandSpec {
        &self.run
    }

    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }
}

/// What came out of building a program
#[derive(Debug)]
pub enum BuildOutcome {
    Ready(CompiledProgram),
    /// Compilation failed, with the diagnostics
    Failed(String),
}

/// Write `source` into a fresh workspace and compile it
///
/// Errors are reserved for workspace setup; a failing compiler is a
/// `BuildOutcome::Failed`.
pub async fn build(
    runner: &dyn Runner,
    config: &JudgeConfig,
    lang_config: &LanguageConfig,
    source: &str,
) -> Result<BuildOutcome> {
    let workspace = config
        .tempdir()
        .context("Failed to create workspace directory")?;
    let source_path = workspace.path().join(&lang_config.source_file);
    tokio::fs::write(&source_path, source)
        .await
        .with_context(|| format!("Failed to write source file {}", source_path.display()))?;

    let result = match lang_config.compile_spec(workspace.path()) {
        Some(compile_cmd) => {
            compile_in_workspace(runner, &compile_cmd, &config.compile_limits()).await
        }
        // Interpreted language, no compilation needed
        None => CompileResult::ok(),
    };

    if !result.success {
        return Ok(BuildOutcome::Failed(result.message.unwrap_or_default()));
    }

    let run = lang_config.run_spec(workspace.path());
    Ok(BuildOutcome::Ready(CompiledProgram { workspace, run }))
}

/// Run a compile command and capture its diagnostics
pub async fn compile_in_workspace(
    runner: &dyn Runner,
    compile_cmd: &CommandSpec,
    limits: &RunLimits,
) -> CompileResult {
    debug!(
        "Compiling with {} {:?} in {:?}",
        compile_cmd.program, compile_cmd.args, compile_cmd.work_dir
    );

    let result = runner.run(compile_cmd, limits, None).await;

    if result.is_success() {
        info!("Compilation finished in {:?}", result.wall_time);
        return CompileResult::ok();
    }

    let error_msg = if !result.stderr.is_empty() {
        result.stderr_lossy()
    } else if !result.stdout.is_empty() {
        result.stdout_lossy()
    } else {
        match result.exit {
            ExitKind::TimeExceeded => "Compilation timed out".to_string(),
            ExitKind::MemoryExceeded => "Compiler exceeded the memory limit".to_string(),
            ExitKind::Signaled(None) => "Compiler could not be started".to_string(),
            ExitKind::Signaled(Some(_)) => "Compiler crashed".to_string(),
            ExitKind::Normal(code) => format!("Compilation failed with exit code {}", code),
        }
    };

    CompileResult {
        success: false,
        message: Some(error_msg),
    }
}
