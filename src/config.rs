//! Judge configuration
//!
//! Fixed resource limits for the trusted steps (compilation, checker runs) and
//! knobs of the limit enforcer. Built once in `main` and passed down explicitly.

use std::path::PathBuf;
use std::time::Duration;

use crate::compare::Comparator;
use crate::runner::RunLimits;

const MB: u64 = 1024 * 1024;

/// Judge configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Compile time limit in milliseconds (default: 30000ms = 30s)
    pub compile_time_limit_ms: u32,
    /// Compile memory limit in MB (default: 2048MB)
    pub compile_memory_limit_mb: u32,
    /// Checker time limit in milliseconds (default: 10000ms = 10s)
    pub checker_time_limit_ms: u32,
    /// Checker memory limit in MB (default: 1024MB)
    pub checker_memory_limit_mb: u32,
    /// Captured stdout/stderr cap in bytes
    pub output_limit_bytes: usize,
    /// How often the memory of a running process is sampled
    pub memory_poll_interval: Duration,
    /// Parent directory of the per-job workspaces (system temp dir if unset)
    pub work_dir: Option<PathBuf>,
    /// Output comparison for problems without a checker
    pub comparator: Comparator,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            compile_time_limit_ms: 30_000,
            compile_memory_limit_mb: 2048,
            checker_time_limit_ms: 10_000,
            checker_memory_limit_mb: 1024,
            output_limit_bytes: 16 * MB as usize,
            memory_poll_interval: Duration::from_millis(10),
            work_dir: None,
            comparator: Comparator::default(),
        }
    }
}

impl JudgeConfig {
    pub fn compile_limits(&self) -> RunLimits {
        RunLimits::uniform(
            Duration::from_millis(self.compile_time_limit_ms as u64),
            self.compile_memory_limit_mb as u64 * MB,
        )
    }

    pub fn checker_limits(&self) -> RunLimits {
        RunLimits::uniform(
            Duration::from_millis(self.checker_time_limit_ms as u64),
            self.checker_memory_limit_mb as u64 * MB,
        )
    }

    /// Create a fresh temporary directory for one workspace
    pub fn tempdir(&self) -> std::io::Result<tempfile::TempDir> {
        match &self.work_dir {
            Some(dir) => tempfile::tempdir_in(dir),
            None => tempfile::tempdir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = JudgeConfig::default();
        let compile = config.compile_limits();
        assert_eq!(compile.wall_time, Duration::from_secs(30));
        assert_eq!(compile.cpu_time, Duration::from_secs(30));
        assert_eq!(compile.memory_bytes, 2048 * MB);

        let checker = config.checker_limits();
        assert_eq!(checker.wall_time, Duration::from_secs(10));
        assert_eq!(checker.memory_bytes, 1024 * MB);
    }

    #[test]
    fn test_tempdir_respects_work_dir() {
        let parent = tempfile::tempdir().unwrap();
        let config = JudgeConfig {
            work_dir: Some(parent.path().to_path_buf()),
            ..Default::default()
        };
        let dir = config.tempdir().unwrap();
        assert!(dir.path().starts_with(parent.path()));
    }
}
