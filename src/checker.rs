//! Checker module for special judge problems
//!
//! This module builds and runs testlib.h-style checkers. A checker is invoked
//! as `<run command> <input_file> <output_file> <answer_file>` and reports
//! its decision through the exit code.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::compiler::{self, BuildOutcome, CompiledProgram};
use crate::config::JudgeConfig;
use crate::core::{CheckerSource, Verdict};
use crate::languages::get_language_config;
use crate::runner::{ExitKind, RunLimits, Runner};

/// Result of running a checker
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerResult {
    pub verdict: Verdict,
    pub message: Option<String>,
}

/// testlib.h exit codes
/// Reference: https://github.com/MikeMirzayanov/testlib
mod testlib_exit_codes {
    pub const OK: i32 = 0; // _ok
    pub const WRONG_ANSWER: i32 = 1; // _wa
    pub const PRESENTATION_ERROR: i32 = 2; // _pe
    pub const FAIL: i32 = 3; // _fail (checker bug or internal error)
    pub const DIRT: i32 = 4; // _dirt (extra output in user file)
    pub const UNEXPECTED_EOF: i32 = 8; // _unexpected_eof
}

/// Convert testlib exit code to verdict
///
/// A checker failure is never promoted to AC.
fn exit_code_to_verdict(exit_code: i32) -> Verdict {
    match exit_code {
        testlib_exit_codes::OK => Verdict::Accepted,
        testlib_exit_codes::WRONG_ANSWER
        | testlib_exit_codes::PRESENTATION_ERROR
        | testlib_exit_codes::DIRT
        | testlib_exit_codes::UNEXPECTED_EOF => Verdict::WrongAnswer,
        testlib_exit_codes::FAIL => {
            warn!("Checker reported an internal failure");
            Verdict::RuntimeError
        }
        _ => {
            warn!("Unknown checker exit code: {}", exit_code);
            Verdict::RuntimeError
        }
    }
}

/// A compiled checker, ready to judge test cases
#[derive(Debug)]
pub struct CheckerProgram {
    program: CompiledProgram,
    limits: RunLimits,
}

impl CheckerProgram {
    /// Compile a checker
    ///
    /// An unknown language or a failed compilation makes the problem
    /// unusable, so both are errors rather than verdicts.
    pub async fn prepare(
        runner: &dyn Runner,
        config: &JudgeConfig,
        source: &CheckerSource,
    ) -> Result<Self> {
        let lang_config = get_language_config(&source.language)
            .with_context(|| format!("Unsupported checker language: {}", source.language))?;

        info!("Compiling checker ({})", source.language);
        match compiler::build(runner, config, &lang_config, &source.source).await? {
            BuildOutcome::Ready(program) => {
                info!("Checker compiled successfully: {:?}", program.workspace());
                Ok(Self {
                    program,
                    limits: config.checker_limits(),
                })
            }
            BuildOutcome::Failed(message) => bail!("Failed to compile checker: {}", message),
        }
    }

    /// Judge one test case
    ///
    /// Anything that prevents a clean checker decision yields RE.
    pub async fn check(
        &self,
        runner: &dyn Runner,
        input: &[u8],
        output: &[u8],
        answer: &[u8],
    ) -> CheckerResult {
        match self.run_checker(runner, input, output, answer).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Checker could not run: {:#}", e);
                CheckerResult {
                    verdict: Verdict::RuntimeError,
                    message: Some(format!("{:#}", e)),
                }
            }
        }
    }

    async fn run_checker(
        &self,
        runner: &dyn Runner,
        input: &[u8],
        output: &[u8],
        answer: &[u8],
    ) -> Result<CheckerResult> {
        let input_path = self.write_case_file("case.in", input).await?;
        let output_path = self.write_case_file("case.out", output).await?;
        let answer_path = self.write_case_file("case.ans", answer).await?;

        // Checker arguments: <input_file> <output_file> <answer_file>
        let cmd = self.program.run_spec().clone().append_args([
            path_arg(&input_path)?,
            path_arg(&output_path)?,
            path_arg(&answer_path)?,
        ]);

        let result = runner.run(&cmd, &self.limits, None).await;

        debug!(
            "Checker result: exit={:?}, stdout={}, stderr={}",
            result.exit,
            result.stdout_lossy().chars().take(200).collect::<String>(),
            result.stderr_lossy().chars().take(200).collect::<String>()
        );

        let verdict = match result.exit {
            ExitKind::Normal(code) => exit_code_to_verdict(code),
            other => {
                warn!("Checker did not finish normally: {:?}", other);
                Verdict::RuntimeError
            }
        };

        // Checker message is typically in stderr (testlib writes to stderr)
        let message = if result.stderr.is_empty() {
            if result.stdout.is_empty() {
                None
            } else {
                Some(result.stdout_lossy().trim().to_string())
            }
        } else {
            Some(result.stderr_lossy().trim().to_string())
        };

        Ok(CheckerResult { verdict, message })
    }

    async fn write_case_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.program.workspace().join(name);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

fn path_arg(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .with_context(|| format!("Non UTF-8 path: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::LimitedRunner;

    fn runner() -> LimitedRunner {
        LimitedRunner::from_config(&JudgeConfig::default())
    }

    fn sh_checker(script: &str) -> CheckerSource {
        CheckerSource {
            language: "sh".into(),
            source: script.into(),
        }
    }

    #[test]
    fn test_exit_code_to_verdict() {
        assert_eq!(exit_code_to_verdict(0), Verdict::Accepted);
        assert_eq!(exit_code_to_verdict(1), Verdict::WrongAnswer);
        assert_eq!(exit_code_to_verdict(2), Verdict::WrongAnswer);
        assert_eq!(exit_code_to_verdict(3), Verdict::RuntimeError);
        assert_eq!(exit_code_to_verdict(4), Verdict::WrongAnswer);
        assert_eq!(exit_code_to_verdict(8), Verdict::WrongAnswer);
        assert_eq!(exit_code_to_verdict(7), Verdict::RuntimeError);
        assert_eq!(exit_code_to_verdict(-1), Verdict::RuntimeError);
    }

    #[tokio::test]
    async fn test_checker_receives_three_files() {
        let runner = runner();
        let config = JudgeConfig::default();
        // Accepts any output whose first number equals the answer's, e.g. "5.0" for "5"
        let source = sh_checker(
            r#"
read want < "$3"
read got < "$2"
read given < "$1"
[ "$given" = "2 3" ] || { echo "bad input" >&2; exit 3; }
if [ "${got%.0}" = "$want" ]; then echo ok >&2; exit 0; fi
echo "expected $want, found $got" >&2
exit 1
"#,
        );
        let checker = CheckerProgram::prepare(&runner, &config, &source).await.unwrap();

        let accepted = checker.check(&runner, b"2 3\n", b"5.0\n", b"5\n").await;
        assert_eq!(accepted.verdict, Verdict::Accepted);
        assert_eq!(accepted.message.as_deref(), Some("ok"));

        let rejected = checker.check(&runner, b"2 3\n", b"6\n", b"5\n").await;
        assert_eq!(rejected.verdict, Verdict::WrongAnswer);
        assert_eq!(rejected.message.as_deref(), Some("expected 5, found 6"));

        let failed = checker.check(&runner, b"1 1\n", b"5\n", b"5\n").await;
        assert_eq!(failed.verdict, Verdict::RuntimeError);
    }

    #[tokio::test]
    async fn test_crashing_checker_is_runtime_error() {
        let runner = runner();
        let config = JudgeConfig::default();
        let checker = CheckerProgram::prepare(&runner, &config, &sh_checker("kill -9 $$\n"))
            .await
            .unwrap();

        let result = checker.check(&runner, b"", b"", b"").await;
        assert_eq!(result.verdict, Verdict::RuntimeError);
    }

    #[tokio::test]
    async fn test_slow_checker_is_runtime_error() {
        let runner = runner();
        let config = JudgeConfig {
            checker_time_limit_ms: 300,
            ..Default::default()
        };
        let checker = CheckerProgram::prepare(&runner, &config, &sh_checker("sleep 10\nexit 0\n"))
            .await
            .unwrap();

        let started = std::time::Instant::now();
        let result = checker.check(&runner, b"", b"", b"").await;
        assert_eq!(result.verdict, Verdict::RuntimeError);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_unusable_checker_is_an_error() {
        let runner = runner();
        let config = JudgeConfig::default();

        let unknown = CheckerSource {
            language: "cobol".into(),
            source: String::new(),
        };
        assert!(CheckerProgram::prepare(&runner, &config, &unknown).await.is_err());

        let broken = sh_checker("if then fi (\n");
        let err = CheckerProgram::prepare(&runner, &config, &broken)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to compile checker"));
    }
}
