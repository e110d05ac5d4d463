//! AC/WA decision for a test case whose program exited cleanly

use anyhow::Result;
use tracing::debug;

use crate::checker::CheckerProgram;
use crate::compare::Comparator;
use crate::config::JudgeConfig;
use crate::core::{Problem, TestCase, Verdict};
use crate::runner::Runner;

/// How the output of a clean run is judged
#[derive(Debug)]
pub enum OutcomeResolver {
    /// Compare against the reference answer
    Exact(Comparator),
    /// Delegate to the problem's checker
    Checker(CheckerProgram),
}

impl OutcomeResolver {
    /// Pick the resolver for a problem, compiling its checker if it has one
    pub async fn for_problem(
        runner: &dyn Runner,
        config: &JudgeConfig,
        problem: &Problem,
    ) -> Result<Self> {
        match &problem.checker {
            Some(source) => Ok(Self::Checker(
                CheckerProgram::prepare(runner, config, source).await?,
            )),
            None => Ok(Self::Exact(config.comparator)),
        }
    }

    pub async fn resolve(&self, runner: &dyn Runner, case: &TestCase, output: &[u8]) -> Verdict {
        match self {
            Self::Exact(comparator) => {
                if comparator.matches(case.expected_output.as_bytes(), output) {
                    Verdict::Accepted
                } else {
                    Verdict::WrongAnswer
                }
            }
            Self::Checker(checker) => {
                let result = checker
                    .check(
                        runner,
                        case.input.as_bytes(),
                        output,
                        case.expected_output.as_bytes(),
                    )
                    .await;
                if let Some(message) = &result.message {
                    debug!("Checker says: {}", message);
                }
                result.verdict
            }
        }
    }
}
