//! Verdict classification of one job
//!
//! Compiles the submission, runs every test case through the `Runner`,
//! classifies each outcome and hands the reports to a `ReportSink` as soon as
//! they are known. The aggregate report closes the job.

pub mod resolver;

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compiler::{self, BuildOutcome, CompiledProgram};
use crate::config::JudgeConfig;
use crate::core::{Job, Report, TestCase, Verdict};
use crate::languages;
use crate::runner::{ExitKind, RunLimits, Runner};
use crate::session::ReportSink;
use crate::transport::TransportError;

pub use resolver::OutcomeResolver;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// A report could not be delivered to the caller
    #[error("failed to deliver report: {0}")]
    Delivery(#[from] TransportError),
    /// The job cannot be judged at all (workspace setup, unusable checker)
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

/// Where a job currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JudgeState {
    Compiling,
    CompileFailed,
    Ready,
    Judging(usize),
    Aggregating,
    Done,
}

/// Running maximum of the per-case reports
#[derive(Debug, Default)]
struct Aggregate {
    status: Verdict,
    time: Duration,
    memory: u64,
}

impl Aggregate {
    fn add(&mut self, report: &Report) {
        self.status = self.status.worst(report.status);
        self.time = self.time.max(report.time);
        self.memory = self.memory.max(report.memory);
    }

    fn into_report(self, job_id: &str, case_count: usize) -> Report {
        Report::case(job_id, case_count, self.status, self.time, self.memory).into_summary()
    }
}

/// Judges jobs with the given runner and limits
pub struct Judge<'a> {
    runner: &'a dyn Runner,
    config: &'a JudgeConfig,
}

impl<'a> Judge<'a> {
    pub fn new(runner: &'a dyn Runner, config: &'a JudgeConfig) -> Self {
        Self { runner, config }
    }

    /// Judge a job, emitting N per-case reports and then the aggregate
    ///
    /// Returns the aggregate report once it has been emitted.
    pub async fn judge(&self, job: &Job, sink: &mut dyn ReportSink) -> Result<Report, JudgeError> {
        let case_count = job.problem.len();
        if job.problem.is_empty() {
            warn!("Job {}: problem has no test cases", job.id);
        }
        let mut state = JudgeState::Compiling;
        debug!("Job {}: {:?}", job.id, state);

        let program = match self.build_submission(job).await? {
            BuildOutcome::Ready(program) => program,
            BuildOutcome::Failed(message) => {
                advance(&job.id, &mut state, JudgeState::CompileFailed);
                info!("Job {}: compile error: {}", job.id, message.trim_end());
                for case_index in 0..case_count {
                    sink.emit(&Report::compile_error(&job.id, case_index)).await?;
                }
                let summary = Report::compile_error(&job.id, case_count).into_summary();
                sink.emit(&summary).await?;
                return Ok(summary);
            }
        };
        advance(&job.id, &mut state, JudgeState::Ready);

        // Compiled only once the submission is known to build
        let resolver = OutcomeResolver::for_problem(self.runner, self.config, &job.problem).await?;
        let limits = RunLimits::uniform(job.problem.time_limit, job.problem.memory_limit);

        let mut aggregate = Aggregate::default();
        for (case_index, case) in job.problem.test_cases.iter().enumerate() {
            advance(&job.id, &mut state, JudgeState::Judging(case_index));
            let report = self
                .judge_case(job, case_index, case, &program, &resolver, &limits)
                .await;
            aggregate.add(&report);
            sink.emit(&report).await?;
        }

        advance(&job.id, &mut state, JudgeState::Aggregating);
        let summary = aggregate.into_report(&job.id, case_count);
        info!(
            "Job summary: id={}, verdict={}, max_time={:?}, max_memory={} bytes",
            job.id, summary.status, summary.time, summary.memory
        );
        sink.emit(&summary).await?;
        advance(&job.id, &mut state, JudgeState::Done);

        Ok(summary)
    }

    async fn build_submission(&self, job: &Job) -> anyhow::Result<BuildOutcome> {
        let language = &job.submission.language;
        let Some(lang_config) = languages::get_language_config(language) else {
            warn!("Job {}: unsupported language {}", job.id, language);
            return Ok(BuildOutcome::Failed(format!("Unsupported language: {}", language)));
        };

        info!("Job {}: compiling {} submission", job.id, language);
        compiler::build(self.runner, self.config, &lang_config, &job.submission.source).await
    }

    async fn judge_case(
        &self,
        job: &Job,
        case_index: usize,
        case: &TestCase,
        program: &CompiledProgram,
        resolver: &OutcomeResolver,
        limits: &RunLimits,
    ) -> Report {
        let outcome = self
            .runner
            .run(program.run_spec(), limits, Some(case.input.as_bytes()))
            .await;

        let status = match outcome.exit {
            ExitKind::MemoryExceeded => Verdict::MemoryLimitExceeded,
            ExitKind::TimeExceeded => Verdict::TimeLimitExceeded,
            ExitKind::Signaled(_) => Verdict::RuntimeError,
            ExitKind::Normal(0) => resolver.resolve(self.runner, case, &outcome.stdout).await,
            ExitKind::Normal(_) => Verdict::RuntimeError,
        };

        info!(
            "Job {} case {}: {} (time {:?}, memory {} bytes, exit {:?})",
            job.id, case_index, status, outcome.time, outcome.memory, outcome.exit
        );

        Report::case(&job.id, case_index, status, outcome.time, outcome.memory)
    }
}

fn advance(job_id: &str, state: &mut JudgeState, next: JudgeState) {
    debug!("Job {}: {:?} -> {:?}", job_id, state, next);
    *state = next;
}
