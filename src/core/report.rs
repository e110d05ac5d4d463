use std::time::Duration;

use super::verdict::Verdict;

/// Report for one test case, or the aggregate report of a job
///
/// Per-case reports carry `case_index` 0..N-1, the aggregate carries N.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub job_id: String,
    pub case_index: usize,
    pub status: Verdict,
    pub time: Duration,
    /// Peak memory in bytes
    pub memory: u64,
    /// Set only on the aggregate report
    pub summary: bool,
}

impl Report {
    pub fn case(job_id: &str, case_index: usize, status: Verdict, time: Duration, memory: u64) -> Self {
        Self {
            job_id: job_id.to_string(),
            case_index,
            status,
            time,
            memory,
            summary: false,
        }
    }

    /// CE report: no test case ran, so usage is zero
    pub fn compile_error(job_id: &str, case_index: usize) -> Self {
        Self::case(job_id, case_index, Verdict::CompileError, Duration::ZERO, 0)
    }

    pub fn into_summary(mut self) -> Self {
        self.summary = true;
        self
    }
}
