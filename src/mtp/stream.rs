//! Streaming push/pull protocol
//!
//! Jobs carry an id and a memory limit in megabytes; every report is pushed
//! back without waiting for the caller.

use serde::{Deserialize, Serialize};

use super::{bytes_to_megabytes, megabytes_to_bytes, time_limit, WireError, WireSource, WireTestCase};
use crate::core::{Job, Problem, Report, Submission, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    Normal,
    Spj,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamJob {
    #[serde(default)]
    pub id: Option<String>,
    pub source: WireSource,
    pub problem: StreamProblem,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamProblem {
    #[serde(default)]
    pub problem_type: Option<ProblemType>,
    /// Seconds
    pub time_limit: f64,
    /// Megabytes
    pub memory_limit: f64,
    #[serde(default)]
    pub checker: Option<WireSource>,
    #[serde(default)]
    pub test_cases: Vec<WireTestCase>,
}

impl StreamJob {
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn into_job(self) -> Result<Job, WireError> {
        let problem = self.problem;
        let checker = match (problem.problem_type, problem.checker) {
            (Some(ProblemType::Normal), _) => None,
            (Some(ProblemType::Spj), None) => {
                return Err(WireError::Invalid(
                    "special judge problem without a checker".to_string(),
                ))
            }
            (_, checker) => checker.map(Into::into),
        };

        let problem = Problem {
            time_limit: time_limit(problem.time_limit)?,
            memory_limit: megabytes_to_bytes(problem.memory_limit)?,
            test_cases: problem.test_cases.into_iter().map(Into::into).collect(),
            checker,
        };
        let submission = Submission {
            language: self.source.language,
            source: self.source.code,
        };
        Ok(Job::new(self.id, submission, problem))
    }
}

/// One pushed report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamReport {
    pub id: String,
    pub case_index: usize,
    pub status: Verdict,
    /// Seconds
    pub time: f64,
    /// Megabytes
    pub memory: f64,
}

impl From<&Report> for StreamReport {
    fn from(report: &Report) -> Self {
        StreamReport {
            id: report.job_id.clone(),
            case_index: report.case_index,
            status: report.status,
            time: report.time.as_secs_f64(),
            memory: bytes_to_megabytes(report.memory),
        }
    }
}

impl StreamReport {
    pub fn encode(report: &Report) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&StreamReport::from(report))
    }
}
