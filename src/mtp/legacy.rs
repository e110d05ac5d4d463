//! Legacy request/reply protocol
//!
//! One request carries the whole job with the memory limit in bytes. Every
//! reply is acknowledged by the caller before the next one is sent.

use serde::{Deserialize, Serialize};

use super::{memory_bytes, time_limit, WireError, WireSource, WireTestCase};
use crate::core::{Job, Problem, Report, Submission, Verdict};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyJob {
    pub language: String,
    pub source: String,
    pub problem: LegacyProblem,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyProblem {
    /// Seconds
    pub time_limit: f64,
    /// Bytes
    pub memory_limit: f64,
    #[serde(default)]
    pub test_cases: Vec<WireTestCase>,
    #[serde(default)]
    pub checker: Option<WireSource>,
}

impl LegacyJob {
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// The legacy protocol carries no id; one is generated
    pub fn into_job(self) -> Result<Job, WireError> {
        let problem = Problem {
            time_limit: time_limit(self.problem.time_limit)?,
            memory_limit: memory_bytes(self.problem.memory_limit)?,
            test_cases: self.problem.test_cases.into_iter().map(Into::into).collect(),
            checker: self.problem.checker.map(Into::into),
        };
        let submission = Submission {
            language: self.language,
            source: self.source,
        };
        Ok(Job::new(None, submission, problem))
    }
}

/// How replies are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReplyFormat {
    /// `{"status": "AC", "time": 0.01, "memory": 1048576}`
    #[default]
    Json,
    /// `#0 AC`
    Text,
}

/// Structured reply for one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyReply {
    pub status: Verdict,
    /// Seconds
    pub time: f64,
    /// Bytes
    pub memory: u64,
}

impl From<&Report> for LegacyReply {
    fn from(report: &Report) -> Self {
        LegacyReply {
            status: report.status,
            time: report.time.as_secs_f64(),
            memory: report.memory,
        }
    }
}

impl ReplyFormat {
    pub fn encode(self, report: &Report) -> serde_json::Result<Vec<u8>> {
        match self {
            ReplyFormat::Json => serde_json::to_vec(&LegacyReply::from(report)),
            ReplyFormat::Text => {
                Ok(format!("#{} {}", report.case_index, report.status).into_bytes())
            }
        }
    }
}
