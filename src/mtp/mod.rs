//! Wire model of the two job protocols
//!
//! - `legacy`: request/reply payload, memory in bytes
//! - `stream`: push/pull payload, memory in megabytes
//!
//! Both decode into the domain `Job`; limits are validated on the way.

pub mod legacy;
pub mod stream;

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::core::{CheckerSource, TestCase};

pub use legacy::{LegacyJob, LegacyReply, ReplyFormat};
pub use stream::{StreamJob, StreamReport};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed job payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid job: {0}")]
    Invalid(String),
}

/// Source text with its language, used for submissions and checkers
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireSource {
    pub language: String,
    #[serde(alias = "source")]
    pub code: String,
}

impl From<WireSource> for CheckerSource {
    fn from(source: WireSource) -> Self {
        CheckerSource {
            language: source.language,
            source: source.code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireTestCase {
    #[serde(default)]
    pub input: String,
    #[serde(alias = "expected_output")]
    pub answer: String,
}

impl From<WireTestCase> for TestCase {
    fn from(case: WireTestCase) -> Self {
        TestCase {
            input: case.input,
            expected_output: case.answer,
        }
    }
}

fn time_limit(seconds: f64) -> Result<Duration, WireError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(WireError::Invalid(format!("bad time limit: {}", seconds)));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| WireError::Invalid(format!("bad time limit {}: {}", seconds, e)))
}

fn memory_bytes(bytes: f64) -> Result<u64, WireError> {
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(WireError::Invalid(format!("bad memory limit: {}", bytes)));
    }
    Ok(bytes.round() as u64)
}

fn megabytes_to_bytes(megabytes: f64) -> Result<u64, WireError> {
    memory_bytes(megabytes * BYTES_PER_MB)
}

fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}
