//! Session protocol handling
//!
//! A session receives exactly one job, judges it and hands every report to a
//! `ReportSink`:
//! - lockstep: each reply waits for the caller's acknowledgment
//! - streaming: reports are pushed as soon as they exist
//!
//! The process exits once the session returns.

pub mod lockstep;
pub mod streaming;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::core::{Job, Report};
use crate::judger::{Judge, JudgeError};
use crate::mtp::{LegacyJob, ReplyFormat, StreamJob, WireError};
use crate::transport::{Transport, TransportError};

pub use lockstep::LockstepSink;
pub use streaming::StreamingSink;

/// Destination of the reports of a job
#[async_trait]
pub trait ReportSink: Send {
    async fn emit(&mut self, report: &Report) -> Result<(), TransportError>;
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Undecodable payload or unusable problem data
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("job could not be judged: {0:#}")]
    Judge(anyhow::Error),
}

impl From<JudgeError> for SessionError {
    fn from(err: JudgeError) -> Self {
        match err {
            JudgeError::Delivery(e) => SessionError::Transport(e),
            JudgeError::Fault(e) => SessionError::Judge(e),
        }
    }
}

/// Serve one job over the legacy request/reply protocol
///
/// The aggregate reply is sent only when `with_summary` is set, or when the
/// problem has no test cases and it is the only reply.
pub async fn run_lockstep<T: Transport>(
    transport: &mut T,
    judge: &Judge<'_>,
    format: ReplyFormat,
    with_summary: bool,
) -> Result<Report, SessionError> {
    let payload = transport.recv().await?;
    let job = LegacyJob::decode(&payload)?.into_job()?;
    log_job(&job);

    let mut sink = LockstepSink::new(transport, format, with_summary);
    Ok(judge.judge(&job, &mut sink).await?)
}

/// Serve one job over the streaming push/pull protocol
pub async fn run_streaming<T: Transport>(
    transport: &mut T,
    judge: &Judge<'_>,
) -> Result<Report, SessionError> {
    let payload = transport.recv().await?;
    let job = StreamJob::decode(&payload)?.into_job()?;
    log_job(&job);

    let mut sink = StreamingSink::new(transport);
    Ok(judge.judge(&job, &mut sink).await?)
}

fn log_job(job: &Job) {
    info!(
        "Received job {}: language={}, cases={}, time_limit={:?}, memory_limit={} bytes, checker={}",
        job.id,
        job.submission.language,
        job.problem.len(),
        job.problem.time_limit,
        job.problem.memory_limit,
        job.problem.checker.is_some()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JudgeConfig;
    use crate::core::Verdict;
    use crate::mtp::{LegacyReply, StreamReport};
    use crate::runner::LimitedRunner;
    use crate::transport::memory::ChannelTransport;

    fn legacy_payload(source: &str) -> Vec<u8> {
        serde_json::json!({
            "language": "sh",
            "source": source,
            "problem": {
                "time_limit": 2.0,
                "memory_limit": 64.0 * 1024.0 * 1024.0,
                "test_cases": [
                    {"input": "1\n", "answer": "1\n"},
                    {"input": "2\n", "answer": "2\n"},
                    {"input": "3\n", "answer": "3\n"}
                ]
            }
        })
        .to_string()
        .into_bytes()
    }

    fn stream_payload(source: &str) -> Vec<u8> {
        serde_json::json!({
            "id": "job-7",
            "source": {"language": "sh", "code": source},
            "problem": {
                "problem_type": "normal",
                "time_limit": 2.0,
                "memory_limit": 64.0,
                "test_cases": [
                    {"input": "a\n", "answer": "a\n"},
                    {"input": "b\n", "expected_output": "b\n"}
                ]
            }
        })
        .to_string()
        .into_bytes()
    }

    /// Plays the caller side of the lockstep protocol, acknowledging every reply
    async fn lockstep_caller(mut caller: ChannelTransport, payload: Vec<u8>, replies: usize) -> Vec<Vec<u8>> {
        caller.send(payload).await.unwrap();
        let mut received = Vec::new();
        for _ in 0..replies {
            received.push(caller.recv().await.unwrap());
            caller.send(Vec::new()).await.unwrap();
        }
        received
    }

    #[tokio::test]
    async fn test_lockstep_text_replies() {
        let config = JudgeConfig::default();
        let runner = LimitedRunner::from_config(&config);
        let judge = Judge::new(&runner, &config);
        let (mut engine, caller) = ChannelTransport::pair();

        let caller = tokio::spawn(lockstep_caller(caller, legacy_payload("read x\necho $x\n"), 3));
        let summary = run_lockstep(&mut engine, &judge, ReplyFormat::Text, false)
            .await
            .unwrap();

        let replies = caller.await.unwrap();
        assert_eq!(replies, vec![b"#0 AC".to_vec(), b"#1 AC".to_vec(), b"#2 AC".to_vec()]);
        assert_eq!(summary.status, Verdict::Accepted);
        assert_eq!(summary.case_index, 3);
    }

    #[tokio::test]
    async fn test_lockstep_json_with_summary() {
        let config = JudgeConfig::default();
        let runner = LimitedRunner::from_config(&config);
        let judge = Judge::new(&runner, &config);
        let (mut engine, caller) = ChannelTransport::pair();

        let caller = tokio::spawn(lockstep_caller(caller, legacy_payload("if then fi (\n"), 4));
        run_lockstep(&mut engine, &judge, ReplyFormat::Json, true)
            .await
            .unwrap();

        let replies = caller.await.unwrap();
        assert_eq!(replies.len(), 4);
        for reply in replies {
            let reply: LegacyReply = serde_json::from_slice(&reply).unwrap();
            assert_eq!(reply.status, Verdict::CompileError);
            assert_eq!(reply.time, 0.0);
            assert_eq!(reply.memory, 0);
        }
    }

    #[tokio::test]
    async fn test_lockstep_empty_problem_still_replies() {
        let config = JudgeConfig::default();
        let runner = LimitedRunner::from_config(&config);
        let judge = Judge::new(&runner, &config);
        let (mut engine, caller) = ChannelTransport::pair();

        let payload = serde_json::json!({
            "language": "sh",
            "source": "echo 1\n",
            "problem": {"time_limit": 1.0, "memory_limit": 64.0 * 1024.0 * 1024.0, "test_cases": []}
        })
        .to_string()
        .into_bytes();
        let caller = tokio::spawn(lockstep_caller(caller, payload, 1));
        let summary = run_lockstep(&mut engine, &judge, ReplyFormat::Text, false)
            .await
            .unwrap();

        assert_eq!(caller.await.unwrap(), vec![b"#0 AC".to_vec()]);
        assert_eq!(summary.case_index, 0);
    }

    #[tokio::test]
    async fn test_streaming_reports() {
        let config = JudgeConfig::default();
        let runner = LimitedRunner::from_config(&config);
        let judge = Judge::new(&runner, &config);
        let (mut engine, mut caller) = ChannelTransport::pair();

        caller.send(stream_payload("read x\necho $x\n")).await.unwrap();
        run_streaming(&mut engine, &judge).await.unwrap();
        drop(engine);

        let mut reports = Vec::new();
        while let Ok(message) = caller.recv().await {
            reports.push(serde_json::from_slice::<StreamReport>(&message).unwrap());
        }

        assert_eq!(reports.len(), 3);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.id, "job-7");
            assert_eq!(report.case_index, i);
            assert_eq!(report.status, Verdict::Accepted);
            assert!(report.time <= 2.0);
            assert!(report.memory <= 64.0);
        }
    }

    #[tokio::test]
    async fn test_malformed_job_sends_nothing() {
        let config = JudgeConfig::default();
        let runner = LimitedRunner::from_config(&config);
        let judge = Judge::new(&runner, &config);
        let (mut engine, mut caller) = ChannelTransport::pair();

        caller.send(b"{\"id\": 1}".to_vec()).await.unwrap();
        let err = run_streaming(&mut engine, &judge).await.unwrap_err();
        assert!(matches!(err, SessionError::Wire(WireError::Malformed(_))));

        drop(engine);
        assert!(matches!(caller.recv().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_closed_transport_is_an_error() {
        let config = JudgeConfig::default();
        let runner = LimitedRunner::from_config(&config);
        let judge = Judge::new(&runner, &config);
        let (mut engine, caller) = ChannelTransport::pair();
        drop(caller);

        let err = run_streaming(&mut engine, &judge).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(TransportError::Closed)));
    }
}
