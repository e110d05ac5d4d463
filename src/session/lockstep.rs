use async_trait::async_trait;
use tracing::debug;

use super::ReportSink;
use crate::core::Report;
use crate::mtp::ReplyFormat;
use crate::transport::{Transport, TransportError};

/// Sends each report and waits for the caller's acknowledgment
pub struct LockstepSink<'a, T> {
    transport: &'a mut T,
    format: ReplyFormat,
    with_summary: bool,
}

impl<'a, T: Transport> LockstepSink<'a, T> {
    pub fn new(transport: &'a mut T, format: ReplyFormat, with_summary: bool) -> Self {
        Self {
            transport,
            format,
            with_summary,
        }
    }
}

#[async_trait]
impl<T: Transport> ReportSink for LockstepSink<'_, T> {
    async fn emit(&mut self, report: &Report) -> Result<(), TransportError> {
        // The caller of an empty problem still needs one reply
        if report.summary && !self.with_summary && report.case_index > 0 {
            debug!("Aggregate report not sent in lockstep mode");
            return Ok(());
        }

        let reply = self.format.encode(report)?;
        self.transport.send(reply).await?;

        // Any message counts as an acknowledgment
        let ack = self.transport.recv().await?;
        debug!("Report {} acknowledged ({} bytes)", report.case_index, ack.len());
        Ok(())
    }
}
