use async_trait::async_trait;
use tracing::debug;

use super::ReportSink;
use crate::core::Report;
use crate::mtp::StreamReport;
use crate::transport::{Transport, TransportError};

/// Pushes every report without waiting for the caller
pub struct StreamingSink<'a, T> {
    transport: &'a mut T,
}

impl<'a, T: Transport> StreamingSink<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: Transport> ReportSink for StreamingSink<'_, T> {
    async fn emit(&mut self, report: &Report) -> Result<(), TransportError> {
        self.transport.send(StreamReport::encode(report)?).await?;
        debug!("Report {} pushed", report.case_index);
        Ok(())
    }
}
