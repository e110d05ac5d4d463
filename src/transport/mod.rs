//! Message transport between the caller and the session
//!
//! A transport moves whole messages: one `recv` yields one message, one `send`
//! delivers one. Ordering and reliability are the transport's business.

pub mod zmq;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use self::zmq::ZmqTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("zmq error: {0}")]
    Zmq(#[from] ::zmq::Error),
    #[error("transport worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("socket lock poisoned")]
    Poisoned,
    #[error("peer closed the connection")]
    Closed,
}

#[async_trait]
pub trait Transport: Send {
    /// Wait for the next inbound message
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Deliver one outbound message
    async fn send(&mut self, message: Vec<u8>) -> Result<(), TransportError>;
}
