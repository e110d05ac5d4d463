//! In-process transport over tokio channels

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::{Transport, TransportError};

pub struct ChannelTransport {
    rx: UnboundedReceiver<Vec<u8>>,
    tx: UnboundedSender<Vec<u8>>,
}

impl ChannelTransport {
    /// Two connected ends: what one sends the other receives
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = unbounded_channel();
        let (b_tx, b_rx) = unbounded_channel();
        (Self { rx: a_rx, tx: b_tx }, Self { rx: b_rx, tx: a_tx })
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }

    async fn send(&mut self, message: Vec<u8>) -> Result<(), TransportError> {
        self.tx.send(message).map_err(|_| TransportError::Closed)
    }
}
