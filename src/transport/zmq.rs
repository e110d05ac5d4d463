//! ZeroMQ transport
//!
//! The lockstep protocol uses a single REP socket; the streaming protocol a
//! PULL socket for jobs and a PUSH socket for reports. Socket calls block, so
//! they run on the blocking thread pool.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::{Transport, TransportError};

/// How long unsent reports may delay shutdown, in milliseconds
const LINGER_MS: i32 = 5_000;

type SharedSocket = Arc<Mutex<zmq::Socket>>;

pub struct ZmqTransport {
    inbound: SharedSocket,
    outbound: SharedSocket,
}

impl ZmqTransport {
    /// Bind a REP socket; requests and replies share it
    pub fn reply(context: &zmq::Context, endpoint: &str) -> Result<Self, TransportError> {
        let socket = bound(context, zmq::REP, endpoint)?;
        info!("Listening for jobs on {} (REP)", endpoint);
        Ok(Self::from_socket(socket))
    }

    /// Bind a PULL socket for jobs and a PUSH socket for reports
    pub fn pipeline(
        context: &zmq::Context,
        recv_endpoint: &str,
        send_endpoint: &str,
    ) -> Result<Self, TransportError> {
        let inbound = bound(context, zmq::PULL, recv_endpoint)?;
        let outbound = bound(context, zmq::PUSH, send_endpoint)?;
        info!(
            "Listening for jobs on {} (PULL), reporting on {} (PUSH)",
            recv_endpoint, send_endpoint
        );
        Ok(Self::from_sockets(inbound, outbound))
    }

    /// Use one socket in both directions
    pub fn from_socket(socket: zmq::Socket) -> Self {
        let shared = Arc::new(Mutex::new(socket));
        Self {
            inbound: shared.clone(),
            outbound: shared,
        }
    }

    pub fn from_sockets(inbound: zmq::Socket, outbound: zmq::Socket) -> Self {
        Self {
            inbound: Arc::new(Mutex::new(inbound)),
            outbound: Arc::new(Mutex::new(outbound)),
        }
    }
}

fn bound(context: &zmq::Context, kind: zmq::SocketType, endpoint: &str) -> Result<zmq::Socket, TransportError> {
    let socket = context.socket(kind)?;
    socket.set_linger(LINGER_MS)?;
    socket.bind(endpoint)?;
    Ok(socket)
}

#[async_trait]
impl Transport for ZmqTransport {
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let socket = self.inbound.clone();
        let message = tokio::task::spawn_blocking(move || {
            let socket = socket.lock().map_err(|_| TransportError::Poisoned)?;
            Ok::<_, TransportError>(socket.recv_bytes(0)?)
        })
        .await??;
        debug!("Received {} bytes", message.len());
        Ok(message)
    }

    async fn send(&mut self, message: Vec<u8>) -> Result<(), TransportError> {
        let socket = self.outbound.clone();
        let len = message.len();
        tokio::task::spawn_blocking(move || {
            let socket = socket.lock().map_err(|_| TransportError::Poisoned)?;
            socket.send(message, 0)?;
            Ok::<_, TransportError>(())
        })
        .await??;
        debug!("Sent {} bytes", len);
        Ok(())
    }
}
