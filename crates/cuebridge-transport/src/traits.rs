//! Transport trait definitions

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Events that can occur on a connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One complete, de-framed message
    Data(Bytes),
    /// Connection closed (clean or error)
    Disconnected { reason: Option<String> },
    Error(String),
}

/// Write side of a connection
#[async_trait]
pub trait TransportSender: Send + Sync {
    /// Queue one message; framing is applied by the connection
    async fn send(&self, data: Bytes) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn close(&self) -> Result<()>;
}

/// Read side of a connection
#[async_trait]
pub trait TransportReceiver: Send {
    /// Next event, or `None` once the connection task has exited
    async fn recv(&mut self) -> Option<TransportEvent>;
}
