//! UDP transport implementation

use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{Result, TransportError};
use crate::traits::TransportEvent;

/// UDP configuration
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Maximum packet size
    pub max_packet_size: usize,
    /// Receive channel depth
    pub channel_size: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            max_packet_size: 65507, // Max UDP payload
            channel_size: 100,
        }
    }
}

/// UDP transport (connectionless)
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    config: UdpConfig,
}

impl UdpTransport {
    /// Bind to a local address
    pub async fn bind(addr: &str) -> Result<Self> {
        Self::bind_with_config(addr, UdpConfig::default()).await
    }

    /// Bind with config
    pub async fn bind_with_config(addr: &str, config: UdpConfig) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        info!("UDP bound to {}", addr);

        Ok(Self {
            socket: Arc::new(socket),
            config,
        })
    }

    /// Get local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Io)
    }

    /// Start receiving datagrams until `cancel` fires or the receiver is dropped
    pub fn start_receiver(&self, cancel: CancellationToken) -> UdpReceiver {
        let (tx, rx) = mpsc::channel(self.config.channel_size);
        let socket = self.socket.clone();
        let max_size = self.config.max_packet_size;

        tokio::spawn(async move {
            let mut buf = vec![0u8; max_size];

            loop {
                let received = tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = socket.recv_from(&mut buf) => received,
                };

                let event = match received {
                    Ok((len, from)) => {
                        debug!("UDP received {} bytes from {}", len, from);
                        (TransportEvent::Data(Bytes::copy_from_slice(&buf[..len])), from)
                    }
                    Err(e) => {
                        error!("UDP receive error: {}", e);
                        (
                            TransportEvent::Error(e.to_string()),
                            SocketAddr::from(([0, 0, 0, 0], 0)),
                        )
                    }
                };

                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        UdpReceiver { rx }
    }

    /// Send one datagram to a specific address
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, target)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

/// UDP receiver
pub struct UdpReceiver {
    rx: mpsc::Receiver<(TransportEvent, SocketAddr)>,
}

impl UdpReceiver {
    /// Receive the next event with source address
    pub async fn recv_from(&mut self) -> Option<(TransportEvent, SocketAddr)> {
        self.rx.recv().await
    }
}
