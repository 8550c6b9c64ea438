//! TCP transport implementation
//!
//! Framed TCP connections. Each connection runs one I/O task that decodes
//! inbound chunks with a [`Framer`](crate::Framer) and encodes outbound
//! messages with the same framer. The framer is shared with the connection's
//! owner so decode state can outlive a single connection; it is cleared
//! whenever the connection ends so a torn message is never stitched onto the
//! next connection's data. A peer that exceeds the framer's message size limit
//! gets an [`TransportEvent::Error`] and is disconnected.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{Result, TransportError};
use crate::framing::SharedFramer;
use crate::traits::{TransportEvent, TransportReceiver, TransportSender};

/// Default channel buffer size for TCP connections
const DEFAULT_CHANNEL_BUFFER_SIZE: usize = 1000;

/// TCP configuration
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Read buffer size
    pub read_buffer_size: usize,
    /// Keep-alive interval in seconds (0 = disabled)
    pub keepalive_secs: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 8192,
            keepalive_secs: 30,
        }
    }
}

/// TCP client transport
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    config: TcpConfig,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TcpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TcpConfig {
        &self.config
    }

    /// Connect to a TCP server, framing the stream with `framer`
    pub async fn connect(
        &self,
        addr: &str,
        framer: SharedFramer,
    ) -> Result<(TcpSender, TcpReceiver)> {
        info!("Connecting to TCP: {}", addr);

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        set_keepalive(&stream, self.config.keepalive_secs);

        info!("TCP connected to {}", addr);
        Ok(spawn_connection(stream, framer, &self.config))
    }
}

fn set_keepalive(stream: &TcpStream, keepalive_secs: u64) {
    if keepalive_secs > 0 {
        let socket = socket2::SockRef::from(stream);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(keepalive_secs));
        if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
            debug!("Failed to enable TCP keepalive: {}", e);
        }
    }
}

fn spawn_connection(
    stream: TcpStream,
    framer: SharedFramer,
    config: &TcpConfig,
) -> (TcpSender, TcpReceiver) {
    let connected = Arc::new(Mutex::new(true));
    let (outgoing_tx, outgoing_rx) = mpsc::channel::<Bytes>(DEFAULT_CHANNEL_BUFFER_SIZE);
    let (incoming_tx, incoming_rx) = mpsc::channel::<TransportEvent>(DEFAULT_CHANNEL_BUFFER_SIZE);

    let sender = TcpSender {
        tx: outgoing_tx,
        connected: connected.clone(),
    };
    let receiver = TcpReceiver { rx: incoming_rx };

    let read_buffer_size = config.read_buffer_size;

    tokio::spawn(async move {
        let (reader, writer) = stream.into_split();
        run_tcp_io_loop(
            reader,
            writer,
            outgoing_rx,
            incoming_tx,
            framer,
            read_buffer_size,
            connected,
        )
        .await;
    });

    (sender, receiver)
}

/// Shared IO loop for TCP connections
async fn run_tcp_io_loop(
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    mut outgoing_rx: mpsc::Receiver<Bytes>,
    incoming_tx: mpsc::Sender<TransportEvent>,
    framer: SharedFramer,
    read_buffer_size: usize,
    connected: Arc<Mutex<bool>>,
) {
    let mut read_buf = BytesMut::with_capacity(read_buffer_size);

    loop {
        tokio::select! {
            outgoing = outgoing_rx.recv() => {
                let Some(data) = outgoing else {
                    debug!("TCP sender dropped, closing connection");
                    break;
                };

                let frame = framer.lock().encode(&data);
                if let Err(e) = writer.write_all(&frame).await {
                    error!("TCP write error: {}", e);
                    let _ = incoming_tx.send(TransportEvent::Error(e.to_string())).await;
                    break;
                }
            }

            result = reader.read_buf(&mut read_buf) => {
                match result {
                    Ok(0) => {
                        debug!("TCP connection closed");
                        let _ = incoming_tx.send(TransportEvent::Disconnected { reason: None }).await;
                        break;
                    }
                    Ok(_) => {
                        let decoded = framer.lock().decode(&read_buf);
                        read_buf.clear();
                        let messages = match decoded {
                            Ok(messages) => messages,
                            Err(e) => {
                                error!("TCP framing error: {}", e);
                                let _ = incoming_tx.send(TransportEvent::Error(e.to_string())).await;
                                break;
                            }
                        };
                        let mut receiver_gone = false;
                        for message in messages {
                            if incoming_tx.send(TransportEvent::Data(message)).await.is_err() {
                                receiver_gone = true;
                                break;
                            }
                        }
                        if receiver_gone {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("TCP read error: {}", e);
                        let _ = incoming_tx.send(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }
        }
    }

    framer.lock().clear();
    *connected.lock() = false;
}

/// TCP sender for writing messages
#[derive(Clone)]
pub struct TcpSender {
    tx: mpsc::Sender<Bytes>,
    connected: Arc<Mutex<bool>>,
}

#[async_trait]
impl TransportSender for TcpSender {
    async fn send(&self, data: Bytes) -> Result<()> {
        if !*self.connected.lock() {
            return Err(TransportError::NotConnected);
        }

        self.tx
            .send(data)
            .await
            .map_err(|_| TransportError::SendFailed("Channel closed".into()))
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    async fn close(&self) -> Result<()> {
        *self.connected.lock() = false;
        Ok(())
    }
}

/// TCP receiver for reading messages
pub struct TcpReceiver {
    rx: mpsc::Receiver<TransportEvent>,
}

#[async_trait]
impl TransportReceiver for TcpReceiver {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

/// TCP server for accepting connections
pub struct TcpServer {
    listener: TcpListener,
    config: TcpConfig,
}

impl TcpServer {
    /// Bind to an address and create a new TCP server
    pub async fn bind(addr: &str) -> Result<Self> {
        Self::bind_with_config(addr, TcpConfig::default()).await
    }

    /// Bind with custom configuration
    pub async fn bind_with_config(addr: &str, config: TcpConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;

        info!("TCP server listening on {}", addr);

        Ok(Self { listener, config })
    }

    /// Accept a new connection, framing it with `framer`
    pub async fn accept(
        &self,
        framer: SharedFramer,
    ) -> Result<(TcpSender, TcpReceiver, SocketAddr)> {
        let (stream, peer_addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::AcceptFailed(e.to_string()))?;

        info!("TCP connection accepted from {}", peer_addr);

        set_keepalive(&stream, self.config.keepalive_secs);
        let (sender, receiver) = spawn_connection(stream, framer, &self.config);
        Ok((sender, receiver, peer_addr))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(TransportError::Io)
    }
}
