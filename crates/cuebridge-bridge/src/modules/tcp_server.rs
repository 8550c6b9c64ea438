//! Framed TCP server module

use async_trait::async_trait;
use cuebridge_core::{Dispatch, Module, ModuleConfig, ModuleContext, ModuleError, Payload};
use cuebridge_transport::{
    FramingMethod, TcpReceiver, TcpSender, TcpServer, TransportEvent, TransportReceiver,
    TransportSender,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{framing_param, log_outcome, StopSignal};
use crate::error::module_error;

type Clients = Arc<Mutex<HashMap<SocketAddr, TcpSender>>>;

/// Listens for TCP connections; every connection gets its own framer.
///
/// Params: `ip` (default `0.0.0.0`), `port`, `framing` (default `LF`).
/// Output is written to every connected client.
pub struct TcpServerModule {
    id: String,
    addr: String,
    framing: FramingMethod,
    local_addr: Mutex<Option<SocketAddr>>,
    clients: Clients,
    signal: StopSignal,
}

impl TcpServerModule {
    pub const TYPE: &'static str = "net.tcp.server";

    pub fn from_config(config: &ModuleConfig) -> Result<Self, ModuleError> {
        let ip = config.params.get_string_or("ip", "0.0.0.0")?;
        let port = config.params.get_port("port")?;
        let framing = framing_param(&config.params)?;

        Ok(Self {
            id: config.id.clone(),
            addr: format!("{}:{}", ip, port),
            framing,
            local_addr: Mutex::new(None),
            clients: Arc::new(Mutex::new(HashMap::new())),
            signal: StopSignal::default(),
        })
    }

    /// Bound address while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }
}

#[async_trait]
impl Module for TcpServerModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn module_type(&self) -> &str {
        Self::TYPE
    }

    async fn start(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        let cancel = self.signal.begin(&ctx);
        let server = TcpServer::bind(&self.addr).await.map_err(module_error)?;
        *self.local_addr.lock() = Some(server.local_addr().map_err(module_error)?);
        info!("TCP server {} listening on {}", self.id, self.addr);

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = server.accept(self.framing.build_shared()) => match accepted {
                    Ok((sender, receiver, peer)) => {
                        self.clients.lock().insert(peer, sender);
                        connections.spawn(serve_connection(
                            self.id.clone(),
                            peer,
                            receiver,
                            ctx.dispatch.clone(),
                            self.clients.clone(),
                            cancel.clone(),
                        ));
                    }
                    Err(e) => error!("TCP server {} accept error: {}", self.id, e),
                },
                Some(_) = connections.join_next() => {}
            }
        }

        self.clients.lock().clear();
        connections.shutdown().await;
        self.local_addr.lock().take();
        info!("TCP server {} stopped", self.id);
        Ok(())
    }

    fn stop(&self) {
        self.signal.stop();
    }

    async fn output(&self, payload: Payload) -> Result<(), ModuleError> {
        if self.local_addr().is_none() {
            return Err(ModuleError::NotReady(format!(
                "TCP server {} is not listening",
                self.id
            )));
        }

        let clients: Vec<(SocketAddr, TcpSender)> = self
            .clients
            .lock()
            .iter()
            .map(|(addr, sender)| (*addr, sender.clone()))
            .collect();

        if clients.is_empty() {
            return Err(ModuleError::NotReady(format!(
                "TCP server {} has no connected clients",
                self.id
            )));
        }

        let data = payload.into_bytes()?;
        let mut delivered = 0;
        for (addr, sender) in clients {
            match sender.send(data.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("TCP server {} dropping client {}: {}", self.id, addr, e);
                    self.clients.lock().remove(&addr);
                }
            }
        }

        if delivered == 0 {
            return Err(ModuleError::ConnectionFailed(format!(
                "TCP server {} could not reach any client",
                self.id
            )));
        }
        Ok(())
    }
}

async fn serve_connection(
    id: String,
    peer: SocketAddr,
    mut receiver: TcpReceiver,
    dispatch: Arc<dyn Dispatch>,
    clients: Clients,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = receiver.recv() => event,
        };

        match event {
            Some(TransportEvent::Data(data)) => {
                debug!("TCP server {} received {} bytes from {}", id, data.len(), peer);
                let outcome = dispatch.handle_input(&id, Payload::Bytes(data)).await;
                log_outcome(&id, &outcome);
            }
            Some(TransportEvent::Disconnected { .. }) | None => {
                info!("TCP server {} client {} disconnected", id, peer);
                break;
            }
            Some(TransportEvent::Error(e)) => {
                error!("TCP server {} client {} error: {}", id, peer, e);
                break;
            }
        }
    }

    clients.lock().remove(&peer);
}
