//! UDP send module

use async_trait::async_trait;
use cuebridge_core::{Module, ModuleConfig, ModuleContext, ModuleError, Payload};
use cuebridge_transport::UdpTransport;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

use super::StopSignal;
use crate::error::module_error;

/// Sends every routed payload as one datagram to a fixed target.
///
/// Params: `host`, `port`, `bind_port` (default 0, any free port).
pub struct UdpClientModule {
    id: String,
    target: String,
    bind_port: u16,
    socket: Mutex<Option<(Arc<UdpTransport>, SocketAddr)>>,
    signal: StopSignal,
}

impl UdpClientModule {
    pub const TYPE: &'static str = "net.udp.client";

    pub fn from_config(config: &ModuleConfig) -> Result<Self, ModuleError> {
        let host = config.params.get_string("host")?;
        let port = config.params.get_port("port")?;
        let bind_port = config.params.get_port_or("bind_port", 0)?;

        Ok(Self {
            id: config.id.clone(),
            target: format!("{}:{}", host, port),
            bind_port,
            socket: Mutex::new(None),
            signal: StopSignal::default(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl Module for UdpClientModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn module_type(&self) -> &str {
        Self::TYPE
    }

    async fn start(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        let cancel = self.signal.begin(&ctx);

        let target = tokio::net::lookup_host(&self.target)
            .await?
            .next()
            .ok_or_else(|| {
                ModuleError::ConnectionFailed(format!("cannot resolve {}", self.target))
            })?;

        let bind_addr = if target.is_ipv4() {
            format!("0.0.0.0:{}", self.bind_port)
        } else {
            format!("[::]:{}", self.bind_port)
        };
        let transport = UdpTransport::bind(&bind_addr).await.map_err(module_error)?;
        *self.socket.lock() = Some((Arc::new(transport), target));
        info!("UDP client {} sending to {}", self.id, target);

        cancel.cancelled().await;

        self.socket.lock().take();
        info!("UDP client {} stopped", self.id);
        Ok(())
    }

    fn stop(&self) {
        self.signal.stop();
    }

    async fn output(&self, payload: Payload) -> Result<(), ModuleError> {
        let (transport, target) = self.socket.lock().clone().ok_or_else(|| {
            ModuleError::NotReady(format!("UDP client {} is not started", self.id))
        })?;

        let data = payload.into_bytes()?;
        transport.send_to(&data, target).await.map_err(module_error)?;
        debug!("UDP client {} sent {} bytes to {}", self.id, data.len(), target);
        Ok(())
    }
}
