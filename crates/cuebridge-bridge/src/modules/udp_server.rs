//! UDP receive module

use async_trait::async_trait;
use cuebridge_core::{Module, ModuleConfig, ModuleContext, ModuleError, Payload};
use cuebridge_transport::{TransportEvent, UdpTransport};
use parking_lot::Mutex;
use std::net::SocketAddr;
use tracing::{debug, error, info};

use super::{log_outcome, StopSignal};
use crate::error::module_error;

/// Binds a UDP socket and dispatches every datagram as `Payload::Bytes`.
///
/// Params: `ip` (default `0.0.0.0`), `port`. Receive only.
pub struct UdpServerModule {
    id: String,
    addr: String,
    local_addr: Mutex<Option<SocketAddr>>,
    signal: StopSignal,
}

impl UdpServerModule {
    pub const TYPE: &'static str = "net.udp.server";

    pub fn from_config(config: &ModuleConfig) -> Result<Self, ModuleError> {
        let ip = config.params.get_string_or("ip", "0.0.0.0")?;
        let port = config.params.get_port("port")?;

        Ok(Self {
            id: config.id.clone(),
            addr: format!("{}:{}", ip, port),
            local_addr: Mutex::new(None),
            signal: StopSignal::default(),
        })
    }

    /// Bound address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }
}

#[async_trait]
impl Module for UdpServerModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn module_type(&self) -> &str {
        Self::TYPE
    }

    async fn start(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        let cancel = self.signal.begin(&ctx);
        let transport = UdpTransport::bind(&self.addr).await.map_err(module_error)?;
        *self.local_addr.lock() = Some(transport.local_addr().map_err(module_error)?);
        info!("UDP server {} listening on {}", self.id, self.addr);

        let mut receiver = transport.start_receiver(cancel.clone());

        let result = loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                event = receiver.recv_from() => event,
            };

            match event {
                Some((TransportEvent::Data(data), from)) => {
                    debug!("UDP server {} received {} bytes from {}", self.id, data.len(), from);
                    let outcome = ctx.dispatch.handle_input(&self.id, Payload::Bytes(data)).await;
                    log_outcome(&self.id, &outcome);
                }
                Some((TransportEvent::Error(e), _)) => {
                    error!("UDP server {} receive error: {}", self.id, e);
                }
                Some((TransportEvent::Disconnected { .. }, _)) => {}
                None if cancel.is_cancelled() => break Ok(()),
                None => {
                    break Err(ModuleError::ConnectionFailed(format!(
                        "UDP server {} receiver closed",
                        self.id
                    )))
                }
            }
        };

        self.local_addr.lock().take();
        info!("UDP server {} stopped", self.id);
        result
    }

    fn stop(&self) {
        self.signal.stop();
    }

    async fn output(&self, _payload: Payload) -> Result<(), ModuleError> {
        Err(ModuleError::Unsupported(format!(
            "{} is receive only",
            Self::TYPE
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuebridge_core::Params;

    #[test]
    fn test_from_config() {
        let config = ModuleConfig::new("udp", UdpServerModule::TYPE)
            .with_params(Params::new().with("ip", "127.0.0.1").with("port", 8000));
        let module = UdpServerModule::from_config(&config).unwrap();
        assert_eq!(module.addr, "127.0.0.1:8000");
        assert!(module.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_output_unsupported() {
        let config = ModuleConfig::new("udp", UdpServerModule::TYPE)
            .with_params(Params::new().with("port", 8000));
        let module = UdpServerModule::from_config(&config).unwrap();
        assert!(matches!(
            module.output(Payload::from("x")).await,
            Err(ModuleError::Unsupported(_))
        ));
    }
}
