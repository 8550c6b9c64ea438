//! Framed TCP client module

use async_trait::async_trait;
use cuebridge_core::{Module, ModuleConfig, ModuleContext, ModuleError, Payload};
use cuebridge_transport::{
    FramingMethod, SharedFramer, TcpSender, TcpTransport, TransportEvent, TransportReceiver,
    TransportSender,
};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{framing_param, log_outcome, StopSignal};
use crate::error::module_error;

/// Connects to a remote TCP endpoint and keeps reconnecting until stopped.
///
/// Params: `host`, `port`, `framing` (default `LF`), `reconnect_ms`
/// (default 2000). Every decoded message is dispatched as `Payload::Bytes`.
pub struct TcpClientModule {
    id: String,
    addr: String,
    framing: FramingMethod,
    reconnect: Duration,
    /// Decode state; survives reconnects but is cleared whenever a connection ends
    framer: SharedFramer,
    sender: Mutex<Option<TcpSender>>,
    signal: StopSignal,
}

impl TcpClientModule {
    pub const TYPE: &'static str = "net.tcp.client";

    pub fn from_config(config: &ModuleConfig) -> Result<Self, ModuleError> {
        let host = config.params.get_string("host")?;
        let port = config.params.get_port("port")?;
        let framing = framing_param(&config.params)?;
        let reconnect_ms = config.params.get_uint_or("reconnect_ms", 2000)?;

        Ok(Self {
            id: config.id.clone(),
            addr: format!("{}:{}", host, port),
            framing,
            reconnect: Duration::from_millis(reconnect_ms),
            framer: framing.build_shared(),
            sender: Mutex::new(None),
            signal: StopSignal::default(),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn framing(&self) -> FramingMethod {
        self.framing
    }

    pub fn is_connected(&self) -> bool {
        self.sender
            .lock()
            .as_ref()
            .map(|s| s.is_connected())
            .unwrap_or(false)
    }

    fn disconnected(&self) {
        self.sender.lock().take();
        self.framer.lock().clear();
    }
}

#[async_trait]
impl Module for TcpClientModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn module_type(&self) -> &str {
        Self::TYPE
    }

    async fn start(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        let cancel = self.signal.begin(&ctx);
        let transport = TcpTransport::new();

        loop {
            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                connected = transport.connect(&self.addr, self.framer.clone()) => connected,
            };

            match connected {
                Ok((sender, mut receiver)) => {
                    info!("TCP client {} connected to {}", self.id, self.addr);
                    *self.sender.lock() = Some(sender);

                    loop {
                        let event = tokio::select! {
                            _ = cancel.cancelled() => None,
                            event = receiver.recv() => event,
                        };

                        match event {
                            Some(TransportEvent::Data(data)) => {
                                debug!("TCP client {} received {} bytes", self.id, data.len());
                                let outcome =
                                    ctx.dispatch.handle_input(&self.id, Payload::Bytes(data)).await;
                                log_outcome(&self.id, &outcome);
                            }
                            Some(TransportEvent::Disconnected { reason }) => {
                                info!(
                                    "TCP client {} disconnected: {}",
                                    self.id,
                                    reason.as_deref().unwrap_or("closed by peer")
                                );
                                break;
                            }
                            Some(TransportEvent::Error(e)) => {
                                error!("TCP client {} connection error: {}", self.id, e);
                                break;
                            }
                            None => break,
                        }
                    }

                    self.disconnected();
                }
                Err(e) => {
                    warn!("TCP client {} failed to connect to {}: {}", self.id, self.addr, e);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect) => {
                    debug!("TCP client {} reconnecting to {}", self.id, self.addr);
                }
            }
        }

        self.disconnected();
        info!("TCP client {} stopped", self.id);
        Ok(())
    }

    fn stop(&self) {
        self.signal.stop();
    }

    async fn output(&self, payload: Payload) -> Result<(), ModuleError> {
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or_else(|| ModuleError::NotReady(format!("not connected to {}", self.addr)))?;

        let data = payload.into_bytes()?;
        sender.send(data).await.map_err(module_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuebridge_core::Params;

    fn config(params: Params) -> ModuleConfig {
        ModuleConfig::new("client", TcpClientModule::TYPE).with_params(params)
    }

    #[test]
    fn test_from_config_defaults() {
        let module = TcpClientModule::from_config(&config(
            Params::new().with("host", "127.0.0.1").with("port", 7000),
        ))
        .unwrap();

        assert_eq!(module.addr(), "127.0.0.1:7000");
        assert_eq!(module.framing(), FramingMethod::Lf);
        assert_eq!(module.reconnect, Duration::from_millis(2000));
        assert!(!module.is_connected());
    }

    #[test]
    fn test_from_config_rejects_bad_params() {
        assert!(matches!(
            TcpClientModule::from_config(&config(Params::new().with("port", 7000))),
            Err(ModuleError::Param(_))
        ));
        assert!(matches!(
            TcpClientModule::from_config(&config(
                Params::new().with("host", "h").with("port", 70000)
            )),
            Err(ModuleError::Param(_))
        ));
        assert!(matches!(
            TcpClientModule::from_config(&config(
                Params::new()
                    .with("host", "h")
                    .with("port", 1)
                    .with("framing", "morse")
            )),
            Err(ModuleError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_output_before_connect_is_not_ready() {
        let module = TcpClientModule::from_config(&config(
            Params::new().with("host", "127.0.0.1").with("port", 7000),
        ))
        .unwrap();

        let result = module.output(Payload::from("hi")).await;
        assert!(matches!(result, Err(ModuleError::NotReady(_))));
    }
}
