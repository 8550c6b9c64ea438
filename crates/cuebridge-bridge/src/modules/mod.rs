//! Built-in modules

pub mod interval;
pub mod tcp_client;
pub mod tcp_server;
pub mod udp_client;
pub mod udp_server;

pub use interval::IntervalModule;
pub use tcp_client::TcpClientModule;
pub use tcp_server::TcpServerModule;
pub use udp_client::UdpClientModule;
pub use udp_server::UdpServerModule;

use cuebridge_core::{InputOutcome, Module, ModuleConfig, ModuleContext, ModuleError, Params};
use cuebridge_router::{ModuleRegistration, ModuleRegistry};
use cuebridge_transport::{FramingMethod, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Register every built-in module type
pub fn register_modules(registry: &ModuleRegistry) {
    registry.register(registration(TcpClientModule::TYPE, TcpClientModule::from_config));
    registry.register(registration(TcpServerModule::TYPE, TcpServerModule::from_config));
    registry.register(registration(UdpServerModule::TYPE, UdpServerModule::from_config));
    registry.register(registration(UdpClientModule::TYPE, UdpClientModule::from_config));
    registry.register(registration(IntervalModule::TYPE, IntervalModule::from_config));
}

fn registration<M, F>(type_name: &str, build: F) -> ModuleRegistration
where
    M: Module + 'static,
    F: Fn(&ModuleConfig) -> Result<M, ModuleError> + Send + Sync + 'static,
{
    ModuleRegistration::new(type_name, move |config| {
        Ok(Arc::new(build(config)?) as Arc<dyn Module>)
    })
}

/// `framing` param, `LF` when absent
pub(crate) fn framing_param(params: &Params) -> Result<FramingMethod, ModuleError> {
    let name = params.get_string_or("framing", "LF")?;
    name.parse()
        .map_err(|e: TransportError| ModuleError::InvalidConfig(e.to_string()))
}

/// Report what happened to an event a module submitted
pub(crate) fn log_outcome(source_id: &str, outcome: &InputOutcome) {
    if !outcome.matched {
        debug!("No route for input from {}", source_id);
    }
    for e in &outcome.errors {
        warn!("Routing input from {} failed: {}", source_id, e);
    }
}

/// Cancellation scoped to one run of a module.
///
/// `begin` derives a token from the router's and `stop` cancels it, so a
/// module stops when either side asks.
#[derive(Default)]
pub(crate) struct StopSignal {
    token: Mutex<Option<CancellationToken>>,
}

impl StopSignal {
    pub(crate) fn begin(&self, ctx: &ModuleContext) -> CancellationToken {
        let token = ctx.cancel.child_token();
        *self.token.lock() = Some(token.clone());
        token
    }

    pub(crate) fn stop(&self) {
        if let Some(token) = self.token.lock().take() {
            token.cancel();
        }
    }
}
