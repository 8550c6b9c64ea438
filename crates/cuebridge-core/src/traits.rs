//! Capability contracts
//!
//! Every protocol endpoint implements [`Module`]; every transformation step
//! implements [`Processor`]. The router implements [`Dispatch`] and hands it
//! to modules at start time so they can submit the events they receive.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{ModuleError, ProcessError, RoutingError};
use crate::types::Payload;

/// Result of submitting one input event to the router
#[derive(Debug, Default)]
pub struct InputOutcome {
    /// At least one route had the source as its input
    pub matched: bool,
    /// Per-route failures, in route order
    pub errors: Vec<RoutingError>,
}

impl InputOutcome {
    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Router-side entry point modules use to inject events
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Run every route whose input is `source_id` and deliver the results
    async fn handle_input(&self, source_id: &str, payload: Payload) -> InputOutcome;
}

/// Everything a module receives when it is started
#[derive(Clone)]
pub struct ModuleContext {
    /// Cancelled when the module must stop
    pub cancel: CancellationToken,
    pub dispatch: Arc<dyn Dispatch>,
}

impl ModuleContext {
    pub fn new(cancel: CancellationToken, dispatch: Arc<dyn Dispatch>) -> Self {
        Self { cancel, dispatch }
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// An independently running protocol endpoint
#[async_trait]
pub trait Module: Send + Sync {
    /// Unique id from the configuration
    fn id(&self) -> &str;

    /// Registry key this module was built from
    fn module_type(&self) -> &str;

    /// Run the module's I/O loop until `ctx.cancel` fires.
    ///
    /// Returns `Ok(())` after observing cancellation; any other termination
    /// is an error.
    async fn start(&self, ctx: ModuleContext) -> Result<(), ModuleError>;

    /// Signal the module to stop. Non-blocking, safe to call repeatedly.
    fn stop(&self);

    /// Deliver a routed payload out of this module
    async fn output(&self, payload: Payload) -> Result<(), ModuleError>;
}

/// A single payload transformation step
pub trait Processor: Send + Sync {
    /// Registry key this processor was built from
    fn processor_type(&self) -> &str;

    /// Transform a payload.
    ///
    /// `Ok(None)` drops the payload silently; an error aborts the route.
    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError>;
}
