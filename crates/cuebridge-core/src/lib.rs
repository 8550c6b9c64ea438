//! cuebridge Core
//!
//! Core types shared by every cuebridge crate:
//! - Routed values ([`Payload`])
//! - Dynamically-typed parameter bags with typed extraction ([`Params`])
//! - The configuration model ([`Config`], [`ModuleConfig`], [`RouteConfig`])
//! - The capability contracts endpoints and transformation steps implement
//!   ([`Module`], [`Processor`]) and the dispatch contract the router exposes
//!   to modules ([`Dispatch`])

pub mod config;
pub mod error;
pub mod params;
pub mod traits;
pub mod types;

pub use config::{Config, ModuleConfig, ProcessorConfig, RouteConfig};
pub use error::{
    ConfigError, ModuleError, OutputError, ParamError, PayloadError, ProcessError, RoutingError,
    RoutingErrorKind,
};
pub use params::Params;
pub use traits::{Dispatch, InputOutcome, Module, ModuleContext, Processor};
pub use types::Payload;

/// Re-exported so module implementations share one cancellation type with the router.
pub use tokio_util::sync::CancellationToken;
