//! cuebridge Router
//!
//! The router is the hub of a bridge:
//! - Instantiates modules from their registry constructors
//! - Compiles routes into processor pipelines
//! - Starts and stops every module concurrently
//! - Matches input events to routes and dispatches the results
//!
//! # Example
//!
//! ```no_run
//! use cuebridge_core::Config;
//! use cuebridge_router::{ModuleRegistry, ProcessorRegistry, Router};
//!
//! # async fn example(config: Config) {
//! let modules = ModuleRegistry::new();
//! let processors = ProcessorRegistry::new();
//! // ... register implementations ...
//!
//! let (router, module_errors, route_errors) = Router::new(&config, &modules, &processors);
//! for e in module_errors.iter() {
//!     eprintln!("{}", e);
//! }
//! for e in route_errors.iter() {
//!     eprintln!("{}", e);
//! }
//!
//! router.start().await;
//! # }
//! ```

pub mod error;
pub mod registry;
pub mod route;
pub mod router;

pub use error::{ModuleLoadError, ModuleLoadErrorKind, RouteCompileError, RouteLoadError};
pub use registry::{
    ModuleConstructor, ModuleRegistration, ModuleRegistry, ProcessorConstructor,
    ProcessorRegistration, ProcessorRegistry, Registration, Registry,
};
pub use route::Route;
pub use router::Router;

pub use cuebridge_core::{InputOutcome, OutputError, RoutingError, RoutingErrorKind};
