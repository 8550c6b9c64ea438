//! cuebridge built-in modules and processors
//!
//! Modules:
//! - `net.tcp.client` / `net.tcp.server` (framed streams)
//! - `net.udp.server` / `net.udp.client` (datagrams)
//! - `time.interval` (tick source)
//!
//! Processors:
//! - `string.*` conversions, filtering and templating
//! - `int.parse`, `float.parse`, `float.scale`, `float.clamp`
//! - `expr.evaluate` (arithmetic expressions)
//! - `json.decode`, `json.encode`
//! - `debug.log`

pub mod error;
pub mod modules;
pub mod processors;

use cuebridge_router::{ModuleRegistry, ProcessorRegistry};

pub use modules::{
    IntervalModule, TcpClientModule, TcpServerModule, UdpClientModule, UdpServerModule,
};
pub use processors::{
    ClampProcessor, DebugLogProcessor, ExprProcessor, FloatParseProcessor, IntParseProcessor,
    JsonDecodeProcessor, JsonEncodeProcessor, ScaleProcessor, StringDecodeProcessor,
    StringEncodeProcessor, StringFilterProcessor, StringTemplateProcessor,
};

/// Register every built-in module and processor type
///
/// # Panics
///
/// If any built-in type is already present in either registry.
pub fn register_builtins(modules: &ModuleRegistry, processors: &ProcessorRegistry) {
    modules::register_modules(modules);
    processors::register_processors(processors);
}
