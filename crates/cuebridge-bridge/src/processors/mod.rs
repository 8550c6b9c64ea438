//! Built-in processors

pub mod debug;
pub mod expr;
pub mod json;
pub mod number;
pub mod string;

pub use debug::DebugLogProcessor;
pub use expr::ExprProcessor;
pub use json::{JsonDecodeProcessor, JsonEncodeProcessor};
pub use number::{ClampProcessor, FloatParseProcessor, IntParseProcessor, ScaleProcessor};
pub use string::{
    StringDecodeProcessor, StringEncodeProcessor, StringFilterProcessor, StringTemplateProcessor,
};

use cuebridge_core::{Params, ProcessError, Processor};
use cuebridge_router::{ProcessorRegistration, ProcessorRegistry};
use std::sync::Arc;

/// Register every built-in processor type
pub fn register_processors(registry: &ProcessorRegistry) {
    registry.register(stateless(StringDecodeProcessor::TYPE, || StringDecodeProcessor));
    registry.register(stateless(StringEncodeProcessor::TYPE, || StringEncodeProcessor));
    registry.register(registration(
        StringFilterProcessor::TYPE,
        StringFilterProcessor::from_params,
    ));
    registry.register(registration(
        StringTemplateProcessor::TYPE,
        StringTemplateProcessor::from_params,
    ));
    registry.register(stateless(IntParseProcessor::TYPE, || IntParseProcessor));
    registry.register(stateless(FloatParseProcessor::TYPE, || FloatParseProcessor));
    registry.register(registration(ScaleProcessor::TYPE, ScaleProcessor::from_params));
    registry.register(registration(ClampProcessor::TYPE, ClampProcessor::from_params));
    registry.register(registration(ExprProcessor::TYPE, ExprProcessor::from_params));
    registry.register(stateless(JsonDecodeProcessor::TYPE, || JsonDecodeProcessor));
    registry.register(stateless(JsonEncodeProcessor::TYPE, || JsonEncodeProcessor));
    registry.register(registration(
        DebugLogProcessor::TYPE,
        DebugLogProcessor::from_params,
    ));
}

fn registration<P, F>(type_name: &str, build: F) -> ProcessorRegistration
where
    P: Processor + 'static,
    F: Fn(&Params) -> Result<P, ProcessError> + Send + Sync + 'static,
{
    ProcessorRegistration::new(type_name, move |params| {
        Ok(Arc::new(build(params)?) as Arc<dyn Processor>)
    })
}

/// Processor types that take no params
fn stateless<P, F>(type_name: &str, build: F) -> ProcessorRegistration
where
    P: Processor + 'static,
    F: Fn() -> P + Send + Sync + 'static,
{
    registration(type_name, move |_| Ok(build()))
}
