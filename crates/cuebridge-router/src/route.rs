//! Compiled routes
//!
//! A route binds one input module id to one output module id through an
//! ordered pipeline of processors. Routes are compiled once at startup and
//! never mutated; their processors are shared by every concurrent event on
//! the route's input.

use cuebridge_core::{Payload, ProcessError, Processor, RouteConfig, RoutingError, RoutingErrorKind};
use std::fmt;
use std::sync::Arc;

use crate::error::RouteCompileError;
use crate::registry::ProcessorRegistry;

pub struct Route {
    index: usize,
    input: String,
    processors: Vec<Arc<dyn Processor>>,
    output: String,
}

impl Route {
    /// Resolve every processor declaration in order. All-or-nothing: the first
    /// unknown type or constructor failure discards the whole route.
    pub fn compile(
        index: usize,
        config: &RouteConfig,
        registry: &ProcessorRegistry,
    ) -> Result<Self, RouteCompileError> {
        let mut processors = Vec::with_capacity(config.processors.len());

        for (position, processor_config) in config.processors.iter().enumerate() {
            let processor_type = &processor_config.processor_type;

            let constructor = registry.lookup(processor_type).ok_or_else(|| {
                RouteCompileError::UnknownProcessor {
                    position,
                    processor_type: processor_type.clone(),
                }
            })?;

            let processor = constructor(&processor_config.params).map_err(|source| {
                RouteCompileError::Construction {
                    position,
                    processor_type: processor_type.clone(),
                    source,
                }
            })?;

            processors.push(processor);
        }

        Ok(Self {
            index,
            input: config.input.clone(),
            processors,
            output: config.output.clone(),
        })
    }

    /// Position of this route in the configuration
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn processors(&self) -> &[Arc<dyn Processor>] {
        &self.processors
    }

    /// Run the pipeline.
    ///
    /// `Ok(None)` means a processor filtered the payload out. The first error
    /// stops the pipeline.
    pub fn run(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        let mut current = payload;
        for processor in &self.processors {
            match processor.process(current)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    pub(crate) fn error(&self, kind: RoutingErrorKind) -> RoutingError {
        RoutingError {
            route_index: self.index,
            input: self.input.clone(),
            output: self.output.clone(),
            kind,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<&str> = self.processors.iter().map(|p| p.processor_type()).collect();
        f.debug_struct("Route")
            .field("index", &self.index)
            .field("input", &self.input)
            .field("processors", &types)
            .field("output", &self.output)
            .finish()
    }
}
