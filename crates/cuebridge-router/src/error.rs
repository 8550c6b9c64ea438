//! Router construction error types
//!
//! Construction never fails as a whole: every rejected module or route is
//! reported with its position in the configuration and skipped.

use cuebridge_core::{ModuleError, ProcessError};
use thiserror::Error;

/// Why a module config was rejected
#[derive(Error, Debug)]
pub enum ModuleLoadErrorKind {
    #[error("module id is empty")]
    EmptyId,

    #[error("duplicate module id {0}")]
    DuplicateId(String),

    #[error("unknown module type {0}")]
    UnknownType(String),

    #[error("constructor failed: {0}")]
    Construction(#[source] ModuleError),
}

/// A rejected module config
#[derive(Error, Debug)]
#[error("module {index} ({id}): {kind}")]
pub struct ModuleLoadError {
    /// Position in the `modules` list
    pub index: usize,
    pub id: String,
    #[source]
    pub kind: ModuleLoadErrorKind,
}

/// Why a route failed to compile; `position` is the processor's index in the pipeline
#[derive(Error, Debug)]
pub enum RouteCompileError {
    #[error("processor {position}: unknown processor type {processor_type}")]
    UnknownProcessor {
        position: usize,
        processor_type: String,
    },

    #[error("processor {position} ({processor_type}): constructor failed: {source}")]
    Construction {
        position: usize,
        processor_type: String,
        #[source]
        source: ProcessError,
    },
}

impl RouteCompileError {
    pub fn position(&self) -> usize {
        match self {
            RouteCompileError::UnknownProcessor { position, .. } => *position,
            RouteCompileError::Construction { position, .. } => *position,
        }
    }
}

/// A route that failed to compile
#[derive(Error, Debug)]
#[error("route {index} ({input} -> {output}): {source}")]
pub struct RouteLoadError {
    /// Position in the `routes` list
    pub index: usize,
    pub input: String,
    pub output: String,
    #[source]
    pub source: RouteCompileError,
}
