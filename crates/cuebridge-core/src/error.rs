//! Error types for cuebridge

use thiserror::Error;

/// Typed parameter extraction failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// The key is absent from the parameter bag
    #[error("param not found: {0}")]
    NotFound(String),

    /// The key is present but holds a value of another type
    #[error("param {key} is not {expected}")]
    WrongType { key: String, expected: &'static str },

    /// The key holds a value of the right type that is out of range
    #[error("param {key} is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

impl ParamError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ParamError::NotFound(_))
    }
}

/// A payload arrived as a different kind than the receiver handles
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("expected {expected} payload, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors raised by module construction, start-up and output
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("param error: {0}")]
    Param(#[from] ParamError),

    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Output requested before the module's I/O resources exist
    #[error("not ready: {0}")]
    NotReady(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("module error: {0}")]
    Other(String),
}

/// Errors raised by processor construction and processing
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("param error: {0}")]
    Param(#[from] ParamError),

    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("processor error: {0}")]
    Other(String),
}

/// Configuration document loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

/// Why a route could not deliver its payload
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("no module found for destination id {0}")]
    NoModule(String),

    #[error(transparent)]
    Module(#[from] ModuleError),
}

/// Failure of one route for one input event
#[derive(Error, Debug)]
pub enum RoutingErrorKind {
    #[error("process error: {0}")]
    Process(#[source] ProcessError),

    #[error("output error: {0}")]
    Output(#[source] OutputError),
}

/// A routing error tagged with the route that produced it
#[derive(Error, Debug)]
#[error("route {route_index} ({input} -> {output}): {kind}")]
pub struct RoutingError {
    /// Position of the route in the configuration
    pub route_index: usize,
    pub input: String,
    pub output: String,
    #[source]
    pub kind: RoutingErrorKind,
}

impl RoutingError {
    pub fn is_process_error(&self) -> bool {
        matches!(self.kind, RoutingErrorKind::Process(_))
    }

    pub fn is_output_error(&self) -> bool {
        matches!(self.kind, RoutingErrorKind::Output(_))
    }
}
