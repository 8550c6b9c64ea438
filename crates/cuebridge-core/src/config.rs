//! Configuration model
//!
//! A configuration document lists the modules to instantiate and the routes
//! connecting them. It is read once at startup and never mutated.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::params::Params;

/// Full bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// One module instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub module_type: String,
    #[serde(default)]
    pub params: Params,
}

/// One pipeline step of a route
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    #[serde(rename = "type")]
    pub processor_type: String,
    #[serde(default)]
    pub params: Params,
}

/// Binds an input module to an output module through an ordered pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub input: String,
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,
    pub output: String,
}

impl ModuleConfig {
    pub fn new(id: &str, module_type: &str) -> Self {
        Self {
            id: id.to_string(),
            module_type: module_type.to_string(),
            params: Params::default(),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

impl ProcessorConfig {
    pub fn new(processor_type: &str) -> Self {
        Self {
            processor_type: processor_type.to_string(),
            params: Params::default(),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

impl RouteConfig {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            processors: Vec::new(),
            output: output.to_string(),
        }
    }

    pub fn with_processor(mut self, processor: ProcessorConfig) -> Self {
        self.processors.push(processor);
        self
    }
}

impl Config {
    /// Load a configuration file, choosing the format by extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let content = std::fs::read_to_string(path)?;

        match ext.as_str() {
            "json" => Self::from_json_str(&content),
            "toml" => Self::from_toml_str(&content),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
