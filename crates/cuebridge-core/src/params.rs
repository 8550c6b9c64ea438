//! Dynamically-typed parameter bags
//!
//! Module and processor configurations carry an open key/value bag whose
//! recognized keys are owned by each implementation. Extraction is typed and
//! distinguishes a missing key from a key holding the wrong type, so
//! implementations can treat optional params with a default while still
//! rejecting malformed ones.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParamError;

/// Open key/value parameter bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and programmatic configs
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Raw access to the underlying value
    pub fn get(&self, key: &str) -> Result<&Value, ParamError> {
        self.0
            .get(key)
            .ok_or_else(|| ParamError::NotFound(key.to_string()))
    }

    fn wrong_type(key: &str, expected: &'static str) -> ParamError {
        ParamError::WrongType {
            key: key.to_string(),
            expected,
        }
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ParamError> {
        self.get(key)?
            .as_str()
            .ok_or_else(|| Self::wrong_type(key, "a string"))
    }

    pub fn get_string(&self, key: &str) -> Result<String, ParamError> {
        self.get_str(key).map(str::to_string)
    }

    pub fn get_int(&self, key: &str) -> Result<i64, ParamError> {
        self.get(key)?
            .as_i64()
            .ok_or_else(|| Self::wrong_type(key, "an integer"))
    }

    pub fn get_uint(&self, key: &str) -> Result<u64, ParamError> {
        self.get(key)?
            .as_u64()
            .ok_or_else(|| Self::wrong_type(key, "an unsigned integer"))
    }

    /// Float extraction; integer values are accepted and widened
    pub fn get_float(&self, key: &str) -> Result<f64, ParamError> {
        self.get(key)?
            .as_f64()
            .ok_or_else(|| Self::wrong_type(key, "a number"))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ParamError> {
        self.get(key)?
            .as_bool()
            .ok_or_else(|| Self::wrong_type(key, "a boolean"))
    }

    pub fn get_array(&self, key: &str) -> Result<&Vec<Value>, ParamError> {
        self.get(key)?
            .as_array()
            .ok_or_else(|| Self::wrong_type(key, "an array"))
    }

    /// Port numbers are unsigned integers that fit in 16 bits
    pub fn get_port(&self, key: &str) -> Result<u16, ParamError> {
        let port = self.get_uint(key)?;
        u16::try_from(port).map_err(|_| ParamError::Invalid {
            key: key.to_string(),
            reason: format!("{} is not a valid port", port),
        })
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> Result<String, ParamError> {
        or_default(self.get_string(key), default.to_string())
    }

    pub fn get_int_or(&self, key: &str, default: i64) -> Result<i64, ParamError> {
        or_default(self.get_int(key), default)
    }

    pub fn get_uint_or(&self, key: &str, default: u64) -> Result<u64, ParamError> {
        or_default(self.get_uint(key), default)
    }

    pub fn get_float_or(&self, key: &str, default: f64) -> Result<f64, ParamError> {
        or_default(self.get_float(key), default)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ParamError> {
        or_default(self.get_bool(key), default)
    }

    pub fn get_port_or(&self, key: &str, default: u16) -> Result<u16, ParamError> {
        or_default(self.get_port(key), default)
    }
}

/// Only a missing key falls back to the default; a wrong type stays an error
fn or_default<T>(result: Result<T, ParamError>, default: T) -> Result<T, ParamError> {
    match result {
        Err(ParamError::NotFound(_)) => Ok(default),
        other => other,
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
