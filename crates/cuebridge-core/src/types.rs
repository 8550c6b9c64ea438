//! Routed payload type

use bytes::Bytes;
use std::fmt;

use crate::error::PayloadError;

/// Value carried from a source module through a route's processors to a destination module
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw bytes, as read from a stream or datagram
    Bytes(Bytes),
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Structured message
    Json(serde_json::Value),
}

impl Payload {
    /// Name of the variant, used in type mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
            Payload::Int(_) => "int",
            Payload::Float(_) => "float",
            Payload::Bool(_) => "bool",
            Payload::Json(_) => "json",
        }
    }

    fn mismatch(&self, expected: &'static str) -> PayloadError {
        PayloadError::TypeMismatch {
            expected,
            actual: self.kind(),
        }
    }

    pub fn as_bytes(&self) -> Result<&Bytes, PayloadError> {
        match self {
            Payload::Bytes(b) => Ok(b),
            other => Err(other.mismatch("bytes")),
        }
    }

    pub fn as_text(&self) -> Result<&str, PayloadError> {
        match self {
            Payload::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn as_int(&self) -> Result<i64, PayloadError> {
        match self {
            Payload::Int(i) => Ok(*i),
            other => Err(other.mismatch("int")),
        }
    }

    /// Numeric view: ints widen to floats
    pub fn as_float(&self) -> Result<f64, PayloadError> {
        match self {
            Payload::Float(f) => Ok(*f),
            Payload::Int(i) => Ok(*i as f64),
            other => Err(other.mismatch("float")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, PayloadError> {
        match self {
            Payload::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_json(&self) -> Result<&serde_json::Value, PayloadError> {
        match self {
            Payload::Json(v) => Ok(v),
            other => Err(other.mismatch("json")),
        }
    }

    /// Byte view for writers: bytes pass through, text is UTF-8 encoded
    pub fn into_bytes(self) -> Result<Bytes, PayloadError> {
        match self {
            Payload::Bytes(b) => Ok(b),
            Payload::Text(s) => Ok(Bytes::from(s)),
            other => Err(other.mismatch("bytes")),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Payload::Text(s) => f.write_str(s),
            Payload::Int(i) => write!(f, "{}", i),
            Payload::Float(v) => write!(f, "{}", v),
            Payload::Bool(b) => write!(f, "{}", b),
            Payload::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(v: Bytes) -> Self {
        Payload::Bytes(v)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(v))
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Text(v)
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Text(v.to_string())
    }
}

impl From<i64> for Payload {
    fn from(v: i64) -> Self {
        Payload::Int(v)
    }
}

impl From<f64> for Payload {
    fn from(v: f64) -> Self {
        Payload::Float(v)
    }
}

impl From<bool> for Payload {
    fn from(v: bool) -> Self {
        Payload::Bool(v)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Json(v)
    }
}
