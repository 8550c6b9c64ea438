//! JSON decoding and encoding

use cuebridge_core::{Payload, PayloadError, ProcessError, Processor};
use serde_json::Value;

/// Text or bytes to `Payload::Json`; JSON passes through
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecodeProcessor;

impl JsonDecodeProcessor {
    pub const TYPE: &'static str = "json.decode";
}

impl Processor for JsonDecodeProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        let parsed = match &payload {
            Payload::Json(_) => return Ok(Some(payload)),
            Payload::Text(s) => serde_json::from_str(s),
            Payload::Bytes(b) => serde_json::from_slice(b),
            other => {
                return Err(PayloadError::TypeMismatch {
                    expected: "bytes or text",
                    actual: other.kind(),
                }
                .into())
            }
        };

        parsed
            .map(|value| Some(Payload::Json(value)))
            .map_err(|e| ProcessError::InvalidInput(format!("invalid JSON: {}", e)))
    }
}

/// Serializes the payload as JSON text.
///
/// Scalars and text are encoded as their JSON equivalents; bytes have no
/// JSON form.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncodeProcessor;

impl JsonEncodeProcessor {
    pub const TYPE: &'static str = "json.encode";
}

impl Processor for JsonEncodeProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        let value = match payload {
            Payload::Json(v) => v,
            Payload::Text(s) => Value::String(s),
            Payload::Int(i) => Value::from(i),
            Payload::Bool(b) => Value::Bool(b),
            Payload::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| {
                    ProcessError::InvalidInput(format!("{} has no JSON representation", f))
                })?,
            Payload::Bytes(_) => {
                return Err(PayloadError::TypeMismatch {
                    expected: "json, text, number or bool",
                    actual: "bytes",
                }
                .into())
            }
        };

        Ok(Some(Payload::Text(value.to_string())))
    }
}
