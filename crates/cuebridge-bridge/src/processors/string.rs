//! Text conversion, filtering and templating

use bytes::Bytes;
use cuebridge_core::{Params, ParamError, Payload, PayloadError, ProcessError, Processor};
use regex_lite::Regex;

/// Bytes to UTF-8 text; text passes through
#[derive(Debug, Clone, Copy, Default)]
pub struct StringDecodeProcessor;

impl StringDecodeProcessor {
    pub const TYPE: &'static str = "string.decode";
}

impl Processor for StringDecodeProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        match payload {
            Payload::Text(_) => Ok(Some(payload)),
            Payload::Bytes(bytes) => {
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|e| ProcessError::InvalidInput(format!("invalid UTF-8: {}", e)))?;
                Ok(Some(Payload::Text(text)))
            }
            other => Err(not_text(&other)),
        }
    }
}

fn not_text(payload: &Payload) -> ProcessError {
    PayloadError::TypeMismatch {
        expected: "bytes or text",
        actual: payload.kind(),
    }
    .into()
}

/// Text to UTF-8 bytes; bytes pass through
#[derive(Debug, Clone, Copy, Default)]
pub struct StringEncodeProcessor;

impl StringEncodeProcessor {
    pub const TYPE: &'static str = "string.encode";
}

impl Processor for StringEncodeProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        match payload {
            Payload::Bytes(_) => Ok(Some(payload)),
            Payload::Text(text) => Ok(Some(Payload::Bytes(Bytes::from(text)))),
            other => Err(not_text(&other)),
        }
    }
}

/// Passes text matching `pattern`, drops everything else that is text
#[derive(Debug, Clone)]
pub struct StringFilterProcessor {
    pattern: Regex,
}

impl StringFilterProcessor {
    pub const TYPE: &'static str = "string.filter";

    pub fn from_params(params: &Params) -> Result<Self, ProcessError> {
        let pattern = params.get_str("pattern")?;
        Self::new(pattern).map_err(|reason| {
            ParamError::Invalid {
                key: "pattern".into(),
                reason,
            }
            .into()
        })
    }

    pub fn new(pattern: &str) -> Result<Self, String> {
        let pattern = Regex::new(pattern).map_err(|e| e.to_string())?;
        Ok(Self { pattern })
    }
}

impl Processor for StringFilterProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        if self.pattern.is_match(payload.as_text()?) {
            Ok(Some(payload))
        } else {
            Ok(None)
        }
    }
}

/// Renders `template` with every `{}` replaced by the payload's text form
#[derive(Debug, Clone)]
pub struct StringTemplateProcessor {
    template: String,
}

impl StringTemplateProcessor {
    pub const TYPE: &'static str = "string.template";

    pub fn from_params(params: &Params) -> Result<Self, ProcessError> {
        Ok(Self::new(params.get_string("template")?))
    }

    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Processor for StringTemplateProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        let rendered = self.template.replace("{}", &payload.to_string());
        Ok(Some(Payload::Text(rendered)))
    }
}
