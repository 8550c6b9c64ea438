//! Pass-through payload logging

use cuebridge_core::{Params, Payload, ProcessError, Processor};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct DebugLogProcessor {
    prefix: Option<String>,
}

impl DebugLogProcessor {
    pub const TYPE: &'static str = "debug.log";

    pub fn from_params(params: &Params) -> Result<Self, ProcessError> {
        let prefix = match params.get_string("prefix") {
            Ok(prefix) => Some(prefix),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self { prefix })
    }
}

impl Processor for DebugLogProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        match &self.prefix {
            Some(prefix) => info!("{} {} ({})", prefix, payload, payload.kind()),
            None => info!("{} ({})", payload, payload.kind()),
        }
        Ok(Some(payload))
    }
}
