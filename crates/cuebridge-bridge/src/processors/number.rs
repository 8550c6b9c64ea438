//! Numeric parsing and range transforms

use cuebridge_core::{Params, ParamError, Payload, ProcessError, Processor};

fn parse_text<T: std::str::FromStr>(payload: &Payload, kind: &str) -> Result<T, ProcessError>
where
    T::Err: std::fmt::Display,
{
    let text = payload.as_text()?;
    text.trim()
        .parse()
        .map_err(|e| ProcessError::InvalidInput(format!("{:?} is not {}: {}", text, kind, e)))
}

/// Text to `Payload::Int`
#[derive(Debug, Clone, Copy, Default)]
pub struct IntParseProcessor;

impl IntParseProcessor {
    pub const TYPE: &'static str = "int.parse";
}

impl Processor for IntParseProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        Ok(Some(Payload::Int(parse_text(&payload, "an integer")?)))
    }
}

/// Text to `Payload::Float`
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatParseProcessor;

impl FloatParseProcessor {
    pub const TYPE: &'static str = "float.parse";
}

impl Processor for FloatParseProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        Ok(Some(Payload::Float(parse_text(&payload, "a number")?)))
    }
}

/// Linear mapping of `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// Values outside the input range are extrapolated, not clamped; chain a
/// `float.clamp` for that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleProcessor {
    in_min: f64,
    in_max: f64,
    out_min: f64,
    out_max: f64,
}

impl ScaleProcessor {
    pub const TYPE: &'static str = "float.scale";

    pub fn from_params(params: &Params) -> Result<Self, ProcessError> {
        let in_min = params.get_float("in_min")?;
        let in_max = params.get_float("in_max")?;
        let out_min = params.get_float("out_min")?;
        let out_max = params.get_float("out_max")?;

        if in_min == in_max {
            return Err(ParamError::Invalid {
                key: "in_max".into(),
                reason: "input range is empty".into(),
            }
            .into());
        }

        Ok(Self {
            in_min,
            in_max,
            out_min,
            out_max,
        })
    }

    pub fn apply(&self, v: f64) -> f64 {
        let normalized = (v - self.in_min) / (self.in_max - self.in_min);
        self.out_min + normalized * (self.out_max - self.out_min)
    }
}

impl Processor for ScaleProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        Ok(Some(Payload::Float(self.apply(payload.as_float()?))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampProcessor {
    min: f64,
    max: f64,
}

impl ClampProcessor {
    pub const TYPE: &'static str = "float.clamp";

    pub fn from_params(params: &Params) -> Result<Self, ProcessError> {
        let min = params.get_float("min")?;
        let max = params.get_float("max")?;

        // f64::clamp panics on these
        if min.is_nan() || max.is_nan() || min > max {
            return Err(ParamError::Invalid {
                key: "max".into(),
                reason: format!("{} is below min {}", max, min),
            }
            .into());
        }

        Ok(Self { min, max })
    }
}

impl Processor for ClampProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        Ok(Some(Payload::Float(payload.as_float()?.clamp(self.min, self.max))))
    }
}
