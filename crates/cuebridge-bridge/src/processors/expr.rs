//! Expression evaluation

use cuebridge_core::{Params, ParamError, Payload, PayloadError, ProcessError, Processor};
use evalexpr::{build_operator_tree, ContextWithMutableVariables, HashMapContext, Node, Value};

/// Evaluates `expression` with the payload bound to `value` and `x`.
///
/// Int, float, text and bool payloads can be bound; `PI` and `E` are
/// predefined. Example: `value * 2 + 1`, `if(x > 0.5, "on", "off")`.
#[derive(Debug, Clone)]
pub struct ExprProcessor {
    source: String,
    tree: Node,
}

impl ExprProcessor {
    pub const TYPE: &'static str = "expr.evaluate";

    pub fn from_params(params: &Params) -> Result<Self, ProcessError> {
        let expression = params.get_str("expression")?;
        Self::new(expression).map_err(|e| match e {
            ProcessError::Evaluation(reason) => ParamError::Invalid {
                key: "expression".into(),
                reason,
            }
            .into(),
            other => other,
        })
    }

    /// Parse the expression once; evaluation reuses the tree
    pub fn new(expression: &str) -> Result<Self, ProcessError> {
        let tree = build_operator_tree(expression)
            .map_err(|e| ProcessError::Evaluation(e.to_string()))?;
        Ok(Self {
            source: expression.to_string(),
            tree,
        })
    }

    pub fn expression(&self) -> &str {
        &self.source
    }
}

fn bind(payload: &Payload) -> Result<Value, ProcessError> {
    match payload {
        Payload::Int(i) => Ok(Value::Int(*i)),
        Payload::Float(f) => Ok(Value::Float(*f)),
        Payload::Text(s) => Ok(Value::String(s.clone())),
        Payload::Bool(b) => Ok(Value::Boolean(*b)),
        other => Err(PayloadError::TypeMismatch {
            expected: "number, text or bool",
            actual: other.kind(),
        }
        .into()),
    }
}

impl Processor for ExprProcessor {
    fn processor_type(&self) -> &str {
        Self::TYPE
    }

    fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        let value = bind(&payload)?;

        let mut context = HashMapContext::new();
        let eval = |e: evalexpr::EvalexprError| ProcessError::Evaluation(e.to_string());
        context
            .set_value("value".to_string(), value.clone())
            .map_err(eval)?;
        context.set_value("x".to_string(), value).map_err(eval)?;
        context
            .set_value("PI".to_string(), Value::Float(std::f64::consts::PI))
            .map_err(eval)?;
        context
            .set_value("E".to_string(), Value::Float(std::f64::consts::E))
            .map_err(eval)?;

        match self.tree.eval_with_context(&context).map_err(eval)? {
            Value::Int(i) => Ok(Some(Payload::Int(i))),
            Value::Float(f) => Ok(Some(Payload::Float(f))),
            Value::String(s) => Ok(Some(Payload::Text(s))),
            Value::Boolean(b) => Ok(Some(Payload::Bool(b))),
            other => Err(ProcessError::Evaluation(format!(
                "{} produced unsupported value {:?}",
                self.source, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str, payload: Payload) -> Result<Option<Payload>, ProcessError> {
        ExprProcessor::new(expression).unwrap().process(payload)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("value * 2 + 1", Payload::Int(20)).unwrap(), Some(Payload::Int(41)));
        assert_eq!(eval("x / 2", Payload::Float(1.0)).unwrap(), Some(Payload::Float(0.5)));
    }

    #[test]
    fn test_non_numeric_bindings() {
        assert_eq!(
            eval("if(x, \"on\", \"off\")", Payload::Bool(false)).unwrap(),
            Some(Payload::from("off"))
        );
        assert_eq!(
            eval("value == \"go\"", Payload::from("go")).unwrap(),
            Some(Payload::Bool(true))
        );
    }

    #[test]
    fn test_constants() {
        let result = eval("PI", Payload::Int(0)).unwrap();
        assert_eq!(result, Some(Payload::Float(std::f64::consts::PI)));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            eval("x", Payload::from(vec![1u8])),
            Err(ProcessError::Payload(_))
        ));
        assert!(matches!(
            eval("value + \"s\" * 2", Payload::Int(1)),
            Err(ProcessError::Evaluation(_))
        ));
        assert!(matches!(
            ExprProcessor::from_params(&Params::new().with("expression", "(1 + 2")),
            Err(ProcessError::Param(ParamError::Invalid { .. }))
        ));
    }
}
