//! JSON 함수

use sluice_core::value::{Value, ValueType};

use crate::eval::EvalError;
use crate::function::{Function, FunctionDescriptor, ParameterDescriptor};

pub fn functions() -> Vec<Function> {
    vec![parse_json()]
}

fn parse_json() -> Function {
    Function::new(
        FunctionDescriptor::new("parse_json", ValueType::Any)
            .param(ParameterDescriptor::string("value"))
            .pure()
            .description("Parses JSON text into values"),
        |args, _| {
            let text = args.required_string("value")?;
            let json: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| EvalError::new(format!("invalid JSON: {e}")))?;
            Ok(Value::from(json))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::builtin::testing::{call, find};

    #[test]
    fn parses_nested_objects() {
        let f = find(functions(), "parse_json");
        let value = call(&f, vec![r#"{"user":{"id":7},"tags":["a"]}"#.into()]).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["user"].as_map().unwrap()["id"], Value::Long(7));
        assert_eq!(map["tags"], Value::List(vec!["a".into()]));
    }

    #[test]
    fn invalid_json_is_eval_error() {
        let f = find(functions(), "parse_json");
        let err = call(&f, vec!["{oops".into()]).unwrap_err();
        assert!(err.message().contains("invalid JSON"));
    }
}
