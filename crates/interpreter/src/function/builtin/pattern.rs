//! 정규식 함수
//!
//! `pattern` 매개변수는 [`compile_pattern`] 변환으로 컴파일됩니다.
//! 상수 패턴은 규칙 컴파일 시 한 번만 컴파일되며, 잘못된 상수 패턴은 컴파일 에러입니다.

use std::collections::BTreeMap;

use sluice_core::value::{Value, ValueType};

use crate::function::{Function, FunctionDescriptor, ParameterDescriptor, compile_pattern};

pub fn functions() -> Vec<Function> {
    vec![regex(), regex_replace()]
}

fn regex() -> Function {
    Function::new(
        FunctionDescriptor::new("regex", ValueType::Map)
            .param(ParameterDescriptor::string("pattern").transform(compile_pattern))
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::list("group_names").optional())
            .pure()
            .description("Matches a regular expression and returns its capture groups"),
        |args, _| {
            let pattern = args.pattern("pattern")?;
            let value = args.string("value")?.unwrap_or_default();
            let group_names = args.list("group_names")?.unwrap_or_default();

            let mut result = BTreeMap::new();
            let mut groups = BTreeMap::new();
            let captures = pattern.captures(value);
            result.insert("matches".to_owned(), Value::Boolean(captures.is_some()));

            if let Some(captures) = captures {
                let names: Vec<Option<&str>> = pattern.capture_names().skip(1).collect();
                for (idx, name) in names.iter().enumerate() {
                    let key = match (name, group_names.get(idx).and_then(Value::as_str)) {
                        (_, Some(explicit)) => explicit.to_owned(),
                        (Some(named), None) => (*named).to_owned(),
                        (None, None) => idx.to_string(),
                    };
                    let value = captures
                        .get(idx + 1)
                        .map(|m| Value::String(m.as_str().to_owned()))
                        .unwrap_or_default();
                    groups.insert(key, value);
                }
            }

            result.insert("groups".to_owned(), Value::Map(groups));
            Ok(Value::Map(result))
        },
    )
}

fn regex_replace() -> Function {
    Function::new(
        FunctionDescriptor::new("regex_replace", ValueType::String)
            .param(ParameterDescriptor::string("pattern").transform(compile_pattern))
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::string("replacement"))
            .param(ParameterDescriptor::boolean("replace_all").with_default(true))
            .pure()
            .description("Replaces regular expression matches, `$1` refers to a capture group"),
        |args, _| {
            let pattern = args.pattern("pattern")?;
            let value = args.string("value")?.unwrap_or_default();
            let replacement = args.string("replacement")?.unwrap_or_default();
            let replaced = if args.bool("replace_all")?.unwrap_or(true) {
                pattern.replace_all(value, replacement)
            } else {
                pattern.replace(value, replacement)
            };
            Ok(Value::String(replaced.into_owned()))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::builtin::testing::{call, find};

    fn groups(result: &Value) -> &BTreeMap<String, Value> {
        result.as_map().unwrap()["groups"].as_map().unwrap()
    }

    #[test]
    fn regex_returns_indexed_groups() {
        let f = find(functions(), "regex");
        let result = call(&f, vec![r"(\w+)@(\w+)".into(), "user@host".into()]).unwrap();
        assert_eq!(result.as_map().unwrap()["matches"], Value::Boolean(true));
        assert_eq!(groups(&result)["0"], Value::from("user"));
        assert_eq!(groups(&result)["1"], Value::from("host"));
    }

    #[test]
    fn regex_prefers_explicit_then_named_groups() {
        let f = find(functions(), "regex");
        let result = call(
            &f,
            vec![
                r"(?P<user>\w+)@(\w+)".into(),
                "user@host".into(),
                Value::List(vec![Value::Null, "domain".into()]),
            ],
        )
        .unwrap();
        assert_eq!(groups(&result)["user"], Value::from("user"));
        assert_eq!(groups(&result)["domain"], Value::from("host"));
    }

    #[test]
    fn regex_without_match() {
        let f = find(functions(), "regex");
        let result = call(&f, vec![r"^\d+$".into(), "abc".into()]).unwrap();
        assert_eq!(result.as_map().unwrap()["matches"], Value::Boolean(false));
        assert!(groups(&result).is_empty());
    }

    #[test]
    fn regex_replace_first_or_all() {
        let f = find(functions(), "regex_replace");
        assert_eq!(
            call(&f, vec!["o".into(), "foo".into(), "0".into()]),
            Ok(Value::from("f00"))
        );
        assert_eq!(
            call(
                &f,
                vec!["o".into(), "foo".into(), "0".into(), Value::Boolean(false)]
            ),
            Ok(Value::from("f0o"))
        );
    }

    #[test]
    fn regex_replace_expands_groups() {
        let f = find(functions(), "regex_replace");
        assert_eq!(
            call(&f, vec![r"(\w+)=(\w+)".into(), "a=b".into(), "$2=$1".into()]),
            Ok(Value::from("b=a"))
        );
    }
}
