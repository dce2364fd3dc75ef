//! 타입 변환과 타입 검사 함수
//!
//! 문자열에서 숫자로의 변환은 이 함수들을 통해서만 일어납니다.
//! 변환할 수 없는 값은 `default` 인자로 대체됩니다.

use std::collections::BTreeMap;

use sluice_core::value::{Value, ValueType};

use crate::function::{Function, FunctionDescriptor, ParameterDescriptor};

pub fn functions() -> Vec<Function> {
    let mut functions = vec![to_bool(), to_double(), to_long(), to_string(), to_map()];
    functions.extend(type_checks());
    functions
}

fn to_bool() -> Function {
    Function::new(
        FunctionDescriptor::new("to_bool", ValueType::Boolean)
            .param(ParameterDescriptor::any("value"))
            .param(ParameterDescriptor::boolean("default").with_default(false))
            .pure()
            .description("Converts a value to a boolean"),
        |args, _| {
            let default = args.bool("default")?.unwrap_or(false);
            let converted = match args.value("value") {
                Some(Value::Boolean(b)) => *b,
                Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
                Some(Value::Long(n)) => *n != 0,
                Some(Value::Double(d)) => *d != 0.0,
                _ => default,
            };
            Ok(Value::Boolean(converted))
        },
    )
}

fn to_double() -> Function {
    Function::new(
        FunctionDescriptor::new("to_double", ValueType::Double)
            .param(ParameterDescriptor::any("value"))
            .param(ParameterDescriptor::double("default").with_default(0.0))
            .pure()
            .description("Converts a value to a double"),
        |args, _| {
            let default = args.double("default")?.unwrap_or(0.0);
            let converted = match args.value("value") {
                Some(v @ (Value::Long(_) | Value::Double(_))) => v.as_double(),
                Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            Ok(Value::Double(converted.unwrap_or(default)))
        },
    )
}

fn to_long() -> Function {
    Function::new(
        FunctionDescriptor::new("to_long", ValueType::Long)
            .param(ParameterDescriptor::any("value"))
            .param(ParameterDescriptor::long("default").with_default(0i64))
            .pure()
            .description("Converts a value to a long"),
        |args, _| {
            let default = args.long("default")?.unwrap_or(0);
            let converted = match args.value("value") {
                Some(Value::Long(n)) => Some(*n),
                Some(Value::Double(d)) => double_to_long(*d),
                Some(Value::String(s)) => {
                    let s = s.trim();
                    s.parse::<i64>().ok().or_else(|| {
                        s.parse::<f64>().ok().and_then(double_to_long)
                    })
                }
                _ => None,
            };
            Ok(Value::Long(converted.unwrap_or(default)))
        },
    )
}

/// 소수점 이하를 버립니다. i64 범위 밖이거나 유한하지 않으면 `None`입니다.
fn double_to_long(d: f64) -> Option<i64> {
    let t = d.trunc();
    // i64::MAX as f64는 2^63으로 반올림되므로 상한은 배타적으로 비교합니다.
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

fn to_string() -> Function {
    Function::new(
        FunctionDescriptor::new("to_string", ValueType::String)
            .param(ParameterDescriptor::any("value"))
            .param(ParameterDescriptor::string("default").with_default(""))
            .pure()
            .description("Converts a value to its string representation"),
        |args, _| match args.value("value") {
            Some(Value::String(s)) => Ok(Value::String(s.clone())),
            Some(other) => Ok(Value::String(other.to_string())),
            None => Ok(Value::String(
                args.string("default")?.unwrap_or_default().to_owned(),
            )),
        },
    )
}

fn to_map() -> Function {
    Function::new(
        FunctionDescriptor::new("to_map", ValueType::Map)
            .param(ParameterDescriptor::any("value"))
            .param(ParameterDescriptor::map("default").with_default(BTreeMap::new()))
            .pure()
            .description("Converts a map-like value to a map"),
        |args, _| match args.value("value") {
            Some(Value::Map(map)) => Ok(Value::Map(map.clone())),
            _ => Ok(Value::Map(args.map("default")?.cloned().unwrap_or_default())),
        },
    )
}

fn type_check(name: &'static str, description: &str, check: fn(&Value) -> bool) -> Function {
    Function::new(
        FunctionDescriptor::new(name, ValueType::Boolean)
            .param(ParameterDescriptor::any("value"))
            .pure()
            .description(description),
        move |args, _| {
            let value = args.value("value").unwrap_or(&Value::Null);
            Ok(Value::Boolean(check(value)))
        },
    )
}

fn type_checks() -> Vec<Function> {
    vec![
        type_check("is_bool", "Checks whether a value is a boolean", |v| {
            matches!(v, Value::Boolean(_))
        }),
        type_check("is_number", "Checks whether a value is a number", |v| {
            matches!(v, Value::Long(_) | Value::Double(_))
        }),
        type_check("is_double", "Checks whether a value is a double", |v| {
            matches!(v, Value::Double(_))
        }),
        type_check("is_long", "Checks whether a value is a long", |v| {
            matches!(v, Value::Long(_))
        }),
        type_check("is_string", "Checks whether a value is a string", |v| {
            matches!(v, Value::String(_))
        }),
        type_check(
            "is_collection",
            "Checks whether a value is a list or a map",
            |v| matches!(v, Value::List(_) | Value::Map(_)),
        ),
        type_check("is_list", "Checks whether a value is a list", |v| {
            matches!(v, Value::List(_))
        }),
        type_check("is_map", "Checks whether a value is a map", |v| {
            matches!(v, Value::Map(_))
        }),
        type_check("is_null", "Checks whether a value is null", Value::is_null),
        type_check("is_not_null", "Checks whether a value is not null", |v| {
            !v.is_null()
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::builtin::testing::{call, find};

    #[test]
    fn to_long_parses_and_truncates() {
        let f = find(functions(), "to_long");
        assert_eq!(call(&f, vec!["42".into()]), Ok(Value::Long(42)));
        assert_eq!(call(&f, vec![" 7.9 ".into()]), Ok(Value::Long(7)));
        assert_eq!(call(&f, vec![Value::Double(-3.7)]), Ok(Value::Long(-3)));
        assert_eq!(call(&f, vec!["abc".into(), Value::Long(5)]), Ok(Value::Long(5)));
        assert_eq!(call(&f, vec![Value::Null]), Ok(Value::Long(0)));
    }

    #[test]
    fn to_long_out_of_range_uses_default() {
        let f = find(functions(), "to_long");
        assert_eq!(
            call(&f, vec![Value::Double(1e30), Value::Long(-1)]),
            Ok(Value::Long(-1))
        );
        assert_eq!(
            call(&f, vec![Value::Double(-1e30), Value::Long(-1)]),
            Ok(Value::Long(-1))
        );
        assert_eq!(call(&f, vec!["9.3e18".into(), Value::Long(3)]), Ok(Value::Long(3)));
        assert_eq!(call(&f, vec![Value::Double(f64::NAN)]), Ok(Value::Long(0)));
        assert_eq!(
            call(&f, vec![Value::Double(-9.0e18)]),
            Ok(Value::Long(-9 * 10i64.pow(18)))
        );
    }

    #[test]
    fn to_double_promotes_long() {
        let f = find(functions(), "to_double");
        assert_eq!(call(&f, vec![Value::Long(2)]), Ok(Value::Double(2.0)));
        assert_eq!(call(&f, vec!["1.5".into()]), Ok(Value::Double(1.5)));
        assert_eq!(
            call(&f, vec![Value::Boolean(true), Value::Double(9.0)]),
            Ok(Value::Double(9.0))
        );
    }

    #[test]
    fn to_bool_accepts_strings_and_numbers() {
        let f = find(functions(), "to_bool");
        assert_eq!(call(&f, vec!["TRUE".into()]), Ok(Value::Boolean(true)));
        assert_eq!(call(&f, vec!["no".into()]), Ok(Value::Boolean(false)));
        assert_eq!(call(&f, vec![Value::Long(1)]), Ok(Value::Boolean(true)));
        assert_eq!(
            call(&f, vec![Value::Null, Value::Boolean(true)]),
            Ok(Value::Boolean(true))
        );
    }

    #[test]
    fn to_string_uses_default_for_null() {
        let f = find(functions(), "to_string");
        assert_eq!(call(&f, vec![Value::Long(3)]), Ok(Value::from("3")));
        assert_eq!(call(&f, vec![Value::Double(1.0)]), Ok(Value::from("1.0")));
        assert_eq!(call(&f, vec![Value::Null, "n/a".into()]), Ok(Value::from("n/a")));
    }

    #[test]
    fn type_checks_distinguish_numbers() {
        let is_number = find(functions(), "is_number");
        assert_eq!(call(&is_number, vec![Value::Double(1.0)]), Ok(Value::Boolean(true)));
        assert_eq!(call(&is_number, vec!["1".into()]), Ok(Value::Boolean(false)));

        let is_null = find(functions(), "is_null");
        assert_eq!(call(&is_null, vec![Value::Null]), Ok(Value::Boolean(true)));
    }
}
