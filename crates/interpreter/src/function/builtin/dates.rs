//! 날짜 함수
//!
//! 날짜 값은 UTC 기준 RFC 3339 문자열(밀리초 정밀도)로 표현합니다.
//! 패턴은 chrono의 strftime 문법을 따릅니다 (`%Y-%m-%d %H:%M:%S`).

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use sluice_core::value::{Value, ValueType};

use crate::eval::EvalError;
use crate::function::{Function, FunctionDescriptor, ParameterDescriptor};

pub fn functions() -> Vec<Function> {
    vec![now(), parse_date(), format_date(), parse_unix_milliseconds()]
}

fn render(datetime: DateTime<Utc>) -> Value {
    Value::String(datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn now() -> Function {
    Function::new(
        FunctionDescriptor::new("now", ValueType::String)
            .description("Returns the current time"),
        |_, _| Ok(render(Utc::now())),
    )
}

/// 시간대가 있으면 UTC로 변환하고, 없으면 UTC로 간주합니다.
fn parse_with_pattern(value: &str, pattern: &str) -> Result<DateTime<Utc>, EvalError> {
    if let Ok(datetime) = DateTime::parse_from_str(value, pattern) {
        return Ok(datetime.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, pattern)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| EvalError::new(format!("'{value}' does not match pattern '{pattern}'")))
}

fn parse_date() -> Function {
    Function::new(
        FunctionDescriptor::new("parse_date", ValueType::String)
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::string("pattern"))
            .pure()
            .description("Parses a date with a strftime pattern"),
        |args, _| {
            let value = args.required_string("value")?;
            let pattern = args.required_string("pattern")?;
            Ok(render(parse_with_pattern(value.trim(), pattern)?))
        },
    )
}

fn format_date() -> Function {
    Function::new(
        FunctionDescriptor::new("format_date", ValueType::String)
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::string("format"))
            .pure()
            .description("Formats an RFC 3339 date with a strftime pattern"),
        |args, _| {
            let value = args.required_string("value")?;
            let format = args.required_string("format")?;
            let datetime = DateTime::parse_from_rfc3339(value)
                .map_err(|e| EvalError::new(format!("'{value}' is not an RFC 3339 date: {e}")))?
                .with_timezone(&Utc);

            let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
            if items.iter().any(|item| matches!(item, Item::Error)) {
                return Err(EvalError::new(format!("invalid date format '{format}'")));
            }
            let mut formatted = String::new();
            write!(formatted, "{}", datetime.format_with_items(items.into_iter()))
                .map_err(|_| EvalError::new(format!("cannot format date with '{format}'")))?;
            Ok(Value::String(formatted))
        },
    )
}

fn parse_unix_milliseconds() -> Function {
    Function::new(
        FunctionDescriptor::new("parse_unix_milliseconds", ValueType::String)
            .param(ParameterDescriptor::long("value"))
            .pure()
            .description("Converts UNIX epoch milliseconds to a date"),
        |args, _| {
            let millis = args
                .long("value")?
                .ok_or_else(|| EvalError::new("parameter 'value' must not be null"))?;
            DateTime::from_timestamp_millis(millis)
                .map(render)
                .ok_or_else(|| EvalError::new(format!("{millis} is out of range")))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::builtin::testing::{call, find};

    fn run(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        call(&find(functions(), name), args)
    }

    #[test]
    fn parse_date_without_zone_is_utc() {
        assert_eq!(
            run(
                "parse_date",
                vec!["2024-03-01 12:30:00".into(), "%Y-%m-%d %H:%M:%S".into()]
            ),
            Ok("2024-03-01T12:30:00.000Z".into())
        );
    }

    #[test]
    fn parse_date_converts_offsets() {
        assert_eq!(
            run(
                "parse_date",
                vec![
                    "2024-03-01 12:30:00 +0900".into(),
                    "%Y-%m-%d %H:%M:%S %z".into()
                ]
            ),
            Ok("2024-03-01T03:30:00.000Z".into())
        );
    }

    #[test]
    fn parse_date_accepts_plain_dates() {
        assert_eq!(
            run("parse_date", vec!["2024-03-01".into(), "%Y-%m-%d".into()]),
            Ok("2024-03-01T00:00:00.000Z".into())
        );
        assert!(run("parse_date", vec!["nope".into(), "%Y".into()]).is_err());
    }

    #[test]
    fn format_date_rejects_bad_format() {
        assert_eq!(
            run(
                "format_date",
                vec!["2024-03-01T03:30:00Z".into(), "%d/%m/%Y".into()]
            ),
            Ok("01/03/2024".into())
        );
        assert!(run("format_date", vec!["2024-03-01T03:30:00Z".into(), "%Q".into()]).is_err());
    }

    #[test]
    fn unix_milliseconds() {
        assert_eq!(
            run("parse_unix_milliseconds", vec![Value::Long(0)]),
            Ok("1970-01-01T00:00:00.000Z".into())
        );
    }

    #[test]
    fn now_is_rfc3339() {
        let value = run("now", vec![]).unwrap();
        assert!(DateTime::parse_from_rfc3339(value.as_str().unwrap()).is_ok());
    }
}
