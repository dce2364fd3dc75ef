//! 문자열 함수
//!
//! 위치와 길이는 바이트가 아니라 문자(`char`) 단위입니다 (`length`의 `bytes` 옵션 제외).

use std::collections::BTreeMap;

use sluice_core::value::{Value, ValueType};

use crate::eval::EvalError;
use crate::function::{Function, FunctionArgs, FunctionDescriptor, ParameterDescriptor, compile_pattern};

pub fn functions() -> Vec<Function> {
    vec![
        abbreviate(),
        case_fn("capitalize", "Uppercases the first character", capitalize),
        case_fn("uncapitalize", "Lowercases the first character", uncapitalize),
        case_fn("uppercase", "Uppercases every character", str::to_uppercase),
        case_fn("lowercase", "Lowercases every character", str::to_lowercase),
        case_fn("swapcase", "Swaps the case of every character", swapcase),
        affix_fn("contains", "search", "Checks whether a string contains another", |v, s| {
            v.contains(s)
        }),
        affix_fn("starts_with", "prefix", "Checks whether a string starts with a prefix", |v, s| {
            v.starts_with(s)
        }),
        affix_fn("ends_with", "suffix", "Checks whether a string ends with a suffix", |v, s| {
            v.ends_with(s)
        }),
        substring(),
        concat(),
        join(),
        split(),
        replace(),
        length(),
        key_value(),
        first_non_null(),
    ]
}

fn value_of<'a>(args: &'a FunctionArgs<'_>) -> Result<&'a str, EvalError> {
    Ok(args.string("value")?.unwrap_or_default())
}

fn abbreviate() -> Function {
    Function::new(
        FunctionDescriptor::new("abbreviate", ValueType::String)
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::long("width"))
            .pure()
            .description("Abbreviates a string with an ellipsis"),
        |args, _| {
            let value = value_of(args)?;
            let width = args
                .long("width")?
                .ok_or_else(|| EvalError::new("parameter 'width' must not be null"))?;
            if width < 4 {
                return Err(EvalError::new(format!(
                    "width must be at least 4, got {width}"
                )));
            }
            let width = usize::try_from(width).unwrap_or(usize::MAX);
            if value.chars().count() <= width {
                return Ok(Value::String(value.to_owned()));
            }
            let mut abbreviated: String = value.chars().take(width - 3).collect();
            abbreviated.push_str("...");
            Ok(Value::String(abbreviated))
        },
    )
}

fn case_fn(name: &'static str, description: &str, convert: fn(&str) -> String) -> Function {
    Function::new(
        FunctionDescriptor::new(name, ValueType::String)
            .param(ParameterDescriptor::string("value"))
            .pure()
            .description(description),
        move |args, _| Ok(Value::String(convert(value_of(args)?))),
    )
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn uncapitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn swapcase(value: &str) -> String {
    value
        .chars()
        .flat_map(|c| {
            if c.is_uppercase() {
                c.to_lowercase().collect::<Vec<_>>()
            } else if c.is_lowercase() {
                c.to_uppercase().collect::<Vec<_>>()
            } else {
                vec![c]
            }
        })
        .collect()
}

fn affix_fn(
    name: &'static str,
    needle: &'static str,
    description: &str,
    check: fn(&str, &str) -> bool,
) -> Function {
    Function::new(
        FunctionDescriptor::new(name, ValueType::Boolean)
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::string(needle))
            .param(ParameterDescriptor::boolean("ignore_case").with_default(false))
            .pure()
            .description(description),
        move |args, _| {
            let value = value_of(args)?;
            let search = args.string(needle)?.unwrap_or_default();
            let matched = if args.bool("ignore_case")?.unwrap_or(false) {
                check(&value.to_lowercase(), &search.to_lowercase())
            } else {
                check(value, search)
            };
            Ok(Value::Boolean(matched))
        },
    )
}

/// 음수 위치는 끝에서부터 셉니다. 범위를 벗어난 위치는 잘라냅니다.
fn clamp_index(index: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if index < 0 { len_i + index } else { index };
    usize::try_from(resolved.clamp(0, len_i)).unwrap_or(len)
}

fn substring() -> Function {
    Function::new(
        FunctionDescriptor::new("substring", ValueType::String)
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::long("start"))
            .param(ParameterDescriptor::long("end").optional())
            .pure()
            .description("Extracts a substring by character positions"),
        |args, _| {
            let chars: Vec<char> = value_of(args)?.chars().collect();
            let start = clamp_index(args.long("start")?.unwrap_or(0), chars.len());
            let end = match args.long("end")? {
                Some(end) => clamp_index(end, chars.len()),
                None => chars.len(),
            };
            if start >= end {
                return Ok(Value::String(String::new()));
            }
            Ok(Value::String(chars[start..end].iter().collect()))
        },
    )
}

fn concat() -> Function {
    Function::new(
        FunctionDescriptor::new("concat", ValueType::String)
            .param(ParameterDescriptor::any("first"))
            .param(ParameterDescriptor::any("second"))
            .pure()
            .description("Concatenates two values as strings"),
        |args, _| {
            let render = |name| match args.value(name) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Ok(Value::String(render("first") + &render("second")))
        },
    )
}

fn join() -> Function {
    Function::new(
        FunctionDescriptor::new("join", ValueType::String)
            .param(ParameterDescriptor::list("elements"))
            .param(ParameterDescriptor::string("delimiter").with_default(""))
            .pure()
            .description("Joins list elements into a string"),
        |args, _| {
            let elements = args.list("elements")?.unwrap_or_default();
            let delimiter = args.string("delimiter")?.unwrap_or_default();
            let joined = elements
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(delimiter);
            Ok(Value::String(joined))
        },
    )
}

fn split() -> Function {
    Function::new(
        FunctionDescriptor::new("split", ValueType::List)
            .param(ParameterDescriptor::string("pattern").transform(compile_pattern))
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::long("limit").with_default(0i64))
            .pure()
            .description("Splits a string around regular expression matches"),
        |args, _| {
            let pattern = args.pattern("pattern")?;
            let value = value_of(args)?;
            let limit = args.long("limit")?.unwrap_or(0);

            let mut parts: Vec<&str> = match usize::try_from(limit) {
                Ok(n) if n > 0 => pattern.splitn(value, n).collect(),
                _ => pattern.split(value).collect(),
            };
            // limit 0이면 끝의 빈 문자열을 버립니다
            if limit == 0 {
                while parts.last().is_some_and(|p| p.is_empty()) {
                    parts.pop();
                }
            }
            Ok(Value::List(
                parts.into_iter().map(|p| Value::String(p.to_owned())).collect(),
            ))
        },
    )
}

fn replace() -> Function {
    Function::new(
        FunctionDescriptor::new("replace", ValueType::String)
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::string("search"))
            .param(ParameterDescriptor::string("replacement").with_default(""))
            .param(ParameterDescriptor::long("max").with_default(-1i64))
            .pure()
            .description("Replaces occurrences of a literal string"),
        |args, _| {
            let value = value_of(args)?;
            let search = args.string("search")?.unwrap_or_default();
            let replacement = args.string("replacement")?.unwrap_or_default();
            if search.is_empty() {
                return Ok(Value::String(value.to_owned()));
            }
            let replaced = match usize::try_from(args.long("max")?.unwrap_or(-1)) {
                Ok(max) => value.replacen(search, replacement, max),
                Err(_) => value.replace(search, replacement),
            };
            Ok(Value::String(replaced))
        },
    )
}

fn length() -> Function {
    Function::new(
        FunctionDescriptor::new("length", ValueType::Long)
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::boolean("bytes").with_default(false))
            .pure()
            .description("Counts characters, or bytes when `bytes` is true"),
        |args, _| {
            let value = value_of(args)?;
            let len = if args.bool("bytes")?.unwrap_or(false) {
                value.len()
            } else {
                value.chars().count()
            };
            Ok(Value::Long(i64::try_from(len).unwrap_or(i64::MAX)))
        },
    )
}

fn key_value() -> Function {
    Function::new(
        FunctionDescriptor::new("key_value", ValueType::Map)
            .param(ParameterDescriptor::string("value"))
            .param(ParameterDescriptor::string("delimiters").with_default(" "))
            .param(ParameterDescriptor::string("kv_delimiters").with_default("="))
            .param(ParameterDescriptor::string("trim_key_chars").with_default(""))
            .param(ParameterDescriptor::string("trim_value_chars").with_default(""))
            .pure()
            .description("Extracts key/value pairs from a string, the first occurrence of a key wins"),
        |args, _| {
            let value = value_of(args)?;
            let delimiters = args.string("delimiters")?.unwrap_or(" ");
            let kv_delimiters = args.string("kv_delimiters")?.unwrap_or("=");
            let trim_key: Vec<char> = args
                .string("trim_key_chars")?
                .unwrap_or_default()
                .chars()
                .collect();
            let trim_value: Vec<char> = args
                .string("trim_value_chars")?
                .unwrap_or_default()
                .chars()
                .collect();

            if kv_delimiters.is_empty() {
                return Err(EvalError::new("kv_delimiters must not be empty"));
            }

            let mut map = BTreeMap::new();
            let pairs = value
                .split(|c: char| delimiters.contains(c))
                .filter(|pair| !pair.is_empty());
            for pair in pairs {
                let Some((key, val)) = pair.split_once(|c: char| kv_delimiters.contains(c)) else {
                    continue;
                };
                let key = key.trim_matches(trim_key.as_slice());
                let val = val.trim_matches(trim_value.as_slice());
                if key.is_empty() {
                    continue;
                }
                map.entry(key.to_owned())
                    .or_insert_with(|| Value::String(val.to_owned()));
            }
            Ok(Value::Map(map))
        },
    )
}

fn first_non_null() -> Function {
    Function::new(
        FunctionDescriptor::new("first_non_null", ValueType::Any)
            .param(ParameterDescriptor::list("value"))
            .pure()
            .description("Returns the first non-null element of a list"),
        |args, _| {
            let items = args.list("value")?.unwrap_or_default();
            Ok(items
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or_default())
        },
    )
}
