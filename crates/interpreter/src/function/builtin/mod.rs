//! 내장 함수
//!
//! 분류별 모듈이 각자 `functions()`로 등록할 함수 목록을 제공합니다.
//!
//! | 모듈 | 함수 |
//! |------|------|
//! | [`conversion`] | `to_*`, `is_*` |
//! | [`fields`] | `has_field`, `set_field`, `set_fields`, `rename_field`, `remove_field` |
//! | [`messages`] | `drop_message`, `create_message`, `clone_message`, `route_to_stream`, `remove_from_stream` |
//! | [`pattern`] | `regex`, `regex_replace` |
//! | [`strings`] | 문자열 처리 |
//! | [`json`] | `parse_json` |
//! | [`dates`] | `now`, `parse_date`, `format_date`, `parse_unix_milliseconds` |
//! | [`debug`] | `debug`, `metric_counter_increment` |

pub mod conversion;
pub mod dates;
pub mod debug;
pub mod fields;
pub mod json;
pub mod messages;
pub mod pattern;
pub mod strings;

use super::Function;

/// 모든 내장 함수
pub fn all() -> Vec<Function> {
    let mut functions = Vec::new();
    functions.extend(conversion::functions());
    functions.extend(fields::functions());
    functions.extend(messages::functions());
    functions.extend(pattern::functions());
    functions.extend(strings::functions());
    functions.extend(json::functions());
    functions.extend(dates::functions());
    functions.extend(debug::functions());
    functions
}

#[cfg(test)]
pub(crate) mod testing {
    //! 내장 함수 단위 테스트 도우미

    use std::borrow::Cow;

    use sluice_core::types::Message;
    use sluice_core::value::Value;

    use crate::eval::{EvalError, EvaluationContext};
    use crate::function::{Function, FunctionArgs};

    /// 위치 인자로 함수를 호출합니다. 생략된 매개변수에는 기본값이 적용됩니다.
    pub fn call_on(
        function: &Function,
        message: &mut Message,
        args: Vec<Value>,
    ) -> Result<Value, EvalError> {
        let descriptor = function.descriptor();
        let mut values = Vec::new();
        for (idx, param) in descriptor.params.iter().enumerate() {
            let raw = args.get(idx).cloned().or_else(|| param.default.clone());
            let bound = match raw {
                Some(value) => Some(Cow::Owned(
                    param.apply(value).map_err(EvalError::new)?,
                )),
                None => None,
            };
            values.push(bound);
        }
        let args: FunctionArgs<'_> = FunctionArgs::new(descriptor, values);
        let mut ctx = EvaluationContext::new(message);
        function.invoke(&args, &mut ctx)
    }

    pub fn call(function: &Function, args: Vec<Value>) -> Result<Value, EvalError> {
        let mut message = Message::with_id("test");
        call_on(function, &mut message, args)
    }

    pub fn find(functions: Vec<Function>, name: &str) -> Function {
        functions
            .into_iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("function {name} not registered"))
    }
}
