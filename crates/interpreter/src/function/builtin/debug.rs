//! 진단 함수

use sluice_core::metrics as m;
use sluice_core::value::{Value, ValueType};

use crate::eval::EvalError;
use crate::function::{Function, FunctionDescriptor, ParameterDescriptor};

pub fn functions() -> Vec<Function> {
    vec![debug(), metric_counter_increment()]
}

fn debug() -> Function {
    Function::new(
        FunctionDescriptor::new("debug", ValueType::Null)
            .param(ParameterDescriptor::any("value"))
            .description("Logs a value at info level"),
        |args, ctx| {
            let value = args.value("value").cloned().unwrap_or_default();
            tracing::info!(msg_id = %ctx.message().id(), value = %value, "rule debug");
            Ok(Value::Null)
        },
    )
}

fn metric_counter_increment() -> Function {
    Function::new(
        FunctionDescriptor::new("metric_counter_increment", ValueType::Null)
            .param(ParameterDescriptor::string("name"))
            .param(ParameterDescriptor::long("value").with_default(1i64))
            .description("Increments a named rule counter"),
        |args, _| {
            let name = args.required_string("name")?.to_owned();
            let value = args.long("value")?.unwrap_or(1);
            let increment = u64::try_from(value).map_err(|_| {
                EvalError::new(format!("counter increment must not be negative, got {value}"))
            })?;
            metrics::counter!(m::RULE_CUSTOM_COUNTER_TOTAL, m::LABEL_NAME => name).increment(increment);
            Ok(Value::Null)
        },
    )
}
