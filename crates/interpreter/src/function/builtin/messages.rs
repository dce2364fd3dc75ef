//! 메시지 수명 주기와 라우팅 함수
//!
//! 스트림이 하나도 없는 메시지는 암묵적으로 `default` 스트림에 속합니다.

use chrono::{SecondsFormat, Utc};
use sluice_core::types::{DEFAULT_STREAM, FIELD_SOURCE, FIELD_TIMESTAMP, Message};
use sluice_core::value::{Value, ValueType};

use crate::function::{Function, FunctionDescriptor, ParameterDescriptor};

pub fn functions() -> Vec<Function> {
    vec![
        drop_message(),
        create_message(),
        clone_message(),
        route_to_stream(),
        remove_from_stream(),
    ]
}

fn drop_message() -> Function {
    Function::new(
        FunctionDescriptor::new("drop_message", ValueType::Null)
            .description("Drops the message once the current stage finishes"),
        |_, ctx| {
            ctx.message_mut().set_filter_out(true);
            Ok(Value::Null)
        },
    )
}

fn create_message() -> Function {
    Function::new(
        FunctionDescriptor::new("create_message", ValueType::String)
            .param(ParameterDescriptor::string("message").optional())
            .param(ParameterDescriptor::string("source").optional())
            .param(ParameterDescriptor::string("timestamp").optional())
            .description("Creates a new message and returns its id"),
        |args, ctx| {
            let text = args.string("message")?.unwrap_or_default();
            let source = match args.string("source")? {
                Some(source) => source.to_owned(),
                None => ctx
                    .message()
                    .field(FIELD_SOURCE)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            };
            let timestamp = match args.string("timestamp")? {
                Some(ts) => ts.to_owned(),
                None => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            };

            let mut created = Message::new(text, source);
            created.set_field(FIELD_TIMESTAMP, Value::String(timestamp));
            Ok(Value::String(ctx.create_message(created)))
        },
    )
}

fn clone_message() -> Function {
    Function::new(
        FunctionDescriptor::new("clone_message", ValueType::String)
            .description("Clones the current message with a new id and returns that id"),
        |_, ctx| {
            let original = ctx.message();
            let mut clone = Message::from_fields(original.fields().clone());
            for stream in original.streams() {
                clone.add_stream(stream.clone());
            }
            Ok(Value::String(ctx.create_message(clone)))
        },
    )
}

fn route_to_stream() -> Function {
    Function::new(
        FunctionDescriptor::new("route_to_stream", ValueType::Null)
            .param(ParameterDescriptor::string("id"))
            .param(ParameterDescriptor::boolean("remove_from_default").with_default(false))
            .description("Adds the message to a stream"),
        |args, ctx| {
            let stream = args.required_string("id")?;
            let remove_from_default = args.bool("remove_from_default")?.unwrap_or(false);
            let message = ctx.message_mut();
            if message.streams().is_empty() {
                message.add_stream(DEFAULT_STREAM);
            }
            message.add_stream(stream);
            if remove_from_default && stream != DEFAULT_STREAM {
                message.remove_stream(DEFAULT_STREAM);
            }
            Ok(Value::Null)
        },
    )
}

fn remove_from_stream() -> Function {
    Function::new(
        FunctionDescriptor::new("remove_from_stream", ValueType::Null)
            .param(ParameterDescriptor::string("id"))
            .description("Removes the message from a stream"),
        |args, ctx| {
            let stream = args.required_string("id")?;
            ctx.message_mut().remove_stream(stream);
            Ok(Value::Null)
        },
    )
}
