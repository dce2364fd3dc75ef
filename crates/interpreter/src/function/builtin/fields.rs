//! 메시지 필드 함수

use sluice_core::value::{Value, ValueType};

use crate::function::{Function, FunctionDescriptor, ParameterDescriptor};

pub fn functions() -> Vec<Function> {
    vec![
        has_field(),
        set_field(),
        set_fields(),
        rename_field(),
        remove_field(),
    ]
}

fn has_field() -> Function {
    Function::new(
        FunctionDescriptor::new("has_field", ValueType::Boolean)
            .param(ParameterDescriptor::string("field"))
            .description("Checks whether the message has a non-null field"),
        |args, ctx| {
            let field = args.required_string("field")?;
            Ok(Value::Boolean(ctx.message().has_field(field)))
        },
    )
}

fn set_field() -> Function {
    Function::new(
        FunctionDescriptor::new("set_field", ValueType::Null)
            .param(ParameterDescriptor::string("field"))
            .param(ParameterDescriptor::any("value"))
            .param(ParameterDescriptor::string("prefix").optional())
            .param(ParameterDescriptor::string("suffix").optional())
            .description("Sets a message field, null values are ignored"),
        |args, ctx| {
            let field = args.required_string("field")?;
            let Some(value) = args.value("value") else {
                return Ok(Value::Null);
            };
            let prefix = args.string("prefix")?.unwrap_or_default();
            let suffix = args.string("suffix")?.unwrap_or_default();
            ctx.message_mut()
                .set_field(format!("{prefix}{field}{suffix}"), value.clone());
            Ok(Value::Null)
        },
    )
}

fn set_fields() -> Function {
    Function::new(
        FunctionDescriptor::new("set_fields", ValueType::Null)
            .param(ParameterDescriptor::map("fields"))
            .param(ParameterDescriptor::string("prefix").optional())
            .param(ParameterDescriptor::string("suffix").optional())
            .description("Sets every entry of a map as a message field"),
        |args, ctx| {
            let Some(fields) = args.map("fields")? else {
                return Ok(Value::Null);
            };
            let prefix = args.string("prefix")?.unwrap_or_default();
            let suffix = args.string("suffix")?.unwrap_or_default();
            let message = ctx.message_mut();
            for (name, value) in fields {
                if !value.is_null() {
                    message.set_field(format!("{prefix}{name}{suffix}"), value.clone());
                }
            }
            Ok(Value::Null)
        },
    )
}

fn rename_field() -> Function {
    Function::new(
        FunctionDescriptor::new("rename_field", ValueType::Null)
            .param(ParameterDescriptor::string("old_field"))
            .param(ParameterDescriptor::string("new_field"))
            .description("Renames a message field"),
        |args, ctx| {
            let old = args.required_string("old_field")?;
            let new = args.required_string("new_field")?;
            ctx.message_mut().rename_field(old, new);
            Ok(Value::Null)
        },
    )
}

fn remove_field() -> Function {
    Function::new(
        FunctionDescriptor::new("remove_field", ValueType::Null)
            .param(ParameterDescriptor::string("field"))
            .description("Removes a message field"),
        |args, ctx| {
            let field = args.required_string("field")?;
            ctx.message_mut().remove_field(field);
            Ok(Value::Null)
        },
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::function::builtin::testing::{call_on, find};
    use sluice_core::types::Message;

    #[test]
    fn set_field_applies_prefix_and_suffix() {
        let f = find(functions(), "set_field");
        let mut message = Message::with_id("m");
        call_on(
            &f,
            &mut message,
            vec!["code".into(), Value::Long(1), "http_".into(), "_x".into()],
        )
        .unwrap();
        assert_eq!(message.field("http_code_x"), Some(&Value::Long(1)));
    }

    #[test]
    fn set_field_ignores_null() {
        let f = find(functions(), "set_field");
        let mut message = Message::with_id("m");
        call_on(&f, &mut message, vec!["a".into(), Value::Null]).unwrap();
        assert!(message.field("a").is_none());
    }

    #[test]
    fn set_fields_copies_map() {
        let f = find(functions(), "set_fields");
        let mut message = Message::with_id("m");
        let mut map = BTreeMap::new();
        map.insert("a".to_owned(), Value::Long(1));
        map.insert("b".to_owned(), Value::from("x"));
        call_on(&f, &mut message, vec![Value::Map(map)]).unwrap();
        assert_eq!(message.fields().len(), 2);
    }

    #[test]
    fn has_rename_remove_roundtrip() {
        let mut message = Message::with_id("m");
        message.set_field("src", Value::from("10.0.0.1"));

        let has = find(functions(), "has_field");
        assert_eq!(
            call_on(&has, &mut message, vec!["src".into()]),
            Ok(Value::Boolean(true))
        );

        let rename = find(functions(), "rename_field");
        call_on(&rename, &mut message, vec!["src".into(), "source_ip".into()]).unwrap();
        assert!(!message.has_field("src"));
        assert!(message.has_field("source_ip"));

        let remove = find(functions(), "remove_field");
        call_on(&remove, &mut message, vec!["source_ip".into()]).unwrap();
        assert!(message.fields().is_empty());
    }
}
