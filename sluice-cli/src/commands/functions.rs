//! `sluice functions` command handler

use std::io::Write;

use serde::Serialize;

use sluice_core::value::{Value, ValueType};
use sluice_interpreter::{FunctionDescriptor, ParameterDescriptor};

use crate::cli::FunctionsArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `functions` command.
pub fn execute(args: FunctionsArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let registry = super::registry()?;
    let functions: Vec<FunctionEntry> = registry
        .descriptors()
        .into_iter()
        .filter(|d| args.filter.as_deref().is_none_or(|f| d.name.contains(f)))
        .map(FunctionEntry::from)
        .collect();

    writer.render(&FunctionsReport {
        total: functions.len(),
        functions,
    })
}

#[derive(Serialize)]
pub struct FunctionsReport {
    pub total: usize,
    pub functions: Vec<FunctionEntry>,
}

#[derive(Serialize)]
pub struct FunctionEntry {
    pub name: String,
    pub return_type: ValueType,
    pub pure: bool,
    pub params: Vec<ParamEntry>,
    pub description: String,
}

#[derive(Serialize)]
pub struct ParamEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ValueType,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl From<&FunctionDescriptor> for FunctionEntry {
    fn from(d: &FunctionDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            return_type: d.return_type,
            pure: d.pure,
            params: d.params.iter().map(ParamEntry::from).collect(),
            description: d.description.clone(),
        }
    }
}

impl From<&ParameterDescriptor> for ParamEntry {
    fn from(p: &ParameterDescriptor) -> Self {
        Self {
            name: p.name.clone(),
            ty: p.ty,
            optional: p.optional,
            default: p.default.clone(),
        }
    }
}

impl FunctionEntry {
    /// `name(a: String, b?: Long = 0) -> Long`
    fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let marker = if p.optional { "?" } else { "" };
                match &p.default {
                    Some(default) => format!("{}{marker}: {} = {}", p.name, p.ty, default.to_json()),
                    None => format!("{}{marker}: {}", p.name, p.ty),
                }
            })
            .collect();
        format!("{}({}) -> {}", self.name, params.join(", "), self.return_type)
    }
}

impl Render for FunctionsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Functions ({} total)", self.total.to_string().bold())?;
        writeln!(w)?;
        for f in &self.functions {
            writeln!(w, "{}", f.signature().bold())?;
            if !f.description.is_empty() {
                writeln!(w, "    {}", f.description)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> FunctionEntry {
        FunctionEntry::from(
            &FunctionDescriptor::new("to_long", ValueType::Long)
                .param(ParameterDescriptor::any("value"))
                .param(ParameterDescriptor::long("default").with_default(0i64))
                .pure()
                .description("Converts a value to a long"),
        )
    }

    #[test]
    fn test_signature_shows_optional_and_default() {
        assert_eq!(
            entry().signature(),
            "to_long(value: any, default?: long = 0) -> long"
        );
    }

    #[test]
    fn test_functions_report_render_text() {
        colored::control::set_override(false);
        let report = FunctionsReport {
            total: 1,
            functions: vec![entry()],
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Functions (1 total)"));
        assert!(output.contains("Converts a value to a long"));
    }

    #[test]
    fn test_function_entry_json() {
        let json = serde_json::to_value(entry()).expect("json");
        assert_eq!(json["name"], "to_long");
        assert_eq!(json["pure"], true);
        assert_eq!(json["params"][1]["type"], serde_json::to_value(ValueType::Long).unwrap());
        assert!(json["params"][0].get("default").is_none());
    }
}
