//! `sluice simulate` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use sluice_core::config::SluiceConfig;
use sluice_core::store::TraceSink;
use sluice_core::types::{Message, TraceEntry};
use sluice_interpreter::{InterpreterError, RuleParser, SimulationResult, Simulator};

use super::check::FailureEntry;
use crate::cli::SimulateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::trace_sink::JsonLinesTraceSink;

/// Execute the `simulate` command.
pub async fn execute(
    args: SimulateArgs,
    config: &SluiceConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let rule_source = tokio::fs::read_to_string(&args.rule_file).await?;
    let message_json = match args.message.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => args.message,
    };
    let message =
        Message::from_json(&message_json).map_err(|e| CliError::Input(e.to_string()))?;
    let message_id = message.id().to_owned();

    info!(rule = %args.rule_file.display(), message_id = %message_id, "simulating rule");

    let simulator = Simulator::new(RuleParser::new(super::registry()?))
        .record_processing_errors(config.interpreter.record_processing_errors);

    let result = match simulator.simulate(&rule_source, message) {
        Ok(result) => result,
        Err(InterpreterError::Compile { source_id, errors }) => {
            let report = CompileFailureReport {
                failure: FailureEntry {
                    kind: "rule".to_owned(),
                    source_id: args.rule_file.display().to_string(),
                    errors,
                },
            };
            tracing::debug!(source_id = %source_id, "simulated rule failed to compile");
            writer.render(&report)?;
            return Err(CliError::Compile { failed: 1 });
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &args.trace_out {
        JsonLinesTraceSink::new(path).persist(&message_id, &result.trace)?;
    }

    writer.render(&SimulationReport::from(result))?;
    Ok(())
}

#[derive(Serialize)]
pub struct SimulationReport {
    pub rule_satisfied: bool,
    pub took_us: u64,
    pub messages: Vec<serde_json::Value>,
    pub dropped: Vec<String>,
    pub trace: Vec<TraceEntry>,
}

impl From<SimulationResult> for SimulationReport {
    fn from(result: SimulationResult) -> Self {
        Self {
            rule_satisfied: result.rule_satisfied(),
            took_us: result.took_us,
            messages: result.messages.iter().map(Message::to_json).collect(),
            dropped: result.dropped,
            trace: result.trace,
        }
    }
}

impl Render for SimulationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let verdict = if self.rule_satisfied {
            "SATISFIED".green().bold()
        } else {
            "NOT SATISFIED".yellow().bold()
        };
        writeln!(w, "Rule: {verdict} (took {}us)", self.took_us)?;

        writeln!(w)?;
        writeln!(w, "Trace:")?;
        for entry in &self.trace {
            writeln!(w, "  {entry}")?;
        }

        writeln!(w)?;
        writeln!(w, "Messages ({}):", self.messages.len())?;
        for message in &self.messages {
            let text = serde_json::to_string_pretty(message).map_err(std::io::Error::other)?;
            writeln!(w, "{text}")?;
        }
        for id in &self.dropped {
            writeln!(w, "  {} {id}", "dropped".red())?;
        }
        Ok(())
    }
}

/// Compile errors of the simulated rule.
#[derive(Serialize)]
pub struct CompileFailureReport {
    #[serde(flatten)]
    pub failure: FailureEntry,
}

impl Render for CompileFailureReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule: {}", "COMPILE FAILED".red().bold())?;
        self.failure.render_text(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(satisfied: bool) -> SimulationReport {
        SimulationReport {
            rule_satisfied: satisfied,
            took_us: 42,
            messages: vec![serde_json::json!({"_id": "m1", "checked": "yes"})],
            dropped: Vec::new(),
            trace: vec![TraceEntry {
                elapsed_us: 3,
                message: "Evaluation satisfied Rule 'check'".to_owned(),
            }],
        }
    }

    #[test]
    fn test_simulation_report_render_text() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report(true).render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");

        assert!(output.contains("Rule: SATISFIED (took 42us)"));
        assert!(output.contains("Evaluation satisfied Rule 'check'"));
        assert!(output.contains("\"checked\": \"yes\""));
    }

    #[test]
    fn test_simulation_report_not_satisfied() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report(false).render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("NOT SATISFIED"));
    }

    #[test]
    fn test_simulation_report_json() {
        let json = serde_json::to_value(report(true)).expect("json");
        assert_eq!(json["rule_satisfied"], true);
        assert_eq!(json["messages"][0]["_id"], "m1");
        assert_eq!(json["trace"][0]["elapsed_us"], 3);
    }
}
