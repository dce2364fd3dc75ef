//! `sluice check` command handler

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use sluice_core::config::SluiceConfig;
use sluice_interpreter::{CompileFailure, ParseError};

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `check` command.
///
/// Compiles every source in the directory and fails with exit code 3
/// when any of them is rejected.
pub async fn execute(
    args: CheckArgs,
    config: &SluiceConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (interpreter, store) = super::interpreter(config, args.dir)?;
    info!(dir = %store.dir().display(), "checking sources");

    let failures = interpreter.reload_from_store(&store).await?;
    let state = interpreter.state();

    let report = CheckReport {
        source_dir: store.dir().to_path_buf(),
        pipelines: state.pipeline_count(),
        rules: state.rule_count(),
        streams: state
            .connected_streams()
            .into_iter()
            .map(str::to_owned)
            .collect(),
        failures: failures.into_iter().map(FailureEntry::from).collect(),
    };
    writer.render(&report)?;

    if report.failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::Compile {
            failed: report.failures.len(),
        })
    }
}

#[derive(Serialize)]
pub struct CheckReport {
    pub source_dir: PathBuf,
    pub pipelines: usize,
    pub rules: usize,
    pub streams: Vec<String>,
    pub failures: Vec<FailureEntry>,
}

/// A rejected source and its positioned errors.
#[derive(Serialize)]
pub struct FailureEntry {
    pub kind: String,
    pub source_id: String,
    pub errors: Vec<ParseError>,
}

impl From<CompileFailure> for FailureEntry {
    fn from(failure: CompileFailure) -> Self {
        Self {
            kind: failure.kind.to_string(),
            source_id: failure.source_id,
            errors: failure.errors,
        }
    }
}

impl FailureEntry {
    pub fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "  {} {}", self.kind, self.source_id.red().bold())?;
        for e in &self.errors {
            writeln!(
                w,
                "    {}:{} {} {}",
                e.line,
                e.position_in_line,
                e.kind.to_string().yellow(),
                e.reason
            )?;
        }
        Ok(())
    }
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Source Check: {}", self.source_dir.display().to_string().bold())?;
        writeln!(
            w,
            "  Compiled: {} pipeline(s), {} rule(s)",
            self.pipelines.to_string().green(),
            self.rules.to_string().green()
        )?;
        if !self.streams.is_empty() {
            writeln!(w, "  Streams: {}", self.streams.join(", "))?;
        }

        if self.failures.is_empty() {
            writeln!(w, "  Result: {}", "OK".green().bold())?;
        } else {
            writeln!(
                w,
                "  Result: {} ({} source(s) rejected)",
                "FAILED".red().bold(),
                self.failures.len()
            )?;
            writeln!(w)?;
            for failure in &self.failures {
                failure.render_text(w)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_interpreter::ParseErrorKind;

    fn failure() -> FailureEntry {
        FailureEntry {
            kind: "rule".to_owned(),
            source_id: "broken".to_owned(),
            errors: vec![ParseError {
                kind: ParseErrorKind::UndeclaredFunction,
                line: 2,
                position_in_line: 5,
                reason: "unknown function 'nope'".to_owned(),
            }],
        }
    }

    #[test]
    fn test_check_report_render_text_with_failures() {
        colored::control::set_override(false);
        let report = CheckReport {
            source_dir: PathBuf::from("/srv/pipelines"),
            pipelines: 1,
            rules: 2,
            streams: vec!["default".to_owned()],
            failures: vec![failure()],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");

        assert!(output.contains("/srv/pipelines"));
        assert!(output.contains("1 pipeline(s), 2 rule(s)"));
        assert!(output.contains("FAILED"));
        assert!(output.contains("2:5 UndeclaredFunction unknown function 'nope'"));
    }

    #[test]
    fn test_check_report_json_contains_error_positions() {
        let report = CheckReport {
            source_dir: PathBuf::from("/srv"),
            pipelines: 0,
            rules: 0,
            streams: Vec::new(),
            failures: vec![failure()],
        };
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["failures"][0]["source_id"], "broken");
        assert_eq!(json["failures"][0]["errors"][0]["type"], "UndeclaredFunction");
        assert_eq!(json["failures"][0]["errors"][0]["line"], 2);
    }
}
