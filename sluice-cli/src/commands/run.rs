//! `sluice run` command handler

use std::io::Write;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use sluice_core::config::SluiceConfig;
use sluice_core::types::Message;
use sluice_interpreter::StageOutcome;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
///
/// Sources that fail to compile are reported as warnings and left out;
/// the remaining pipelines still process the input.
pub async fn execute(
    args: RunArgs,
    config: &SluiceConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (interpreter, store) = super::interpreter(config, args.dir)?;
    let failures = interpreter.reload_from_store(&store).await?;
    for failure in &failures {
        warn!(
            kind = %failure.kind,
            source_id = %failure.source_id,
            errors = failure.errors.len(),
            "source rejected, continuing without it"
        );
    }

    let messages = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            read_messages(BufReader::new(file)).await?
        }
        None => read_messages(BufReader::new(tokio::io::stdin())).await?,
    };
    let received = messages.len();

    let result = interpreter.process(messages);
    info!(
        received,
        delivered = result.messages.len(),
        dropped = result.dropped.len(),
        "processed input"
    );

    let report = RunReport {
        received,
        messages: result.messages.iter().map(Message::to_json).collect(),
        dropped: result.dropped,
        stages: if args.stages { result.stages } else { Vec::new() },
    };
    writer.render(&report)?;
    Ok(())
}

/// Read one JSON message per line. Blank lines are skipped.
pub async fn read_messages<R>(reader: R) -> Result<Vec<Message>, CliError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut messages = Vec::new();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let message = Message::from_json(&line)
            .map_err(|e| CliError::Input(format!("line {line_no}: {e}")))?;
        messages.push(message);
    }
    Ok(messages)
}

#[derive(Serialize)]
pub struct RunReport {
    pub received: usize,
    pub messages: Vec<serde_json::Value>,
    pub dropped: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageOutcome>,
}

impl Render for RunReport {
    /// One compact JSON object per delivered message, then stage outcomes if requested.
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for message in &self.messages {
            let line = serde_json::to_string(message).map_err(std::io::Error::other)?;
            writeln!(w, "{line}")?;
        }
        for stage in &self.stages {
            writeln!(
                w,
                "# {} stage {} of '{}' ({}): {}/{} satisfied, {}",
                stage.message_id,
                stage.ordinal,
                stage.pipeline,
                stage.pipeline_id,
                stage.satisfied,
                stage.total,
                if stage.matched { "continued" } else { "stopped" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_messages_skips_blank_lines() {
        let input = "{\"_id\":\"a\",\"x\":1}\n\n   \n{\"_id\":\"b\"}\n";
        let messages = read_messages(BufReader::new(input.as_bytes()))
            .await
            .expect("valid input");
        let ids: Vec<&str> = messages.iter().map(Message::id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_read_messages_reports_line_number() {
        let input = "{\"_id\":\"a\"}\n[1, 2]\n";
        let err = read_messages(BufReader::new(input.as_bytes()))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_run_report_text_is_json_lines() {
        let report = RunReport {
            received: 2,
            messages: vec![
                serde_json::json!({"_id": "a", "checked": "yes"}),
                serde_json::json!({"_id": "b"}),
            ],
            dropped: vec!["c".to_owned()],
            stages: Vec::new(),
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json line");
        assert_eq!(first["checked"], "yes");
    }
}
