//! JSON-lines trace sink
//!
//! Appends one JSON object per trace entry:
//! `{"message_id": "...", "elapsed_us": 12, "message": "..."}`.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use sluice_core::error::SluiceError;
use sluice_core::store::TraceSink;
use sluice_core::types::TraceEntry;

/// File-backed [`TraceSink`] writing JSON lines.
#[derive(Debug, Clone)]
pub struct JsonLinesTraceSink {
    path: PathBuf,
}

#[derive(Serialize)]
struct TraceLine<'a> {
    message_id: &'a str,
    elapsed_us: u64,
    message: &'a str,
}

impl JsonLinesTraceSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for JsonLinesTraceSink {
    fn persist(&self, message_id: &str, entries: &[TraceEntry]) -> Result<(), SluiceError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for entry in entries {
            let line = TraceLine {
                message_id,
                elapsed_us: entry.elapsed_us,
                message: &entry.message,
            };
            serde_json::to_writer(&mut writer, &line).map_err(std::io::Error::other)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        tracing::debug!(
            path = %self.path.display(),
            message_id,
            entries = entries.len(),
            "persisted trace"
        );
        Ok(())
    }
}
