// Pipeline progress tracing
// Append-only JSONL log of stage progress for one or more chart requests

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::stage::Stage;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A single progress entry of one generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// RFC 3339 timestamp of when this entry was created
    pub timestamp: String,

    /// Stage name (e.g. "grid_build", "arrow_selection")
    pub stage: String,

    /// Request label, typically the difficulty name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,

    /// Pipeline progress [0.0, 1.0]
    pub progress: f32,

    pub message: String,

    /// Structured counts for the stage (cells, steps, holds...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(stage: Stage, progress: f32, message: String) -> Self {
        TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            stage: stage.as_str().to_string(),
            request: None,
            progress: progress.clamp(0.0, 1.0),
            message,
            data: None,
        }
    }

    /// Tag the entry with the request it belongs to
    pub fn for_request(mut self, label: impl Into<String>) -> Self {
        self.request = Some(label.into());
        self
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Appends trace entries to a JSONL file, creating it on first write
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        self.write_batch(std::slice::from_ref(entry))
    }

    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        for entry in entries {
            let json_line = entry.to_json_line()?;
            file.write_all(json_line.as_bytes())?;
        }

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Helper builder for stage entries
pub struct TraceBuilder {
    stage: Stage,
}

impl TraceBuilder {
    pub fn stage(stage: Stage) -> Self {
        TraceBuilder { stage }
    }

    pub fn progress(self, progress: f32, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.stage, progress, message.into())
    }

    pub fn with_data(
        self,
        progress: f32,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> TraceEntry {
        let mut entry = TraceEntry::new(self.stage, progress, message.into());
        entry.data = Some(data);
        entry
    }
}

/// Read trace entries from a JSONL file, skipping blank lines
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_progress_clamping() {
        let low = TraceEntry::new(Stage::GridBuild, -0.5, "x".to_string());
        assert_eq!(low.progress, 0.0);

        let high = TraceEntry::new(Stage::GridBuild, 1.5, "x".to_string());
        assert_eq!(high.progress, 1.0);
    }

    #[test]
    fn test_builder_with_data() {
        let entry = TraceBuilder::stage(Stage::DensitySchedule).with_data(
            0.6,
            "complete",
            serde_json::json!({"placed": 120}),
        );

        assert_eq!(entry.stage, "density_schedule");
        assert_eq!(entry.data.unwrap()["placed"], 120);
    }

    #[test]
    fn test_request_label_round_trips() {
        let entry = TraceBuilder::stage(Stage::Assembly)
            .progress(0.0, "begin")
            .for_request("expert");
        let line = entry.to_json_line().unwrap();
        assert!(line.ends_with('\n'));

        let parsed: TraceEntry = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed.request.as_deref(), Some("expert"));
    }

    #[test]
    fn test_untagged_entry_omits_optional_fields() {
        let entry = TraceBuilder::stage(Stage::Validation).progress(0.0, "begin");
        let line = entry.to_json_line().unwrap();
        assert!(!line.contains("request"));
        assert!(!line.contains("data"));
    }

    #[test]
    fn test_writer_appends_across_calls() {
        let temp_dir = TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("trace.jsonl");
        let writer = TraceWriter::new(trace_path.clone());

        writer
            .write(&TraceBuilder::stage(Stage::Validation).progress(0.0, "begin"))
            .unwrap();
        writer
            .write_batch(&[
                TraceBuilder::stage(Stage::GridBuild).progress(0.5, "grid"),
                TraceBuilder::stage(Stage::Assembly).progress(1.0, "done"),
            ])
            .unwrap();

        let entries = read_trace_file(&trace_path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].stage, "validation");
        assert_eq!(entries[2].progress, 1.0);
        assert_eq!(writer.path(), trace_path.as_path());
    }
}
