use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// Everything a studio session writes to its event log.
///
/// Records are referenced by id and content fingerprint; image payloads are
/// never part of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudioEvent {
    SessionStarted {
        model: String,
        provider: String,
        service: String,
        fallback_reason: Option<String>,
    },
    ModeChanged {
        from: &'static str,
        to: &'static str,
    },
    ImageModelChanged {
        model: String,
        provider: String,
        requested: Option<String>,
        fallback_reason: Option<String>,
    },
    GenerationStarted {
        prompt: String,
        aspect_ratio: &'static str,
        count: u8,
        model: String,
    },
    GenerationProgress {
        current: u8,
        total: u8,
    },
    GenerationFinished {
        added: usize,
    },
    GenerationFailed {
        added: usize,
        error: String,
    },
    ImageAdded {
        image_id: String,
        source_prompt: String,
        mime_type: String,
        created_at: i64,
        fingerprint: String,
        gallery_size: usize,
    },
    SourceIngested {
        origin: &'static str,
        file_name: Option<String>,
        mime_type: String,
        bytes: usize,
    },
    SourceRejected {
        origin: &'static str,
        file_name: Option<String>,
        mime_type: String,
        error: String,
    },
    SourceCleared {
        had_source: bool,
    },
    EditStarted {
        prompt: String,
        source_mime_type: String,
        model: String,
    },
    EditFinished {
        added: usize,
    },
    EditFailed {
        error: String,
    },
    ImageRemoved {
        image_id: String,
        found: bool,
        gallery_size: usize,
    },
    ImageDownloaded {
        image_id: String,
        path: String,
    },
}

/// Appends one JSON line per [`StudioEvent`], stamped with the session id
/// and an RFC 3339 timestamp. Clones share the same open file.
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventLog>,
}

#[derive(Debug)]
struct EventLog {
    path: PathBuf,
    session_id: String,
    file: Mutex<Option<File>>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventLog {
                path: path.into(),
                session_id: session_id.into(),
                file: Mutex::new(None),
            }),
        }
    }

    pub fn record(&self, event: &StudioEvent) -> Result<()> {
        let line = self.line_for(event)?;
        let mut slot = self
            .inner
            .file
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        if slot.is_none() {
            *slot = Some(self.open()?);
        }
        let Some(file) = slot.as_mut() else {
            bail!("event log {} is not open", self.inner.path.display());
        };
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.inner.path.display()))
    }

    fn line_for(&self, event: &StudioEvent) -> Result<String> {
        let mut row = serde_json::to_value(event)?;
        let Value::Object(fields) = &mut row else {
            bail!("studio event did not serialize to an object");
        };
        fields.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        fields.insert(
            "ts".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        Ok(serde_json::to_string(&row)?)
    }

    fn open(&self) -> Result<File> {
        let path = &self.inner.path;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open event log {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;

    use super::*;

    fn rows(path: &std::path::Path) -> Result<Vec<Value>> {
        let raw = fs::read_to_string(path)?;
        raw.lines()
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }

    #[test]
    fn record_writes_tagged_line_with_session_and_timestamp() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("logs").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-1");

        writer.record(&StudioEvent::GenerationProgress {
            current: 2,
            total: 3,
        })?;

        let rows = rows(&path)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["type"], "generation_progress");
        assert_eq!(rows[0]["session_id"], "session-1");
        assert_eq!(rows[0]["current"], 2);
        assert_eq!(rows[0]["total"], 3);
        DateTime::parse_from_rfc3339(rows[0]["ts"].as_str().unwrap_or(""))?;
        Ok(())
    }

    #[test]
    fn optional_fields_serialize_as_null() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "s");

        writer.record(&StudioEvent::SourceRejected {
            origin: "dropped",
            file_name: None,
            mime_type: "application/pdf".to_string(),
            error: "Please upload a valid image file.".to_string(),
        })?;

        let row = &rows(&path)?[0];
        assert_eq!(row["type"], "source_rejected");
        assert_eq!(row["origin"], "dropped");
        assert!(row["file_name"].is_null());
        Ok(())
    }

    #[test]
    fn clones_append_to_the_same_log() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "s");
        let shared = writer.clone();

        writer.record(&StudioEvent::SourceCleared { had_source: false })?;
        shared.record(&StudioEvent::EditFailed {
            error: "blocked".to_string(),
        })?;

        let types: Vec<Value> = rows(&path)?.into_iter().map(|row| row["type"].clone()).collect();
        assert_eq!(types, vec!["source_cleared", "edit_failed"]);
        Ok(())
    }

    #[test]
    fn unwritable_path_is_an_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let writer = EventWriter::new(temp.path(), "s");

        let err = writer.record(&StudioEvent::SourceCleared { had_source: true });

        assert!(err.is_err());
        Ok(())
    }
}
