use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::image_data::ImageData;

pub const EDIT_PROMPT_PREFIX: &str = "Edit: ";
pub const DOWNLOAD_FILE_PREFIX: &str = "nanoart-";

/// One produced image and the instruction that produced it. Immutable once
/// built; the gallery only ever inserts or removes whole records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImageRecord {
    id: String,
    image_data: ImageData,
    source_prompt: String,
    created_at: i64,
}

impl GeneratedImageRecord {
    pub fn new(image_data: ImageData, source_prompt: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            image_data,
            source_prompt: source_prompt.into(),
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image_data(&self) -> &ImageData {
        &self.image_data
    }

    pub fn source_prompt(&self) -> &str {
        &self.source_prompt
    }

    /// Milliseconds since the Unix epoch.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn download_file_name(&self) -> String {
        format!(
            "{DOWNLOAD_FILE_PREFIX}{}.{}",
            self.id,
            self.image_data.file_extension()
        )
    }
}

pub fn edit_source_prompt(prompt: &str) -> String {
    format!("{EDIT_PROMPT_PREFIX}{prompt}")
}

/// Session gallery, newest first. Display order is insertion order and is
/// independent of `created_at`.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    records: VecDeque<GeneratedImageRecord>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(&mut self, record: GeneratedImageRecord) {
        self.records.push_front(record);
    }

    pub fn remove_by_id(&mut self, id: &str) -> Option<GeneratedImageRecord> {
        let idx = self.records.iter().position(|record| record.id == id)?;
        self.records.remove(idx)
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedImageRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedImageRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Writes the record's decoded bytes to `dir/nanoart-<id>.<ext>`.
pub fn download_record(record: &GeneratedImageRecord, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let bytes = record.image_data.decode()?;
    let path = dir.join(record.download_file_name());
    std::fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
