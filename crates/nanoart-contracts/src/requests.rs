use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::image_data::{is_image_mime, mime_for_extension, strip_transport_envelope, ImageData};

pub const MIN_IMAGE_COUNT: u8 = 1;
pub const MAX_IMAGE_COUNT: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    Vertical,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Standard,
        AspectRatio::Vertical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Standard => "4:3",
            AspectRatio::Vertical => "3:4",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "Square (1:1)",
            AspectRatio::Landscape => "Landscape (16:9)",
            AspectRatio::Portrait => "Portrait (9:16)",
            AspectRatio::Standard => "Standard (4:3)",
            AspectRatio::Vertical => "Vertical (3:4)",
        }
    }

    /// Width and height terms of the ratio.
    pub fn terms(self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Landscape => (16, 9),
            AspectRatio::Portrait => (9, 16),
            AspectRatio::Standard => (4, 3),
            AspectRatio::Vertical => (3, 4),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        let ratio = match normalized.as_str() {
            "1:1" | "square" => AspectRatio::Square,
            "16:9" | "landscape" | "wide" => AspectRatio::Landscape,
            "9:16" | "portrait" | "tall" => AspectRatio::Portrait,
            "4:3" | "standard" => AspectRatio::Standard,
            "3:4" | "vertical" => AspectRatio::Vertical,
            _ => bail!(
                "unsupported aspect ratio '{}' (expected one of {})",
                raw.trim(),
                AspectRatio::ALL.map(AspectRatio::as_str).join(", ")
            ),
        };
        Ok(ratio)
    }
}

/// Number of images requested in one generation run, 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageCount(u8);

impl ImageCount {
    pub fn new(value: u8) -> Result<Self> {
        if !(MIN_IMAGE_COUNT..=MAX_IMAGE_COUNT).contains(&value) {
            bail!("image count must be between {MIN_IMAGE_COUNT} and {MAX_IMAGE_COUNT}, got {value}");
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for ImageCount {
    fn default() -> Self {
        Self(MIN_IMAGE_COUNT)
    }
}

impl fmt::Display for ImageCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub count: ImageCount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub prompt: String,
    /// Base64 body with any data-URI envelope already removed.
    pub source_image_base64: String,
    pub source_mime_type: String,
}

impl EditRequest {
    pub fn from_source(prompt: impl Into<String>, source: &SourceImage) -> Self {
        let data_uri = source.preview.to_data_uri();
        Self {
            prompt: prompt.into(),
            source_image_base64: strip_transport_envelope(&data_uri).to_string(),
            source_mime_type: source.mime_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyPrompt,
    MissingSourceImage,
    NotAnImage { mime_type: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyPrompt => f.write_str("Please enter a prompt."),
            ValidationError::MissingSourceImage => f.write_str("Please upload an image to edit."),
            ValidationError::NotAnImage { .. } => f.write_str("Please upload a valid image file."),
        }
    }
}

impl std::error::Error for ValidationError {}

/// A file handed to the editor, by selection or drag-and-drop, before
/// validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: Option<String>,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Reads a file from disk; the declared media type comes from the
    /// extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(mime_for_extension)
            .unwrap_or("application/octet-stream");
        Ok(Self {
            name: path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string),
            mime_type: mime_type.to_string(),
            bytes,
        })
    }
}

/// An accepted source image: preview payload plus the declared MIME type kept
/// separately for the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub preview: ImageData,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl SourceImage {
    pub fn ingest(file: SourceFile) -> std::result::Result<Self, ValidationError> {
        if !is_image_mime(&file.mime_type) {
            return Err(ValidationError::NotAnImage {
                mime_type: file.mime_type,
            });
        }
        Ok(Self {
            preview: ImageData::from_bytes(file.mime_type.clone(), &file.bytes),
            mime_type: file.mime_type,
            file_name: file.name,
        })
    }
}
