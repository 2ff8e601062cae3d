use std::fmt;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_MIME: &str = "image/png";
pub const IMAGE_MIME_PREFIX: &str = "image/";

/// Inline image payload: MIME type plus base64 body.
///
/// Renders as a self-describing data URI (`data:<mime>;base64,<payload>`),
/// which is what the gallery stores and what a front end displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub mime_type: String,
    pub base64: String,
}

impl ImageData {
    pub fn new(mime_type: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64: base64.into(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, BASE64.encode(bytes))
    }

    pub fn to_data_uri(&self) -> String {
        self.to_string()
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.base64.as_bytes())
            .context("image base64 decode failed")
    }

    pub fn file_extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

impl fmt::Display for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Returns the transport payload of a data URI: everything after the first
/// comma. Input without an envelope is returned unchanged.
pub fn strip_transport_envelope(raw: &str) -> &str {
    match raw.split_once(',') {
        Some((_, payload)) => payload,
        None => raw,
    }
}

/// Case-sensitive prefix match on the declared type, as browsers report it.
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with(IMAGE_MIME_PREFIX)
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/heic" => "heic",
        "image/heif" => "heif",
        _ => "png",
    }
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.trim().to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "application/octet-stream",
    }
}
