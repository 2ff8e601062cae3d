use std::fmt;

use anyhow::{bail, Result};
use nanoart_contracts::image_data::ImageData;
use nanoart_contracts::models::ModelSpec;
use nanoart_contracts::requests::{AspectRatio, EditRequest};

use crate::config::StudioConfig;
use crate::dryrun::DryrunImageService;
use crate::gemini::GeminiImageService;

const ERROR_MESSAGE_MAX_CHARS: usize = 600;

/// A single request/response exchange with the image backend.
///
/// One call produces exactly one image. Implementations do not retry; the
/// first failure goes straight back to the caller.
pub trait ImageService: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<ImageData, ServiceError>;
    fn edit(&self, request: &EditRequest) -> Result<ImageData, ServiceError>;
}

/// Failure from the image backend. Transport, auth, quota and server-side
/// errors all collapse into this; the only distinction kept is whether a
/// human-readable message exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    message: Option<String>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let trimmed = message.trim();
        Self {
            message: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }

    pub fn unknown() -> Self {
        Self { message: None }
    }

    pub fn from_anyhow(err: anyhow::Error) -> Self {
        Self::new(error_chain_text(&err, ERROR_MESSAGE_MAX_CHARS))
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Text for the error banner: the message, or `fallback` when the
    /// failure carried none.
    pub fn display_message(&self, fallback: &str) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message.as_deref() {
            Some(message) => f.write_str(message),
            None => f.write_str("image service failed without a message"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

pub fn build_image_service(
    model: &ModelSpec,
    config: &StudioConfig,
) -> Result<Box<dyn ImageService>> {
    match model.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiImageService::new(config, &model.name)?)),
        "dryrun" => Ok(Box::new(DryrunImageService::new(&model.name))),
        other => bail!("no image service for provider '{other}'"),
    }
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Context};

    use super::*;

    #[test]
    fn blank_message_normalizes_to_none() {
        assert_eq!(ServiceError::new("   ").message(), None);
        assert_eq!(ServiceError::new(" quota ").message(), Some("quota"));
    }

    #[test]
    fn display_message_uses_fallback_only_without_message() {
        assert_eq!(
            ServiceError::unknown().display_message("An unknown error occurred"),
            "An unknown error occurred"
        );
        assert_eq!(
            ServiceError::new("403 forbidden").display_message("An unknown error occurred"),
            "403 forbidden"
        );
    }

    #[test]
    fn anyhow_chain_is_joined_once() {
        let err: anyhow::Result<()> = Err(anyhow!("connection reset"));
        let err = err.context("Gemini request failed").err().unwrap_or_else(|| anyhow!(""));
        let service_err = ServiceError::from(err);
        assert_eq!(
            service_err.message(),
            Some("Gemini request failed | caused by: connection reset")
        );
    }

    #[test]
    fn empty_anyhow_error_has_no_message() {
        assert_eq!(ServiceError::from_anyhow(anyhow!("")).message(), None);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let model = ModelSpec {
            name: "x".to_string(),
            provider: "nowhere".to_string(),
            label: "x".to_string(),
        };
        let err = build_image_service(&model, &StudioConfig::default()).err();
        assert_eq!(
            err.map(|e| e.to_string()).as_deref(),
            Some("no image service for provider 'nowhere'")
        );
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
