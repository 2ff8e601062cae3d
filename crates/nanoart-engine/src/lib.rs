mod config;
mod dryrun;
mod editor;
mod gemini;
mod generator;
mod service;
mod studio;
#[cfg(test)]
mod test_support;

pub use config::{parse_dotenv, StudioConfig, DEFAULT_GEMINI_API_BASE};
pub use dryrun::DryrunImageService;
pub use editor::{EditPhase, EditWorkflow, IngestOrigin, EDIT_FALLBACK_ERROR};
pub use gemini::GeminiImageService;
pub use generator::{GenerationPhase, GenerationWorkflow, Progress, GENERATION_FALLBACK_ERROR};
pub use service::{build_image_service, ImageService, ServiceError};
pub use studio::{image_fingerprint, IngestOutcome, Studio, StudioMode};

use nanoart_contracts::requests::ValidationError;

/// Result of one submit on a workflow controller. Service failures end up
/// here as display text; they never escape as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Inputs were incomplete; nothing was sent.
    Rejected(ValidationError),
    Completed {
        added: Vec<String>,
    },
    Failed {
        added: Vec<String>,
        message: String,
    },
}

impl SubmitOutcome {
    /// Ids of the records this submit prepended, oldest first.
    pub fn added(&self) -> &[String] {
        match self {
            SubmitOutcome::Rejected(_) => &[],
            SubmitOutcome::Completed { added } | SubmitOutcome::Failed { added, .. } => added,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub(crate) fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
