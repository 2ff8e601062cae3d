use nanoart_contracts::gallery::{edit_source_prompt, Gallery, GeneratedImageRecord};
use nanoart_contracts::requests::{EditRequest, SourceFile, SourceImage, ValidationError};

use crate::service::ImageService;
use crate::{timestamp_millis, SubmitOutcome};

pub const EDIT_FALLBACK_ERROR: &str = "An unknown error occurred during editing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditPhase {
    #[default]
    Idle,
    Editing,
}

/// How a source file reached the editor. Both paths validate the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOrigin {
    Selected,
    Dropped,
}

impl IngestOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestOrigin::Selected => "selected",
            IngestOrigin::Dropped => "dropped",
        }
    }
}

/// Edit-by-instruction controller: owns the instruction prompt and the
/// ingested source image, and runs a single edit call per submit.
#[derive(Debug, Clone, Default)]
pub struct EditWorkflow {
    prompt: String,
    source: Option<SourceImage>,
    phase: EditPhase,
    error: Option<String>,
}

impl EditWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn can_submit(&self) -> bool {
        self.phase == EditPhase::Idle && !self.prompt.trim().is_empty() && self.source.is_some()
    }

    /// Accepts an `image/*` file as the new source. A rejected file sets the
    /// display error and leaves any current source in place.
    pub fn ingest(&mut self, file: SourceFile) -> Result<&SourceImage, ValidationError> {
        match SourceImage::ingest(file) {
            Ok(source) => {
                self.error = None;
                Ok(&*self.source.insert(source))
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn clear_source(&mut self) {
        self.source = None;
    }

    /// A source image is checked before the prompt.
    pub fn request(&self) -> Result<EditRequest, ValidationError> {
        let Some(source) = self.source.as_ref() else {
            return Err(ValidationError::MissingSourceImage);
        };
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        Ok(EditRequest::from_source(self.prompt.clone(), source))
    }

    /// Issues exactly one edit call. On success one record, with the prompt
    /// marked as an edit, is prepended; on failure nothing is committed.
    pub fn submit(&mut self, service: &dyn ImageService, gallery: &mut Gallery) -> SubmitOutcome {
        let request = match self.request() {
            Ok(request) => request,
            Err(err) => return SubmitOutcome::Rejected(err),
        };

        self.phase = EditPhase::Editing;
        self.error = None;

        let outcome = match service.edit(&request) {
            Ok(image_data) => {
                let record = GeneratedImageRecord::new(
                    image_data,
                    edit_source_prompt(&request.prompt),
                    timestamp_millis(),
                );
                let id = record.id().to_string();
                gallery.prepend(record);
                SubmitOutcome::Completed { added: vec![id] }
            }
            Err(err) => {
                let message = err.display_message(EDIT_FALLBACK_ERROR);
                self.error = Some(message.clone());
                SubmitOutcome::Failed {
                    added: Vec::new(),
                    message,
                }
            }
        };

        self.phase = EditPhase::Idle;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceError;
    use crate::test_support::{image, Call, ScriptedImageService};

    fn png_file(bytes: &[u8]) -> SourceFile {
        SourceFile {
            name: Some("photo.png".to_string()),
            mime_type: "image/png".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    fn pdf_file() -> SourceFile {
        SourceFile {
            name: Some("doc.pdf".to_string()),
            mime_type: "application/pdf".to_string(),
            bytes: b"%PDF".to_vec(),
        }
    }

    #[test]
    fn ingest_builds_data_uri_preview_and_keeps_mime() {
        let mut workflow = EditWorkflow::new();
        let source = workflow.ingest(png_file(b"ABC")).cloned();

        let source = source.expect("png accepted");
        assert_eq!(source.preview.to_data_uri(), "data:image/png;base64,QUJD");
        assert_eq!(source.mime_type, "image/png");
        assert!(workflow.error().is_none());
    }

    #[test]
    fn rejected_file_sets_error_and_keeps_previous_source() {
        let mut workflow = EditWorkflow::new();
        workflow.ingest(png_file(b"ABC")).expect("png accepted");
        let before = workflow.source().cloned();

        let result = workflow.ingest(pdf_file());

        assert!(matches!(result, Err(ValidationError::NotAnImage { .. })));
        assert_eq!(workflow.error(), Some("Please upload a valid image file."));
        assert_eq!(workflow.source().cloned(), before);
    }

    #[test]
    fn accepted_file_clears_validation_error() {
        let mut workflow = EditWorkflow::new();
        let _ = workflow.ingest(pdf_file());
        assert!(workflow.error().is_some());

        workflow.ingest(png_file(b"x")).expect("png accepted");
        assert!(workflow.error().is_none());
    }

    #[test]
    fn clear_removes_source() {
        let mut workflow = EditWorkflow::new();
        workflow.ingest(png_file(b"x")).expect("png accepted");
        workflow.clear_source();
        assert!(workflow.source().is_none());
    }

    #[test]
    fn submit_requires_prompt_and_source() {
        let service = ScriptedImageService::succeeding();
        let mut gallery = Gallery::new();

        let mut no_source = EditWorkflow::new();
        no_source.set_prompt("add a hat");
        assert_eq!(
            no_source.submit(&service, &mut gallery),
            SubmitOutcome::Rejected(ValidationError::MissingSourceImage)
        );

        let mut blank_prompt = EditWorkflow::new();
        blank_prompt.set_prompt("   ");
        blank_prompt.ingest(png_file(b"x")).expect("png accepted");
        assert!(!blank_prompt.can_submit());
        assert_eq!(
            blank_prompt.submit(&service, &mut gallery),
            SubmitOutcome::Rejected(ValidationError::EmptyPrompt)
        );

        assert!(service.calls().is_empty());
        assert!(gallery.is_empty());
    }

    #[test]
    fn submit_sends_stripped_payload_and_prefixes_prompt() {
        let service = ScriptedImageService::new(vec![Ok(image(7))]);
        let mut gallery = Gallery::new();
        let mut workflow = EditWorkflow::new();
        workflow.ingest(png_file(b"ABC")).expect("png accepted");
        workflow.set_prompt("make it night");
        assert!(workflow.can_submit());

        let outcome = workflow.submit(&service, &mut gallery);

        assert_eq!(
            service.calls(),
            vec![Call::Edit(EditRequest {
                prompt: "make it night".to_string(),
                source_image_base64: "QUJD".to_string(),
                source_mime_type: "image/png".to_string(),
            })]
        );
        assert_eq!(outcome.added().len(), 1);
        assert_eq!(gallery.len(), 1);
        let record = gallery.iter().next().expect("record");
        assert_eq!(record.source_prompt(), "Edit: make it night");
        assert_eq!(record.image_data(), &image(7));
        assert_eq!(workflow.phase(), EditPhase::Idle);
        assert!(workflow.source().is_some());
    }

    #[test]
    fn failure_sets_error_and_commits_nothing() {
        let service = ScriptedImageService::new(vec![Err(ServiceError::new("safety block"))]);
        let mut gallery = Gallery::new();
        let mut workflow = EditWorkflow::new();
        workflow.ingest(png_file(b"ABC")).expect("png accepted");
        workflow.set_prompt("remove background");

        let outcome = workflow.submit(&service, &mut gallery);

        assert_eq!(outcome.error(), Some("safety block"));
        assert_eq!(workflow.error(), Some("safety block"));
        assert!(gallery.is_empty());
        assert_eq!(workflow.phase(), EditPhase::Idle);
    }

    #[test]
    fn failure_without_message_uses_edit_fallback() {
        let service = ScriptedImageService::new(vec![Err(ServiceError::unknown())]);
        let mut gallery = Gallery::new();
        let mut workflow = EditWorkflow::new();
        workflow.ingest(png_file(b"ABC")).expect("png accepted");
        workflow.set_prompt("sketch");

        let outcome = workflow.submit(&service, &mut gallery);

        assert_eq!(outcome.error(), Some(EDIT_FALLBACK_ERROR));
    }
}
