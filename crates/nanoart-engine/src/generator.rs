use nanoart_contracts::gallery::{Gallery, GeneratedImageRecord};
use nanoart_contracts::requests::{AspectRatio, GenerationRequest, ImageCount, ValidationError};

use crate::service::ImageService;
use crate::{timestamp_millis, SubmitOutcome};

pub const GENERATION_FALLBACK_ERROR: &str = "An unknown error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPhase {
    #[default]
    Idle,
    Generating,
}

/// "Generating image `current` of `total`". Both zero while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub current: u8,
    pub total: u8,
}

/// Text-to-image controller: owns prompt, aspect ratio and count, and runs
/// the sequential generate loop.
#[derive(Debug, Clone, Default)]
pub struct GenerationWorkflow {
    prompt: String,
    aspect_ratio: AspectRatio,
    count: ImageCount,
    phase: GenerationPhase,
    progress: Progress,
    error: Option<String>,
}

impl GenerationWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn count(&self) -> ImageCount {
        self.count
    }

    pub fn set_count(&mut self, count: ImageCount) {
        self.count = count;
    }

    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn can_submit(&self) -> bool {
        self.phase == GenerationPhase::Idle && !self.prompt.trim().is_empty()
    }

    pub fn request(&self) -> Result<GenerationRequest, ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        Ok(GenerationRequest {
            prompt: self.prompt.clone(),
            aspect_ratio: self.aspect_ratio,
            count: self.count,
        })
    }

    /// Runs `count` generate calls one after another.
    ///
    /// Progress `(i, count)` is reported before call `i`. Each image is
    /// prepended as soon as it arrives. The first failure stops the loop;
    /// records added before it stay in the gallery.
    pub fn submit<F>(
        &mut self,
        service: &dyn ImageService,
        gallery: &mut Gallery,
        mut on_progress: F,
    ) -> SubmitOutcome
    where
        F: FnMut(Progress),
    {
        let request = match self.request() {
            Ok(request) => request,
            Err(err) => return SubmitOutcome::Rejected(err),
        };

        let total = request.count.get();
        self.phase = GenerationPhase::Generating;
        self.error = None;
        self.progress = Progress { current: 0, total };

        let mut added = Vec::new();
        let mut last_created_at = i64::MIN;
        let mut failure = None;

        for current in 1..=total {
            self.progress = Progress { current, total };
            on_progress(self.progress);

            match service.generate(&request.prompt, request.aspect_ratio) {
                Ok(image_data) => {
                    let created_at = timestamp_millis().max(last_created_at);
                    last_created_at = created_at;
                    let record =
                        GeneratedImageRecord::new(image_data, request.prompt.clone(), created_at);
                    added.push(record.id().to_string());
                    gallery.prepend(record);
                }
                Err(err) => {
                    failure = Some(err.display_message(GENERATION_FALLBACK_ERROR));
                    break;
                }
            }
        }

        self.phase = GenerationPhase::Idle;
        self.progress = Progress::default();
        match failure {
            Some(message) => {
                self.error = Some(message.clone());
                SubmitOutcome::Failed { added, message }
            }
            None => SubmitOutcome::Completed { added },
        }
    }
}
