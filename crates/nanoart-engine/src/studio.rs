use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Result};
use nanoart_contracts::events::{EventWriter, StudioEvent};
use nanoart_contracts::gallery::{download_record, Gallery, GeneratedImageRecord};
use nanoart_contracts::image_data::ImageData;
use nanoart_contracts::models::{ModelRegistry, ModelSelection, ModelSpec};
use nanoart_contracts::requests::{SourceFile, ValidationError};
use sha2::{Digest, Sha256};

use crate::config::StudioConfig;
use crate::editor::{EditWorkflow, IngestOrigin};
use crate::generator::{GenerationWorkflow, Progress};
use crate::service::{build_image_service, ImageService};
use crate::SubmitOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudioMode {
    #[default]
    Generate,
    Edit,
}

impl StudioMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StudioMode::Generate => "generate",
            StudioMode::Edit => "edit",
        }
    }
}

impl fmt::Display for StudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudioMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "generate" => Ok(StudioMode::Generate),
            "edit" => Ok(StudioMode::Edit),
            other => bail!("unknown mode '{other}' (expected generate or edit)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted,
    Rejected(ValidationError),
}

/// One running studio session.
///
/// Owns the gallery and both workflow controllers, and lends the gallery to
/// whichever controller is submitting. Nothing here outlives the instance.
///
/// Event-log write failures never interrupt the session; they queue up for
/// the front end to collect with [`Studio::take_log_failures`].
pub struct Studio {
    mode: StudioMode,
    gallery: Gallery,
    generator: GenerationWorkflow,
    editor: EditWorkflow,
    config: StudioConfig,
    models: ModelRegistry,
    model: ModelSpec,
    service: Box<dyn ImageService>,
    events: Option<EventWriter>,
    log_failures: Vec<anyhow::Error>,
}

impl Studio {
    pub fn new(config: StudioConfig, events: Option<EventWriter>) -> Result<Self> {
        let models = ModelRegistry::default();
        let selection = models.resolve(config.image_model.as_deref());
        let service = build_image_service(&selection.model, &config)?;
        let mut studio = Self::assemble(config, models, selection.model, service, events);
        studio.record_session_started(selection.fallback_reason);
        Ok(studio)
    }

    /// Builds a studio around an already constructed service.
    pub fn with_service(
        model: ModelSpec,
        service: Box<dyn ImageService>,
        events: Option<EventWriter>,
    ) -> Self {
        let mut studio = Self::assemble(
            StudioConfig::default(),
            ModelRegistry::default(),
            model,
            service,
            events,
        );
        studio.record_session_started(None);
        studio
    }

    fn assemble(
        config: StudioConfig,
        models: ModelRegistry,
        model: ModelSpec,
        service: Box<dyn ImageService>,
        events: Option<EventWriter>,
    ) -> Self {
        Self {
            mode: StudioMode::default(),
            gallery: Gallery::new(),
            generator: GenerationWorkflow::new(),
            editor: EditWorkflow::new(),
            config,
            models,
            model,
            service,
            events,
            log_failures: Vec::new(),
        }
    }

    fn record_session_started(&mut self, fallback_reason: Option<String>) {
        self.record(StudioEvent::SessionStarted {
            model: self.model.name.clone(),
            provider: self.model.provider.clone(),
            service: self.service.name().to_string(),
            fallback_reason,
        });
    }

    pub fn mode(&self) -> StudioMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: StudioMode) {
        if self.mode == mode {
            return;
        }
        let from = self.mode;
        self.mode = mode;
        self.record(StudioEvent::ModeChanged {
            from: from.as_str(),
            to: mode.as_str(),
        });
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn generator(&self) -> &GenerationWorkflow {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut GenerationWorkflow {
        &mut self.generator
    }

    pub fn editor(&self) -> &EditWorkflow {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut EditWorkflow {
        &mut self.editor
    }

    pub fn model(&self) -> &ModelSpec {
        &self.model
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Display error of the active mode's controller.
    pub fn error(&self) -> Option<&str> {
        match self.mode {
            StudioMode::Generate => self.generator.error(),
            StudioMode::Edit => self.editor.error(),
        }
    }

    pub fn can_submit(&self) -> bool {
        match self.mode {
            StudioMode::Generate => self.generator.can_submit(),
            StudioMode::Edit => self.editor.can_submit(),
        }
    }

    /// Event-log write errors since the last call, oldest first.
    pub fn take_log_failures(&mut self) -> Vec<anyhow::Error> {
        std::mem::take(&mut self.log_failures)
    }

    /// Swaps the backing service. On error the current model stays.
    pub fn set_image_model(&mut self, requested: &str) -> Result<ModelSelection> {
        let selection = self.models.resolve(Some(requested));
        self.service = build_image_service(&selection.model, &self.config)?;
        self.model = selection.model.clone();
        self.record(StudioEvent::ImageModelChanged {
            model: self.model.name.clone(),
            provider: self.model.provider.clone(),
            requested: selection.requested.clone(),
            fallback_reason: selection.fallback_reason.clone(),
        });
        Ok(selection)
    }

    /// Sets the active controller's prompt and submits it.
    pub fn submit_prompt<F>(&mut self, prompt: &str, on_progress: F) -> SubmitOutcome
    where
        F: FnMut(Progress),
    {
        match self.mode {
            StudioMode::Generate => {
                self.generator.set_prompt(prompt);
                self.submit_generation(on_progress)
            }
            StudioMode::Edit => {
                self.editor.set_prompt(prompt);
                self.submit_edit()
            }
        }
    }

    pub fn submit_generation<F>(&mut self, mut on_progress: F) -> SubmitOutcome
    where
        F: FnMut(Progress),
    {
        let request = match self.generator.request() {
            Ok(request) => request,
            Err(err) => return SubmitOutcome::Rejected(err),
        };
        self.record(StudioEvent::GenerationStarted {
            prompt: request.prompt.clone(),
            aspect_ratio: request.aspect_ratio.as_str(),
            count: request.count.get(),
            model: self.model.name.clone(),
        });

        let events = self.events.clone();
        let mut progress_failures = Vec::new();
        let outcome = self
            .generator
            .submit(self.service.as_ref(), &mut self.gallery, |progress| {
                if let Some(events) = events.as_ref() {
                    let event = StudioEvent::GenerationProgress {
                        current: progress.current,
                        total: progress.total,
                    };
                    if let Err(err) = events.record(&event) {
                        progress_failures.push(err);
                    }
                }
                on_progress(progress);
            });
        self.log_failures.extend(progress_failures);

        self.record_added(outcome.added());
        match &outcome {
            SubmitOutcome::Completed { added } => {
                self.record(StudioEvent::GenerationFinished { added: added.len() })
            }
            SubmitOutcome::Failed { added, message } => {
                self.record(StudioEvent::GenerationFailed {
                    added: added.len(),
                    error: message.clone(),
                })
            }
            SubmitOutcome::Rejected(_) => {}
        }
        outcome
    }

    pub fn ingest_source(&mut self, file: SourceFile, origin: IngestOrigin) -> IngestOutcome {
        let file_name = file.name.clone();
        let mime_type = file.mime_type.clone();
        let bytes = file.bytes.len();
        match self.editor.ingest(file) {
            Ok(_) => {
                self.record(StudioEvent::SourceIngested {
                    origin: origin.as_str(),
                    file_name,
                    mime_type,
                    bytes,
                });
                IngestOutcome::Accepted
            }
            Err(err) => {
                self.record(StudioEvent::SourceRejected {
                    origin: origin.as_str(),
                    file_name,
                    mime_type,
                    error: err.to_string(),
                });
                IngestOutcome::Rejected(err)
            }
        }
    }

    pub fn clear_source(&mut self) {
        let had_source = self.editor.source().is_some();
        self.editor.clear_source();
        self.record(StudioEvent::SourceCleared { had_source });
    }

    pub fn submit_edit(&mut self) -> SubmitOutcome {
        let request = match self.editor.request() {
            Ok(request) => request,
            Err(err) => return SubmitOutcome::Rejected(err),
        };
        self.record(StudioEvent::EditStarted {
            prompt: request.prompt,
            source_mime_type: request.source_mime_type,
            model: self.model.name.clone(),
        });

        let outcome = self.editor.submit(self.service.as_ref(), &mut self.gallery);

        self.record_added(outcome.added());
        match &outcome {
            SubmitOutcome::Completed { added } => {
                self.record(StudioEvent::EditFinished { added: added.len() })
            }
            SubmitOutcome::Failed { message, .. } => self.record(StudioEvent::EditFailed {
                error: message.clone(),
            }),
            SubmitOutcome::Rejected(_) => {}
        }
        outcome
    }

    pub fn delete_image(&mut self, id: &str) -> Option<GeneratedImageRecord> {
        let removed = self.gallery.remove_by_id(id);
        self.record(StudioEvent::ImageRemoved {
            image_id: id.to_string(),
            found: removed.is_some(),
            gallery_size: self.gallery.len(),
        });
        removed
    }

    pub fn download_image(&mut self, id: &str, dir: &Path) -> Result<PathBuf> {
        let Some(record) = self.gallery.get(id) else {
            bail!("no image with id '{id}' in the gallery");
        };
        let path = download_record(record, dir)?;
        self.record(StudioEvent::ImageDownloaded {
            image_id: id.to_string(),
            path: path.to_string_lossy().to_string(),
        });
        Ok(path)
    }

    fn record_added(&mut self, ids: &[String]) {
        let added: Vec<StudioEvent> = ids
            .iter()
            .filter_map(|id| self.gallery.get(id))
            .map(|record| StudioEvent::ImageAdded {
                image_id: record.id().to_string(),
                source_prompt: record.source_prompt().to_string(),
                mime_type: record.image_data().mime_type.clone(),
                created_at: record.created_at(),
                fingerprint: image_fingerprint(record.image_data()),
                gallery_size: self.gallery.len(),
            })
            .collect();
        for event in added {
            self.record(event);
        }
    }

    fn record(&mut self, event: StudioEvent) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.record(&event) {
            self.log_failures.push(err);
        }
    }
}

/// Short content hash for logs, so image payloads never hit the event file.
pub fn image_fingerprint(image_data: &ImageData) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data.mime_type.as_bytes());
    hasher.update(image_data.base64.as_bytes());
    hex::encode(&hasher.finalize()[..8])
}
