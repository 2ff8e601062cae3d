use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use nanoart_contracts::image_data::ImageData;
use nanoart_contracts::requests::{AspectRatio, EditRequest};

use crate::service::{ImageService, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Generate {
        prompt: String,
        aspect_ratio: AspectRatio,
    },
    Edit(EditRequest),
}

pub(crate) type SharedLog = Arc<Mutex<Vec<String>>>;

/// Service double that replays scripted results in order and records every
/// call. Once the script runs out, calls succeed with a numbered image.
pub(crate) struct ScriptedImageService {
    script: Mutex<VecDeque<Result<ImageData, ServiceError>>>,
    calls: Mutex<Vec<Call>>,
    log: SharedLog,
}

impl ScriptedImageService {
    pub(crate) fn new(script: Vec<Result<ImageData, ServiceError>>) -> Self {
        Self::with_log(script, SharedLog::default())
    }

    pub(crate) fn with_log(script: Vec<Result<ImageData, ServiceError>>, log: SharedLog) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            log,
        }
    }

    pub(crate) fn succeeding() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn next(&self, call: Call) -> Result<ImageData, ServiceError> {
        let number = {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.push(call);
            calls.len()
        };
        self.log
            .lock()
            .expect("log lock")
            .push(format!("call {number}"));
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(image(number)))
    }
}

impl ImageService for ScriptedImageService {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<ImageData, ServiceError> {
        self.next(Call::Generate {
            prompt: prompt.to_string(),
            aspect_ratio,
        })
    }

    fn edit(&self, request: &EditRequest) -> Result<ImageData, ServiceError> {
        self.next(Call::Edit(request.clone()))
    }
}

pub(crate) fn image(tag: usize) -> ImageData {
    ImageData::from_bytes("image/png", format!("image-{tag}").as_bytes())
}
