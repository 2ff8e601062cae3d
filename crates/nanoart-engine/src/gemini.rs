use std::time::Duration;

use anyhow::{bail, Context, Result};
use nanoart_contracts::image_data::{ImageData, DEFAULT_IMAGE_MIME};
use nanoart_contracts::requests::{AspectRatio, EditRequest};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};

use crate::config::StudioConfig;
use crate::service::{truncate_text, ImageService, ServiceError};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` client for Gemini image models.
pub struct GeminiImageService {
    name: String,
    api_base: String,
    api_key: Option<String>,
    model: String,
    http: HttpClient,
}

impl GeminiImageService {
    pub fn new(config: &StudioConfig, model: &str) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs_f64(config.request_timeout_s))
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            name: format!("gemini:{}", model.trim()),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: model.to_string(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        endpoint_for_model(&self.api_base, &self.model)
    }

    fn post(&self, payload: &Value) -> Result<ImageData> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(payload)
            .send()
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let response_payload = response_json_or_error(response)?;
        extract_image(&response_payload)
    }
}

impl ImageService for GeminiImageService {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<ImageData, ServiceError> {
        Ok(self.post(&generate_payload(prompt, aspect_ratio))?)
    }

    fn edit(&self, request: &EditRequest) -> Result<ImageData, ServiceError> {
        Ok(self.post(&edit_payload(request))?)
    }
}

fn endpoint_for_model(api_base: &str, model: &str) -> String {
    let trimmed = model.trim();
    let model_path = if trimmed.starts_with("models/") {
        trimmed.to_string()
    } else {
        format!("models/{trimmed}")
    };
    format!("{api_base}/{model_path}:generateContent")
}

fn generate_payload(prompt: &str, aspect_ratio: AspectRatio) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }],
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": { "aspectRatio": aspect_ratio.as_str() },
        },
    })
}

fn edit_payload(request: &EditRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": request.source_mime_type,
                        "data": request.source_image_base64,
                    }
                },
                { "text": request.prompt },
            ],
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
        },
    })
}

fn response_json_or_error(response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .context("Gemini response body read failed")?;
    if !status.is_success() {
        bail!(
            "Gemini request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    serde_json::from_str(&body).context("Gemini returned invalid JSON payload")
}

/// First inline image across all candidates.
fn extract_image(response_payload: &Value) -> Result<ImageData> {
    let candidates = response_payload
        .get("candidates")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for candidate in candidates {
        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for part in parts {
            let Some(inline) = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object)
            else {
                continue;
            };
            let data = inline
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim();
            if data.is_empty() {
                continue;
            }
            let mime_type = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_IMAGE_MIME);
            return Ok(ImageData::new(mime_type, data));
        }
    }

    if let Some(reason) = response_payload
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        bail!("Gemini blocked the prompt ({reason})");
    }
    bail!("Gemini returned no image")
}
