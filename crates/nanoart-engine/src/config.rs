use std::collections::HashMap;
use std::env;
use std::path::Path;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_REQUEST_TIMEOUT_S: f64 = 90.0;
const MIN_REQUEST_TIMEOUT_S: f64 = 15.0;
const MAX_REQUEST_TIMEOUT_S: f64 = 300.0;

#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub image_model: Option<String>,
    pub request_timeout_s: f64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            image_model: None,
            request_timeout_s: DEFAULT_REQUEST_TIMEOUT_S,
        }
    }
}

impl StudioConfig {
    /// Process environment first, then `.env` in the working directory for
    /// anything still unset.
    pub fn from_env() -> Self {
        let dotenv = parse_dotenv(Path::new(".env"));
        Self::from_lookup(|key| {
            non_empty(env::var(key).ok()).or_else(|| non_empty(dotenv.get(key).cloned()))
        })
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY"));
        let api_base = lookup("GEMINI_API_BASE")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string());
        let request_timeout_s = lookup("NANOART_REQUEST_TIMEOUT")
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_S)
            .clamp(MIN_REQUEST_TIMEOUT_S, MAX_REQUEST_TIMEOUT_S);
        Self {
            api_key,
            api_base,
            image_model: lookup("NANOART_IMAGE_MODEL"),
            request_timeout_s,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_dotenv(path: &Path) -> HashMap<String, String> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    parse_dotenv_str(&content)
}

fn parse_dotenv_str(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for raw_line in content.lines() {
        let mut line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("export ") {
            line = stripped.trim();
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim().to_string();
        if value.len() >= 2 {
            let bytes = value.as_bytes();
            if (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
                || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'')
            {
                value = value[1..value.len() - 1].to_string();
            }
        }
        vars.insert(key.to_string(), value);
    }
    vars
}
