use indexmap::IndexMap;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub label: String,
}

impl ModelSpec {
    fn new(name: &str, provider: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            provider: provider.to_string(),
            label: label.to_string(),
        }
    }
}

/// Which model a session ended up on, and why if it is not the one asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

/// The image models a studio can drive. Every entry handles both generate
/// and edit calls; the Gemini Flash image model is the default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    default: ModelSpec,
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let default = ModelSpec::new(DEFAULT_IMAGE_MODEL, "gemini", "Gemini 2.5 Flash");
        let models = [
            default.clone(),
            ModelSpec::new("gemini-3-pro-image-preview", "gemini", "Gemini 3 Pro Image"),
            ModelSpec::new("dryrun-image-1", "dryrun", "Dry run"),
        ]
        .into_iter()
        .map(|model| (model.name.clone(), model))
        .collect();
        Self { default, models }
    }
}

impl ModelRegistry {
    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    /// Resolves a user-supplied model name. Blank or absent picks the
    /// default quietly; an unknown name falls back to it with a reason.
    pub fn resolve(&self, requested: Option<&str>) -> ModelSelection {
        let Some(name) = requested.map(str::trim).filter(|name| !name.is_empty()) else {
            return ModelSelection {
                model: self.default.clone(),
                requested: None,
                fallback_reason: None,
            };
        };
        match self.get(name) {
            Some(model) => ModelSelection {
                model: model.clone(),
                requested: Some(name.to_string()),
                fallback_reason: None,
            },
            None => ModelSelection {
                model: self.default.clone(),
                requested: Some(name.to_string()),
                fallback_reason: Some(format!(
                    "Unknown image model '{name}'; using {}.",
                    self.default.name
                )),
            },
        }
    }
}
