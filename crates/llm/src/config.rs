//! Provider connection settings.

use std::time::Duration;

use pipeline::GenerationSettings;
use thiserror::Error;

/// Base URL of the public OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Everything needed to reach a chat-completions endpoint.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    /// API root; `/chat/completions` is appended.
    pub base_url: String,
    /// Transport-level deadline for one HTTP exchange.
    pub request_timeout: Duration,
    pub generation: GenerationSettings,
}

impl ProviderConfig {
    /// Settings for the public API with default generation parameters.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            generation: GenerationSettings::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_generation(mut self, generation: GenerationSettings) -> Self {
        self.generation = generation;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full URL of the chat-completions endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// The key never appears in logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Failure to construct a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API key is empty")]
    MissingApiKey,

    #[error("base URL '{url}' must start with http:// or https://")]
    InvalidBaseUrl { url: String },

    #[error("HTTP client could not be built: {0}")]
    ClientBuild(#[from] reqwest::Error),
}
