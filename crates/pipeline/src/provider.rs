//! The text-generation port.
//!
//! The pipeline only ever sees [`LlmProvider`]. Concrete HTTP adapters live in
//! the `llm` crate; tests use [`crate::testing::ScriptedProvider`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::LlmError;
use crate::types::TokenCount;

/// A single prompt sent to the model.
///
/// Generation parameters (model, temperature, output cap) are fixed by the
/// provider's configuration and are not part of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Text produced by the model for one request.
///
/// No content guarantees: `text` may be empty, truncated, prose, or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,

    /// Tokens generated, when the provider reports usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<TokenCount>,
}

impl Completion {
    /// A completion without usage information.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            output_tokens: None,
        }
    }
}

/// Stateless text-generation capability.
///
/// Implementations must be safe to share between concurrently running
/// pipelines; one instance is constructed per process and passed around
/// behind an `Arc`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generates text for `request`.
    ///
    /// Implementations must not retry internally; retry decisions belong to the caller.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;

    /// Short provider label for logs (e.g. `"openai"`).
    fn name(&self) -> &str;
}
