//! The LLM gateway: the single path by which stages reach the provider.
//!
//! Wraps every call with the configured deadline and a `generate` span, and
//! attributes failures to the stage that issued the call. An expired deadline
//! is reported as [`LlmError::Timeout`], the same as a provider-side timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pipeline::{AnalysisError, CompletionRequest, LlmError, LlmProvider, StageName};
use tracing::Instrument;

/// Deadline-enforcing wrapper around a shared [`LlmProvider`].
#[derive(Clone)]
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    call_timeout: Duration,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    /// Sends `prompt` on behalf of `stage` and returns the generated text.
    pub async fn generate(&self, stage: StageName, prompt: String) -> Result<String, AnalysisError> {
        let span = tracing::debug_span!(
            "generate",
            stage = stage.as_str(),
            provider = self.provider.name()
        );
        async {
            let prompt_chars = prompt.chars().count();
            let start = Instant::now();
            let result = tokio::time::timeout(
                self.call_timeout,
                self.provider.complete(CompletionRequest::new(prompt)),
            )
            .await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(Ok(completion)) => {
                    tracing::debug!(
                        elapsed_ms,
                        prompt_chars,
                        response_chars = completion.text.chars().count(),
                        output_tokens = completion.output_tokens.map(|t| t.as_u64()),
                        "generation complete"
                    );
                    Ok(completion.text)
                }
                Ok(Err(source)) => {
                    tracing::debug!(elapsed_ms, error = %source, "generation failed");
                    Err(AnalysisError::Generation { stage, source })
                }
                Err(_) => {
                    tracing::debug!(elapsed_ms, "generation deadline expired");
                    Err(AnalysisError::Generation {
                        stage,
                        source: LlmError::Timeout {
                            after: self.call_timeout,
                        },
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("provider", &self.provider.name())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
