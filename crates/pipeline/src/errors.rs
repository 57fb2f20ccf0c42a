//! Error and retry-policy types for the analysis pipeline.
//!
//! Two classes of failure exist, kept in separate types:
//!
//! - [`LlmError`]: transient failures of the text-generation capability. These
//!   are never caught inside a stage; they surface as [`AnalysisError::Generation`]
//!   and abort the run.
//! - [`ParseError`]: model output that does not have the expected shape. These
//!   are always recovered inside the stage that produced them (see
//!   [`crate::ParseOutcome`]) and never reach the caller as an error.
//!
//! [`RetryPolicy`] lets callers decide whether re-submitting a document is
//! worthwhile; the pipeline itself never retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::StageName;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, typically derived from a
        /// `Retry-After` header. `None` means the caller's own schedule applies.
        after: Option<Duration>,
    },
    /// Retrying without operator intervention will not help.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Text-generation failures
// ---------------------------------------------------------------------------

/// Failure of a single call to the text-generation capability.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum LlmError {
    /// The provider rejected the call because a rate limit was hit.
    #[error("Rate limited by provider (retry after {retry_after:?})")]
    RateLimited {
        /// Delay advertised by the provider, when it sent one.
        retry_after: Option<Duration>,
    },

    /// The request could not be delivered or the response could not be read.
    #[error("Network error: {message}")]
    Network {
        /// Transport-level description.
        message: String,
    },

    /// No response arrived within the per-call deadline.
    #[error("Generation call timed out after {after:?}")]
    Timeout {
        /// The deadline that expired.
        after: Duration,
    },

    /// The provider rejected the configured credentials.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Provider-supplied description.
        message: String,
    },

    /// The provider answered with an unexpected status or an undecodable envelope.
    #[error("Provider returned status {status}: {message}")]
    Api {
        /// HTTP status of the response, also for 2xx bodies that did not decode.
        status: u16,
        /// Provider-supplied or decoding error description.
        message: String,
    },
}

impl LlmError {
    /// Returns whether the failed call could succeed if repeated later.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            LlmError::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            LlmError::Network { .. } | LlmError::Timeout { .. } => {
                RetryPolicy::Retryable { after: None }
            }
            LlmError::Api { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            LlmError::Authentication { .. } | LlmError::Api { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Output-shape failures
// ---------------------------------------------------------------------------

/// Model output that could not be coerced into the expected structure.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum ParseError {
    /// The text contains nothing that looks like JSON.
    #[error("Response contains no structured content")]
    NoStructuredContent,

    /// A JSON-looking block was found but is not valid JSON.
    #[error("Invalid JSON: {message}")]
    InvalidJson {
        /// Decoder message including line/column.
        message: String,
    },

    /// Valid JSON, but not a list where a list was required.
    #[error("Expected a JSON array of adjustments")]
    NotAList,

    /// A list element is not a JSON object.
    #[error("Array element {index} is not an object")]
    InvalidEntry {
        /// Zero-based position of the offending element.
        index: usize,
    },

    /// Valid JSON that does not satisfy the adjustment suggestion schema.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Field-level description of the mismatch.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors that abort a pipeline run.
///
/// When `run` returns one of these, no partial context is handed back; the
/// caller records the document's analysis as failed.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A text-generation call failed inside a stage.
    #[error("Stage '{stage}' failed: {source}")]
    Generation {
        /// Stage that issued the failed call.
        stage: StageName,
        /// Underlying provider failure.
        #[source]
        source: LlmError,
    },

    /// A stage was executed before the stage that produces its input.
    #[error("Stage '{stage}' requires {input}, which has not been produced yet")]
    MissingStageInput {
        /// Stage that found its input missing.
        stage: StageName,
        /// Human-readable name of the missing input.
        input: &'static str,
    },

    /// The pipeline or provider configuration is invalid.
    ///
    /// Produced at construction time; a pipeline never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

impl AnalysisError {
    /// Returns the retry policy of the underlying cause.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            AnalysisError::Generation { source, .. } => source.retry_policy(),
            AnalysisError::MissingStageInput { .. } | AnalysisError::ConfigurationError { .. } => {
                RetryPolicy::NonRetryable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_retryable_with_advertised_delay() {
        let err = LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(20)),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(20))
            }
        );
    }

    #[test]
    fn test_authentication_is_not_retryable() {
        let err = LlmError::Authentication {
            message: "bad key".into(),
        };
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn test_api_error_retryability_depends_on_status() {
        let server = LlmError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        let client = LlmError::Api {
            status: 400,
            message: "bad request".into(),
        };
        assert_eq!(server.retry_policy(), RetryPolicy::Retryable { after: None });
        assert_eq!(client.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn test_generation_error_names_the_stage() {
        let err = AnalysisError::Generation {
            stage: StageName::CalculateAmounts,
            source: LlmError::Timeout {
                after: Duration::from_secs(5),
            },
        };
        assert!(err.to_string().contains("calculate_amounts"));
        assert_eq!(err.retry_policy(), RetryPolicy::Retryable { after: None });
    }
}
