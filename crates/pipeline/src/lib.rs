//! Core domain for quality-of-earnings adjustment analysis.
//!
//! This crate contains every domain concept shared by the workspace: the
//! analysis context threaded through the stages, the adjustment suggestion
//! schema and its structured-output parser, newtype identifiers, bounded value
//! types, configuration values, error types, and the [`LlmProvider`] port.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; the `llm` crate defines *how* text is generated
//! and the `nodes` crate sequences the calls.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`AnalysisRunId`, `ModelId`, etc.) |
//! | [`types`] | Value types (scores, materiality, `DocumentType`, `AdjustmentType`) |
//! | [`context`] | `AnalysisContext` and the candidate/processed adjustment records |
//! | [`schema`] | `AdjustmentSuggestion` and the structured-output parser |
//! | [`config`] | `GenerationSettings`, `PipelineConfig`, `MaterialityPolicy` |
//! | [`provider`] | The `LlmProvider` port |
//! | [`errors`] | `LlmError`, `ParseError`, `AnalysisError`, `RetryPolicy` |

pub mod config;
pub mod context;
pub mod errors;
pub mod identifiers;
pub mod provider;
pub mod schema;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{GenerationSettings, MaterialityPolicy, PipelineConfig};
pub use context::{
    AnalysisContext, CandidateAdjustment, Degradation, ProcessedAdjustments, ProjectContext,
    StageName,
};
pub use errors::{AnalysisError, LlmError, ParseError, RetryPolicy};
pub use identifiers::{AnalysisRunId, ClientName, DocumentId, ModelId, ProjectName};
pub use provider::{Completion, CompletionRequest, LlmProvider};
pub use schema::{
    format_instructions, parse_candidate_list, parse_suggestion, AdjustmentSuggestion,
    ParseOutcome, MANUAL_REVIEW_METHOD, UNKNOWN_TITLE,
};
pub use types::{
    AdjustmentType, ConfidenceScore, DocumentType, MaterialityAmount, MaterialityPercentage,
    PrecisionScore, Temperature, Timestamp, TokenCount,
};
