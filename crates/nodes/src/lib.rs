//! Quality-of-earnings pipeline stages and the orchestrator that runs them.
//!
//! This crate provides the five stage implementations (AnalyzeDocument
//! through ApplyMateriality), the LLM gateway that wraps every provider call
//! with a deadline and a tracing span, and [`AdjustmentPipeline`], which runs
//! the stages in their fixed order.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Stages sequence calls between business logic in the
//! [`pipeline`] crate (prompt inputs, parsing, fallbacks, materiality) and the
//! [`pipeline::LlmProvider`] port. They contain no transport code.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`executor`] | `AdjustmentPipeline`, `PipelineOutcome` |
//! | [`stage`] | The `PipelineStage` trait, `StageReport`, `StageResult` |
//! | [`stages`] | The five stage implementations |
//! | [`gateway`] | `LlmGateway` |
//! | `prompts` | Embedded prompt templates (crate-private) |

pub mod executor;
pub mod gateway;
mod prompts;
pub mod stage;
pub mod stages;

pub use executor::{AdjustmentPipeline, PipelineOutcome};
pub use gateway::LlmGateway;
pub use stage::{PipelineStage, StageReport, StageResult};
pub use stages::{
    apply_threshold, AnalyzeDocument, ApplyMateriality, CalculateAmounts, GenerateNarratives,
    IdentifyAdjustments,
};
