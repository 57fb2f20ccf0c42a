//! The stage abstraction and per-stage execution records.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{AnalysisContext, AnalysisError, StageName};
use serde::Serialize;

use crate::gateway::LlmGateway;

/// A single step of the analysis pipeline.
///
/// Stages read from and write to the shared [`AnalysisContext`]. Output-shape
/// problems are recovered inside the stage; any error returned here aborts the
/// remaining stages.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Which of the five fixed stages this is.
    fn name(&self) -> StageName;

    /// Transforms `context`, using `gateway` for every text-generation call.
    async fn execute(
        &self,
        context: &mut AnalysisContext,
        gateway: &LlmGateway,
    ) -> Result<StageReport, AnalysisError>;
}

/// What a stage did, as reported by the stage itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Provider calls issued.
    pub calls: usize,
    /// Responses that did not parse and were replaced by a fallback.
    pub degraded: usize,
    /// Entries in the stage's output list, where it has one.
    pub items: usize,
}

/// Outcome of one stage within a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub stage: StageName,
    pub duration: Duration,
    pub calls: usize,
    pub degraded: usize,
    pub items: usize,
}

impl StageResult {
    pub fn new(stage: StageName, report: StageReport, duration: Duration) -> Self {
        Self {
            stage,
            duration,
            calls: report.calls,
            degraded: report.degraded,
            items: report.items,
        }
    }
}
