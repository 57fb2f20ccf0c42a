//! The pipeline orchestrator.
//!
//! [`AdjustmentPipeline`] owns the fixed, linear list of stages and the
//! gateway they share. One instance is built per process and reused (behind an
//! `Arc`) by every concurrent analysis; each [`AdjustmentPipeline::run`] owns
//! its own [`AnalysisContext`] exclusively.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pipeline::{
    AdjustmentSuggestion, AnalysisContext, AnalysisError, AnalysisRunId, LlmProvider,
    PipelineConfig, StageName,
};
use serde::Serialize;
use tracing::Instrument;

use crate::gateway::LlmGateway;
use crate::stage::{PipelineStage, StageResult};
use crate::stages::{
    AnalyzeDocument, ApplyMateriality, CalculateAmounts, GenerateNarratives, IdentifyAdjustments,
};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: AnalysisRunId,
    /// The context after all five stages.
    pub context: AnalysisContext,
    /// One entry per stage, in execution order.
    pub stage_results: Vec<StageResult>,
    pub total_duration: Duration,
}

impl PipelineOutcome {
    /// The material suggestions, in identification order.
    pub fn suggestions(&self) -> &[AdjustmentSuggestion] {
        self.context
            .processed_adjustments
            .suggestions()
            .unwrap_or_default()
    }

    /// Total recovered parse failures across all stages.
    pub fn degraded_count(&self) -> usize {
        self.context.degradations.len()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs AnalyzeDocument → IdentifyAdjustments → CalculateAmounts →
/// GenerateNarratives → ApplyMateriality over one context.
///
/// There is no branching and no retry. The first error returned by a stage
/// aborts the run and is returned as-is; the partially processed context is
/// discarded.
pub struct AdjustmentPipeline {
    gateway: LlmGateway,
    stages: Vec<Box<dyn PipelineStage>>,
}

impl AdjustmentPipeline {
    /// Validates `config` and assembles the stage list around `provider`.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: PipelineConfig,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        let stages: Vec<Box<dyn PipelineStage>> = vec![
            Box::new(AnalyzeDocument::new(config.analysis_char_budget)),
            Box::new(IdentifyAdjustments::new()),
            Box::new(CalculateAmounts::new(
                config.calculation_char_budget,
                config.max_concurrent_calls,
            )),
            Box::new(GenerateNarratives::new(config.max_concurrent_calls)),
            Box::new(ApplyMateriality::new(config.materiality)),
        ];
        Ok(Self {
            gateway: LlmGateway::new(provider, config.call_timeout),
            stages,
        })
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Executes every stage over `context` and returns the final state.
    pub async fn run(&self, mut context: AnalysisContext) -> Result<PipelineOutcome, AnalysisError> {
        let run_id = AnalysisRunId::new_random();
        let span = tracing::info_span!(
            "analysis_run",
            run_id = %run_id,
            document_type = context.document_type.as_str()
        );

        async move {
            tracing::info!(
                document_chars = context.document_content.chars().count(),
                materiality_threshold = context.materiality_threshold.as_f64(),
                "analysis run started"
            );
            let started = Instant::now();
            let mut stage_results = Vec::with_capacity(self.stages.len());

            for stage in &self.stages {
                let name = stage.name();
                let stage_started = Instant::now();
                tracing::info!(stage = name.as_str(), "stage started");

                let report = match stage
                    .execute(&mut context, &self.gateway)
                    .instrument(tracing::info_span!("stage", stage = name.as_str()))
                    .await
                {
                    Ok(report) => report,
                    Err(err) => {
                        tracing::warn!(
                            stage = name.as_str(),
                            error = %err,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "analysis run aborted"
                        );
                        return Err(err);
                    }
                };

                let result = StageResult::new(name, report, stage_started.elapsed());
                tracing::info!(
                    stage = name.as_str(),
                    calls = result.calls,
                    degraded = result.degraded,
                    items = result.items,
                    elapsed_ms = result.duration.as_millis() as u64,
                    "stage finished"
                );
                stage_results.push(result);
            }

            let total_duration = started.elapsed();
            tracing::info!(
                adjustments = context.processed_adjustments.len(),
                degradations = context.degradations.len(),
                elapsed_ms = total_duration.as_millis() as u64,
                "analysis run finished"
            );
            Ok(PipelineOutcome {
                run_id,
                context,
                stage_results,
                total_duration,
            })
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for AdjustmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdjustmentPipeline")
            .field("gateway", &self.gateway)
            .field("stages", &self.stage_names())
            .finish()
    }
}
