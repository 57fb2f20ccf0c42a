//! Stage 5: drop suggestions below the materiality threshold.

use async_trait::async_trait;
use pipeline::{
    AdjustmentSuggestion, AnalysisContext, AnalysisError, MaterialityAmount, MaterialityPolicy,
    ProcessedAdjustments, StageName,
};

use crate::gateway::LlmGateway;
use crate::stage::{PipelineStage, StageReport};

/// Keeps suggestions whose absolute amount meets the threshold.
///
/// Issues no model calls. Relative order is preserved and applying the stage
/// twice gives the same result as applying it once.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyMateriality {
    policy: MaterialityPolicy,
}

impl ApplyMateriality {
    pub fn new(policy: MaterialityPolicy) -> Self {
        Self { policy }
    }
}

/// Retains the suggestions with `|amount| >= threshold`, in order.
pub fn apply_threshold(suggestions: &mut Vec<AdjustmentSuggestion>, threshold: MaterialityAmount) {
    suggestions.retain(|s| threshold.is_met_by(s.amount));
}

#[async_trait]
impl PipelineStage for ApplyMateriality {
    fn name(&self) -> StageName {
        StageName::ApplyMateriality
    }

    async fn execute(
        &self,
        context: &mut AnalysisContext,
        _gateway: &LlmGateway,
    ) -> Result<StageReport, AnalysisError> {
        let threshold = self
            .policy
            .effective_threshold(context.materiality_threshold, &context.project_context);
        let ProcessedAdjustments::Suggested(suggestions) = &mut context.processed_adjustments else {
            return Err(AnalysisError::MissingStageInput {
                stage: self.name(),
                input: "adjustment suggestions",
            });
        };

        let before = suggestions.len();
        apply_threshold(suggestions, threshold);
        tracing::info!(
            threshold = threshold.as_f64(),
            kept = suggestions.len(),
            dropped = before - suggestions.len(),
            "materiality applied"
        );

        Ok(StageReport {
            items: suggestions.len(),
            ..StageReport::default()
        })
    }
}
