//! Stage 4: turn each calculated candidate into a typed suggestion.

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use pipeline::{
    format_instructions, parse_suggestion, AdjustmentSuggestion, AnalysisContext, AnalysisError,
    ParseOutcome, ProcessedAdjustments, StageName,
};

use crate::gateway::LlmGateway;
use crate::prompts;
use crate::stage::{PipelineStage, StageReport};

/// Requests a structured narrative per candidate and parses it.
///
/// A response that does not satisfy the suggestion schema is replaced by
/// [`AdjustmentSuggestion::fallback`] and recorded as a degradation; only
/// provider failures abort the stage.
#[derive(Debug, Clone)]
pub struct GenerateNarratives {
    max_concurrent_calls: usize,
}

impl GenerateNarratives {
    pub fn new(max_concurrent_calls: usize) -> Self {
        Self {
            max_concurrent_calls: max_concurrent_calls.max(1),
        }
    }
}

#[async_trait]
impl PipelineStage for GenerateNarratives {
    fn name(&self) -> StageName {
        StageName::GenerateNarratives
    }

    async fn execute(
        &self,
        context: &mut AnalysisContext,
        gateway: &LlmGateway,
    ) -> Result<StageReport, AnalysisError> {
        let stage = self.name();
        let ProcessedAdjustments::Calculated(calculated) = &context.processed_adjustments else {
            return Err(AnalysisError::MissingStageInput {
                stage,
                input: "calculated adjustments",
            });
        };
        let instructions = format_instructions();

        let calls: Vec<_> = calculated
            .iter()
            .map(|candidate| {
                let prompt = prompts::generate_narrative(
                    &candidate.to_value().to_string(),
                    candidate.calculation_details.as_deref().unwrap_or_default(),
                    &instructions,
                );
                gateway.generate(stage, prompt)
            })
            .collect();
        let responses: Vec<String> = stream::iter(calls)
        .buffered(self.max_concurrent_calls)
        .try_collect()
        .await?;

        let mut failures = Vec::new();
        let suggestions: Vec<AdjustmentSuggestion> = calculated
            .iter()
            .zip(&responses)
            .enumerate()
            .map(|(index, (candidate, raw))| {
                match ParseOutcome::from_result(raw, parse_suggestion(raw)) {
                    ParseOutcome::Parsed(suggestion) => suggestion,
                    ParseOutcome::Degraded { raw, reason } => {
                        failures.push((index, reason));
                        AdjustmentSuggestion::fallback(candidate, &raw)
                    }
                }
            })
            .collect();

        let report = StageReport {
            calls: responses.len(),
            degraded: failures.len(),
            items: suggestions.len(),
        };
        for (index, reason) in failures {
            context.record_degradation(stage, Some(index), reason.to_string());
        }
        tracing::info!(
            suggestions = report.items,
            degraded = report.degraded,
            "narratives generated"
        );
        context.processed_adjustments = ProcessedAdjustments::Suggested(suggestions);

        Ok(report)
    }
}
