//! Stage 2: turn the analysis into a list of candidate adjustments.

use async_trait::async_trait;
use pipeline::{
    parse_candidate_list, AdjustmentType, AnalysisContext, AnalysisError, ParseOutcome, StageName,
};

use crate::gateway::LlmGateway;
use crate::prompts;
use crate::stage::{PipelineStage, StageReport};

/// Asks the model for candidate adjustments as a JSON array.
///
/// A response that is not a list of objects does not fail the run: the
/// candidate list becomes empty and a degradation is recorded.
#[derive(Debug, Clone, Default)]
pub struct IdentifyAdjustments;

impl IdentifyAdjustments {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineStage for IdentifyAdjustments {
    fn name(&self) -> StageName {
        StageName::IdentifyAdjustments
    }

    async fn execute(
        &self,
        context: &mut AnalysisContext,
        gateway: &LlmGateway,
    ) -> Result<StageReport, AnalysisError> {
        let analysis = context
            .analysis
            .as_deref()
            .ok_or(AnalysisError::MissingStageInput {
                stage: self.name(),
                input: "document analysis",
            })?;
        let project = serde_json::to_string_pretty(&context.project_context).map_err(|e| {
            AnalysisError::ConfigurationError {
                message: format!("project context is not serialisable: {e}"),
            }
        })?;
        let prompt =
            prompts::identify_adjustments(analysis, &project, &AdjustmentType::catalog());

        let response = gateway.generate(self.name(), prompt).await?;

        let mut report = StageReport {
            calls: 1,
            ..StageReport::default()
        };
        match ParseOutcome::from_result(&response, parse_candidate_list(&response)) {
            ParseOutcome::Parsed(candidates) => {
                context.identified_adjustments = candidates;
            }
            ParseOutcome::Degraded { reason, .. } => {
                context.identified_adjustments = Vec::new();
                context.record_degradation(self.name(), None, reason.to_string());
                report.degraded = 1;
            }
        }
        report.items = context.identified_adjustments.len();
        tracing::info!(candidates = report.items, "adjustments identified");

        Ok(report)
    }
}
