//! Stage 3: ask for a calculation for every candidate.

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use pipeline::{AnalysisContext, AnalysisError, ProcessedAdjustments, StageName};

use crate::gateway::LlmGateway;
use crate::prompts;
use crate::stage::{PipelineStage, StageReport};

/// Issues one calculation call per candidate and attaches the raw response.
///
/// Up to `max_concurrent_calls` requests are in flight at once; results are
/// always attached in candidate order. The first failed call aborts the stage.
#[derive(Debug, Clone)]
pub struct CalculateAmounts {
    char_budget: usize,
    max_concurrent_calls: usize,
}

impl CalculateAmounts {
    pub fn new(char_budget: usize, max_concurrent_calls: usize) -> Self {
        Self {
            char_budget,
            max_concurrent_calls: max_concurrent_calls.max(1),
        }
    }
}

#[async_trait]
impl PipelineStage for CalculateAmounts {
    fn name(&self) -> StageName {
        StageName::CalculateAmounts
    }

    async fn execute(
        &self,
        context: &mut AnalysisContext,
        gateway: &LlmGateway,
    ) -> Result<StageReport, AnalysisError> {
        let stage = self.name();
        let excerpt = prompts::truncate_chars(&context.document_content, self.char_budget);
        let candidates = &context.identified_adjustments;

        let calls: Vec<_> = candidates
            .iter()
            .map(|candidate| {
                let prompt = prompts::calculate_amounts(&candidate.to_value().to_string(), excerpt);
                gateway.generate(stage, prompt)
            })
            .collect();
        let details: Vec<String> = stream::iter(calls)
        .buffered(self.max_concurrent_calls)
        .try_collect()
        .await?;

        let calculated: Vec<_> = candidates
            .iter()
            .cloned()
            .zip(details)
            .map(|(mut candidate, detail)| {
                candidate.calculation_details = Some(detail);
                candidate
            })
            .collect();

        let report = StageReport {
            calls: calculated.len(),
            degraded: 0,
            items: calculated.len(),
        };
        tracing::info!(candidates = report.items, "amounts calculated");
        context.processed_adjustments = ProcessedAdjustments::Calculated(calculated);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::context;
    use pipeline::testing::ScriptedProvider;
    use pipeline::{CandidateAdjustment, LlmError};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn candidate(title: &str) -> CandidateAdjustment {
        let serde_json::Value::Object(fields) = json!({"type": "other", "title": title}) else {
            unreachable!()
        };
        CandidateAdjustment::from_fields(fields)
    }

    #[tokio::test]
    async fn test_attaches_details_in_candidate_order() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .on("Alpha", "alpha: 1,000")
                .on("Beta", "beta: 2,000"),
        );
        let gateway = LlmGateway::new(provider.clone(), Duration::from_secs(5));
        let mut ctx = context("ledger text", 1000.0);
        ctx.identified_adjustments = vec![candidate("Alpha"), candidate("Beta")];

        let report = CalculateAmounts::new(3000, 1)
            .execute(&mut ctx, &gateway)
            .await
            .unwrap();

        assert_eq!(report.calls, 2);
        let ProcessedAdjustments::Calculated(items) = &ctx.processed_adjustments else {
            panic!("expected calculated adjustments");
        };
        assert_eq!(items[0].calculation_details.as_deref(), Some("alpha: 1,000"));
        assert_eq!(items[1].calculation_details.as_deref(), Some("beta: 2,000"));
        assert!(provider.prompts()[0].contains("ledger text"));
    }

    #[tokio::test]
    async fn test_no_candidates_issues_no_calls() {
        let provider = Arc::new(ScriptedProvider::new());
        let gateway = LlmGateway::new(provider.clone(), Duration::from_secs(5));
        let mut ctx = context("ledger text", 1000.0);

        let report = CalculateAmounts::new(3000, 4)
            .execute(&mut ctx, &gateway)
            .await
            .unwrap();

        assert_eq!(report.calls, 0);
        assert_eq!(provider.call_count(), 0);
        assert!(matches!(
            ctx.processed_adjustments,
            ProcessedAdjustments::Calculated(ref items) if items.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_failed_call_aborts_stage() {
        let provider = Arc::new(ScriptedProvider::new().fail_on(
            "Beta",
            LlmError::Network {
                message: "connection reset".into(),
            },
        ));
        let gateway = LlmGateway::new(provider, Duration::from_secs(5));
        let mut ctx = context("ledger text", 1000.0);
        ctx.identified_adjustments = vec![candidate("Alpha"), candidate("Beta")];

        let err = CalculateAmounts::new(3000, 1)
            .execute(&mut ctx, &gateway)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::Generation {
                stage: StageName::CalculateAmounts,
                ..
            }
        ));
    }
}
