//! Stage 1: free-text analysis of the document.

use async_trait::async_trait;
use pipeline::{AnalysisContext, AnalysisError, StageName};

use crate::gateway::LlmGateway;
use crate::prompts;
use crate::stage::{PipelineStage, StageReport};

/// Asks the model for a prose analysis of the (truncated) document.
///
/// The response is stored verbatim in [`AnalysisContext::analysis`]; it is not
/// parsed or validated.
#[derive(Debug, Clone)]
pub struct AnalyzeDocument {
    char_budget: usize,
}

impl AnalyzeDocument {
    /// `char_budget` caps how much of the document is sent to the model.
    pub fn new(char_budget: usize) -> Self {
        Self { char_budget }
    }
}

#[async_trait]
impl PipelineStage for AnalyzeDocument {
    fn name(&self) -> StageName {
        StageName::AnalyzeDocument
    }

    async fn execute(
        &self,
        context: &mut AnalysisContext,
        gateway: &LlmGateway,
    ) -> Result<StageReport, AnalysisError> {
        let excerpt = prompts::truncate_chars(&context.document_content, self.char_budget);
        let document_type = format!(
            "{} ({})",
            context.document_type.label(),
            context.document_type.as_str()
        );
        let prompt = prompts::analyze_document(&document_type, excerpt);

        let analysis = gateway.generate(self.name(), prompt).await?;
        tracing::info!(analysis_chars = analysis.chars().count(), "document analysed");
        context.analysis = Some(analysis);

        Ok(StageReport {
            calls: 1,
            ..StageReport::default()
        })
    }
}
