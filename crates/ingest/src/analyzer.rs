//! Running the pipeline for one extracted document.

use std::sync::Arc;

use nodes::AdjustmentPipeline;
use pipeline::{
    AdjustmentSuggestion, AnalysisContext, AnalysisRunId, Degradation, DocumentId, DocumentType,
    ProjectContext, RetryPolicy, Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::classify::classify_document;

/// Characters of extracted text kept for analysis.
pub const RAW_TEXT_CHAR_LIMIT: usize = 10_000;

/// Text already extracted from an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub id: Option<DocumentId>,
    pub filename: String,
    pub text: String,
    /// Overrides classification when set.
    pub document_type: Option<DocumentType>,
}

impl ExtractedDocument {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            filename: filename.into(),
            text: text.into(),
            document_type: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed,
    Failed,
}

/// What the analysis of one document produced, ready to be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    pub filename: String,
    pub document_type: DocumentType,
    pub status: AnalysisStatus,
    /// Absent when the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<AnalysisRunId>,
    /// Material suggestions in identification order; empty on failure.
    pub adjustments: Vec<AdjustmentSuggestion>,
    /// Candidates found by identification, before calculation and the
    /// materiality filter. The number kept is `adjustments.len()`.
    pub candidates_identified: usize,
    pub degradations: Vec<Degradation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub analyzed_at: Timestamp,
}

/// Runs the shared pipeline for individual documents.
#[derive(Debug, Clone)]
pub struct DocumentAnalyzer {
    pipeline: Arc<AdjustmentPipeline>,
}

impl DocumentAnalyzer {
    pub fn new(pipeline: Arc<AdjustmentPipeline>) -> Self {
        Self { pipeline }
    }

    /// Analyses `document` for `project`.
    ///
    /// Never fails: a pipeline error is logged and returned as a
    /// [`AnalysisStatus::Failed`] record with no adjustments.
    pub async fn analyze(
        &self,
        document: ExtractedDocument,
        project: ProjectContext,
    ) -> DocumentAnalysis {
        let document_type = document
            .document_type
            .unwrap_or_else(|| classify_document(&document.filename, &document.text));
        let text = cap_chars(document.text, RAW_TEXT_CHAR_LIMIT);
        tracing::info!(
            document_id = document.id.map(|id| id.as_u64()),
            filename = %document.filename,
            document_type = document_type.as_str(),
            chars = text.chars().count(),
            "analysing document"
        );

        let context = AnalysisContext::new(text, document_type, project);
        match self.pipeline.run(context).await {
            Ok(outcome) => {
                let candidates_identified = outcome.context.identified_adjustments.len();
                let degradations = outcome.context.degradations.clone();
                let run_id = outcome.run_id;
                let adjustments = outcome.context.into_suggestions();
                tracing::info!(
                    run_id = %run_id,
                    adjustments = adjustments.len(),
                    candidates_identified,
                    "document analysis completed"
                );
                DocumentAnalysis {
                    document_id: document.id,
                    filename: document.filename,
                    document_type,
                    status: AnalysisStatus::Completed,
                    run_id: Some(run_id),
                    adjustments,
                    candidates_identified,
                    degradations,
                    error: None,
                    analyzed_at: Timestamp::now(),
                }
            }
            Err(err) => {
                tracing::error!(
                    filename = %document.filename,
                    error = %err,
                    retryable = matches!(err.retry_policy(), RetryPolicy::Retryable { .. }),
                    "document analysis failed"
                );
                DocumentAnalysis {
                    document_id: document.id,
                    filename: document.filename,
                    document_type,
                    status: AnalysisStatus::Failed,
                    run_id: None,
                    adjustments: Vec::new(),
                    candidates_identified: 0,
                    degradations: Vec::new(),
                    error: Some(err.to_string()),
                    analyzed_at: Timestamp::now(),
                }
            }
        }
    }
}

fn cap_chars(mut text: String, max_chars: usize) -> String {
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_chars() {
        assert_eq!(cap_chars("abcdef".into(), 4), "abcd");
        assert_eq!(cap_chars("ab".into(), 4), "ab");
        assert_eq!(cap_chars("ééé".into(), 2), "éé");
    }
}
