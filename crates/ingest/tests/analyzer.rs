//! Document intake against a scripted provider.

use std::sync::Arc;

use ingest::{AnalysisStatus, DocumentAnalyzer, ExtractedDocument, RAW_TEXT_CHAR_LIMIT};
use nodes::AdjustmentPipeline;
use pipeline::testing::ScriptedProvider;
use pipeline::{
    ClientName, DocumentId, DocumentType, LlmError, MaterialityAmount, MaterialityPercentage,
    PipelineConfig, ProjectContext, ProjectName,
};
use serde_json::json;

fn project() -> ProjectContext {
    ProjectContext::new(
        ProjectName::new("Project Heron").unwrap(),
        ClientName::new("Heron Foods Ltd").unwrap(),
        MaterialityAmount::new(1000.0).unwrap(),
        MaterialityPercentage::new(3.0).unwrap(),
    )
}

fn analyzer(provider: ScriptedProvider) -> (DocumentAnalyzer, Arc<ScriptedProvider>) {
    analyzer_with(provider, PipelineConfig::default())
}

fn analyzer_with(
    provider: ScriptedProvider,
    config: PipelineConfig,
) -> (DocumentAnalyzer, Arc<ScriptedProvider>) {
    let provider = Arc::new(provider);
    let pipeline = AdjustmentPipeline::new(provider.clone(), config).unwrap();
    (DocumentAnalyzer::new(Arc::new(pipeline)), provider)
}

#[tokio::test]
async fn test_completed_analysis_carries_suggestions() {
    let suggestion = json!({
        "adjustment_type": "related_party",
        "title": "Management fee to parent",
        "description": "Annual fee charged by the parent company",
        "amount": "$(60,000)",
        "confidence_score": 0.9,
        "precision_score": 0.8,
        "narrative": "The fee will not continue post-transaction.",
        "calculation_method": "12 x 5,000 monthly invoices"
    });
    let (analyzer, provider) = analyzer(
        ScriptedProvider::new()
            .on("Document type:", "Monthly management fee paid to parent.")
            .on(
                "Identify potential",
                r#"[{"type":"related_party","title":"Management fee to parent"}]"#,
            )
            .on("Calculate the monetary amount", "5,000 x 12 = 60,000")
            .on("Write a professional narrative", suggestion.to_string()),
    );

    let analysis = analyzer
        .analyze(
            ExtractedDocument::new("Heron_PnL_Income_2023.csv", "Revenue 2,000,000")
                .with_id(DocumentId::new(42)),
            project(),
        )
        .await;

    assert_eq!(analysis.status, AnalysisStatus::Completed);
    assert_eq!(analysis.document_type, DocumentType::ProfitAndLoss);
    assert_eq!(analysis.document_id, Some(DocumentId::new(42)));
    assert_eq!(analysis.candidates_identified, 1);
    assert_eq!(analysis.adjustments.len(), 1);
    assert_eq!(analysis.adjustments[0].amount, -60000.0);
    assert!(analysis.run_id.is_some());
    assert!(analysis.error.is_none());
    assert!(provider.prompts()[1].contains("Heron Foods Ltd"));
}

#[tokio::test]
async fn test_pipeline_failure_is_recorded_not_raised() {
    let (analyzer, _) = analyzer(ScriptedProvider::new().fail_on(
        "Document type:",
        LlmError::Network {
            message: "dns lookup failed".into(),
        },
    ));

    let analysis = analyzer
        .analyze(ExtractedDocument::new("ledger.csv", "Account,Debit,Credit"), project())
        .await;

    assert_eq!(analysis.status, AnalysisStatus::Failed);
    assert_eq!(analysis.document_type, DocumentType::GeneralLedger);
    assert!(analysis.adjustments.is_empty());
    assert!(analysis.run_id.is_none());
    assert!(analysis.error.as_deref().unwrap().contains("dns lookup failed"));
}

#[tokio::test]
async fn test_text_is_capped_before_analysis() {
    let config = PipelineConfig {
        analysis_char_budget: 2 * RAW_TEXT_CHAR_LIMIT,
        ..PipelineConfig::default()
    };
    let (analyzer, provider) =
        analyzer_with(ScriptedProvider::new().on("Identify potential", "[]"), config);
    let kept = format!("{}Y", "x".repeat(RAW_TEXT_CHAR_LIMIT - 1));
    let text = format!("{kept}END-OF-DOCUMENT");

    let analysis = analyzer
        .analyze(
            ExtractedDocument::new("notes.txt", text).with_document_type(DocumentType::Other),
            project(),
        )
        .await;

    assert_eq!(analysis.status, AnalysisStatus::Completed);
    assert_eq!(analysis.document_type, DocumentType::Other);
    let prompts = provider.prompts();
    let prompt = &prompts[0];
    assert!(prompt.contains(&kept));
    assert!(!prompt.contains("END-OF-DOCUMENT"));
}

#[tokio::test]
async fn test_record_serialises_with_snake_case_tags() {
    let (analyzer, _) = analyzer(ScriptedProvider::new().on("Identify potential", "[]"));
    let analysis = analyzer
        .analyze(ExtractedDocument::new("payroll_q4.xlsx", "Name,Salary"), project())
        .await;

    let value = serde_json::to_value(&analysis).unwrap();
    assert_eq!(value["status"], "completed");
    assert_eq!(value["document_type"], "payroll");
    assert_eq!(value["adjustments"], json!([]));
    assert_eq!(value["candidates_identified"], 0);
}
