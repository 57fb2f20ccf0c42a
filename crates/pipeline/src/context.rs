//! The analysis context threaded through every pipeline stage.
//!
//! An [`AnalysisContext`] is created fresh for one document, owned exclusively
//! by the run that created it, and mutated monotonically stage by stage:
//!
//! | After stage | Populated |
//! |-------------|-----------|
//! | `analyze_document` | [`AnalysisContext::analysis`] |
//! | `identify_adjustments` | [`AnalysisContext::identified_adjustments`] |
//! | `calculate_amounts` | [`ProcessedAdjustments::Calculated`] |
//! | `generate_narratives` | [`ProcessedAdjustments::Suggested`] |
//! | `apply_materiality` | [`ProcessedAdjustments::Suggested`], filtered |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::AdjustmentSuggestion;
use crate::types::{DocumentType, MaterialityAmount, MaterialityPercentage};
use crate::{ClientName, ProjectName};

// ---------------------------------------------------------------------------
// Stage names
// ---------------------------------------------------------------------------

/// The five stages of the fixed linear pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    AnalyzeDocument,
    IdentifyAdjustments,
    CalculateAmounts,
    GenerateNarratives,
    ApplyMateriality,
}

impl StageName {
    /// Returns the snake_case name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::AnalyzeDocument => "analyze_document",
            StageName::IdentifyAdjustments => "identify_adjustments",
            StageName::CalculateAmounts => "calculate_amounts",
            StageName::GenerateNarratives => "generate_narratives",
            StageName::ApplyMateriality => "apply_materiality",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Project snapshot
// ---------------------------------------------------------------------------

/// Immutable snapshot of the engagement a document belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project_name: ProjectName,
    pub client_name: ClientName,
    pub materiality_amount: MaterialityAmount,
    pub materiality_percentage: MaterialityPercentage,

    /// Earnings figure (typically EBITDA) the materiality percentage applies to.
    ///
    /// Only consulted when percentage-based filtering is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earnings_base: Option<f64>,
}

impl ProjectContext {
    /// Creates a snapshot without an earnings base.
    pub fn new(
        project_name: ProjectName,
        client_name: ClientName,
        materiality_amount: MaterialityAmount,
        materiality_percentage: MaterialityPercentage,
    ) -> Self {
        Self {
            project_name,
            client_name,
            materiality_amount,
            materiality_percentage,
            earnings_base: None,
        }
    }

    /// Attaches the earnings base used by percentage-based materiality.
    #[must_use]
    pub fn with_earnings_base(mut self, base: f64) -> Self {
        self.earnings_base = base.is_finite().then_some(base);
        self
    }
}

// ---------------------------------------------------------------------------
// Candidate adjustments
// ---------------------------------------------------------------------------

/// A loosely structured adjustment candidate as returned by the model.
///
/// The model is free to add fields (impact estimates, confidence, evidence);
/// only the type tag, title, and description are interpreted by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateAdjustment {
    /// Every field the model returned, preserved verbatim.
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// Raw calculation text attached by `calculate_amounts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_details: Option<String>,
}

impl CandidateAdjustment {
    /// Wraps a JSON object returned by the model.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            calculation_details: None,
        }
    }

    /// The candidate's type tag (`type`, or `adjustment_type` as written by some models).
    pub fn type_tag(&self) -> Option<&str> {
        self.str_field("type")
            .or_else(|| self.str_field("adjustment_type"))
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field("description")
    }

    /// Returns the candidate as a single JSON object, calculation text included.
    pub fn to_value(&self) -> Value {
        let mut fields = self.fields.clone();
        if let Some(details) = &self.calculation_details {
            fields.insert(
                "calculation_details".to_string(),
                Value::String(details.clone()),
            );
        }
        Value::Object(fields)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Processed adjustments
// ---------------------------------------------------------------------------

/// The progressively replaced adjustment list.
///
/// Each variant is only ever produced by one stage, so a stage can tell from
/// the variant alone whether its predecessor has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "items", rename_all = "snake_case")]
pub enum ProcessedAdjustments {
    /// Nothing processed yet.
    #[default]
    Pending,
    /// Candidates annotated with calculation text by `calculate_amounts`.
    Calculated(Vec<CandidateAdjustment>),
    /// Fully typed suggestions from `generate_narratives`, possibly filtered.
    Suggested(Vec<AdjustmentSuggestion>),
}

impl ProcessedAdjustments {
    /// Number of entries in whichever state the list is in.
    pub fn len(&self) -> usize {
        match self {
            ProcessedAdjustments::Pending => 0,
            ProcessedAdjustments::Calculated(items) => items.len(),
            ProcessedAdjustments::Suggested(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The suggestions, if narratives have been generated.
    pub fn suggestions(&self) -> Option<&[AdjustmentSuggestion]> {
        match self {
            ProcessedAdjustments::Suggested(items) => Some(items),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Degradations
// ---------------------------------------------------------------------------

/// Record of a model response that did not parse and was replaced by a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub stage: StageName,

    /// Position of the affected candidate, for per-candidate stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_index: Option<usize>,

    pub reason: String,
}

// ---------------------------------------------------------------------------
// The context
// ---------------------------------------------------------------------------

/// Mutable record passed by reference through the five stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Full extracted text of the source document.
    pub document_content: String,
    pub document_type: DocumentType,
    pub project_context: ProjectContext,

    /// Copied from [`ProjectContext::materiality_amount`] at construction.
    pub materiality_threshold: MaterialityAmount,
    /// Copied from [`ProjectContext::materiality_percentage`] at construction.
    pub materiality_percentage: MaterialityPercentage,

    /// Free-text output of `analyze_document`; `None` until that stage completes.
    pub analysis: Option<String>,

    /// Candidates from `identify_adjustments`, in the order the model listed them.
    pub identified_adjustments: Vec<CandidateAdjustment>,

    pub processed_adjustments: ProcessedAdjustments,

    /// Parse failures recovered during this run.
    pub degradations: Vec<Degradation>,
}

impl AnalysisContext {
    /// Builds the initial context for one document; all stage outputs start empty.
    pub fn new(
        document_content: impl Into<String>,
        document_type: DocumentType,
        project_context: ProjectContext,
    ) -> Self {
        Self {
            document_content: document_content.into(),
            document_type,
            materiality_threshold: project_context.materiality_amount,
            materiality_percentage: project_context.materiality_percentage,
            project_context,
            analysis: None,
            identified_adjustments: Vec::new(),
            processed_adjustments: ProcessedAdjustments::Pending,
            degradations: Vec::new(),
        }
    }

    /// Records a recovered parse failure and emits it as a structured warning.
    pub fn record_degradation(
        &mut self,
        stage: StageName,
        candidate_index: Option<usize>,
        reason: impl Into<String>,
    ) {
        let reason = reason.into();
        tracing::warn!(
            stage = stage.as_str(),
            candidate_index,
            reason = %reason,
            degraded = true,
            "model output did not parse; using fallback"
        );
        self.degradations.push(Degradation {
            stage,
            candidate_index,
            reason,
        });
    }

    /// Consumes the context and returns the final suggestions.
    ///
    /// Returns an empty list if narratives were never generated.
    pub fn into_suggestions(self) -> Vec<AdjustmentSuggestion> {
        match self.processed_adjustments {
            ProcessedAdjustments::Suggested(items) => items,
            _ => Vec::new(),
        }
    }
}
