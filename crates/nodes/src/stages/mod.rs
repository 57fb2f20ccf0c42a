//! The five stage implementations, in pipeline order.
//!
//! | Stage | Reads | Writes | Calls |
//! |-------|-------|--------|-------|
//! | [`AnalyzeDocument`] | document content, type | `analysis` | 1 |
//! | [`IdentifyAdjustments`] | `analysis`, project | `identified_adjustments` | 1 |
//! | [`CalculateAmounts`] | candidates, document content | `Calculated` | 1 per candidate |
//! | [`GenerateNarratives`] | `Calculated` | `Suggested` | 1 per candidate |
//! | [`ApplyMateriality`] | `Suggested`, threshold | `Suggested` (filtered) | 0 |

pub mod analyze;
pub mod calculate;
pub mod identify;
pub mod materiality;
pub mod narrate;

pub use analyze::AnalyzeDocument;
pub use calculate::CalculateAmounts;
pub use identify::IdentifyAdjustments;
pub use materiality::{apply_threshold, ApplyMateriality};
pub use narrate::GenerateNarratives;

#[cfg(test)]
pub(crate) mod test_support {
    use pipeline::{
        AnalysisContext, ClientName, DocumentType, MaterialityAmount, MaterialityPercentage,
        ProjectContext, ProjectName,
    };

    pub(crate) fn project(threshold: f64) -> ProjectContext {
        ProjectContext::new(
            ProjectName::new("Project Falcon").unwrap(),
            ClientName::new("Acme Corp").unwrap(),
            MaterialityAmount::new(threshold).unwrap(),
            MaterialityPercentage::new(3.0).unwrap(),
        )
    }

    pub(crate) fn context(content: &str, threshold: f64) -> AnalysisContext {
        AnalysisContext::new(content, DocumentType::ProfitAndLoss, project(threshold))
    }
}
