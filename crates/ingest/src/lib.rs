//! Document intake for quality-of-earnings analysis.
//!
//! The pipeline's caller: it infers a document's type, caps the text that is
//! analysed, builds the initial [`pipeline::AnalysisContext`] from the project,
//! runs the [`nodes::AdjustmentPipeline`], and turns the result into a
//! [`DocumentAnalysis`] record. A failed run never escapes as an error; it is
//! recorded as [`AnalysisStatus::Failed`] so the document itself is kept.
//!
//! ## Architectural Layer
//!
//! **Application service.** Text extraction from PDF/Excel/CSV and persistence
//! are outside this crate; callers hand in already-extracted text and store the
//! returned record.

pub mod analyzer;
pub mod classify;

pub use analyzer::{
    AnalysisStatus, DocumentAnalysis, DocumentAnalyzer, ExtractedDocument, RAW_TEXT_CHAR_LIMIT,
};
pub use classify::classify_document;
