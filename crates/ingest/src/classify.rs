//! Keyword-based document type inference.

use pipeline::DocumentType;

const FILENAME_RULES: &[(DocumentType, &[&str])] = &[
    (DocumentType::GeneralLedger, &["gl", "general", "ledger"]),
    (DocumentType::ProfitAndLoss, &["p&l", "profit", "loss", "income"]),
    (DocumentType::Payroll, &["payroll", "salary", "wages"]),
    (DocumentType::TrialBalance, &["trial", "balance"]),
];

const CONTENT_RULES: &[(DocumentType, &[&str])] = &[
    (
        DocumentType::GeneralLedger,
        &["general ledger", "account", "debit", "credit"],
    ),
    (
        DocumentType::ProfitAndLoss,
        &["revenue", "expense", "profit", "loss", "ebitda"],
    ),
];

/// Infers the document type from its filename, then its content.
///
/// Matching is case-insensitive substring search. Filename rules win over
/// content rules, and within each set the first matching type wins, so
/// `"global_payroll.csv"` is a general ledger (`"gl"`).
pub fn classify_document(filename: &str, content: &str) -> DocumentType {
    let filename = filename.to_lowercase();
    if let Some(kind) = first_match(FILENAME_RULES, &filename) {
        return kind;
    }
    let content = content.to_lowercase();
    first_match(CONTENT_RULES, &content).unwrap_or(DocumentType::Other)
}

fn first_match(rules: &[(DocumentType, &[&str])], haystack: &str) -> Option<DocumentType> {
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(kind, _)| *kind)
}
