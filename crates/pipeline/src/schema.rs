//! The adjustment suggestion schema and the structured-output parser.
//!
//! Model output is free text. The parser locates a JSON block inside it
//! (fenced or bare), decodes it, and validates it against
//! [`AdjustmentSuggestion`]. Anything that does not fit becomes a
//! [`ParseError`], which stages turn into a [`ParseOutcome::Degraded`] rather
//! than a failure.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::context::CandidateAdjustment;
use crate::errors::ParseError;
use crate::types::{AdjustmentType, ConfidenceScore, PrecisionScore};

/// Calculation method recorded on suggestions synthesised from unparseable output.
pub const MANUAL_REVIEW_METHOD: &str = "Manual review required";

/// Title used when neither the model nor the candidate supplied one.
pub const UNKNOWN_TITLE: &str = "Unknown Adjustment";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A fully typed quality-of-earnings adjustment suggestion.
///
/// This is the terminal record handed to the persistence collaborator. Both
/// scores are guaranteed to lie in `[0.0, 1.0]` and `amount` is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentSuggestion {
    pub adjustment_type: AdjustmentType,
    pub title: String,
    pub description: String,

    /// Signed monetary value of the adjustment.
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,

    pub confidence_score: ConfidenceScore,
    pub precision_score: PrecisionScore,

    /// Free-text justification of the adjustment.
    pub narrative: String,

    /// Opaque evidence payload. Defaults to an empty object when the model omits it.
    #[serde(default = "empty_object")]
    pub source_data: Value,

    pub calculation_method: String,
}

impl AdjustmentSuggestion {
    /// Synthesises the suggestion used when the model's output did not parse.
    ///
    /// Keeps the candidate's own type, title, and description, zeroes the
    /// amount, sets both scores to their neutral `0.5`, and preserves the raw model text as
    /// the narrative so a reviewer can still read it.
    pub fn fallback(candidate: &CandidateAdjustment, raw_response: &str) -> Self {
        Self {
            adjustment_type: candidate
                .type_tag()
                .map(AdjustmentType::from_tag)
                .unwrap_or(AdjustmentType::Other),
            title: candidate.title().unwrap_or(UNKNOWN_TITLE).to_string(),
            description: candidate.description().unwrap_or_default().to_string(),
            amount: 0.0,
            confidence_score: ConfidenceScore::NEUTRAL,
            precision_score: PrecisionScore::NEUTRAL,
            narrative: raw_response.to_string(),
            source_data: candidate.to_value(),
            calculation_method: MANUAL_REVIEW_METHOD.to_string(),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Accepts a JSON number or a numeric string such as `"$12,000"` or `"(3,500.00)"`.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
    }

    let value = match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(n) => n,
        RawAmount::Text(text) => parse_money(&text)
            .ok_or_else(|| de::Error::custom(format!("amount '{text}' is not numeric")))?,
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(de::Error::custom("amount must be finite"))
    }
}

/// Reads a single money value such as `"$1,250.50"`, `"-3000"`, `"(60,000)"`
/// or `"USD (60,000)"`. Parentheses mean negative.
///
/// Ranges, several numbers, exponents, and surrounding words are rejected.
fn parse_money(text: &str) -> Option<f64> {
    let text = strip_currency(text.trim());
    let (parenthesised, text) = match text.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, strip_currency(inner.trim())),
        None => (false, text),
    };
    let (minus, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if parenthesised && minus {
        return None;
    }
    let value = parse_grouped_number(strip_currency(text))?;
    Some(if parenthesised || minus { -value } else { value })
}

/// Drops an optional ISO currency code and an optional currency symbol.
fn strip_currency(text: &str) -> &str {
    let text = match text.get(..3) {
        Some(code) if code.bytes().all(|b| b.is_ascii_uppercase()) => text[3..].trim_start(),
        _ => text,
    };
    text.strip_prefix(&['$', '€', '£', '¥'][..])
        .unwrap_or(text)
        .trim_start()
}

/// Digits with optional comma grouping in threes and an optional decimal part.
fn parse_grouped_number(text: &str) -> Option<f64> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit() || b == b',') {
        return None;
    }
    if whole.contains(',') {
        let mut groups = whole.split(',');
        let lead = groups.next().unwrap_or_default();
        if lead.is_empty() || lead.len() > 3 || !groups.all(|g| g.len() == 3) {
            return None;
        }
    }
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    text.replace(',', "").parse().ok()
}

// ---------------------------------------------------------------------------
// Parse outcome
// ---------------------------------------------------------------------------

/// Result of interpreting one model response.
///
/// `Degraded` is not an error: the stage continues with a fallback, but keeps
/// the raw text and the reason so the degradation can be observed.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    Degraded { raw: String, reason: ParseError },
}

impl<T> ParseOutcome<T> {
    /// Wraps a parser result, keeping `raw` only when parsing failed.
    pub fn from_result(raw: &str, result: Result<T, ParseError>) -> Self {
        match result {
            Ok(value) => ParseOutcome::Parsed(value),
            Err(reason) => ParseOutcome::Degraded {
                raw: raw.to_string(),
                reason,
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ParseOutcome::Degraded { .. })
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// Parses a model response as a list of candidate adjustments.
///
/// The located JSON must be an array whose every element is an object.
pub fn parse_candidate_list(text: &str) -> Result<Vec<CandidateAdjustment>, ParseError> {
    let Value::Array(items) = locate_json(text, '[', ']')? else {
        return Err(ParseError::NotAList);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(CandidateAdjustment::from_fields(fields)),
            _ => Err(ParseError::InvalidEntry { index }),
        })
        .collect()
}

/// Parses a model response as a single [`AdjustmentSuggestion`].
pub fn parse_suggestion(text: &str) -> Result<AdjustmentSuggestion, ParseError> {
    let value = locate_json(text, '{', '}')?;
    serde_json::from_value(value).map_err(|e| ParseError::SchemaMismatch {
        message: e.to_string(),
    })
}

/// Decodes the first JSON payload found in free text.
///
/// Candidates are tried in order: a ```` ```json ```` fence, then any fence,
/// then the widest span between the first `open` and the last `close`
/// delimiter. A fence that does not decode falls through to the next one.
fn locate_json(text: &str, open: char, close: char) -> Result<Value, ParseError> {
    let text = text.trim();
    let candidates = [
        fenced(text, "```json"),
        any_fence(text),
        bracket_span(text, open, close),
    ];

    let mut first_error = None;
    for block in candidates.into_iter().flatten() {
        match serde_json::from_str(block) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(ParseError::InvalidJson {
                    message: e.to_string(),
                });
            }
        }
    }
    Err(first_error.unwrap_or(ParseError::NoStructuredContent))
}

fn fenced<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let end = text[start..].find("```")?;
    non_empty(&text[start..start + end])
}

fn any_fence(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    // Skip a language identifier if present.
    let start = text[start..]
        .find('\n')
        .map(|i| start + i + 1)
        .unwrap_or(start);
    let end = text[start..].find("```")?;
    non_empty(&text[start..start + end])
}

fn bracket_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    non_empty(&text[start..=end])
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// Instructions appended to the narrative prompt describing the expected JSON shape.
pub fn format_instructions() -> String {
    let schema = json!({
        "type": "object",
        "properties": {
            "adjustment_type": {
                "type": "string",
                "enum": AdjustmentType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
                "description": "Type of adjustment identified"
            },
            "title": { "type": "string", "description": "Brief title for the adjustment" },
            "description": { "type": "string", "description": "Detailed description of the adjustment" },
            "amount": { "type": "number", "description": "Monetary amount of the adjustment" },
            "confidence_score": { "type": "number", "minimum": 0, "maximum": 1, "description": "Confidence that this is a real adjustment (0-1)" },
            "precision_score": { "type": "number", "minimum": 0, "maximum": 1, "description": "Precision of the calculated amount (0-1)" },
            "narrative": { "type": "string", "description": "Professional narrative justification" },
            "source_data": { "type": "object", "description": "Source data that led to this adjustment" },
            "calculation_method": { "type": "string", "description": "How the amount was calculated" }
        },
        "required": [
            "adjustment_type", "title", "description", "amount", "confidence_score",
            "precision_score", "narrative", "source_data", "calculation_method"
        ]
    });
    let rendered = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "The output must be a single JSON object conforming to the JSON schema below. \
         Respond with the JSON object only.\n\n```json\n{rendered}\n```"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "adjustment_type": "severance",
        "title": "Executive Severance",
        "description": "One-time severance paid to the former CFO",
        "amount": 12000,
        "confidence_score": 0.9,
        "precision_score": 0.8,
        "narrative": "The payment is non-recurring.",
        "source_data": {"account": "6100"},
        "calculation_method": "Sum of GL postings"
    }"#;

    fn candidate(value: Value) -> CandidateAdjustment {
        match value {
            Value::Object(map) => CandidateAdjustment::from_fields(map),
            _ => panic!("candidate must be an object"),
        }
    }

    #[test]
    fn test_parse_suggestion_plain_json() {
        let s = parse_suggestion(VALID).unwrap();
        assert_eq!(s.adjustment_type, AdjustmentType::Severance);
        assert_eq!(s.amount, 12000.0);
        assert_eq!(s.confidence_score.as_f64(), 0.9);
        assert_eq!(s.source_data, json!({"account": "6100"}));
    }

    #[test]
    fn test_parse_suggestion_inside_prose_and_fence() {
        let fenced = format!("Here is the adjustment:\n```json\n{VALID}\n```\nThanks.");
        assert!(parse_suggestion(&fenced).is_ok());

        let bare = format!("Sure! {VALID} Let me know if you need more.");
        assert!(parse_suggestion(&bare).is_ok());
    }

    #[test]
    fn test_parse_suggestion_skips_non_json_fence() {
        let text = format!("```text\nThe fee recurs monthly.\n```\nResult: {VALID}");
        assert_eq!(parse_suggestion(&text).unwrap().amount, 12000.0);

        let list = "```\nnotes only\n```\n[{\"type\": \"severance\"}]";
        assert_eq!(parse_candidate_list(list).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_suggestion_coerces_string_amounts() {
        let text = VALID.replace("12000", "\"(12,000.50)\"");
        let s = parse_suggestion(&text).unwrap();
        assert_eq!(s.amount, -12000.5);

        let dollars = VALID.replace("12000", "\"$7,500\"");
        assert_eq!(parse_suggestion(&dollars).unwrap().amount, 7500.0);

        let labelled = VALID.replace("12000", "\"USD $(60,000)\"");
        assert_eq!(parse_suggestion(&labelled).unwrap().amount, -60000.0);

        let signed = VALID.replace("12000", "\"-$3,000\"");
        assert_eq!(parse_suggestion(&signed).unwrap().amount, -3000.0);
    }

    #[test]
    fn test_parse_suggestion_rejects_ambiguous_amount_strings() {
        for amount in [
            "$12,000 to $15,000",
            "approx. 5,000",
            "between 10,000 and 12,000",
            "1e5",
            "Q4 2023: 12,000",
            "12,000 USD per year",
            "1,2345",
            "-(500)",
            "",
        ] {
            let text = VALID.replace("12000", &format!("\"{amount}\""));
            assert!(
                matches!(parse_suggestion(&text), Err(ParseError::SchemaMismatch { .. })),
                "amount {amount:?} should not parse"
            );
        }
    }

    #[test]
    fn test_parse_suggestion_rejects_out_of_range_scores() {
        let text = VALID.replace("0.9", "90");
        assert!(matches!(
            parse_suggestion(&text),
            Err(ParseError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_suggestion_missing_field_is_schema_mismatch() {
        let text = r#"{"title": "Only a title"}"#;
        assert!(matches!(
            parse_suggestion(text),
            Err(ParseError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_suggestion_defaults_source_data() {
        let text = VALID.replace(r#""source_data": {"account": "6100"},"#, "");
        let s = parse_suggestion(&text).unwrap();
        assert_eq!(s.source_data, json!({}));
    }

    #[test]
    fn test_parse_suggestion_prose_only() {
        assert_eq!(
            parse_suggestion("I could not determine the amount."),
            Err(ParseError::NoStructuredContent)
        );
        assert!(matches!(
            parse_suggestion("{ amount: twelve }"),
            Err(ParseError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_parse_candidate_list_accepts_array_of_objects() {
        let text = r#"```json
[{"type": "severance", "title": "A"}, {"type": "bad_debt", "title": "B"}]
```"#;
        let list = parse_candidate_list(text).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].title(), Some("B"));
    }

    #[test]
    fn test_parse_candidate_list_rejects_non_lists() {
        assert_eq!(
            parse_candidate_list("```json\n{\"adjustments\": []}\n```"),
            Err(ParseError::NotAList)
        );
        assert_eq!(
            parse_candidate_list(r#"[{"type": "other"}, 3]"#),
            Err(ParseError::InvalidEntry { index: 1 })
        );
        assert_eq!(
            parse_candidate_list("No adjustments found."),
            Err(ParseError::NoStructuredContent)
        );
    }

    #[test]
    fn test_parse_candidate_list_empty_array() {
        assert!(parse_candidate_list("[]").unwrap().is_empty());
    }

    #[test]
    fn test_fallback_keeps_candidate_identity() {
        let c = candidate(json!({ "type": "severance", "title": "Executive Severance" }));
        let s = AdjustmentSuggestion::fallback(&c, "raw model text");
        assert_eq!(s.adjustment_type, AdjustmentType::Severance);
        assert_eq!(s.title, "Executive Severance");
        assert_eq!(s.description, "");
        assert_eq!(s.amount, 0.0);
        assert_eq!(s.confidence_score.as_f64(), 0.5);
        assert_eq!(s.precision_score.as_f64(), 0.5);
        assert_eq!(s.narrative, "raw model text");
        assert_eq!(s.calculation_method, MANUAL_REVIEW_METHOD);
        assert_eq!(s.source_data, c.to_value());
    }

    #[test]
    fn test_fallback_defaults_for_bare_candidate() {
        let s = AdjustmentSuggestion::fallback(&CandidateAdjustment::default(), "");
        assert_eq!(s.adjustment_type, AdjustmentType::Other);
        assert_eq!(s.title, UNKNOWN_TITLE);
    }

    #[test]
    fn test_format_instructions_lists_catalog() {
        let text = format_instructions();
        assert!(text.contains("executive_compensation"));
        assert!(text.contains("calculation_method"));
    }

    #[test]
    fn test_parse_outcome_keeps_raw_only_on_failure() {
        let ok: ParseOutcome<u8> = ParseOutcome::from_result("x", Ok(1));
        assert_eq!(ok, ParseOutcome::Parsed(1));
        let bad: ParseOutcome<u8> =
            ParseOutcome::from_result("raw", Err(ParseError::NoStructuredContent));
        assert!(bad.is_degraded());
    }
}
