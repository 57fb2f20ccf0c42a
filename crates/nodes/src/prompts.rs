//! Prompt templates and rendering.
//!
//! Templates are plain Markdown files under `prompts/`, embedded at compile
//! time. Placeholders have the form `{name}` and are substituted in a single
//! pass, so text inserted for one placeholder (document content, model output)
//! is never itself scanned for placeholders.

const ANALYZE_DOCUMENT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/analyze_document.md"
));
const IDENTIFY_ADJUSTMENTS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/identify_adjustments.md"
));
const CALCULATE_AMOUNTS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/calculate_amounts.md"
));
const GENERATE_NARRATIVE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/generate_narrative.md"
));

pub(crate) fn analyze_document(document_type: &str, document_content: &str) -> String {
    render(
        ANALYZE_DOCUMENT,
        &[
            ("document_type", document_type),
            ("document_content", document_content),
        ],
    )
}

pub(crate) fn identify_adjustments(
    analysis: &str,
    project_context: &str,
    adjustment_types: &str,
) -> String {
    render(
        IDENTIFY_ADJUSTMENTS,
        &[
            ("analysis", analysis),
            ("project_context", project_context),
            ("adjustment_types", adjustment_types),
        ],
    )
}

pub(crate) fn calculate_amounts(adjustment: &str, document_content: &str) -> String {
    render(
        CALCULATE_AMOUNTS,
        &[
            ("adjustment", adjustment),
            ("document_content", document_content),
        ],
    )
}

pub(crate) fn generate_narrative(
    adjustment: &str,
    calculation_details: &str,
    format_instructions: &str,
) -> String {
    render(
        GENERATE_NARRATIVE,
        &[
            ("adjustment", adjustment),
            ("calculation_details", calculation_details),
            ("format_instructions", format_instructions),
        ],
    )
}

/// Substitutes `{name}` placeholders from `values` in one left-to-right pass.
///
/// Braces that do not enclose a known name are copied through unchanged.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Returns at most the first `max_chars` characters of `text`.
///
/// Cuts on a character boundary, never inside a multi-byte sequence.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_known_placeholders_once() {
        let out = render(
            "A={a} B={b} C={c}",
            &[("a", "{b}"), ("b", "2")],
        );
        assert_eq!(out, "A={b} B=2 C={c}");
    }

    #[test]
    fn test_render_copies_unbalanced_braces() {
        assert_eq!(render("x { y", &[("y", "1")]), "x { y");
    }

    #[test]
    fn test_templates_have_no_leftover_placeholders() {
        let prompt = generate_narrative("{\"type\":\"other\"}", "details", "FORMAT");
        assert!(prompt.contains("{\"type\":\"other\"}"));
        assert!(prompt.contains("FORMAT"));
        assert!(!prompt.contains("{calculation_details}"));

        let prompt = analyze_document("p_and_l", "Revenue 100");
        assert!(prompt.contains("Document type: p_and_l"));
        assert!(!prompt.contains("{document_content}"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("€€€", 2), "€€");
        assert_eq!(truncate_chars("", 5), "");
    }
}
