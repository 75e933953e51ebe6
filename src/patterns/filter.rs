//! False-positive filter for rule-origin candidates.
//!
//! A category's own name is never an entity of that category ("authority"
//! is not an Authority), and section-header words caught by loose clause
//! regexes are rejected outright.

use std::sync::LazyLock;

use regex::Regex;

use super::{EntityCategory, SpanCandidate};
use crate::models::normalize_key;

/// Words that appear as section headers in regulatory documents and must
/// never become entities on their own.
const SECTION_HEADERS: &[&str] = &[
    "introduction",
    "summary",
    "background",
    "scope",
    "definitions",
    "annex",
    "appendix",
    "conditions",
    "condition",
    "authority",
    "authorities",
    "competent authority",
    "procedure",
    "procedures",
    "delay",
    "delays",
    "dosage",
    "dosages",
    "date",
    "dates",
    "references",
    "legal reference",
    "legal references",
];

static OBLIGATION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:must|shall|required|mandatory|doit|doivent|tenu|tenus|obligatoire)\b")
        .unwrap()
});

fn has_numeric_marker(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
}

/// Whether a candidate survives the false-positive rules.
pub fn passes_filter(candidate: &SpanCandidate) -> bool {
    let normalized = normalize_key(&candidate.value);

    if normalized.is_empty() {
        return false;
    }

    // The bare category name is never itself an entity.
    let category_word = candidate.category.as_str().replace('_', " ").to_lowercase();
    if normalized == category_word {
        return false;
    }

    if SECTION_HEADERS.contains(&normalized.as_str()) {
        return false;
    }

    // Conditions and delays need either a number or an obligation marker;
    // everything else caught by their clause regexes is prose.
    match candidate.category {
        EntityCategory::Condition | EntityCategory::Delay => {
            has_numeric_marker(&candidate.value) || OBLIGATION_MARKER.is_match(&candidate.value)
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::SpanCandidate;

    fn candidate(category: EntityCategory, value: &str) -> SpanCandidate {
        SpanCandidate::rule(category, value, 0, value.len())
    }

    #[test]
    fn bare_category_name_is_rejected() {
        assert!(!passes_filter(&candidate(EntityCategory::Authority, "Authority")));
        assert!(!passes_filter(&candidate(EntityCategory::Dosage, "dosage")));
        assert!(!passes_filter(&candidate(
            EntityCategory::LegalReference,
            "Legal Reference"
        )));
    }

    #[test]
    fn section_header_words_are_rejected() {
        assert!(!passes_filter(&candidate(EntityCategory::Authority, "Conditions")));
        assert!(!passes_filter(&candidate(EntityCategory::Condition, "Annex")));
        assert!(!passes_filter(&candidate(EntityCategory::Authority, "Competent  authority")));
    }

    #[test]
    fn real_values_pass() {
        assert!(passes_filter(&candidate(EntityCategory::Authority, "EMA")));
        assert!(passes_filter(&candidate(EntityCategory::Dosage, "500 mg")));
        assert!(passes_filter(&candidate(
            EntityCategory::LegalReference,
            "Article 14"
        )));
    }

    #[test]
    fn condition_needs_numeric_or_obligation_marker() {
        assert!(passes_filter(&candidate(
            EntityCategory::Condition,
            "the holder must submit reports"
        )));
        assert!(passes_filter(&candidate(
            EntityCategory::Condition,
            "renewal due after 5 years"
        )));
        assert!(!passes_filter(&candidate(
            EntityCategory::Condition,
            "general considerations apply"
        )));
    }

    #[test]
    fn delay_needs_numeric_or_obligation_marker() {
        assert!(passes_filter(&candidate(EntityCategory::Delay, "within 90 days")));
        assert!(!passes_filter(&candidate(EntityCategory::Delay, "some days")));
    }

    #[test]
    fn empty_value_is_rejected() {
        assert!(!passes_filter(&candidate(EntityCategory::Authority, "   ")));
    }
}
