//! Rule/lexicon-based entity and date recognizer.
//!
//! Standalone: no AI dependency. Used upstream to bootstrap extraction and
//! to validate or supplement AI output. Every candidate is grounded against
//! the source text before it leaves this module; ungroundable candidates
//! are dropped, never guessed.

pub mod dates;
pub mod filter;
pub mod grounding;
pub mod lexicon;

use serde::{Deserialize, Serialize};

use crate::models::{normalize_key, RawEntityMap};

/// Domain entity categories recognized by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    Dosage,
    LegalReference,
    Authority,
    Procedure,
    Delay,
    Condition,
    Date,
}

impl EntityCategory {
    /// Wire name, matching the entity-type keys of the semantic graph.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Dosage => "Dosage",
            EntityCategory::LegalReference => "Legal_Reference",
            EntityCategory::Authority => "Authority",
            EntityCategory::Procedure => "Procedure",
            EntityCategory::Delay => "Delay",
            EntityCategory::Condition => "Condition",
            EntityCategory::Date => "Date",
        }
    }
}

/// Where a span came from. AI spans always win on overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanOrigin {
    Rule,
    Ai,
}

/// One candidate annotation with its claimed byte offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanCandidate {
    pub category: EntityCategory,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub origin: SpanOrigin,
    pub confidence: f64,
}

impl SpanCandidate {
    pub fn rule(category: EntityCategory, value: &str, start: usize, end: usize) -> Self {
        Self {
            category,
            value: value.to_string(),
            start,
            end,
            origin: SpanOrigin::Rule,
            confidence: 0.85,
        }
    }
}

/// Full rule-based pass: lexicon categories plus dates, filtered for
/// false positives and grounded against the source text.
pub fn extract(text: &str) -> Vec<SpanCandidate> {
    let mut candidates = lexicon::scan(text);
    candidates.extend(dates::scan(text));
    let filtered: Vec<SpanCandidate> = candidates
        .into_iter()
        .filter(filter::passes_filter)
        .collect();
    grounding::ground_all(text, filtered)
}

/// Combine AI-origin spans with a fresh rule pass over the same text.
///
/// AI spans are grounded (ungroundable ones dropped) and always win on
/// overlap; non-overlapping rule spans are appended only if they pass the
/// false-positive filter.
pub fn merge_with_ai(text: &str, ai_spans: Vec<SpanCandidate>) -> Vec<SpanCandidate> {
    let grounded_ai = grounding::ground_all(text, ai_spans);
    let rule_spans = extract(text);
    grounding::merge_spans(grounded_ai, rule_spans)
}

/// Group spans into the `type → values` map the enrichment engine takes.
/// Values deduplicate by normalized key, first occurrence kept.
pub fn entity_map(spans: &[SpanCandidate]) -> RawEntityMap {
    let mut map = RawEntityMap::new();
    for span in spans {
        let values = map.entry(span.category.as_str().to_string()).or_default();
        if !values.iter().any(|v| normalize_key(v) == normalize_key(&span.value)) {
            values.push(span.value.clone());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_finds_dosage_authority_and_date() {
        let text = "Amoxil 500 mg was authorised by the EMA on 12 May 2023.";
        let spans = extract(text);

        assert!(spans
            .iter()
            .any(|s| s.category == EntityCategory::Dosage && s.value == "500 mg"));
        assert!(spans
            .iter()
            .any(|s| s.category == EntityCategory::Authority && s.value == "EMA"));
        assert!(spans
            .iter()
            .any(|s| s.category == EntityCategory::Date && s.value.contains("2023")));
    }

    #[test]
    fn extract_offsets_match_source_text() {
        let text = "Renewal within 90 days per Article 14 of Regulation (EC) No 726/2004.";
        for span in extract(text) {
            assert_eq!(
                &text[span.start..span.end],
                span.value,
                "span {:?} not grounded",
                span
            );
        }
    }

    #[test]
    fn ai_spans_win_on_overlap() {
        let text = "The product contains 500 mg amoxicillin.";
        let ai = vec![SpanCandidate {
            category: EntityCategory::Dosage,
            value: "500 mg amoxicillin".into(),
            start: 21,
            end: 39,
            origin: SpanOrigin::Ai,
            confidence: 0.9,
        }];
        let merged = merge_with_ai(text, ai);

        let dosages: Vec<_> = merged
            .iter()
            .filter(|s| s.category == EntityCategory::Dosage)
            .collect();
        assert_eq!(dosages.len(), 1);
        assert_eq!(dosages[0].origin, SpanOrigin::Ai);
    }

    #[test]
    fn non_overlapping_rule_spans_are_appended() {
        let text = "EMA approved it. The dose is 500 mg.";
        let ai = vec![SpanCandidate {
            category: EntityCategory::Authority,
            value: "EMA".into(),
            start: 0,
            end: 3,
            origin: SpanOrigin::Ai,
            confidence: 0.95,
        }];
        let merged = merge_with_ai(text, ai);
        assert!(merged
            .iter()
            .any(|s| s.origin == SpanOrigin::Rule && s.category == EntityCategory::Dosage));
    }

    #[test]
    fn entity_map_groups_and_deduplicates() {
        let text = "EMA reviewed the 500 mg dose. The ema confirmed 500 mg.";
        let map = entity_map(&extract(text));

        assert_eq!(map["Dosage"], vec!["500 mg"]);
        assert_eq!(map["Authority"].len(), 1);
    }
}
