//! Regex and lexicon scanners for the non-date entity categories.

use std::sync::LazyLock;

use regex::Regex;

use super::{EntityCategory, SpanCandidate};

/// Strength/dosage expressions: `500 mg`, `0,5 ml`, `20 mg/ml`, `2 %`.
static DOSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d+(?:[.,]\d+)?\s*(?:mg|µg|mcg|g|kg|ml|l|ui|iu|%)(?:\s*/\s*(?:mg|ml|l|kg|dose|day|jour))?",
    )
    .unwrap()
});

/// Legal references: articles, EU regulations/directives, national acts.
static LEGAL_REFERENCES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:article|art\.)\s*\d+[a-z]?(?:\(\d+\))?").unwrap(),
        Regex::new(
            r"(?i)\b(?:regulation|directive|règlement)\s+(?:\((?:EC|EU|CE|UE)\)\s*)?(?:no\.?\s*|n°\s*)?\d+/\d+(?:/(?:EC|EU|CE|UE))?",
        )
        .unwrap(),
        Regex::new(r"(?i)\bannexe?\s+(?:[IVXLC]+|\d+)\b").unwrap(),
        Regex::new(r"(?i)\b(?:décret|decree|loi|arrêté)\s+(?:no\.?\s*|n°\s*)?[\d][\d-]*").unwrap(),
    ]
});

/// Regulatory authority acronyms. Case-sensitive: the word "ema" in prose
/// is not the agency.
static AUTHORITY_ACRONYMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:EMA|EMEA|FDA|ANSM|MHRA|BfArM|AIFA|AEMPS|HAS|ANVISA|TGA|PMDA)\b").unwrap()
});

/// Full agency names, case-insensitive.
static AUTHORITY_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:european medicines agency|european commission|health canada|swissmedic|ministry of health|agence nationale de sécurité du médicament|food and drug administration)\b",
    )
    .unwrap()
});

/// Regulatory procedures by name, variation types, and EMEA-style codes.
static PROCEDURES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(
            r"(?i)\b(?:centrali[sz]ed|decentrali[sz]ed|mutual[- ]recognition|national)\s+procedure\b",
        )
        .unwrap(),
        Regex::new(r"(?i)\bvariation\s+type\s+(?:IA|IB|II)\b").unwrap(),
        Regex::new(r"\b[A-Z]{2,4}/[A-Z]{1,2}(?:/[A-Z])?/\d{3,6}(?:/\d{1,4})?\b").unwrap(),
    ]
});

/// Time limits. The numeric marker is mandatory; "several days" is prose,
/// not a delay entity.
static DELAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:within\s+|sous\s+|dans\s+les\s+)?\d{1,3}\s*(?:calendar\s+|working\s+)?(?:days?|jours?|months?|mois|weeks?|semaines?|years?|ans)\b",
    )
    .unwrap()
});

/// Obligation clauses, captured up to sentence-internal punctuation.
static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:the\s+\w+\s+)?(?:must|shall|is required to|doit|doivent|est tenu de|sont tenus de)\s+[^.;:\n]{3,120}",
    )
    .unwrap()
});

fn collect(
    regex: &Regex,
    category: EntityCategory,
    text: &str,
    out: &mut Vec<SpanCandidate>,
) {
    for m in regex.find_iter(text) {
        out.push(SpanCandidate::rule(
            category,
            m.as_str().trim_end(),
            m.start(),
            m.start() + m.as_str().trim_end().len(),
        ));
    }
}

/// Scan all non-date categories.
pub fn scan(text: &str) -> Vec<SpanCandidate> {
    let mut out = Vec::new();

    collect(&DOSAGE, EntityCategory::Dosage, text, &mut out);
    for re in LEGAL_REFERENCES.iter() {
        collect(re, EntityCategory::LegalReference, text, &mut out);
    }
    collect(&AUTHORITY_ACRONYMS, EntityCategory::Authority, text, &mut out);
    collect(&AUTHORITY_NAMES, EntityCategory::Authority, text, &mut out);
    for re in PROCEDURES.iter() {
        collect(re, EntityCategory::Procedure, text, &mut out);
    }
    collect(&DELAY, EntityCategory::Delay, text, &mut out);
    collect(&CONDITION, EntityCategory::Condition, text, &mut out);

    out
}
