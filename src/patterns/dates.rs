//! Multi-locale date recognition.
//!
//! Accepts month-name+year (en/fr/de/es), numeric month/year, and
//! day-month-year forms. A bare 4-digit year is ambiguous (could be a
//! count, a code, a page) and is deliberately not a date.

use std::sync::LazyLock;

use regex::Regex;

use super::{EntityCategory, SpanCandidate};

/// Month names and common abbreviations across supported locales.
/// Longer alternatives first so the regex engine prefers the full name.
const MONTH_NAMES: &[&str] = &[
    // English
    "january", "february", "march", "april", "june", "july", "august",
    "september", "october", "november", "december",
    // French
    "janvier", "février", "fevrier", "mars", "avril", "mai", "juin",
    "juillet", "août", "aout", "septembre", "octobre", "novembre",
    "décembre", "decembre",
    // German
    "januar", "februar", "märz", "marz", "juni", "juli",
    "oktober", "dezember",
    // Spanish
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio",
    "agosto", "septiembre", "octubre", "noviembre", "diciembre",
    // Abbreviations ("may" doubles as the English month)
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sept", "sep",
    "oct", "nov", "dec",
];

fn month_alternation() -> String {
    let mut names: Vec<&str> = MONTH_NAMES.to_vec();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    names.join("|")
}

/// `12 mai 2023`, `3. Oktober 2021`, `1er janvier 2020`, `12th of May 2023`.
static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b([0-3]?\d)(?:er|re|st|nd|rd|th)?\.?\s+(?:of\s+|de\s+)?({m})\.?,?\s+((?:19|20)\d{{2}})\b",
        m = month_alternation()
    ))
    .unwrap()
});

/// `May 12, 2023`.
static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({m})\.?\s+([0-3]?\d)(?:st|nd|rd|th)?,?\s+((?:19|20)\d{{2}})\b",
        m = month_alternation()
    ))
    .unwrap()
});

/// `May 2023`, `mai 2023`, `Oktober 2021`.
static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({m})\.?,?\s+(?:de\s+)?((?:19|20)\d{{2}})\b",
        m = month_alternation()
    ))
    .unwrap()
});

/// `05/2023` (numeric month/year).
static NUMERIC_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(0?[1-9]|1[0-2])\s*/\s*((?:19|20)\d{2})\b").unwrap());

/// `2023-05`, `2023-05-12` (ISO year-month, optional day).
static ISO_YEAR_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b((?:19|20)\d{2})-(0[1-9]|1[0-2])(?:-([0-3]\d))?\b").unwrap()
});

/// `12/05/2023`, `12.05.2023` (day-month-year numeric).
static NUMERIC_DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(0?[1-9]|[12]\d|3[01])[./](0?[1-9]|1[0-2])[./]((?:19|20)\d{2})\b").unwrap()
});

fn all_patterns() -> [&'static Regex; 6] {
    [
        &DAY_MONTH_YEAR,
        &MONTH_DAY_YEAR,
        &NUMERIC_DAY_MONTH_YEAR,
        &ISO_YEAR_MONTH,
        &MONTH_YEAR,
        &NUMERIC_MONTH_YEAR,
    ]
}

/// Scan for date spans. Shorter matches contained in an already-found
/// span are suppressed ("May 2023" inside "12 May 2023").
pub fn scan(text: &str) -> Vec<SpanCandidate> {
    let mut spans: Vec<SpanCandidate> = Vec::new();

    for regex in all_patterns() {
        for m in regex.find_iter(text) {
            let covered = spans
                .iter()
                .any(|s| m.start() >= s.start && m.end() <= s.end);
            if !covered {
                spans.push(SpanCandidate::rule(
                    EntityCategory::Date,
                    m.as_str(),
                    m.start(),
                    m.end(),
                ));
            }
        }
    }

    spans.sort_by_key(|s| s.start);
    spans
}

/// Whether the whole input is a recognizable date expression.
pub fn is_date(text: &str) -> bool {
    let trimmed = text.trim();
    all_patterns()
        .iter()
        .any(|re| re.find(trimmed).is_some_and(|m| m.as_str() == trimmed))
}
