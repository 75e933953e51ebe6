//! Span grounding: every candidate must be re-verifiable against the
//! source text at its claimed offsets. Offsets drift when upstream stages
//! normalize whitespace, so a mismatch triggers a bounded window search,
//! then a full-text exact scan, before the candidate is dropped.

use super::{filter, SpanCandidate, SpanOrigin};

/// Bytes searched on each side of the claimed offset before falling back
/// to a full scan.
const SEARCH_WINDOW: usize = 48;

/// Clamp an index down to the nearest char boundary.
fn floor_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Clamp an index up to the nearest char boundary.
fn ceil_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Verify one candidate against the source, correcting its offsets if the
/// value is found nearby or anywhere in the text. `None` means the span
/// cannot be grounded and must be dropped.
pub fn ground(text: &str, candidate: &SpanCandidate) -> Option<SpanCandidate> {
    if candidate.value.is_empty() {
        return None;
    }

    // Exact offsets first.
    if text.get(candidate.start..candidate.end) == Some(candidate.value.as_str()) {
        return Some(candidate.clone());
    }

    // Bounded window around the expected position.
    let window_start = floor_boundary(text, candidate.start.saturating_sub(SEARCH_WINDOW));
    let window_end = ceil_boundary(
        text,
        candidate
            .end
            .saturating_add(SEARCH_WINDOW)
            .min(text.len()),
    );
    if let Some(window) = text.get(window_start..window_end) {
        if let Some(offset) = window.find(&candidate.value) {
            let start = window_start + offset;
            return Some(SpanCandidate {
                start,
                end: start + candidate.value.len(),
                ..candidate.clone()
            });
        }
    }

    // Full-text exact scan as a last resort.
    text.find(&candidate.value).map(|start| SpanCandidate {
        start,
        end: start + candidate.value.len(),
        ..candidate.clone()
    })
}

/// Ground a batch; ungroundable candidates are dropped individually,
/// never failing the batch.
pub fn ground_all(text: &str, candidates: Vec<SpanCandidate>) -> Vec<SpanCandidate> {
    let mut grounded = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match ground(text, &candidate) {
            Some(span) => grounded.push(span),
            None => {
                tracing::debug!(
                    category = candidate.category.as_str(),
                    value = %candidate.value,
                    claimed_start = candidate.start,
                    "grounding failure, dropping candidate"
                );
            }
        }
    }
    grounded
}

fn overlaps(a: &SpanCandidate, b: &SpanCandidate) -> bool {
    a.start < b.end && b.start < a.end
}

/// Overlap policy: AI spans always win; rule spans survive only when they
/// overlap no AI span and pass the false-positive filter.
pub fn merge_spans(ai: Vec<SpanCandidate>, rule: Vec<SpanCandidate>) -> Vec<SpanCandidate> {
    let mut merged = ai;
    for span in rule {
        debug_assert_eq!(span.origin, SpanOrigin::Rule);
        let collides = merged
            .iter()
            .filter(|s| s.origin == SpanOrigin::Ai)
            .any(|s| overlaps(s, &span));
        if !collides && filter::passes_filter(&span) {
            merged.push(span);
        }
    }
    merged.sort_by_key(|s| s.start);
    merged
}
