//! Background summary refresh.
//!
//! Summary regeneration can take a full provider round-trip, so callers
//! that already hold a usable graph offload it to a worker thread and pick
//! the result up through a sink callback. A panicking provider stack must
//! never take the caller down with it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::models::{DocumentContext, SemanticGraph};

use super::engine::EnrichmentEngine;
use super::summary;

/// Handle for one in-flight refresh. Dropping it detaches the worker;
/// `join()` blocks until the sink has run.
pub struct SummaryRefreshHandle {
    handle: Option<JoinHandle<()>>,
}

impl SummaryRefreshHandle {
    /// Wait for the refresh to finish.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Regenerate the document summary off-thread and hand it to `sink`.
///
/// On a worker panic the sink receives the deterministic fallback summary
/// instead, so the caller always gets exactly one call.
pub fn spawn_summary_refresh(
    engine: Arc<EnrichmentEngine>,
    graph: SemanticGraph,
    context: DocumentContext,
    sink: impl FnOnce(String) + Send + 'static,
) -> SummaryRefreshHandle {
    let handle = std::thread::spawn(move || {
        let max_tokens = engine.config().max_summary_tokens;
        let generated = catch_unwind(AssertUnwindSafe(|| {
            summary::generate(&graph, &context, engine.gateway(), max_tokens)
        }));

        let text = match generated {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(document = %context.title, "summary refresh panicked, using fallback");
                summary::fallback(&graph, &context)
            }
        };
        sink(text);
    });

    SummaryRefreshHandle {
        handle: Some(handle),
    }
}
