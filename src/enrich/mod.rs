//! Semantic enrichment engine.
//!
//! Pipeline per document: typed entities from the raw map → deterministic
//! relation rules → AI proposal → fusion → description completion →
//! summary and schema hint. Every AI stage degrades to its deterministic
//! subset when the gateway returns `None`.

pub mod answer;
pub mod background;
pub mod describe;
pub mod engine;
pub mod fusion;
pub mod proposal;
pub mod rules;
pub mod schema;
pub mod summary;

pub use answer::{Answer, AnswerKind};
pub use engine::EnrichmentEngine;

use thiserror::Error;

/// Malformed input shape is the only hard failure enrichment surfaces;
/// everything else degrades.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
