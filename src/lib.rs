//! Annotex — semantic annotation core for regulatory documents.
//!
//! Three cooperating engines:
//! - [`gateway`]: a multi-provider LLM gateway with per-provider rate-limit
//!   circuit breaking. Degrades to `None`, never errors to callers.
//! - [`enrich`]: deterministic rules + AI augmentation + idempotent fusion,
//!   producing the per-document [`models::SemanticGraph`].
//! - [`feedback`]: classifies expert corrections into immutable delta
//!   records and feeds validated patterns back into future enrichment.
//!
//! Surrounding CRUD (upload, page storage, dashboards) lives upstream; this
//! crate consumes a raw `type → values` entity map and document context.

pub mod config;
pub mod enrich;
pub mod feedback;
pub mod gateway;
pub mod models;
pub mod patterns;
pub mod similarity;

pub use config::EngineConfig;
pub use enrich::engine::EnrichmentEngine;
pub use feedback::learn::FeedbackEngine;
pub use gateway::client::LlmGateway;
pub use models::SemanticGraph;
