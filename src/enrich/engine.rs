//! The enrichment engine: orchestration of the per-document pipeline.

use std::sync::Arc;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::gateway::cooldown::CooldownTracker;
use crate::gateway::LlmGateway;
use crate::models::{
    DocumentContext, EntityItem, RawEntityMap, RelationRecord, SemanticGraph,
};

use super::answer::{self, Answer};
use super::{describe, fusion, proposal, rules, schema, summary, EnrichError};

/// Confidence assigned to entities coming straight from extraction.
const EXTRACTION_CONFIDENCE: f64 = 0.8;

/// Turns raw extraction output into an enriched semantic graph and answers
/// reviewer questions over it. One instance serves many documents; the
/// cooldown state inside the gateway is shared across all of them.
pub struct EnrichmentEngine {
    gateway: Arc<LlmGateway>,
    config: EngineConfig,
}

impl EnrichmentEngine {
    pub fn new(config: EngineConfig) -> Self {
        let gateway = Arc::new(LlmGateway::from_config(
            &config,
            Arc::new(CooldownTracker::new()),
        ));
        Self { gateway, config }
    }

    /// Inject a prebuilt gateway (tests use scripted providers here).
    pub fn with_gateway(gateway: Arc<LlmGateway>, config: EngineConfig) -> Self {
        Self { gateway, config }
    }

    /// Rule-only engine: no providers, AI disabled.
    pub fn offline() -> Self {
        Self::new(EngineConfig::offline())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<LlmGateway> {
        &self.gateway
    }

    /// Enrich one document.
    ///
    /// `existing` is the previously stored graph, if any; re-enriching
    /// fuses into it rather than replacing it, so expert-authored content
    /// survives. `expert_relations` are fused last and win on
    /// descriptions the same way any earlier author does: first in, kept.
    pub fn enrich(
        &self,
        raw_entities: &RawEntityMap,
        context: &DocumentContext,
        summary_hint: Option<&str>,
        existing: Option<&SemanticGraph>,
        expert_relations: &[RelationRecord],
    ) -> Result<SemanticGraph, EnrichError> {
        if raw_entities.keys().any(|k| k.trim().is_empty()) {
            return Err(EnrichError::InvalidInput(
                "entity map contains an empty type key".into(),
            ));
        }

        let mut graph = existing.cloned().unwrap_or_default();

        if graph.document.is_none() && !context.title.trim().is_empty() {
            graph.document = Some(context.title.clone());
        }
        for (key, value) in [
            ("language", &context.language),
            ("category", &context.category),
            ("country", &context.country),
        ] {
            if let Some(value) = value {
                graph
                    .metadata
                    .entry(key.to_string())
                    .or_insert(Value::String(value.clone()));
            }
        }

        // Typed entities from the raw map.
        let mut base = SemanticGraph::default();
        for (entity_type, values) in raw_entities {
            for value in values {
                if value.trim().is_empty() {
                    continue;
                }
                base.add_entity(
                    entity_type,
                    EntityItem::new(value, EXTRACTION_CONFIDENCE, "extraction"),
                );
            }
        }
        fusion::fuse(&mut graph, &base);

        // Deterministic relation rules over the fused entity set.
        let rule_relations = rules::apply(&graph);
        fusion::fuse_relations(&mut graph, &rule_relations);

        // AI proposal round; a gateway `None` simply skips the stage.
        if self.gateway.is_enabled() {
            let messages = proposal::build_prompt(&graph, context);
            if let Some(raw) = self
                .gateway
                .request_json(&messages, self.config.max_proposal_tokens)
            {
                let prop = proposal::coerce(&raw);
                if prop.is_empty() {
                    tracing::debug!(document = %context.title, "AI proposal carried nothing usable");
                } else {
                    tracing::debug!(
                        document = %context.title,
                        entities = prop.entities.len(),
                        relations = prop.relations.len(),
                        qa = prop.questions_answers.len(),
                        "fusing AI proposal"
                    );
                    fusion::fuse(&mut graph, &prop.into_overlay());
                }
            }
        }

        fusion::fuse_relations(&mut graph, expert_relations);

        describe::ensure_descriptions(
            &mut graph,
            &self.gateway,
            self.config.max_description_tokens,
        );

        if graph.semantic_summary.as_deref().unwrap_or("").is_empty() {
            graph.semantic_summary = Some(match summary_hint {
                Some(hint) if !hint.trim().is_empty() => hint.to_string(),
                _ => summary::generate(
                    &graph,
                    context,
                    &self.gateway,
                    self.config.max_summary_tokens,
                ),
            });
        }

        if graph.tech_hints.suggested_schema.is_none() {
            graph.tech_hints.suggested_schema = Some(schema::suggest(&context.title, &graph));
        }

        tracing::info!(
            document = %context.title,
            entity_types = graph.entities.len(),
            relations = graph.relations.len(),
            qa = graph.questions_answers.len(),
            "enrichment complete"
        );
        Ok(graph)
    }

    /// Answer a reviewer question against enriched graphs.
    pub fn answer(
        &self,
        question: &str,
        graphs: &[&SemanticGraph],
        context: &DocumentContext,
        summary_hint: Option<&str>,
    ) -> Answer {
        answer::answer(
            question,
            graphs,
            context,
            summary_hint,
            &self.gateway,
            &self.config,
        )
    }
}
