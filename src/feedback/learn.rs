//! Comparison sessions: turn an expert's corrected graph into deltas and
//! statistics.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::models::{DeltaRecord, DocumentContext, LearningStats, SemanticGraph};

use super::diff;
use super::reuse;
use super::store::DeltaStore;
use super::FeedbackError;

/// Result of one comparison session.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonOutcome {
    pub session_id: Uuid,
    pub deltas_created: usize,
    pub relations_changed: usize,
    pub qa_changed: usize,
    pub summary: String,
}

/// Learns from expert corrections and reapplies validated patterns.
pub struct FeedbackEngine {
    store: Arc<dyn DeltaStore>,
    config: EngineConfig,
}

impl FeedbackEngine {
    pub fn new(store: Arc<dyn DeltaStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn DeltaStore> {
        &self.store
    }

    /// Diff the AI graph against the expert version and persist one delta
    /// per discrepancy, all under a fresh session id. Statistics for the
    /// reviewer are bumped in the same pass.
    pub fn compare_and_learn(
        &self,
        document_ref: &str,
        reviewer: &str,
        ai_graph: &SemanticGraph,
        expert_graph: &SemanticGraph,
        context: &DocumentContext,
    ) -> Result<ComparisonOutcome, FeedbackError> {
        let session_id = Uuid::new_v4();
        let now = Utc::now();
        let seeds = diff::diff(ai_graph, expert_graph, self.config.qa_correction_threshold);

        let mut relations_changed = 0;
        let mut qa_changed = 0;

        for seed in &seeds {
            if seed.delta_type.is_relation() {
                relations_changed += 1;
            }
            if seed.delta_type.is_qa() {
                qa_changed += 1;
            }
            self.store.append(&DeltaRecord {
                id: Uuid::new_v4(),
                document_ref: document_ref.to_string(),
                reviewer: reviewer.to_string(),
                session_id,
                delta_type: seed.delta_type,
                ai_version: seed.ai_version.clone(),
                expert_version: seed.expert_version.clone(),
                confidence_before: seed.confidence_before,
                rating: None,
                reuse_count: 0,
                created_at: now,
            })?;
        }

        if !seeds.is_empty() {
            self.store.add_stats(&LearningStats {
                reviewer: reviewer.to_string(),
                category: context
                    .category
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| "general".to_string()),
                period: now.date_naive(),
                total_corrections: seeds.len() as u32,
                relations_improved: relations_changed,
                qa_improved: qa_changed,
            })?;
        }

        tracing::info!(
            %session_id,
            document = document_ref,
            reviewer,
            deltas = seeds.len(),
            "comparison session recorded"
        );

        Ok(ComparisonOutcome {
            session_id,
            deltas_created: seeds.len(),
            relations_changed: relations_changed as usize,
            qa_changed: qa_changed as usize,
            summary: format!(
                "{} correction(s): {} relation(s), {} Q&A",
                seeds.len(),
                relations_changed,
                qa_changed
            ),
        })
    }

    /// Attach an expert rating (1 through 5) to a stored delta.
    pub fn rate_delta(&self, delta_id: Uuid, rating: u8) -> Result<(), FeedbackError> {
        if !(1..=5).contains(&rating) {
            return Err(FeedbackError::InvalidRating(rating));
        }
        self.store.set_rating(delta_id, rating)?;
        Ok(())
    }

    pub fn stats_for(&self, reviewer: &str) -> Result<Vec<LearningStats>, FeedbackError> {
        Ok(self.store.stats(reviewer)?)
    }

    /// Apply validated relation patterns from past sessions to a new
    /// document's graph. Returns the enhanced graph and how many patterns
    /// applied.
    pub fn enhance_with_learned_patterns(
        &self,
        document_ref: &str,
        graph: &SemanticGraph,
        context: &DocumentContext,
    ) -> Result<(SemanticGraph, usize), FeedbackError> {
        let (enhanced, applied) = reuse::enhance_with_learned_patterns(
            graph,
            self.store.as_ref(),
            self.config.reuse_candidate_limit,
        )?;
        if applied > 0 {
            tracing::debug!(
                document = document_ref,
                title = %context.title,
                applied,
                "learned patterns reused"
            );
        }
        Ok((enhanced, applied))
    }
}
