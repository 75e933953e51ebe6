//! Engine configuration.
//!
//! The similarity thresholds and ranking constants are empirical values
//! carried over from production tuning, not derived truths. They live here
//! as plain fields so deployments can adjust them without code changes.

use serde::{Deserialize, Serialize};

/// One LLM backend in the priority list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable identifier, used as the cooldown-map key.
    pub name: String,
    /// Base URL of an OpenAI-compatible chat-completions endpoint.
    pub base_url: String,
    /// Model identifier passed through to the backend.
    pub model: String,
    /// Inline API key. Takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl ProviderConfig {
    /// Resolve the credential, preferring the inline key.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.is_empty())
    }
}

/// Configuration shared by the gateway, enrichment and feedback engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Global switch. When false the gateway answers `None` without
    /// touching any provider and every engine runs rule-only.
    pub ai_enabled: bool,
    /// Providers in priority order. First credentialed, non-cooling
    /// provider wins.
    pub providers: Vec<ProviderConfig>,
    /// Sampling temperature for all calls.
    pub temperature: f32,
    /// Wall-clock timeout per provider call, seconds.
    pub request_timeout_secs: u64,
    /// Retries per provider on transient errors (rate limits excluded).
    pub max_retries: u32,
    /// Exponential backoff base, milliseconds (doubles per retry).
    pub retry_base_ms: u64,
    /// Cooldown applied when a rate-limit message carries no parsable
    /// retry interval, seconds.
    pub default_cooldown_secs: u64,
    /// Answers below this char-level similarity count as expert-corrected.
    pub qa_correction_threshold: f64,
    /// Prior expert Q&A at or above this token similarity is returned
    /// directly, skipping the gateway.
    pub qa_memo_threshold: f64,
    /// Evidence items forwarded to the gateway per question.
    pub evidence_top_n: usize,
    /// Learned-pattern candidates considered per enhancement pass.
    pub reuse_candidate_limit: usize,
    /// Token caps per call kind.
    pub max_proposal_tokens: u32,
    pub max_answer_tokens: u32,
    pub max_description_tokens: u32,
    pub max_summary_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ai_enabled: true,
            providers: Vec::new(),
            temperature: 0.2,
            request_timeout_secs: 45,
            max_retries: 2,
            retry_base_ms: 750,
            default_cooldown_secs: 60,
            qa_correction_threshold: 0.80,
            qa_memo_threshold: 0.90,
            evidence_top_n: 8,
            reuse_candidate_limit: 25,
            max_proposal_tokens: 1800,
            max_answer_tokens: 400,
            max_description_tokens: 120,
            max_summary_tokens: 250,
        }
    }
}

impl EngineConfig {
    /// Rule-only configuration: no providers, AI disabled.
    pub fn offline() -> Self {
        Self {
            ai_enabled: false,
            ..Self::default()
        }
    }
}
