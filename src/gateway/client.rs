//! Provider selection, retry and degradation policy.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::cooldown::{parse_retry_interval, CooldownTracker};
use super::json_extract::extract_json_object;
use super::provider::HttpProvider;
use super::types::{ChatMessage, ChatProvider};
use super::ProviderError;
use crate::config::EngineConfig;

/// Uniform call contract over an ordered list of chat providers.
///
/// Both request operations return `None` when AI is disabled or every
/// provider fails; callers must degrade to their deterministic subset.
pub struct LlmGateway {
    providers: Vec<Arc<dyn ChatProvider>>,
    cooldowns: Arc<CooldownTracker>,
    enabled: bool,
    max_retries: u32,
    retry_base: Duration,
    default_cooldown: Duration,
}

impl LlmGateway {
    /// Build HTTP providers from the configured priority list.
    pub fn from_config(config: &EngineConfig, cooldowns: Arc<CooldownTracker>) -> Self {
        let providers: Vec<Arc<dyn ChatProvider>> = config
            .providers
            .iter()
            .map(|p| {
                Arc::new(HttpProvider::new(
                    p,
                    config.temperature,
                    config.request_timeout_secs,
                )) as Arc<dyn ChatProvider>
            })
            .collect();
        Self::with_providers(providers, cooldowns, config)
    }

    /// Assemble a gateway over arbitrary providers (tests inject scripted
    /// ones here).
    pub fn with_providers(
        providers: Vec<Arc<dyn ChatProvider>>,
        cooldowns: Arc<CooldownTracker>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            providers,
            cooldowns,
            enabled: config.ai_enabled,
            max_retries: config.max_retries,
            retry_base: Duration::from_millis(config.retry_base_ms),
            default_cooldown: Duration::from_secs(config.default_cooldown_secs),
        }
    }

    /// A gateway that always answers `None`.
    pub fn disabled() -> Self {
        Self::with_providers(
            Vec::new(),
            Arc::new(CooldownTracker::new()),
            &EngineConfig::offline(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.providers.is_empty()
    }

    /// Request free text. `None` on global disable or total failure.
    pub fn request_text(&self, messages: &[ChatMessage], max_tokens: u32) -> Option<String> {
        self.call(messages, max_tokens, |text| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// Request a JSON object. A response that cannot be parsed even after
    /// fence stripping and balanced-span extraction counts as a failure
    /// for that provider and falls through to the next one.
    pub fn request_json(&self, messages: &[ChatMessage], max_tokens: u32) -> Option<Value> {
        self.call(messages, max_tokens, extract_json_object)
    }

    fn call<T>(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        if !self.enabled {
            return None;
        }

        for provider in &self.providers {
            let name = provider.name();

            if !provider.has_credentials() {
                tracing::debug!(provider = name, "skipping provider without credentials");
                continue;
            }
            if let Some(remaining) = self.cooldowns.remaining(name) {
                tracing::debug!(
                    provider = name,
                    remaining_secs = remaining.as_secs(),
                    "provider cooling down, skipping"
                );
                continue;
            }

            if let Some(result) = self.try_provider(provider.as_ref(), messages, max_tokens, &parse)
            {
                return Some(result);
            }
        }

        tracing::warn!("all providers failed, degrading to None");
        None
    }

    /// One provider, including its transient-error retries. `None` moves
    /// selection on to the next provider.
    fn try_provider<T>(
        &self,
        provider: &dyn ChatProvider,
        messages: &[ChatMessage],
        max_tokens: u32,
        parse: &impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let name = provider.name();

        for attempt in 0..=self.max_retries {
            match provider.complete(messages, max_tokens) {
                Ok(text) => match parse(&text) {
                    Some(value) => return Some(value),
                    None => {
                        tracing::debug!(provider = name, "unusable response body, trying next provider");
                        return None;
                    }
                },
                Err(ProviderError::RateLimited { message }) => {
                    let cooldown =
                        parse_retry_interval(&message).unwrap_or(self.default_cooldown);
                    self.cooldowns.suspend(name, cooldown);
                    tracing::warn!(
                        provider = name,
                        cooldown_secs = cooldown.as_secs(),
                        "rate limited, suspending provider"
                    );
                    return None;
                }
                Err(ProviderError::Unavailable(reason)) => {
                    tracing::debug!(provider = name, %reason, "provider unavailable");
                    return None;
                }
                Err(err) => {
                    // Timeout, connection, HTTP or malformed body: retry
                    // with exponential backoff, then move on.
                    if attempt < self.max_retries {
                        let backoff = self.retry_base * 2u32.pow(attempt);
                        tracing::debug!(
                            provider = name,
                            attempt,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %err,
                            "transient provider error, retrying"
                        );
                        std::thread::sleep(backoff);
                    } else {
                        tracing::warn!(provider = name, error = %err, "provider exhausted retries");
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::provider::ScriptedProvider;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            retry_base_ms: 1,
            ..EngineConfig::default()
        }
    }

    fn gateway(
        providers: Vec<Arc<dyn ChatProvider>>,
        cooldowns: Arc<CooldownTracker>,
    ) -> LlmGateway {
        LlmGateway::with_providers(providers, cooldowns, &fast_config())
    }

    struct NoCredentials;
    impl ChatProvider for NoCredentials {
        fn name(&self) -> &str {
            "no-creds"
        }
        fn has_credentials(&self) -> bool {
            false
        }
        fn complete(&self, _: &[ChatMessage], _: u32) -> Result<String, ProviderError> {
            panic!("must never be called");
        }
    }

    #[test]
    fn disabled_gateway_returns_none() {
        let gw = LlmGateway::disabled();
        assert!(gw.request_text(&[ChatMessage::user("hi")], 10).is_none());
        assert!(gw.request_json(&[ChatMessage::user("hi")], 10).is_none());
        assert!(!gw.is_enabled());
    }

    #[test]
    fn global_flag_short_circuits_even_with_providers() {
        let p = Arc::new(ScriptedProvider::new("p").push_ok("text"));
        let gw = LlmGateway::with_providers(
            vec![p.clone()],
            Arc::new(CooldownTracker::new()),
            &EngineConfig::offline(),
        );
        assert!(gw.request_text(&[ChatMessage::user("q")], 10).is_none());
        assert_eq!(p.calls(), 0);
    }

    #[test]
    fn providers_without_credentials_are_skipped() {
        let fallback = Arc::new(ScriptedProvider::new("fallback").push_ok("answer"));
        let gw = gateway(
            vec![Arc::new(NoCredentials), fallback.clone()],
            Arc::new(CooldownTracker::new()),
        );
        assert_eq!(
            gw.request_text(&[ChatMessage::user("q")], 10).as_deref(),
            Some("answer")
        );
    }

    #[test]
    fn rate_limit_suspends_provider_and_falls_through() {
        let limited = Arc::new(ScriptedProvider::new("primary").push_err(
            ProviderError::RateLimited {
                message: "Please try again in 18m17.498s.".into(),
            },
        ));
        let backup = Arc::new(ScriptedProvider::new("backup").push_ok("from backup").push_ok("again"));
        let cooldowns = Arc::new(CooldownTracker::new());
        let gw = gateway(vec![limited.clone(), backup.clone()], cooldowns.clone());

        // Fallthrough happens within the same invocation.
        assert_eq!(
            gw.request_text(&[ChatMessage::user("q")], 10).as_deref(),
            Some("from backup")
        );
        // Cooldown is at least the parsed 18m17.498s.
        let remaining = cooldowns.remaining("primary").unwrap();
        assert!(remaining >= Duration::from_secs(1097), "got {remaining:?}");

        // The suspended provider is not called again.
        assert_eq!(
            gw.request_text(&[ChatMessage::user("q")], 10).as_deref(),
            Some("again")
        );
        assert_eq!(limited.calls(), 1);
    }

    #[test]
    fn unparsable_rate_limit_uses_default_cooldown() {
        let limited = Arc::new(ScriptedProvider::new("p").push_err(
            ProviderError::RateLimited {
                message: "quota exceeded".into(),
            },
        ));
        let cooldowns = Arc::new(CooldownTracker::new());
        let gw = gateway(vec![limited], cooldowns.clone());
        assert!(gw.request_text(&[ChatMessage::user("q")], 10).is_none());

        let remaining = cooldowns.remaining("p").unwrap();
        assert!(remaining > Duration::from_secs(55) && remaining <= Duration::from_secs(60));
    }

    #[test]
    fn transient_errors_retry_then_succeed() {
        let flaky = Arc::new(
            ScriptedProvider::new("flaky")
                .push_err(ProviderError::Timeout(1))
                .push_err(ProviderError::Connection("reset".into()))
                .push_ok("third time"),
        );
        let gw = gateway(vec![flaky.clone()], Arc::new(CooldownTracker::new()));
        assert_eq!(
            gw.request_text(&[ChatMessage::user("q")], 10).as_deref(),
            Some("third time")
        );
        assert_eq!(flaky.calls(), 3);
    }

    #[test]
    fn retries_are_bounded_then_next_provider() {
        let broken = Arc::new(
            ScriptedProvider::new("broken")
                .push_err(ProviderError::Timeout(1))
                .push_err(ProviderError::Timeout(1))
                .push_err(ProviderError::Timeout(1)),
        );
        let backup = Arc::new(ScriptedProvider::new("backup").push_ok("ok"));
        let gw = gateway(vec![broken.clone(), backup], Arc::new(CooldownTracker::new()));

        assert_eq!(
            gw.request_text(&[ChatMessage::user("q")], 10).as_deref(),
            Some("ok")
        );
        // Initial attempt + two retries.
        assert_eq!(broken.calls(), 3);
    }

    #[test]
    fn every_provider_failing_yields_none() {
        let a = Arc::new(ScriptedProvider::new("a").push_err(ProviderError::Unavailable("down".into())));
        let b = Arc::new(ScriptedProvider::new("b").push_err(ProviderError::Http {
            status: 500,
            body: "boom".into(),
        }));
        let gw = gateway(vec![a, b], Arc::new(CooldownTracker::new()));
        assert!(gw.request_text(&[ChatMessage::user("q")], 10).is_none());
    }

    #[test]
    fn unparsable_json_falls_through_to_next_provider() {
        let wordy = Arc::new(ScriptedProvider::new("wordy").push_ok("I cannot answer in JSON."));
        let precise = Arc::new(ScriptedProvider::new("precise").push_ok(r#"{"ok": true}"#));
        let gw = gateway(vec![wordy, precise], Arc::new(CooldownTracker::new()));

        let value = gw.request_json(&[ChatMessage::user("q")], 10).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn fenced_json_is_recovered() {
        let p = Arc::new(
            ScriptedProvider::new("p").push_ok("```json\n{\"entities\": {}}\n```"),
        );
        let gw = gateway(vec![p], Arc::new(CooldownTracker::new()));
        let value = gw.request_json(&[ChatMessage::user("q")], 10).unwrap();
        assert!(value["entities"].is_object());
    }
}
