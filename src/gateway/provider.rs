//! Concrete chat providers.
//!
//! `HttpProvider` speaks the OpenAI-compatible chat-completions shape,
//! which covers every backend we route to (hosted vendors and local
//! gateways alike). `ScriptedProvider` drives the fallback logic in tests.

use serde::{Deserialize, Serialize};

use super::types::{ChatMessage, ChatProvider};
use super::ProviderError;
use crate::config::ProviderConfig;

/// Blocking HTTP client for one OpenAI-compatible backend.
pub struct HttpProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig, temperature: f32, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.resolve_api_key(),
            temperature,
            timeout_secs,
            client,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Pull the human-readable error message out of an error body, falling
/// back to the raw body. Vendors put retry hints in `error.message`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.to_string())
}

impl ChatProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature: self.temperature,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                ProviderError::Connection(self.base_url.clone())
            } else {
                ProviderError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::RateLimited {
                message: error_message(&body),
            });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: error_message(&body),
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                provider = %self.name,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "provider call accounted"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("empty choices".into()))
    }
}

/// Scripted provider for tests: pops one pre-seeded result per call and
/// counts invocations.
pub struct ScriptedProvider {
    name: String,
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String, ProviderError>>>,
    calls: std::sync::atomic::AtomicU32,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn push_ok(self, text: &str) -> Self {
        self.push(Ok(text.to_string()))
    }

    pub fn push_err(self, err: ProviderError) -> Self {
        self.push(Err(err))
    }

    fn push(self, result: Result<String, ProviderError>) -> Self {
        match self.responses.lock() {
            Ok(mut q) => q.push_back(result),
            Err(poisoned) => poisoned.into_inner().push_back(result),
        }
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_credentials(&self) -> bool {
        true
    }

    fn complete(
        &self,
        _messages: &[ChatMessage],
        _max_tokens: u32,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut queue = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".into())))
    }
}
