use serde::{Deserialize, Serialize};

use super::ProviderError;

/// One chat turn sent to a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// One LLM backend. Implementations must be cheap to call repeatedly;
/// the gateway owns retry, backoff and cooldown policy.
pub trait ChatProvider: Send + Sync {
    /// Stable identifier, used as the cooldown-map key.
    fn name(&self) -> &str;

    /// Whether a usable credential is configured. Providers without
    /// credentials are filtered out before selection.
    fn has_credentials(&self) -> bool;

    /// Run one completion. Must respect a bounded wall-clock timeout.
    fn complete(&self, messages: &[ChatMessage], max_tokens: u32)
        -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
    }
}
