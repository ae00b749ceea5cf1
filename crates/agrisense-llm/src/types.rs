//! Wire types for the chat and provider-configuration endpoints.

use std::str::FromStr;

use agrisense_advisor::ChatTurn;
use serde::{Deserialize, Serialize};

/// Hosted model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Anthropic,
    Groq,
}

impl LLMProvider {
    pub const ALL: [LLMProvider; 3] = [Self::OpenAI, Self::Anthropic, Self::Groq];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Groq => "groq",
        }
    }

    /// Whether the provider accepts inline images.
    pub fn supports_images(self) -> bool {
        !matches!(self, Self::Groq)
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "groq" => Ok(Self::Groq),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// One message in a provider conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

impl From<&ChatTurn> for ChatMessage {
    /// Farmer-facing clients label turns loosely; providers only accept
    /// `user` and `assistant` inside the conversation.
    fn from(turn: &ChatTurn) -> Self {
        let role = match turn.role.trim().to_ascii_lowercase().as_str() {
            "assistant" | "bot" | "model" | "agrisense" => "assistant",
            _ => "user",
        };
        Self {
            role: role.into(),
            content: turn.content.clone(),
        }
    }
}

/// Server-sent event emitted by `/api/chat/stream`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "token")]
    Token { content: String },
    #[serde(rename = "done")]
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        source: String,
        #[serde(rename = "tokensUsed")]
        tokens_used: usize,
        duration: u64,
    },
    #[serde(rename = "error")]
    Error { error: String },
}

/// `GET /api/chat/status` body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatStatus {
    #[serde(rename = "llmAvailable")]
    pub llm_available: bool,
    #[serde(rename = "llmProvider")]
    pub llm_provider: Option<String>,
    #[serde(rename = "defaultModel")]
    pub default_model: Option<String>,
    #[serde(rename = "availableModels")]
    pub available_models: Vec<String>,
    #[serde(rename = "modelEnabled")]
    pub model_enabled: bool,
}

/// Provider configuration as shown to clients. Keys are reduced to flags.
#[derive(Debug, Clone, Serialize)]
pub struct LLMConfigResponse {
    #[serde(rename = "preferredProvider")]
    pub preferred_provider: String,
    #[serde(rename = "openaiConfigured")]
    pub openai_configured: bool,
    #[serde(rename = "anthropicConfigured")]
    pub anthropic_configured: bool,
    #[serde(rename = "groqConfigured")]
    pub groq_configured: bool,
    #[serde(rename = "openaiModel")]
    pub openai_model: String,
    #[serde(rename = "anthropicModel")]
    pub anthropic_model: String,
    #[serde(rename = "groqModel")]
    pub groq_model: String,
    #[serde(rename = "activeProvider")]
    pub active_provider: Option<String>,
}

/// Partial update for `PUT /api/chat/config`. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LLMConfigUpdate {
    pub preferred_provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub anthropic_model: Option<String>,
    pub groq_model: Option<String>,
}

/// `POST /api/chat/config/test` body.
#[derive(Debug, Clone, Deserialize)]
pub struct TestKeyRequest {
    pub provider: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        for provider in LLMProvider::ALL {
            assert_eq!(provider.as_str().parse::<LLMProvider>(), Ok(provider));
        }
        assert_eq!(" Groq ".parse::<LLMProvider>(), Ok(LLMProvider::Groq));
        assert!("ollama".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_turn_roles_are_normalized() {
        let bot = ChatTurn {
            role: "Bot".into(),
            content: "Sow after the first rains.".into(),
        };
        let farmer = ChatTurn {
            role: "farmer".into(),
            content: "When should I sow?".into(),
        };
        assert_eq!(ChatMessage::from(&bot).role, "assistant");
        assert_eq!(ChatMessage::from(&farmer).role, "user");
    }

    #[test]
    fn test_stream_event_tags() {
        let done = StreamEvent::Done {
            model: None,
            source: "fallback engine".into(),
            tokens_used: 1,
            duration: 3,
        };
        let json = serde_json::to_value(&done).unwrap();
        assert_eq!(json["type"], "done");
        assert_eq!(json["tokensUsed"], 1);
        assert!(json.get("model").is_none());
    }

    #[test]
    fn test_config_update_camel_case() {
        let update: LLMConfigUpdate =
            serde_json::from_str(r#"{"preferredProvider":"groq","groqApiKey":"gsk"}"#).unwrap();
        assert_eq!(update.preferred_provider.as_deref(), Some("groq"));
        assert_eq!(update.groq_api_key.as_deref(), Some("gsk"));
        assert!(update.openai_model.is_none());
    }
}
