//! `GenerativeModel` backed by whichever hosted provider is configured.

use std::sync::Arc;

use agrisense_advisor::{ChatTurn, GenerativeModel, ImageAttachment};
use agrisense_core::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use tracing::debug;

use crate::config::{LLMConfig, ResolvedProvider};
use crate::providers;
use crate::types::ChatMessage;

/// System message sent ahead of every pipeline prompt.
pub const SYSTEM_PERSONA: &str = "You are AgriSense, an agronomy assistant for smallholder farmers. \
     Give practical, location-aware advice and follow the requested output format exactly.";

pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Hosted model client. Reads the shared provider config on every call, so
/// key changes made through the config endpoint apply immediately.
#[derive(Clone)]
pub struct HostedModel {
    http: Client,
    config: Arc<RwLock<LLMConfig>>,
}

impl HostedModel {
    pub fn new(http: Client, config: Arc<RwLock<LLMConfig>>) -> Self {
        Self { http, config }
    }

    fn resolve(&self, handle: &str) -> Result<ResolvedProvider> {
        self.config
            .read()
            .resolve_for_handle(handle)
            .ok_or_else(|| Error::ServiceUnavailable("No LLM provider configured".into()))
    }

    async fn call(
        &self,
        prompt: &str,
        handle: &str,
        max_tokens: usize,
        image: Option<&ImageAttachment>,
    ) -> Result<String> {
        let target = self.resolve(handle)?;
        debug!(handle, provider = %target.provider, model = %target.model, "calling hosted model");
        let messages = [ChatMessage::system(SYSTEM_PERSONA), ChatMessage::user(prompt)];
        providers::complete(
            &self.http,
            &target,
            &messages,
            image,
            DEFAULT_TEMPERATURE,
            max_tokens,
        )
        .await
    }
}

#[async_trait]
impl GenerativeModel for HostedModel {
    async fn generate(&self, prompt: &str, model: &str, max_tokens: usize) -> Result<String> {
        self.call(prompt, model, max_tokens, None).await
    }

    async fn generate_with_image(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: usize,
        image: &ImageAttachment,
    ) -> Result<String> {
        self.call(prompt, model, max_tokens, Some(image)).await
    }

    fn name(&self) -> &str {
        "hosted"
    }
}

/// Provider messages for a streamed chat turn: persona, prior turns, question.
/// A requested reply language is appended to the persona.
pub fn chat_messages(history: &[ChatTurn], message: &str, language: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(language) => messages.push(ChatMessage::system(format!(
            "{SYSTEM_PERSONA} Reply in {language}."
        ))),
        None => messages.push(ChatMessage::system(SYSTEM_PERSONA)),
    }
    messages.extend(
        history
            .iter()
            .filter(|turn| !turn.content.trim().is_empty())
            .map(ChatMessage::from),
    );
    messages.push(ChatMessage::user(message.trim()));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_is_unavailable() {
        let model = HostedModel::new(Client::new(), Arc::new(RwLock::new(LLMConfig::default())));
        let err = model.generate("prompt", "gpt-4o-mini", 16).await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_config_changes_are_seen() {
        let config = Arc::new(RwLock::new(LLMConfig::default()));
        let model = HostedModel::new(Client::new(), config.clone());
        assert!(model.resolve("gpt-4o").is_err());

        config.write().openai_api_key = Some("sk".into());
        assert_eq!(model.resolve("gpt-4o").unwrap().model, "gpt-4o");
    }

    #[test]
    fn test_chat_messages() {
        let history = vec![
            ChatTurn {
                role: "user".into(),
                content: "My wheat leaves are yellow".into(),
            },
            ChatTurn {
                role: "assistant".into(),
                content: "   ".into(),
            },
        ];
        let messages = chat_messages(&history, " Should I add urea? ", None);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_PERSONA);
        assert_eq!(messages[2].content, "Should I add urea?");
    }

    #[test]
    fn test_chat_messages_carry_reply_language() {
        let messages = chat_messages(&[], "Kab buai karein?", Some("Hindi"));
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.starts_with(SYSTEM_PERSONA));
        assert!(messages[0].content.ends_with("Reply in Hindi."));

        let blank = chat_messages(&[], "hello", Some("  "));
        assert_eq!(blank[0].content, SYSTEM_PERSONA);
    }
}
