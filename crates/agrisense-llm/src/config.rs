//! Provider configuration: persisted to `llm-config.json`, keys fall back to env.

use std::path::{Path, PathBuf};

use agrisense_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{LLMConfigResponse, LLMConfigUpdate, LLMProvider};

pub const AUTO_PROVIDER: &str = "auto";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

pub const OPENAI_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"];
pub const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
];
pub const GROQ_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
    "mixtral-8x7b-32768",
];

/// Order tried when the preference is `auto`.
const AUTO_ORDER: [LLMProvider; 3] = [LLMProvider::Anthropic, LLMProvider::Groq, LLMProvider::OpenAI];

/// A provider with a usable key, and the model to call on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
}

/// Stored provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    AUTO_PROVIDER.into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            groq_model: default_groq_model(),
            config_path: PathBuf::new(),
        }
    }
}

impl LLMConfig {
    /// Load from `config_path`, filling missing keys from the process environment.
    pub fn load(config_path: &Path) -> Self {
        Self::load_with_env(config_path, |name| std::env::var(name).ok())
    }

    /// Load with an explicit environment lookup.
    pub fn load_with_env(config_path: &Path, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match std::fs::read_to_string(config_path) {
            Ok(raw) => serde_json::from_str::<LLMConfig>(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable {}: {}", config_path.display(), e);
                LLMConfig::default()
            }),
            Err(_) => LLMConfig::default(),
        };
        config.config_path = config_path.to_path_buf();

        for provider in LLMProvider::ALL {
            if config.api_key(provider).is_none() {
                let from_env = env(env_key(provider)).filter(|k| !k.trim().is_empty());
                *config.key_slot(provider) = from_env;
            }
        }

        info!(
            active = ?config.resolve_provider().map(|r| r.provider.as_str()),
            "LLM config loaded"
        );
        config
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved LLM config to {}", self.config_path.display());
        Ok(())
    }

    /// Merge a partial update. An empty key string clears that key.
    pub fn apply_update(&mut self, update: &LLMConfigUpdate) -> Result<()> {
        if let Some(preferred) = &update.preferred_provider {
            let preferred = preferred.trim().to_ascii_lowercase();
            if preferred != AUTO_PROVIDER {
                preferred.parse::<LLMProvider>().map_err(Error::Config)?;
            }
            self.preferred_provider = preferred;
        }

        let keys = [
            (LLMProvider::OpenAI, &update.openai_api_key),
            (LLMProvider::Anthropic, &update.anthropic_api_key),
            (LLMProvider::Groq, &update.groq_api_key),
        ];
        for (provider, key) in keys {
            if let Some(key) = key {
                let key = key.trim();
                *self.key_slot(provider) = (!key.is_empty()).then(|| key.to_string());
            }
        }

        if let Some(m) = &update.openai_model {
            self.openai_model = m.clone();
        }
        if let Some(m) = &update.anthropic_model {
            self.anthropic_model = m.clone();
        }
        if let Some(m) = &update.groq_model {
            self.groq_model = m.clone();
        }
        Ok(())
    }

    pub fn api_key(&self, provider: LLMProvider) -> Option<&str> {
        match provider {
            LLMProvider::OpenAI => self.openai_api_key.as_deref(),
            LLMProvider::Anthropic => self.anthropic_api_key.as_deref(),
            LLMProvider::Groq => self.groq_api_key.as_deref(),
        }
    }

    fn key_slot(&mut self, provider: LLMProvider) -> &mut Option<String> {
        match provider {
            LLMProvider::OpenAI => &mut self.openai_api_key,
            LLMProvider::Anthropic => &mut self.anthropic_api_key,
            LLMProvider::Groq => &mut self.groq_api_key,
        }
    }

    pub fn model(&self, provider: LLMProvider) -> &str {
        match provider {
            LLMProvider::OpenAI => &self.openai_model,
            LLMProvider::Anthropic => &self.anthropic_model,
            LLMProvider::Groq => &self.groq_model,
        }
    }

    /// Provider to use: the explicit preference if it has a key, otherwise
    /// the first keyed provider in auto order (Anthropic, Groq, OpenAI).
    pub fn resolve_provider(&self) -> Option<ResolvedProvider> {
        let resolved = |provider: LLMProvider| {
            self.api_key(provider).map(|key| ResolvedProvider {
                provider,
                model: self.model(provider).to_string(),
                api_key: key.to_string(),
            })
        };

        if self.preferred_provider != AUTO_PROVIDER {
            return self
                .preferred_provider
                .parse::<LLMProvider>()
                .ok()
                .and_then(resolved);
        }
        AUTO_ORDER.into_iter().find_map(resolved)
    }

    /// Resolve for a pipeline model handle.
    ///
    /// Handles name OpenAI models. They are honoured when OpenAI is the
    /// active provider; other providers use their configured model.
    pub fn resolve_for_handle(&self, handle: &str) -> Option<ResolvedProvider> {
        let mut resolved = self.resolve_provider()?;
        if resolved.provider == LLMProvider::OpenAI && OPENAI_MODELS.contains(&handle) {
            resolved.model = handle.to_string();
        }
        Some(resolved)
    }

    pub fn to_response(&self) -> LLMConfigResponse {
        LLMConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_configured: self.anthropic_api_key.is_some(),
            groq_configured: self.groq_api_key.is_some(),
            openai_model: self.openai_model.clone(),
            anthropic_model: self.anthropic_model.clone(),
            groq_model: self.groq_model.clone(),
            active_provider: self.resolve_provider().map(|r| r.provider.to_string()),
        }
    }

    /// Models offered by the active provider.
    pub fn available_models(&self) -> Vec<String> {
        let models = match self.resolve_provider().map(|r| r.provider) {
            Some(LLMProvider::OpenAI) => OPENAI_MODELS,
            Some(LLMProvider::Anthropic) => ANTHROPIC_MODELS,
            Some(LLMProvider::Groq) => GROQ_MODELS,
            None => &[],
        };
        models.iter().map(|m| m.to_string()).collect()
    }
}

fn env_key(provider: LLMProvider) -> &'static str {
    match provider {
        LLMProvider::OpenAI => "OPENAI_API_KEY",
        LLMProvider::Anthropic => "ANTHROPIC_API_KEY",
        LLMProvider::Groq => "GROQ_API_KEY",
    }
}
