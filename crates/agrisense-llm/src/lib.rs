//! Hosted generative model client for AgriSense.
//!
//! Talks to OpenAI, Anthropic or Groq over HTTPS. Provider keys and model
//! preferences live in `llm-config.json`, with environment variables as a
//! fallback for keys.

pub mod config;
pub mod hosted;
pub mod providers;
pub mod types;

pub use config::{LLMConfig, ResolvedProvider};
pub use hosted::{chat_messages, HostedModel, DEFAULT_TEMPERATURE, SYSTEM_PERSONA};
pub use types::*;
