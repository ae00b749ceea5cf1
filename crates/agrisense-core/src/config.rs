//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 3004;
pub const DEFAULT_MAX_TOKENS: usize = 1024;

/// Paths to AgriSense data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// LLM provider configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates the root if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            llm_config_file: root.join("llm-config.json"),
            root,
        })
    }
}

/// Top-level AgriSense configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgriSenseConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Token budget passed to the generative model on every call.
    pub max_tokens: usize,
    /// When false every request goes straight to the rule engine.
    pub model_enabled: bool,
}

impl AgriSenseConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let max_tokens = std::env::var("AGRISENSE_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v: &usize| *v > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let model_enabled = std::env::var("AGRISENSE_MODEL_ENABLED")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        let data_paths = DataPaths::new(data_dir)?;

        tracing::debug!(port, max_tokens, model_enabled, "configuration resolved");

        Ok(Self {
            port,
            data_paths,
            max_tokens,
            model_enabled,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
