//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use agrisense_advisor::{Advisor, AdvisorSettings, GenerativeModel};
use agrisense_core::{AgriSenseConfig, Error, Result};
use agrisense_llm::{HostedModel, LLMConfig};
use parking_lot::RwLock;

/// Upper bound on a single provider round trip.
const HTTP_TIMEOUT: Duration = Duration::from_secs(90);

pub struct AppState {
    pub config: AgriSenseConfig,
    pub llm_config: Arc<RwLock<LLMConfig>>,
    pub http: reqwest::Client,
    pub advisor: Advisor,
}

impl AppState {
    /// State with provider settings loaded from the data directory.
    pub fn new(config: AgriSenseConfig) -> Result<Self> {
        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
        Self::with_llm_config(config, llm_config)
    }

    pub fn with_llm_config(config: AgriSenseConfig, llm_config: LLMConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        let llm_config = Arc::new(RwLock::new(llm_config));

        let model: Arc<dyn GenerativeModel> =
            Arc::new(HostedModel::new(http.clone(), llm_config.clone()));
        let advisor = Advisor::new(Some(model), AdvisorSettings::from_config(&config));

        Ok(Self {
            config,
            llm_config,
            http,
            advisor,
        })
    }
}
