//! AgriSense Advisor: the recommendation and response-structuring pipeline.
//!
//! A request flows through:
//! 1. **Model selection** (`selector`) - task category → model handle
//! 2. **Prompt construction** (`prompts`) - typed payload → prompt text
//! 3. **Generation** (`model`) - injected [`GenerativeModel`], best effort
//! 4. **Parsing** (`parse`) or **rule-based fallback** (`fallback`)
//! 5. **Aggregation** (`confidence`) - one overall score per result
//!
//! [`Advisor`] in `orchestrator` composes the steps and always returns an
//! [`AggregateResult`]; model failures are an expected branch, never an error.

pub mod confidence;
pub mod fallback;
pub mod model;
pub mod orchestrator;
pub mod parse;
pub mod prompts;
pub mod selector;
pub mod types;

pub use model::GenerativeModel;
pub use orchestrator::{
    Advisor, AdvisorSettings, PipelineStage, StageEvent, StageTrace, CHAT_FALLBACK_MESSAGE,
};
pub use parse::{ConfidenceSource, FixedConfidence, RandomConfidence};
pub use prompts::TaskPayload;
pub use selector::{ModelTable, DEFAULT_MODEL_HANDLE};
pub use types::*;
