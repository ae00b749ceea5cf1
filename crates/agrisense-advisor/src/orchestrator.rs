//! Orchestrator: runs one request through prompt → model → parse/fallback → aggregate.
//!
//! The model path is best effort. Any failure on it (no client, disabled,
//! error, empty text, panic) switches to the rule-based fallback, so every
//! operation here returns a result rather than an error.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use agrisense_core::config::DEFAULT_MAX_TOKENS;
use agrisense_core::{AgriSenseConfig, Error, Result};
use futures::FutureExt;
use tracing::{debug, warn};

use crate::confidence::{aggregate, clamp_fallback, rank, round2};
use crate::fallback::{self, tasks};
use crate::model::GenerativeModel;
use crate::parse::{self, ConfidenceSource, RandomConfidence, RecommendationKind};
use crate::prompts::{self, TaskPayload};
use crate::selector::ModelTable;
use crate::types::*;

/// Reply sent when chat has no model to talk to.
pub const CHAT_FALLBACK_MESSAGE: &str = "The AI assistant is not available right now. \
     The crop, fertilizer and irrigation recommendation tools still work from your soil readings, \
     and your local Krishi Vigyan Kendra can help with anything urgent.";

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    BuildingPrompt,
    InvokingModel,
    ParsingResponse,
    RunningFallback,
    Aggregating,
    Done,
}

/// What just happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    PromptReady,
    ModelSucceeded,
    ModelUnavailable,
    RecordsReady,
    ResultReady,
}

impl PipelineStage {
    /// Next stage, or None when `event` is not valid in this stage.
    pub fn next(self, event: StageEvent) -> Option<PipelineStage> {
        use PipelineStage::*;
        use StageEvent::*;
        match (self, event) {
            (BuildingPrompt, PromptReady) => Some(InvokingModel),
            (InvokingModel, ModelSucceeded) => Some(ParsingResponse),
            (InvokingModel, ModelUnavailable) => Some(RunningFallback),
            (ParsingResponse | RunningFallback, RecordsReady) => Some(Aggregating),
            (Aggregating, ResultReady) => Some(Done),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == PipelineStage::Done
    }
}

/// Stages one request went through, for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrace {
    task: TaskCategory,
    path: Vec<PipelineStage>,
}

impl StageTrace {
    fn new(task: TaskCategory) -> Self {
        Self {
            task,
            path: vec![PipelineStage::BuildingPrompt],
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.path
            .last()
            .copied()
            .unwrap_or(PipelineStage::BuildingPrompt)
    }

    fn advance(&mut self, event: StageEvent) {
        let from = self.current();
        match from.next(event) {
            Some(to) => {
                debug!(task = %self.task, ?from, ?to, "pipeline stage");
                self.path.push(to);
            }
            None => warn!(task = %self.task, ?from, ?event, "ignored invalid stage event"),
        }
    }
}

impl fmt::Display for StageTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.path.iter().map(|s| format!("{s:?}")).collect();
        f.write_str(&names.join(" → "))
    }
}

// ---------------------------------------------------------------------------
// Advisor
// ---------------------------------------------------------------------------

/// Knobs the pipeline needs; read from configuration once at startup.
#[derive(Debug, Clone)]
pub struct AdvisorSettings {
    pub model_enabled: bool,
    pub max_tokens: usize,
    pub models: ModelTable,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            model_enabled: true,
            max_tokens: DEFAULT_MAX_TOKENS,
            models: ModelTable::default(),
        }
    }
}

impl AdvisorSettings {
    pub fn from_config(config: &AgriSenseConfig) -> Self {
        Self {
            model_enabled: config.model_enabled,
            max_tokens: config.max_tokens,
            models: ModelTable::default(),
        }
    }
}

/// Model output of one run, or the reason the fallback ran.
struct Outcome<T> {
    records: Vec<T>,
    source: ResultSource,
    raw_response: String,
    trace: StageTrace,
}

/// The recommendation orchestrator. Cheap to share behind an `Arc`; holds no
/// per-request state.
pub struct Advisor {
    client: Option<Arc<dyn GenerativeModel>>,
    settings: AdvisorSettings,
    confidence: Arc<dyn ConfidenceSource>,
}

impl Advisor {
    pub fn new(client: Option<Arc<dyn GenerativeModel>>, settings: AdvisorSettings) -> Self {
        Self {
            client,
            settings,
            confidence: Arc::new(RandomConfidence),
        }
    }

    /// Advisor with no model client; every request uses the fallback engine.
    pub fn offline(settings: AdvisorSettings) -> Self {
        Self::new(None, settings)
    }

    /// Replace the default-confidence provider (tests use a fixed value).
    pub fn with_confidence_source(mut self, source: Arc<dyn ConfidenceSource>) -> Self {
        self.confidence = source;
        self
    }

    pub fn settings(&self) -> &AdvisorSettings {
        &self.settings
    }

    /// True when a client is configured and enabled.
    pub fn model_available(&self) -> bool {
        self.client.is_some() && self.settings.model_enabled
    }

    /// Call the model once. Every failure mode comes back as `ServiceUnavailable`.
    async fn invoke(
        &self,
        task: TaskCategory,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::ServiceUnavailable("no model client configured".into()))?;
        if !self.settings.model_enabled {
            return Err(Error::ServiceUnavailable("model disabled".into()));
        }

        let model = self.settings.models.select(task);
        let max_tokens = self.settings.max_tokens;
        debug!(%task, model, backend = client.name(), "invoking model");

        let call = async {
            match image {
                Some(image) => {
                    client
                        .generate_with_image(prompt, model, max_tokens, image)
                        .await
                }
                None => client.generate(prompt, model, max_tokens).await,
            }
        };
        let text = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(Error::ServiceUnavailable(e.to_string())),
            Err(_) => return Err(Error::ServiceUnavailable("model client panicked".into())),
        };
        if text.trim().is_empty() {
            return Err(Error::ServiceUnavailable("model returned empty text".into()));
        }
        Ok(text)
    }

    /// Prompt, invoke, then parse on success or fall back on failure.
    async fn produce<T>(
        &self,
        payload: TaskPayload<'_>,
        image: Option<&ImageAttachment>,
        parse: impl FnOnce(&str) -> Vec<T>,
        fallback: impl FnOnce() -> Vec<T>,
    ) -> Outcome<T> {
        let task = payload.task();
        let mut trace = StageTrace::new(task);
        let prompt = prompts::build(&payload);
        trace.advance(StageEvent::PromptReady);

        match self.invoke(task, &prompt, image).await {
            Ok(text) => {
                trace.advance(StageEvent::ModelSucceeded);
                let records = parse(&text);
                trace.advance(StageEvent::RecordsReady);
                Outcome {
                    records,
                    source: ResultSource::Model,
                    raw_response: text,
                    trace,
                }
            }
            Err(e) => {
                warn!(%task, error = %e, "model path failed, using fallback engine");
                trace.advance(StageEvent::ModelUnavailable);
                let records = fallback();
                trace.advance(StageEvent::RecordsReady);
                Outcome {
                    records,
                    source: ResultSource::FallbackEngine,
                    raw_response: String::new(),
                    trace,
                }
            }
        }
    }

    async fn run<T: Scored>(
        &self,
        payload: TaskPayload<'_>,
        image: Option<&ImageAttachment>,
        parse: impl FnOnce(&str) -> Vec<T>,
        fallback: impl FnOnce() -> Vec<T>,
    ) -> AggregateResult<T> {
        let Outcome {
            mut records,
            source,
            raw_response,
            mut trace,
        } = self.produce(payload, image, parse, fallback).await;

        rank(&mut records);
        let confidence = match source {
            ResultSource::Model => aggregate(&records),
            ResultSource::FallbackEngine => round2(clamp_fallback(aggregate(&records))),
        };
        trace.advance(StageEvent::ResultReady);
        debug!(
            task = %payload.task(),
            %source,
            records = records.len(),
            confidence,
            path = %trace,
            "pipeline done"
        );

        AggregateResult {
            recommendations: records,
            confidence,
            source,
            raw_response,
            soil_health: None,
            general_advice: Vec::new(),
        }
    }

    fn source(&self) -> &dyn ConfidenceSource {
        self.confidence.as_ref()
    }

    // -- per-task operations -------------------------------------------------

    pub async fn recommend_crops(&self, soil: &SoilEnvironmentInput) -> AggregateResult<CropCandidate> {
        let mut result = self
            .run(
                TaskPayload::CropRecommendation(soil),
                None,
                |text| parse::parse_crops(text, self.source()),
                || fallback::recommend_crops(soil),
            )
            .await;
        result.soil_health = Some(fallback::assess_soil_health(soil));
        result.general_advice = fallback::general_advice(soil);
        result
    }

    pub async fn recommend_fertilizer(
        &self,
        request: &FertilizerRequest,
    ) -> AggregateResult<Recommendation> {
        let mut result = self
            .run(
                TaskPayload::Fertilizer(request),
                None,
                |text| {
                    parse::parse_recommendations(text, RecommendationKind::Fertilizer, self.source())
                },
                || fallback::recommend_fertilizer(&request.soil),
            )
            .await;
        result.soil_health = Some(fallback::assess_soil_health(&request.soil));
        result
    }

    pub async fn plan_irrigation(&self, request: &IrrigationRequest) -> AggregateResult<Recommendation> {
        let mut result = self
            .run(
                TaskPayload::Irrigation(request),
                None,
                |text| {
                    parse::parse_recommendations(text, RecommendationKind::Irrigation, self.source())
                },
                || fallback::recommend_irrigation(&request.soil),
            )
            .await;
        result.soil_health = Some(fallback::assess_soil_health(&request.soil));
        result.general_advice = fallback::general_advice(&request.soil);
        result
    }

    /// The image, when present, goes to the model untouched.
    pub async fn diagnose_disease(&self, request: &DiseaseRequest) -> AggregateResult<DiagnosisRecord> {
        self.run(
            TaskPayload::DiseaseDetection(request),
            request.image.as_ref(),
            |text| parse::parse_diagnoses(text, self.source()),
            || tasks::diagnose(request),
        )
        .await
    }

    pub async fn predict_yield(&self, request: &YieldRequest) -> AggregateResult<YieldPredictionRecord> {
        let mut result = self
            .run(
                TaskPayload::YieldPrediction(request),
                None,
                |text| parse::parse_yield(text, &request.crop, self.source()),
                || tasks::estimate_yield(request),
            )
            .await;
        result.soil_health = request.soil.as_ref().map(fallback::assess_soil_health);
        result
    }

    pub async fn plan_crop_swap(&self, request: &CropSwapRequest) -> AggregateResult<SwapStrategyRecord> {
        let mut result = self
            .run(
                TaskPayload::CropSwapping(request),
                None,
                |text| parse::parse_swaps(text, self.source()),
                || tasks::swap_strategies(request),
            )
            .await;
        result.soil_health = request.soil.as_ref().map(fallback::assess_soil_health);
        result
    }

    pub async fn optimal_season(&self, request: &SeasonRequest) -> AggregateResult<SeasonRecord> {
        self.run(
            TaskPayload::OptimalSeason(request),
            None,
            |text| parse::parse_season(text, &request.crop, self.source()),
            || tasks::season_plan(request),
        )
        .await
    }

    pub async fn market_analysis(&self, request: &MarketRequest) -> AggregateResult<Recommendation> {
        self.run(
            TaskPayload::MarketAnalysis(request),
            None,
            |text| parse::parse_recommendations(text, RecommendationKind::Advisory, self.source()),
            || tasks::market_advisory(request),
        )
        .await
    }

    pub async fn geospatial_insight(
        &self,
        request: &GeospatialRequest,
    ) -> AggregateResult<Recommendation> {
        self.run(
            TaskPayload::Geospatial(request),
            None,
            |text| parse::parse_recommendations(text, RecommendationKind::Advisory, self.source()),
            || tasks::geospatial_advisory(request),
        )
        .await
    }

    /// Free-form question. Model text is returned trimmed; without a model the
    /// farmer gets [`CHAT_FALLBACK_MESSAGE`].
    pub async fn chat(&self, request: &ChatRequest) -> ChatReply {
        let model = self.settings.models.select(TaskCategory::Chat).to_string();
        let outcome = self
            .produce(
                TaskPayload::Chat(request),
                None,
                |text| vec![text.trim().to_string()],
                || vec![CHAT_FALLBACK_MESSAGE.to_string()],
            )
            .await;
        let Outcome {
            records,
            source,
            mut trace,
            ..
        } = outcome;
        trace.advance(StageEvent::ResultReady);
        debug!(task = "chat", %source, path = %trace, "pipeline done");

        ChatReply {
            message: records.into_iter().next().unwrap_or_default(),
            source,
            model: (source == ResultSource::Model).then_some(model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::parse::FixedConfidence;

    struct Echo(&'static str);

    #[async_trait]
    impl GenerativeModel for Echo {
        async fn generate(&self, _prompt: &str, _model: &str, _max_tokens: usize) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn soil() -> SoilEnvironmentInput {
        SoilEnvironmentInput {
            nitrogen: 30.0,
            phosphorus: 25.0,
            potassium: 28.0,
            temperature: 27.0,
            humidity: 75.0,
            ph: 6.2,
            rainfall: 200.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_transitions() {
        use PipelineStage::*;
        use StageEvent::*;
        assert_eq!(BuildingPrompt.next(PromptReady), Some(InvokingModel));
        assert_eq!(InvokingModel.next(ModelSucceeded), Some(ParsingResponse));
        assert_eq!(InvokingModel.next(ModelUnavailable), Some(RunningFallback));
        assert_eq!(ParsingResponse.next(RecordsReady), Some(Aggregating));
        assert_eq!(RunningFallback.next(RecordsReady), Some(Aggregating));
        assert_eq!(Aggregating.next(ResultReady), Some(Done));
        assert!(Done.is_terminal());
        assert_eq!(BuildingPrompt.next(ModelSucceeded), None);
        assert_eq!(Done.next(PromptReady), None);
    }

    #[test]
    fn test_trace_ignores_invalid_events() {
        let mut trace = StageTrace::new(TaskCategory::Fertilizer);
        trace.advance(StageEvent::RecordsReady);
        assert_eq!(trace.current(), PipelineStage::BuildingPrompt);
        trace.advance(StageEvent::PromptReady);
        trace.advance(StageEvent::ModelUnavailable);
        trace.advance(StageEvent::RecordsReady);
        trace.advance(StageEvent::ResultReady);
        assert!(trace.current().is_terminal());
        assert_eq!(
            trace.to_string(),
            "BuildingPrompt → InvokingModel → RunningFallback → Aggregating → Done"
        );
    }

    #[tokio::test]
    async fn test_fallback_path_reaches_done() {
        let advisor = Advisor::offline(AdvisorSettings::default());
        let outcome = advisor
            .produce(
                TaskPayload::CropRecommendation(&soil()),
                None,
                |_| Vec::<Recommendation>::new(),
                || fallback::recommend_crops(&soil()),
            )
            .await;
        assert_eq!(outcome.source, ResultSource::FallbackEngine);
        assert_eq!(outcome.trace.current(), PipelineStage::Aggregating);
        assert!(outcome.raw_response.is_empty());
        assert_eq!(outcome.records.len(), 3);
    }

    #[tokio::test]
    async fn test_disabled_model_is_never_called() {
        let settings = AdvisorSettings {
            model_enabled: false,
            ..Default::default()
        };
        let advisor = Advisor::new(Some(Arc::new(Echo("1. Crop: Wheat"))), settings);
        assert!(!advisor.model_available());
        let result = advisor.recommend_crops(&soil()).await;
        assert_eq!(result.source, ResultSource::FallbackEngine);
    }

    #[tokio::test]
    async fn test_model_text_is_parsed_and_ranked() {
        let text = "1. Crop: Millet\nConfidence: 60%\n2. Crop: Rice\nConfidence: 90%";
        let advisor = Advisor::new(Some(Arc::new(Echo(text))), AdvisorSettings::default())
            .with_confidence_source(Arc::new(FixedConfidence(0.7)));
        let result = advisor.recommend_crops(&soil()).await;
        assert_eq!(result.source, ResultSource::Model);
        assert_eq!(result.recommendations[0].name, "Rice");
        assert_eq!(result.confidence, 0.75);
        assert_eq!(result.raw_response, text);
        assert!(result.soil_health.is_some());
    }

    #[tokio::test]
    async fn test_chat_fallback_and_model() {
        let request = ChatRequest {
            message: "How much urea for wheat?".into(),
            ..Default::default()
        };
        let offline = Advisor::offline(AdvisorSettings::default());
        let reply = offline.chat(&request).await;
        assert_eq!(reply.message, CHAT_FALLBACK_MESSAGE);
        assert_eq!(reply.source, ResultSource::FallbackEngine);
        assert!(reply.model.is_none());

        let online = Advisor::new(Some(Arc::new(Echo("  About 120 kg/ha.  "))), AdvisorSettings::default());
        let reply = online.chat(&request).await;
        assert_eq!(reply.message, "About 120 kg/ha.");
        assert_eq!(reply.model.as_deref(), Some("gpt-4o-mini"));
    }
}
