//! End-to-end pipeline tests with stub model clients.
//!
//! Each stub stands in for the hosted model so the whole
//! prompt → model → parse/fallback → aggregate path runs without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agrisense_advisor::fallback;
use agrisense_advisor::parse::parse_crops;
use agrisense_advisor::*;
use agrisense_core::{Error, Result};
use async_trait::async_trait;

/// Always fails, like an unreachable provider.
struct Unreachable;

#[async_trait]
impl GenerativeModel for Unreachable {
    async fn generate(&self, _prompt: &str, _model: &str, _max_tokens: usize) -> Result<String> {
        Err(Error::ServiceUnavailable("connection refused".into()))
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

/// Returns fixed text and records what it was asked.
struct Scripted {
    reply: String,
    calls: AtomicUsize,
    last_model: Mutex<Option<String>>,
    last_image: Mutex<Option<String>>,
}

impl Scripted {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            last_model: Mutex::new(None),
            last_image: Mutex::new(None),
        })
    }
}

#[async_trait]
impl GenerativeModel for Scripted {
    async fn generate(&self, _prompt: &str, model: &str, _max_tokens: usize) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_model.lock().unwrap() = Some(model.to_string());
        Ok(self.reply.clone())
    }

    async fn generate_with_image(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: usize,
        image: &ImageAttachment,
    ) -> Result<String> {
        *self.last_image.lock().unwrap() = Some(image.mime_type.clone());
        self.generate(prompt, model, max_tokens).await
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Panics inside the model future.
struct Exploding;

#[async_trait]
impl GenerativeModel for Exploding {
    async fn generate(&self, _prompt: &str, _model: &str, _max_tokens: usize) -> Result<String> {
        panic!("provider SDK bug");
    }

    fn name(&self) -> &str {
        "exploding"
    }
}

fn monsoon() -> SoilEnvironmentInput {
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

fn frozen_desert() -> SoilEnvironmentInput {
    SoilEnvironmentInput {
        nitrogen: 10.0,
        phosphorus: 8.0,
        potassium: 5.0,
        temperature: 5.0,
        humidity: 20.0,
        ph: 9.0,
        rainfall: 10.0,
        ..Default::default()
    }
}

fn fixed(advisor: Advisor) -> Advisor {
    advisor.with_confidence_source(Arc::new(FixedConfidence(0.7)))
}

#[test]
fn scenario_a_monsoon_soil_includes_rice_and_maize() {
    let crops = fallback::recommend_crops(&monsoon());
    assert!(crops.len() <= 3);

    let rice = crops.iter().find(|c| c.name == "Rice").expect("rice recommended");
    assert_eq!(rice.suitability, Suitability::High);
    assert!(crops.iter().any(|c| c.name == "Corn (Maize)"));

    for pair in crops.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
    for crop in &crops {
        assert!((0.40..=0.95).contains(&crop.confidence));
        assert!(!crop.details.is_empty());
    }
}

#[test]
fn scenario_b_no_crop_qualifies() {
    assert!(fallback::recommend_crops(&frozen_desert()).is_empty());
}

#[test]
fn scenario_c_empty_text_gives_synthetic_record() {
    let records = parse_crops("", &FixedConfidence(0.8));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "General Recommendation");
    assert_eq!(records[0].confidence, 0.7);
}

#[tokio::test]
async fn scenario_d_failing_model_uses_fallback_engine() {
    let advisor = Advisor::new(Some(Arc::new(Unreachable)), AdvisorSettings::default());
    let result = advisor.recommend_crops(&monsoon()).await;

    assert_eq!(result.source, ResultSource::FallbackEngine);
    assert!((0.4..=0.95).contains(&result.confidence));
    assert!(result.raw_response.is_empty());
    assert_eq!(result.recommendations[0].name, "Corn (Maize)");
    assert_eq!(result.confidence, 0.9);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["source"], "fallback engine");
}

#[tokio::test]
async fn scenario_d_empty_candidates_still_succeed() {
    let advisor = Advisor::new(Some(Arc::new(Unreachable)), AdvisorSettings::default());
    let result = advisor.recommend_crops(&frozen_desert()).await;

    assert!(result.recommendations.is_empty());
    assert_eq!(result.confidence, 0.5);
    assert!(!result.general_advice.is_empty());
}

#[tokio::test]
async fn scenario_e_model_text_is_parsed() {
    let stub = Scripted::new(
        "Recommended crops for your field:\n\
         1. Crop: Wheat ... confidence: 82%\n\
         - Sow in the first fortnight of November",
    );
    let advisor = fixed(Advisor::new(Some(stub.clone()), AdvisorSettings::default()));
    let result = advisor.recommend_crops(&monsoon()).await;

    assert_eq!(result.source, ResultSource::Model);
    assert_eq!(result.recommendations.len(), 1);
    assert_eq!(result.recommendations[0].name, "Wheat");
    assert_eq!(result.recommendations[0].confidence, 0.82);
    assert_eq!(result.confidence, 0.82);
    assert!(result.raw_response.contains("Wheat"));
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        stub.last_model.lock().unwrap().as_deref(),
        Some(DEFAULT_MODEL_HANDLE)
    );
}

#[tokio::test]
async fn no_client_means_fallback() {
    let advisor = Advisor::offline(AdvisorSettings::default());
    let result = advisor
        .recommend_fertilizer(&FertilizerRequest {
            soil: frozen_desert(),
            crop: Some("Wheat".into()),
        })
        .await;
    assert_eq!(result.source, ResultSource::FallbackEngine);
    assert!(!result.recommendations.is_empty());
    assert!(result.recommendations.len() <= 3);
    let health = result.soil_health.expect("soil health attached");
    assert_eq!(health.nitrogen, NutrientLevel::Low);
    assert_eq!(health.ph, PhClass::Alkaline);
}

#[tokio::test]
async fn panicking_client_is_contained() {
    let advisor = Advisor::new(Some(Arc::new(Exploding)), AdvisorSettings::default());
    let result = advisor
        .plan_irrigation(&IrrigationRequest {
            soil: monsoon(),
            ..Default::default()
        })
        .await;
    assert_eq!(result.source, ResultSource::FallbackEngine);
}

#[tokio::test]
async fn whitespace_only_reply_counts_as_unavailable() {
    let advisor = Advisor::new(Some(Scripted::new("  \n ")), AdvisorSettings::default());
    let result = advisor
        .optimal_season(&SeasonRequest {
            crop: "Wheat".into(),
            ..Default::default()
        })
        .await;
    assert_eq!(result.source, ResultSource::FallbackEngine);
    assert_eq!(result.recommendations[0].best_season, "Rabi");
}

#[tokio::test]
async fn disease_image_reaches_vision_model() {
    let stub = Scripted::new(
        "1. Disease: Early Blight\nSeverity: Moderate\nConfidence: 70%\nTreatment: Mancozeb 2 g/L",
    );
    let advisor = Advisor::new(Some(stub.clone()), AdvisorSettings::default());
    let result = advisor
        .diagnose_disease(&DiseaseRequest {
            crop: Some("Tomato".into()),
            symptoms: Some("Concentric rings on lower leaves".into()),
            location: None,
            image: Some(ImageAttachment {
                mime_type: "image/png".into(),
                data: "iVBORw0KGgo=".into(),
            }),
        })
        .await;

    assert_eq!(result.source, ResultSource::Model);
    let record = &result.recommendations[0];
    assert_eq!(record.disease_name, "Early Blight");
    assert_eq!(record.severity, Suitability::Medium);
    assert_eq!(record.treatment, "Mancozeb 2 g/L");
    assert_eq!(stub.last_image.lock().unwrap().as_deref(), Some("image/png"));
    assert_eq!(stub.last_model.lock().unwrap().as_deref(), Some("gpt-4o"));
}

#[tokio::test]
async fn every_task_returns_a_result_offline() {
    let advisor = Advisor::offline(AdvisorSettings::default());

    let yields = advisor
        .predict_yield(&YieldRequest {
            crop: "Maize".into(),
            area_acres: Some(5.0),
            ..Default::default()
        })
        .await;
    assert_eq!(yields.recommendations.len(), 1);
    assert!(yields.soil_health.is_none());

    let swaps = advisor
        .plan_crop_swap(&CropSwapRequest {
            current_crop: "Cotton".into(),
            ..Default::default()
        })
        .await;
    assert_eq!(swaps.recommendations.len(), 3);

    let market = advisor
        .market_analysis(&MarketRequest {
            crop: "Onion".into(),
            ..Default::default()
        })
        .await;
    assert_eq!(market.confidence, 0.4);

    let geo = advisor
        .geospatial_insight(&GeospatialRequest::default())
        .await;
    assert_eq!(geo.recommendations.len(), 1);

    let diagnosis = advisor.diagnose_disease(&DiseaseRequest::default()).await;
    assert_eq!(
        diagnosis.recommendations[0].disease_name,
        "Disease identification needed"
    );

    for result in [&market, &geo] {
        assert!((0.4..=0.95).contains(&result.confidence));
    }
}

#[tokio::test]
async fn concurrent_requests_do_not_interfere() {
    let advisor = Arc::new(Advisor::offline(AdvisorSettings::default()));
    let mut handles = Vec::new();
    for i in 0..8 {
        let advisor = advisor.clone();
        handles.push(tokio::spawn(async move {
            let soil = if i % 2 == 0 { monsoon() } else { frozen_desert() };
            advisor.recommend_crops(&soil).await.recommendations.len()
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let count = handle.await.unwrap();
        if i % 2 == 0 {
            assert_eq!(count, 3);
        } else {
            assert_eq!(count, 0);
        }
    }
}
