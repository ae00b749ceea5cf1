//! Pipeline types: task categories, per-task requests, structured records.

use serde::{Deserialize, Serialize};

/// Kind of agricultural question being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskCategory {
    Chat,
    CropRecommendation,
    DiseaseDetection,
    YieldPrediction,
    CropSwapping,
    OptimalSeason,
    Fertilizer,
    MarketAnalysis,
    Geospatial,
    Irrigation,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 10] = [
        TaskCategory::Chat,
        TaskCategory::CropRecommendation,
        TaskCategory::DiseaseDetection,
        TaskCategory::YieldPrediction,
        TaskCategory::CropSwapping,
        TaskCategory::OptimalSeason,
        TaskCategory::Fertilizer,
        TaskCategory::MarketAnalysis,
        TaskCategory::Geospatial,
        TaskCategory::Irrigation,
    ];

    /// Wire name used in JSON and routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::CropRecommendation => "crop-recommendation",
            Self::DiseaseDetection => "disease-detection",
            Self::YieldPrediction => "yield-prediction",
            Self::CropSwapping => "crop-swapping",
            Self::OptimalSeason => "optimal-season",
            Self::Fertilizer => "fertilizer",
            Self::MarketAnalysis => "market-analysis",
            Self::Geospatial => "geospatial",
            Self::Irrigation => "irrigation",
        }
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskCategory {
    type Err = agrisense_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| agrisense_core::Error::InvalidInput(format!("unknown task category: {s}")))
    }
}

/// Categorical fit of a crop, strategy or input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suitability {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Suitability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Soil nutrients and weather readings for one field.
///
/// Values are taken as given: out-of-range numbers are compared as-is and
/// non-finite numbers fail every threshold check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilEnvironmentInput {
    /// Nitrogen (ppm).
    #[serde(alias = "N")]
    pub nitrogen: f64,
    /// Phosphorus (ppm).
    #[serde(alias = "P")]
    pub phosphorus: f64,
    /// Potassium (ppm).
    #[serde(alias = "K")]
    pub potassium: f64,
    /// Air temperature (°C).
    pub temperature: f64,
    /// Relative humidity (%).
    pub humidity: f64,
    #[serde(alias = "pH")]
    pub ph: f64,
    /// Rainfall (mm).
    pub rainfall: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

/// Image forwarded to the model with a diagnosis request. Never decoded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub mime_type: String,
    /// Base64 encoded image bytes.
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerRequest {
    #[serde(flatten)]
    pub soil: SoilEnvironmentInput,
    #[serde(default)]
    pub crop: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationRequest {
    #[serde(flatten)]
    pub soil: SoilEnvironmentInput,
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub area_acres: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseRequest {
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<ImageAttachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldRequest {
    pub crop: String,
    #[serde(default)]
    pub area_acres: Option<f64>,
    #[serde(default)]
    pub soil: Option<SoilEnvironmentInput>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub irrigation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropSwapRequest {
    pub current_crop: String,
    #[serde(default)]
    pub soil: Option<SoilEnvironmentInput>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    /// What the farmer wants from the switch (profit, soil health, water saving...).
    #[serde(default)]
    pub goal: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRequest {
    pub crop: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub soil: Option<SoilEnvironmentInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRequest {
    pub crop: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub quantity_quintals: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeospatialRequest {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub area_acres: Option<f64>,
}

/// One prior turn of a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, alias = "conversationHistory")]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Anything carrying a per-record confidence.
pub trait Scored {
    /// Confidence in [0, 1], or None when the record never got one.
    fn confidence(&self) -> Option<f64>;
}

/// Ranked crop (or fertilizer, irrigation method, risk) candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub name: String,
    pub suitability: Suitability,
    pub details: Vec<String>,
    pub confidence: f64,
}

/// Crop candidates use the generic recommendation shape.
pub type CropCandidate = Recommendation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisRecord {
    pub disease_name: String,
    pub severity: Suitability,
    pub confidence: f64,
    pub symptoms: String,
    pub cause: String,
    pub treatment: String,
    pub prevention: String,
    pub organic_alternative: String,
    pub recovery_time: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldPredictionRecord {
    pub crop: String,
    pub estimated_yield: String,
    pub total_production: String,
    pub quality_grade: String,
    pub market_value: String,
    pub roi: String,
    pub risk_factors: String,
    pub confidence: f64,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapStrategyRecord {
    pub name: String,
    pub suitability: Suitability,
    pub expected_roi: String,
    pub break_even: String,
    pub rotation_plan: String,
    pub transition_period: String,
    pub investment: String,
    pub confidence: f64,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRecord {
    pub crop: String,
    pub best_season: String,
    pub sowing_window: String,
    pub harvest_window: String,
    pub duration: String,
    pub weather_considerations: String,
    pub confidence: f64,
    pub details: Vec<String>,
}

macro_rules! impl_scored {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scored for $ty {
                fn confidence(&self) -> Option<f64> {
                    Some(self.confidence).filter(|c| c.is_finite())
                }
            }
        )*
    };
}

impl_scored!(
    Recommendation,
    DiagnosisRecord,
    YieldPredictionRecord,
    SwapStrategyRecord,
    SeasonRecord,
);

/// Which branch of the pipeline produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultSource {
    #[serde(rename = "model")]
    Model,
    #[serde(rename = "fallback engine")]
    FallbackEngine,
}

impl std::fmt::Display for ResultSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::FallbackEngine => write!(f, "fallback engine"),
        }
    }
}

/// Nutrient band derived from a ppm reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NutrientLevel {
    Low,
    Medium,
    High,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhClass {
    Acidic,
    Neutral,
    Alkaline,
    Unknown,
}

/// Soil-health labels attached to soil-based results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilHealth {
    pub nitrogen: NutrientLevel,
    pub phosphorus: NutrientLevel,
    pub potassium: NutrientLevel,
    pub ph: PhClass,
}

/// Terminal object handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult<T> {
    /// At most three records, highest confidence first.
    pub recommendations: Vec<T>,
    pub confidence: f64,
    pub source: ResultSource,
    /// Model text the records were parsed from; empty on the fallback path.
    #[serde(rename = "rawResponse")]
    pub raw_response: String,
    #[serde(rename = "soilHealth", default, skip_serializing_if = "Option::is_none")]
    pub soil_health: Option<SoilHealth>,
    #[serde(rename = "generalAdvice", default, skip_serializing_if = "Vec::is_empty")]
    pub general_advice: Vec<String>,
}

/// Reply to a free-form chat question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    pub source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_category_round_trip_names() {
        for task in TaskCategory::ALL {
            let parsed: TaskCategory = task.as_str().parse().unwrap();
            assert_eq!(parsed, task);
            let json = serde_json::to_string(&task).unwrap();
            assert_eq!(json, format!("\"{}\"", task.as_str()));
        }
    }

    #[test]
    fn test_task_category_lenient_parse() {
        assert_eq!(
            "Crop_Recommendation".parse::<TaskCategory>().unwrap(),
            TaskCategory::CropRecommendation
        );
        assert!("soil-analysis".parse::<TaskCategory>().is_err());
    }

    #[test]
    fn test_soil_input_aliases() {
        let soil: SoilEnvironmentInput = serde_json::from_value(serde_json::json!({
            "N": 30, "P": 25, "K": 28,
            "temperature": 27, "humidity": 75, "pH": 6.2, "rainfall": 200,
            "state": "Punjab"
        }))
        .unwrap();
        assert_eq!(soil.nitrogen, 30.0);
        assert_eq!(soil.ph, 6.2);
        assert_eq!(soil.state.as_deref(), Some("Punjab"));
        assert!(soil.district.is_none());
    }

    #[test]
    fn test_aggregate_result_shape() {
        let result = AggregateResult::<Recommendation> {
            recommendations: Vec::new(),
            confidence: 0.5,
            source: ResultSource::FallbackEngine,
            raw_response: String::new(),
            soil_health: None,
            general_advice: Vec::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["recommendations"].is_array());
        assert_eq!(json["source"], "fallback engine");
        assert_eq!(json["rawResponse"], "");
        assert!(json.get("soilHealth").is_none());
        assert!(json.get("generalAdvice").is_none());
    }

    #[test]
    fn test_scored_ignores_non_finite() {
        let rec = Recommendation {
            name: "Rice".into(),
            suitability: Suitability::High,
            details: Vec::new(),
            confidence: f64::NAN,
        };
        assert_eq!(rec.confidence(), None);
    }
}
