//! Prompt construction.
//!
//! Every task renders a fixed template. Optional fields are always present in
//! the output, rendered as `not specified` when absent, so the model sees the
//! same schema on every call.

use std::fmt::Write;

use crate::types::*;

pub const NOT_SPECIFIED: &str = "not specified";

/// Typed payload for one request; the variant fixes the task category.
#[derive(Debug, Clone, Copy)]
pub enum TaskPayload<'a> {
    Chat(&'a ChatRequest),
    CropRecommendation(&'a SoilEnvironmentInput),
    DiseaseDetection(&'a DiseaseRequest),
    YieldPrediction(&'a YieldRequest),
    CropSwapping(&'a CropSwapRequest),
    OptimalSeason(&'a SeasonRequest),
    Fertilizer(&'a FertilizerRequest),
    MarketAnalysis(&'a MarketRequest),
    Geospatial(&'a GeospatialRequest),
    Irrigation(&'a IrrigationRequest),
}

impl TaskPayload<'_> {
    pub fn task(&self) -> TaskCategory {
        match self {
            Self::Chat(_) => TaskCategory::Chat,
            Self::CropRecommendation(_) => TaskCategory::CropRecommendation,
            Self::DiseaseDetection(_) => TaskCategory::DiseaseDetection,
            Self::YieldPrediction(_) => TaskCategory::YieldPrediction,
            Self::CropSwapping(_) => TaskCategory::CropSwapping,
            Self::OptimalSeason(_) => TaskCategory::OptimalSeason,
            Self::Fertilizer(_) => TaskCategory::Fertilizer,
            Self::MarketAnalysis(_) => TaskCategory::MarketAnalysis,
            Self::Geospatial(_) => TaskCategory::Geospatial,
            Self::Irrigation(_) => TaskCategory::Irrigation,
        }
    }
}

/// Render the prompt for a payload. Identical payloads give identical text.
pub fn build(payload: &TaskPayload<'_>) -> String {
    match payload {
        TaskPayload::Chat(req) => chat(req),
        TaskPayload::CropRecommendation(soil) => crop_recommendation(soil),
        TaskPayload::DiseaseDetection(req) => disease(req),
        TaskPayload::YieldPrediction(req) => yield_prediction(req),
        TaskPayload::CropSwapping(req) => crop_swap(req),
        TaskPayload::OptimalSeason(req) => season(req),
        TaskPayload::Fertilizer(req) => fertilizer(req),
        TaskPayload::MarketAnalysis(req) => market(req),
        TaskPayload::Geospatial(req) => geospatial(req),
        TaskPayload::Irrigation(req) => irrigation(req),
    }
}

fn text(value: Option<&String>) -> &str {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_SPECIFIED)
}

fn number(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v}{unit}"),
        None => NOT_SPECIFIED.to_string(),
    }
}

fn soil_block(out: &mut String, soil: &SoilEnvironmentInput) {
    let _ = writeln!(out, "Soil and weather conditions:");
    let _ = writeln!(out, "- Nitrogen (N): {} ppm", soil.nitrogen);
    let _ = writeln!(out, "- Phosphorus (P): {} ppm", soil.phosphorus);
    let _ = writeln!(out, "- Potassium (K): {} ppm", soil.potassium);
    let _ = writeln!(out, "- Temperature: {}°C", soil.temperature);
    let _ = writeln!(out, "- Humidity: {}%", soil.humidity);
    let _ = writeln!(out, "- pH: {}", soil.ph);
    let _ = writeln!(out, "- Rainfall: {} mm", soil.rainfall);
    let _ = writeln!(out, "- State: {}", text(soil.state.as_ref()));
    let _ = writeln!(out, "- District: {}", text(soil.district.as_ref()));
}

fn optional_soil_block(out: &mut String, soil: Option<&SoilEnvironmentInput>) {
    match soil {
        Some(soil) => soil_block(out, soil),
        None => {
            let _ = writeln!(out, "Soil and weather conditions: {NOT_SPECIFIED}");
        }
    }
}

fn candidate_format(out: &mut String, label: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "List at most 3 options, best first, using exactly this format:");
    let _ = writeln!(out, "1. {label}: <name>");
    let _ = writeln!(out, "Suitability: <High|Medium|Low>");
    let _ = writeln!(out, "Confidence: <0-100>%");
    let _ = writeln!(out, "- <practical advice line>");
    let _ = writeln!(out, "- <practical advice line>");
}

fn crop_recommendation(soil: &SoilEnvironmentInput) -> String {
    let mut out = String::from(
        "You are an agronomist advising a smallholder farmer. \
         Recommend the crops best suited to the following field.\n\n",
    );
    soil_block(&mut out, soil);
    candidate_format(&mut out, "Crop");
    out
}

fn fertilizer(req: &FertilizerRequest) -> String {
    let mut out = String::from(
        "You are a soil scientist. Recommend fertilizers and soil amendments \
         for the following field.\n\n",
    );
    let _ = writeln!(out, "Planned crop: {}", text(req.crop.as_ref()));
    soil_block(&mut out, &req.soil);
    candidate_format(&mut out, "Fertilizer");
    let _ = writeln!(out, "Include dose per acre and timing in the advice lines.");
    out
}

fn irrigation(req: &IrrigationRequest) -> String {
    let mut out = String::from(
        "You are an irrigation specialist. Recommend irrigation methods for the \
         following field.\n\n",
    );
    let _ = writeln!(out, "Crop: {}", text(req.crop.as_ref()));
    let _ = writeln!(out, "Area: {}", number(req.area_acres, " acres"));
    soil_block(&mut out, &req.soil);
    candidate_format(&mut out, "Method");
    out
}

fn disease(req: &DiseaseRequest) -> String {
    let mut out = String::from(
        "You are a plant pathologist. Diagnose the most likely crop diseases \
         from the information below.\n\n",
    );
    let _ = writeln!(out, "Crop: {}", text(req.crop.as_ref()));
    let _ = writeln!(out, "Symptoms: {}", text(req.symptoms.as_ref()));
    let _ = writeln!(out, "Location: {}", text(req.location.as_ref()));
    match &req.image {
        Some(image) => {
            let _ = writeln!(
                out,
                "Image: attached ({}, {} base64 characters)",
                image.mime_type,
                image.data.len()
            );
        }
        None => {
            let _ = writeln!(out, "Image: {NOT_SPECIFIED}");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "List at most 3 possible diseases, most likely first, using exactly this format:");
    let _ = writeln!(out, "1. Disease: <name>");
    let _ = writeln!(out, "Severity: <High|Medium|Low>");
    let _ = writeln!(out, "Confidence: <0-100>%");
    let _ = writeln!(out, "Symptoms: <observed signs>");
    let _ = writeln!(out, "Cause: <pathogen or condition>");
    let _ = writeln!(out, "Treatment: <chemical control with dose>");
    let _ = writeln!(out, "Prevention: <preventive practice>");
    let _ = writeln!(out, "Organic Alternative: <organic control>");
    let _ = writeln!(out, "Recovery Time: <expected duration>");
    out
}

fn yield_prediction(req: &YieldRequest) -> String {
    let mut out = String::from(
        "You are a crop yield analyst. Estimate the harvest for the following plot.\n\n",
    );
    let _ = writeln!(out, "Crop: {}", req.crop.trim());
    let _ = writeln!(out, "Area: {}", number(req.area_acres, " acres"));
    let _ = writeln!(out, "Season: {}", text(req.season.as_ref()));
    let _ = writeln!(out, "Irrigation: {}", text(req.irrigation.as_ref()));
    optional_soil_block(&mut out, req.soil.as_ref());
    let _ = writeln!(out);
    let _ = writeln!(out, "Answer using exactly these labels:");
    let _ = writeln!(out, "Estimated Yield: <tonnes per hectare>");
    let _ = writeln!(out, "Total Production: <tonnes for the whole area>");
    let _ = writeln!(out, "Quality Grade: <A|B|C>");
    let _ = writeln!(out, "Market Value: <expected revenue>");
    let _ = writeln!(out, "ROI: <return on investment>");
    let _ = writeln!(out, "Risk Factors: <main risks>");
    let _ = writeln!(out, "Confidence: <0-100>%");
    let _ = writeln!(out, "- <advice to improve the yield>");
    out
}

fn crop_swap(req: &CropSwapRequest) -> String {
    let mut out = String::from(
        "You are a farm economist. Suggest crops the farmer could switch to \
         from the current crop.\n\n",
    );
    let _ = writeln!(out, "Current crop: {}", req.current_crop.trim());
    let _ = writeln!(out, "Goal: {}", text(req.goal.as_ref()));
    let _ = writeln!(out, "State: {}", text(req.state.as_ref()));
    let _ = writeln!(out, "District: {}", text(req.district.as_ref()));
    optional_soil_block(&mut out, req.soil.as_ref());
    let _ = writeln!(out);
    let _ = writeln!(out, "List at most 3 strategies, best first, using exactly this format:");
    let _ = writeln!(out, "1. Crop: <replacement crop>");
    let _ = writeln!(out, "Suitability: <High|Medium|Low>");
    let _ = writeln!(out, "Confidence: <0-100>%");
    let _ = writeln!(out, "Expected ROI: <percentage>");
    let _ = writeln!(out, "Break-even: <period>");
    let _ = writeln!(out, "Rotation Plan: <sequence>");
    let _ = writeln!(out, "Transition Period: <duration>");
    let _ = writeln!(out, "Investment: <initial cost>");
    out
}

fn season(req: &SeasonRequest) -> String {
    let mut out = String::from(
        "You are an agricultural calendar expert. Give the best sowing season \
         for the crop below.\n\n",
    );
    let _ = writeln!(out, "Crop: {}", req.crop.trim());
    let _ = writeln!(out, "State: {}", text(req.state.as_ref()));
    let _ = writeln!(out, "District: {}", text(req.district.as_ref()));
    optional_soil_block(&mut out, req.soil.as_ref());
    let _ = writeln!(out);
    let _ = writeln!(out, "Answer using exactly these labels:");
    let _ = writeln!(out, "Best Season: <season name and months>");
    let _ = writeln!(out, "Sowing Window: <dates>");
    let _ = writeln!(out, "Harvest Window: <dates>");
    let _ = writeln!(out, "Duration: <days to maturity>");
    let _ = writeln!(out, "Weather Considerations: <what to watch>");
    let _ = writeln!(out, "Confidence: <0-100>%");
    out
}

fn market(req: &MarketRequest) -> String {
    let mut out = String::from(
        "You are an agricultural market analyst. Advise the farmer on when and \
         where to sell.\n\n",
    );
    let _ = writeln!(out, "Crop: {}", req.crop.trim());
    let _ = writeln!(out, "Quantity: {}", number(req.quantity_quintals, " quintals"));
    let _ = writeln!(out, "State: {}", text(req.state.as_ref()));
    let _ = writeln!(out, "District: {}", text(req.district.as_ref()));
    candidate_format(&mut out, "Option");
    out
}

fn geospatial(req: &GeospatialRequest) -> String {
    let mut out = String::from(
        "You are a land-use planner. Describe the agro-climatic zone of this \
         location and the land-use options that suit it.\n\n",
    );
    let _ = writeln!(out, "Latitude: {}", number(req.latitude, ""));
    let _ = writeln!(out, "Longitude: {}", number(req.longitude, ""));
    let _ = writeln!(out, "State: {}", text(req.state.as_ref()));
    let _ = writeln!(out, "District: {}", text(req.district.as_ref()));
    let _ = writeln!(out, "Area: {}", number(req.area_acres, " acres"));
    candidate_format(&mut out, "Option");
    out
}

fn chat(req: &ChatRequest) -> String {
    let mut out = String::from(
        "You are AgriSense, a friendly agricultural assistant for farmers. \
         Answer clearly and practically.\n\n",
    );
    let _ = writeln!(out, "Reply language: {}", text(req.language.as_ref()));
    if req.history.is_empty() {
        let _ = writeln!(out, "Conversation so far: {NOT_SPECIFIED}");
    } else {
        let _ = writeln!(out, "Conversation so far:");
        for turn in &req.history {
            let _ = writeln!(out, "{}: {}", turn.role, turn.content.trim());
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Farmer: {}", req.message.trim());
    out
}
