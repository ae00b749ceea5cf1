//! Rule-based answers for tasks that normally need the model.
//!
//! These are deliberately conservative: tables of agronomic baselines plus a
//! pointer to local expertise, all scored inside the fallback band.

use super::crops::{find_crop, names_phrase};
use super::risk::assess_risks;
use crate::confidence::{clamp_fallback, rank, round2, FALLBACK_FLOOR};
use crate::prompts::NOT_SPECIFIED;
use crate::types::{
    CropSwapRequest, DiagnosisRecord, DiseaseRequest, GeospatialRequest, MarketRequest,
    Recommendation, SeasonRecord, SeasonRequest, Suitability, SwapStrategyRecord,
    YieldPredictionRecord, YieldRequest,
};

/// Hectares per acre.
const HECTARES_PER_ACRE: f64 = 0.4047;

fn or_unspecified(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_SPECIFIED)
        .to_string()
}

// ---------------------------------------------------------------------------
// Disease
// ---------------------------------------------------------------------------

static COMMON_DISEASES: &[(&str, &str)] = &[
    ("rice", "Blast, Bacterial Leaf Blight, Sheath Blight"),
    ("wheat", "Yellow Rust, Loose Smut, Karnal Bunt"),
    ("maize", "Turcicum Leaf Blight, Downy Mildew, Stalk Rot"),
    ("cotton", "Bacterial Blight, Root Rot, Leaf Curl Virus"),
    ("sugarcane", "Red Rot, Smut, Wilt"),
    ("soybean", "Yellow Mosaic Virus, Rust, Charcoal Rot"),
    ("chickpea", "Wilt, Ascochyta Blight, Dry Root Rot"),
    ("pearl millet", "Downy Mildew, Ergot, Smut"),
    ("potato", "Late Blight, Early Blight, Black Scurf"),
    ("groundnut", "Tikka Leaf Spot, Rust, Collar Rot"),
    ("tomato", "Early Blight, Leaf Curl Virus, Bacterial Wilt"),
];

pub const UNIDENTIFIED_DISEASE: &str = "Disease identification needed";

/// Single cautious diagnosis pointing the farmer to integrated pest management.
pub fn diagnose(request: &DiseaseRequest) -> Vec<DiagnosisRecord> {
    let crop = request.crop.as_deref().unwrap_or_default();
    let mut details = Vec::new();
    if let Some(subject) = find_crop(crop).map(|rule| rule.subject).or_else(|| {
        COMMON_DISEASES
            .iter()
            .map(|(name, _)| *name)
            .find(|name| names_phrase(crop, name))
    }) {
        if let Some((_, diseases)) = COMMON_DISEASES.iter().find(|(name, _)| *name == subject) {
            details.push(format!("Common diseases of {subject}: {diseases}"));
        }
    }
    details.push("Isolate affected plants and remove badly infected leaves".into());
    details.push("Send a sample to the nearest Krishi Vigyan Kendra for confirmation".into());

    vec![DiagnosisRecord {
        disease_name: UNIDENTIFIED_DISEASE.to_string(),
        severity: Suitability::Medium,
        confidence: FALLBACK_FLOOR,
        symptoms: or_unspecified(request.symptoms.as_deref()),
        cause: "Could not be determined without expert analysis".into(),
        treatment: "Follow integrated pest management; apply a broad-spectrum fungicide only after confirmation".into(),
        prevention: "Use certified seed, rotate crops and avoid overhead irrigation late in the day".into(),
        organic_alternative: "Neem oil spray (5 ml per litre of water) every 7-10 days".into(),
        recovery_time: "Depends on the confirmed diagnosis".into(),
        details,
    }]
}

// ---------------------------------------------------------------------------
// Yield
// ---------------------------------------------------------------------------

/// Baseline yields in tonnes per hectare, keyed by crop subject.
static BASELINE_YIELDS: &[(&str, f64)] = &[
    ("rice", 4.0),
    ("wheat", 3.5),
    ("maize", 5.5),
    ("cotton", 1.8),
    ("sugarcane", 70.0),
    ("soybean", 1.2),
    ("chickpea", 1.0),
    ("pearl millet", 1.5),
    ("potato", 22.0),
    ("groundnut", 1.6),
];

const UNKNOWN_CROP_YIELD: f64 = 2.5;

fn is_irrigated(method: Option<&str>) -> bool {
    match method.map(|m| m.trim().to_lowercase()) {
        None => false,
        Some(m) => !(m.is_empty() || m.contains("rain") || m == "none"),
    }
}

/// Baseline yield scaled by how well the soil suits the crop and whether it is irrigated.
pub fn estimate_yield(request: &YieldRequest) -> Vec<YieldPredictionRecord> {
    let rule = find_crop(&request.crop);
    let baseline = rule
        .and_then(|r| BASELINE_YIELDS.iter().find(|(name, _)| *name == r.subject))
        .map(|(_, t)| *t)
        .unwrap_or(UNKNOWN_CROP_YIELD);

    let mut factor = 1.0;
    let mut confidence = 0.5;
    let mut details = vec![format!("Baseline yield for {} is {baseline} t/ha", request.crop.trim())];

    if let (Some(rule), Some(soil)) = (rule, request.soil.as_ref()) {
        confidence += 0.1;
        if !rule.is_eligible(soil) {
            factor *= 0.8;
            details.push("Current conditions are outside the crop's preferred range (-20%)".into());
        } else if rule.suitability(soil) == Suitability::High {
            factor *= 1.1;
            details.push("Soil nutrients favour this crop (+10%)".into());
        }
    }
    if is_irrigated(request.irrigation.as_deref()) {
        factor *= 1.1;
        details.push("Assured irrigation adds about 10%".into());
    }

    let per_hectare = round2(baseline * factor);
    let total_production = match request.area_acres.filter(|a| a.is_finite() && *a > 0.0) {
        Some(acres) => {
            confidence += 0.1;
            format!("{} t", round2(per_hectare * acres * HECTARES_PER_ACRE))
        }
        None => NOT_SPECIFIED.to_string(),
    };
    let quality_grade = if factor >= 1.05 {
        "A"
    } else if factor >= 0.95 {
        "B"
    } else {
        "C"
    };
    let risk_factors = request
        .soil
        .as_ref()
        .map(assess_risks)
        .filter(|risks| !risks.is_empty())
        .map(|risks| risks.iter().map(|r| r.name.as_str()).collect::<Vec<_>>().join(", "))
        .unwrap_or_else(|| "None identified from the supplied data".to_string());

    vec![YieldPredictionRecord {
        crop: request.crop.trim().to_string(),
        estimated_yield: format!("{per_hectare} t/ha"),
        total_production,
        quality_grade: quality_grade.to_string(),
        market_value: "Depends on local mandi prices at harvest".into(),
        roi: NOT_SPECIFIED.to_string(),
        risk_factors,
        confidence: round2(clamp_fallback(confidence)),
        details,
    }]
}

// ---------------------------------------------------------------------------
// Crop swap
// ---------------------------------------------------------------------------

struct SwapPartner {
    name: &'static str,
    reason: &'static str,
    expected_roi: &'static str,
    break_even: &'static str,
    investment: &'static str,
}

const fn partner(
    name: &'static str,
    reason: &'static str,
    expected_roi: &'static str,
    break_even: &'static str,
    investment: &'static str,
) -> SwapPartner {
    SwapPartner {
        name,
        reason,
        expected_roi,
        break_even,
        investment,
    }
}

static CHICKPEA: SwapPartner = partner(
    "Chickpea",
    "Legume after a cereal restores soil nitrogen",
    "20-30%",
    "1 season",
    "Low",
);
static MUSTARD: SwapPartner = partner(
    "Mustard",
    "Low-water rabi oilseed with steady demand",
    "25-35%",
    "1 season",
    "Low",
);
static SOYBEAN: SwapPartner = partner(
    "Soybean",
    "Kharif legume that fixes nitrogen for the next cereal",
    "20-30%",
    "1 season",
    "Medium",
);
static GREEN_GRAM: SwapPartner = partner(
    "Green Gram (Moong)",
    "Short-duration pulse that fits between main crops",
    "15-25%",
    "1 season",
    "Low",
);
static MAIZE: SwapPartner = partner(
    "Corn (Maize)",
    "Breaks pest cycles of continuous legumes or cotton",
    "25-40%",
    "1 season",
    "Medium",
);
static GROUNDNUT: SwapPartner = partner(
    "Groundnut",
    "Oilseed legume suited to light soils",
    "30-40%",
    "1-2 seasons",
    "Medium",
);
static PEARL_MILLET: SwapPartner = partner(
    "Pearl Millet (Bajra)",
    "Drought-tolerant cereal that cuts water use",
    "15-25%",
    "1 season",
    "Low",
);
static VEGETABLES: SwapPartner = partner(
    "Vegetables (Onion, Tomato)",
    "High-value crops for farms near markets",
    "40-60%",
    "2 seasons",
    "High",
);

/// Rotation partners by current crop subject.
static ROTATIONS: &[(&str, &[&SwapPartner])] = &[
    ("rice", &[&CHICKPEA, &MUSTARD, &GREEN_GRAM]),
    ("wheat", &[&SOYBEAN, &GREEN_GRAM, &MAIZE]),
    ("maize", &[&CHICKPEA, &SOYBEAN, &MUSTARD]),
    ("cotton", &[&CHICKPEA, &MAIZE, &GROUNDNUT]),
    ("sugarcane", &[&GREEN_GRAM, &VEGETABLES, &SOYBEAN]),
    ("soybean", &[&MAIZE, &PEARL_MILLET, &VEGETABLES]),
    ("chickpea", &[&MAIZE, &PEARL_MILLET, &VEGETABLES]),
    ("pearl millet", &[&CHICKPEA, &MUSTARD, &GROUNDNUT]),
    ("potato", &[&MAIZE, &GREEN_GRAM, &MUSTARD]),
    ("groundnut", &[&PEARL_MILLET, &MAIZE, &VEGETABLES]),
];

static DEFAULT_ROTATION: &[&SwapPartner] = &[&CHICKPEA, &GROUNDNUT, &PEARL_MILLET];

/// Rotation-based swap strategies; candidates that also suit the soil score higher.
pub fn swap_strategies(request: &CropSwapRequest) -> Vec<SwapStrategyRecord> {
    let current = request.current_crop.trim();
    let partners = find_crop(current)
        .and_then(|rule| ROTATIONS.iter().find(|(name, _)| *name == rule.subject))
        .map(|(_, partners)| *partners)
        .unwrap_or(DEFAULT_ROTATION);

    let mut records: Vec<SwapStrategyRecord> = partners
        .iter()
        .enumerate()
        .map(|(rank, p)| {
            let mut confidence = 0.7 - 0.05 * rank as f64;
            let mut details = vec![p.reason.to_string()];
            let soil_fit = request
                .soil
                .as_ref()
                .zip(find_crop(p.name))
                .map(|(soil, rule)| rule.is_eligible(soil));
            match soil_fit {
                Some(true) => {
                    confidence += 0.1;
                    details.push("Current soil and weather suit this crop".into());
                }
                Some(false) => {
                    confidence -= 0.1;
                    details.push("Current conditions are marginal for this crop".into());
                }
                None => {}
            }
            if let Some(goal) = request.goal.as_deref().filter(|g| !g.trim().is_empty()) {
                details.push(format!("Goal: {}", goal.trim()));
            }
            SwapStrategyRecord {
                name: p.name.to_string(),
                suitability: if soil_fit == Some(false) {
                    Suitability::Low
                } else if rank == 0 {
                    Suitability::High
                } else {
                    Suitability::Medium
                },
                expected_roi: p.expected_roi.to_string(),
                break_even: p.break_even.to_string(),
                rotation_plan: format!("{current} → {} → {current}", p.name),
                transition_period: "One cropping season".into(),
                investment: p.investment.to_string(),
                confidence: round2(clamp_fallback(confidence)),
                details,
            }
        })
        .collect();
    rank(&mut records);
    records
}

// ---------------------------------------------------------------------------
// Season
// ---------------------------------------------------------------------------

struct Calendar {
    subject: &'static str,
    season: &'static str,
    sowing: &'static str,
    harvest: &'static str,
    duration: &'static str,
    weather: &'static str,
}

static CALENDARS: &[Calendar] = &[
    Calendar {
        subject: "rice",
        season: "Kharif",
        sowing: "June - July",
        harvest: "October - November",
        duration: "120-150 days",
        weather: "Needs assured monsoon rain or irrigation; avoid drought at flowering",
    },
    Calendar {
        subject: "wheat",
        season: "Rabi",
        sowing: "November - December",
        harvest: "March - April",
        duration: "120-140 days",
        weather: "Cool weather at tillering; terminal heat above 35°C reduces grain fill",
    },
    Calendar {
        subject: "maize",
        season: "Kharif",
        sowing: "June - July",
        harvest: "September - October",
        duration: "90-110 days",
        weather: "Sensitive to waterlogging in the first month",
    },
    Calendar {
        subject: "cotton",
        season: "Kharif",
        sowing: "April - June",
        harvest: "October - January",
        duration: "150-180 days",
        weather: "Needs frost-free days and dry weather at boll opening",
    },
    Calendar {
        subject: "sugarcane",
        season: "Annual (Spring planting)",
        sowing: "February - March",
        harvest: "December - March (next year)",
        duration: "10-12 months",
        weather: "High humidity and irrigation through summer",
    },
    Calendar {
        subject: "soybean",
        season: "Kharif",
        sowing: "June - July",
        harvest: "September - October",
        duration: "90-110 days",
        weather: "Sow after 100 mm of monsoon rain has fallen",
    },
    Calendar {
        subject: "chickpea",
        season: "Rabi",
        sowing: "October - November",
        harvest: "February - March",
        duration: "95-110 days",
        weather: "Grows on residual moisture; frost at flowering damages pods",
    },
    Calendar {
        subject: "pearl millet",
        season: "Kharif",
        sowing: "June - July",
        harvest: "September - October",
        duration: "75-90 days",
        weather: "Tolerates low rainfall and high temperature",
    },
    Calendar {
        subject: "potato",
        season: "Rabi",
        sowing: "October - November",
        harvest: "January - February",
        duration: "90-120 days",
        weather: "Cool nights favour tuber formation; protect from frost",
    },
    Calendar {
        subject: "groundnut",
        season: "Kharif",
        sowing: "June - July",
        harvest: "October - November",
        duration: "100-130 days",
        weather: "Dry spell at pod maturity helps harvest",
    },
];

/// Sowing calendar for the crop; unknown crops get the generic Kharif window at floor confidence.
pub fn season_plan(request: &SeasonRequest) -> Vec<SeasonRecord> {
    let crop = request.crop.trim();
    let calendar = find_crop(crop)
        .and_then(|rule| CALENDARS.iter().find(|c| c.subject == rule.subject));

    let Some(calendar) = calendar else {
        return vec![SeasonRecord {
            crop: crop.to_string(),
            best_season: "Kharif".into(),
            sowing_window: "June - July (with monsoon onset)".into(),
            harvest_window: "September - November".into(),
            duration: NOT_SPECIFIED.to_string(),
            weather_considerations: "Confirm the local calendar with the district agriculture office".into(),
            confidence: FALLBACK_FLOOR,
            details: Vec::new(),
        }];
    };

    let mut confidence = 0.6;
    let mut details = Vec::new();
    if let Some(state) = request.state.as_deref().filter(|s| !s.trim().is_empty()) {
        details.push(format!("Adjust dates by one or two weeks for local conditions in {}", state.trim()));
    }
    if let (Some(rule), Some(soil)) = (find_crop(crop), request.soil.as_ref()) {
        if rule.is_eligible(soil) {
            confidence += 0.1;
            details.push("Current conditions already suit sowing".into());
        } else {
            details.push("Current conditions are outside the sowing range; wait for the window".into());
        }
    }

    vec![SeasonRecord {
        crop: crop.to_string(),
        best_season: calendar.season.to_string(),
        sowing_window: calendar.sowing.to_string(),
        harvest_window: calendar.harvest.to_string(),
        duration: calendar.duration.to_string(),
        weather_considerations: calendar.weather.to_string(),
        confidence: round2(clamp_fallback(confidence)),
        details,
    }]
}

// ---------------------------------------------------------------------------
// Market and geospatial
// ---------------------------------------------------------------------------

fn location(state: Option<&str>, district: Option<&str>) -> String {
    match (
        state.map(str::trim).filter(|s| !s.is_empty()),
        district.map(str::trim).filter(|s| !s.is_empty()),
    ) {
        (Some(s), Some(d)) => format!("{d}, {s}"),
        (Some(s), None) => s.to_string(),
        (None, Some(d)) => d.to_string(),
        (None, None) => "your area".to_string(),
    }
}

pub fn market_advisory(request: &MarketRequest) -> Vec<Recommendation> {
    let place = location(request.state.as_deref(), request.district.as_deref());
    vec![Recommendation {
        name: format!("{} market outlook", request.crop.trim()),
        suitability: Suitability::Medium,
        details: vec![
            format!("Compare current mandi prices for {} around {place} on eNAM before selling", request.crop.trim()),
            "Check the government Minimum Support Price for the season".into(),
            "Staggered selling and proper storage reduce distress-sale losses".into(),
        ],
        confidence: FALLBACK_FLOOR,
    }]
}

pub fn geospatial_advisory(request: &GeospatialRequest) -> Vec<Recommendation> {
    let place = location(request.state.as_deref(), request.district.as_deref());
    let mut details = Vec::new();
    if let (Some(lat), Some(lon)) = (request.latitude, request.longitude) {
        details.push(format!("Field located at {lat:.4}, {lon:.4}"));
    }
    details.push(format!("Get a Soil Health Card test for fields in {place}"));
    details.push("Use Bhuvan satellite layers to review land use and water bodies nearby".into());
    vec![Recommendation {
        name: "Location-based field assessment".into(),
        suitability: Suitability::Medium,
        details,
        confidence: FALLBACK_FLOOR,
    }]
}
