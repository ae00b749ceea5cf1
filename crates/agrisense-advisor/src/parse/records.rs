//! Task-specific record parsers built on the shared segment and field helpers.

use agrisense_core::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    excerpt_details, extract_confidence, label_line_pattern, recover, ConfidenceSource, FieldMap,
    FieldSpec, SegmentGrammar, SEVERITY_WORDS, SUITABILITY_WORDS,
};
use crate::fallback::tasks::UNIDENTIFIED_DISEASE;
use crate::types::{
    DiagnosisRecord, Recommendation, SeasonRecord, Suitability, SwapStrategyRecord,
    YieldPredictionRecord,
};

const CROP_SYNTHETIC_CONFIDENCE: f64 = 0.7;
const DISEASE_SYNTHETIC_CONFIDENCE: f64 = 0.6;
const YIELD_SYNTHETIC_CONFIDENCE: f64 = 0.65;
const SWAP_SYNTHETIC_CONFIDENCE: f64 = 0.7;
const SEASON_SYNTHETIC_CONFIDENCE: f64 = 0.75;

// ---------------------------------------------------------------------------
// Generic recommendations (crops, fertilizer, irrigation, advisory options)
// ---------------------------------------------------------------------------

static CROP_GRAMMAR: Lazy<SegmentGrammar> =
    Lazy::new(|| SegmentGrammar::new(r"crop(?:\s+name)?", &[]));
static FERTILIZER_GRAMMAR: Lazy<SegmentGrammar> = Lazy::new(|| {
    SegmentGrammar::new(r"fertili[sz]er(?:\s+name)?", &[r"dosage|dose|timing"])
});
static IRRIGATION_GRAMMAR: Lazy<SegmentGrammar> = Lazy::new(|| {
    SegmentGrammar::new(r"(?:irrigation\s+)?method", &[r"water\s+requirement|schedule"])
});
static ADVISORY_GRAMMAR: Lazy<SegmentGrammar> =
    Lazy::new(|| SegmentGrammar::new(r"option|recommendation", &[]));

/// Which family of generic recommendation the text describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    Crop,
    Fertilizer,
    Irrigation,
    /// Market and location advisories.
    Advisory,
}

impl RecommendationKind {
    fn grammar(&self) -> &'static SegmentGrammar {
        match self {
            Self::Crop => &*CROP_GRAMMAR,
            Self::Fertilizer => &*FERTILIZER_GRAMMAR,
            Self::Irrigation => &*IRRIGATION_GRAMMAR,
            Self::Advisory => &*ADVISORY_GRAMMAR,
        }
    }

    fn unknown_name(&self) -> &'static str {
        match self {
            Self::Crop => "Unknown Crop",
            Self::Fertilizer => "Unknown Fertilizer",
            Self::Irrigation => "Unknown Method",
            Self::Advisory => "Unknown Option",
        }
    }

    fn synthetic_name(&self) -> &'static str {
        match self {
            Self::Crop => "General Recommendation",
            Self::Fertilizer => "General Fertilizer Advice",
            Self::Irrigation => "General Irrigation Advice",
            Self::Advisory => "General Advisory",
        }
    }
}

/// Parse candidates of `kind`; never empty.
pub fn parse_recommendations(
    text: &str,
    kind: RecommendationKind,
    confidence: &dyn ConfidenceSource,
) -> Vec<Recommendation> {
    let grammar = kind.grammar();
    let parsed = grammar.segments(text).map(|segments| {
        segments
            .iter()
            .map(|segment| {
                let body = segment.text();
                Recommendation {
                    name: grammar
                        .name(segment.head())
                        .unwrap_or_else(|| kind.unknown_name().to_string()),
                    suitability: SUITABILITY_WORDS.level(&body),
                    details: grammar.details(segment.body()),
                    confidence: extract_confidence(&body)
                        .unwrap_or_else(|| confidence.default_confidence()),
                }
            })
            .collect()
    });
    recover("recommendations", parsed, || Recommendation {
        name: kind.synthetic_name().to_string(),
        suitability: Suitability::Medium,
        details: excerpt_details(text),
        confidence: CROP_SYNTHETIC_CONFIDENCE,
    })
}

pub fn parse_crops(text: &str, confidence: &dyn ConfidenceSource) -> Vec<Recommendation> {
    parse_recommendations(text, RecommendationKind::Crop, confidence)
}

// ---------------------------------------------------------------------------
// Disease
// ---------------------------------------------------------------------------

static DISEASE_FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        FieldSpec::labeled("symptoms", r"symptoms?|signs", "See description"),
        FieldSpec::labeled("cause", r"cause|caused\s+by|pathogen", "Unknown"),
        FieldSpec::labeled(
            "treatment",
            r"treatment|chemical\s+control",
            "Consult a local agricultural expert",
        ),
        FieldSpec::labeled(
            "prevention",
            r"prevention|preventive\s+measures?",
            "Follow good field hygiene and crop rotation",
        ),
        FieldSpec::labeled(
            "organic_alternative",
            r"organic\s+alternative|organic\s+treatment|organic\s+control",
            "Neem oil spray",
        ),
        FieldSpec::labeled("recovery_time", r"recovery(?:\s+time)?", "2-3 weeks"),
    ]
});

static DISEASE_GRAMMAR: Lazy<SegmentGrammar> = Lazy::new(|| {
    SegmentGrammar::new(
        r"disease(?:\s+name)?|diagnosis",
        &[
            r"symptoms?|signs",
            r"cause|caused\s+by|pathogen",
            r"treatment|chemical\s+control",
            r"prevention|preventive\s+measures?",
            r"organic\s+(?:alternative|treatment|control)",
            r"recovery(?:\s+time)?",
        ],
    )
});

pub fn parse_diagnoses(text: &str, confidence: &dyn ConfidenceSource) -> Vec<DiagnosisRecord> {
    let parsed = DISEASE_GRAMMAR.segments(text).map(|segments| {
        segments
            .iter()
            .map(|segment| {
                let body = segment.text();
                let fields = FieldMap::extract(&DISEASE_FIELDS, &body);
                DiagnosisRecord {
                    disease_name: DISEASE_GRAMMAR
                        .name(segment.head())
                        .unwrap_or_else(|| UNIDENTIFIED_DISEASE.to_string()),
                    severity: SEVERITY_WORDS.level(&body),
                    confidence: extract_confidence(&body)
                        .unwrap_or_else(|| confidence.default_confidence()),
                    symptoms: fields.get("symptoms"),
                    cause: fields.get("cause"),
                    treatment: fields.get("treatment"),
                    prevention: fields.get("prevention"),
                    organic_alternative: fields.get("organic_alternative"),
                    recovery_time: fields.get("recovery_time"),
                    details: DISEASE_GRAMMAR.details(segment.body()),
                }
            })
            .collect()
    });
    recover("disease-detection", parsed, || {
        let fields = FieldMap::extract(&DISEASE_FIELDS, "");
        DiagnosisRecord {
            disease_name: UNIDENTIFIED_DISEASE.to_string(),
            severity: Suitability::Medium,
            confidence: DISEASE_SYNTHETIC_CONFIDENCE,
            symptoms: fields.get("symptoms"),
            cause: fields.get("cause"),
            treatment: fields.get("treatment"),
            prevention: fields.get("prevention"),
            organic_alternative: fields.get("organic_alternative"),
            recovery_time: fields.get("recovery_time"),
            details: excerpt_details(text),
        }
    })
}

// ---------------------------------------------------------------------------
// Whole-text records (yield, season)
// ---------------------------------------------------------------------------

fn label_lines(labels: &[&str]) -> Regex {
    label_line_pattern(&format!(
        r"confidence(?:\s+(?:level|score))?|{}",
        labels.join("|")
    ))
}

/// Free-text lines of a whole answer, minus labeled lines.
fn free_lines(text: &str, labels: &Regex) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !labels.is_match(line))
        .map(|line| line.trim_start_matches(['-', '*', '•', ' ']).to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Fields of a whole answer; malformed when none of them is present.
fn whole_text_fields(text: &str, specs: &[FieldSpec]) -> Result<FieldMap> {
    let fields = FieldMap::extract(specs, text);
    if fields.matched() == 0 {
        return Err(Error::MalformedModelOutput(
            "no labeled fields in model text".into(),
        ));
    }
    Ok(fields)
}

const YIELD_LABELS: [&str; 6] = [
    r"estimated\s+yield|expected\s+yield|yield(?:\s+per\s+(?:hectare|acre))?",
    r"total\s+production|total\s+yield|production",
    r"quality(?:\s+grade)?|grade",
    r"market\s+value|expected\s+revenue|revenue",
    r"roi|return\s+on\s+investment",
    r"risk\s+factors?|risks?",
];

static YIELD_FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    let [estimated, total, quality, market, roi, risks] = YIELD_LABELS;
    vec![
        FieldSpec::labeled("estimated_yield", estimated, "Not available"),
        FieldSpec::labeled("total_production", total, "Not available"),
        FieldSpec::labeled("quality_grade", quality, "Standard"),
        FieldSpec::labeled("market_value", market, "Not available"),
        FieldSpec::labeled("roi", roi, "Not available"),
        FieldSpec::labeled("risk_factors", risks, "Weather variability"),
    ]
});

static YIELD_LINES: Lazy<Regex> = Lazy::new(|| label_lines(&YIELD_LABELS));

pub fn parse_yield(
    text: &str,
    crop: &str,
    confidence: &dyn ConfidenceSource,
) -> Vec<YieldPredictionRecord> {
    let crop = crop.trim().to_string();
    let record = |fields: &FieldMap, confidence: f64, details: Vec<String>| YieldPredictionRecord {
        crop: crop.clone(),
        estimated_yield: fields.get("estimated_yield"),
        total_production: fields.get("total_production"),
        quality_grade: fields.get("quality_grade"),
        market_value: fields.get("market_value"),
        roi: fields.get("roi"),
        risk_factors: fields.get("risk_factors"),
        confidence,
        details,
    };
    let parsed = whole_text_fields(text, &YIELD_FIELDS).map(|fields| {
        let score = extract_confidence(text).unwrap_or_else(|| confidence.default_confidence());
        vec![record(&fields, score, free_lines(text, &YIELD_LINES))]
    });
    recover("yield-prediction", parsed, || {
        record(
            &FieldMap::extract(&YIELD_FIELDS, ""),
            YIELD_SYNTHETIC_CONFIDENCE,
            excerpt_details(text),
        )
    })
}

const SEASON_LABELS: [&str; 5] = [
    r"best\s+season|ideal\s+season|season",
    r"sowing(?:\s+(?:window|time|period))?|planting(?:\s+(?:window|time))?",
    r"harvest(?:ing)?(?:\s+(?:window|time|period))?",
    r"crop\s+duration|duration|days\s+to\s+maturity",
    r"weather(?:\s+considerations?)?|climate",
];

static SEASON_FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    let [season, sowing, harvest, duration, weather] = SEASON_LABELS;
    vec![
        FieldSpec::labeled("best_season", season, "Kharif"),
        FieldSpec::labeled("sowing_window", sowing, "Consult the local crop calendar"),
        FieldSpec::labeled("harvest_window", harvest, "Consult the local crop calendar"),
        FieldSpec::labeled("duration", duration, "Variable"),
        FieldSpec::labeled("weather_considerations", weather, "Monitor local forecasts"),
    ]
});

static SEASON_LINES: Lazy<Regex> = Lazy::new(|| label_lines(&SEASON_LABELS));

pub fn parse_season(text: &str, crop: &str, confidence: &dyn ConfidenceSource) -> Vec<SeasonRecord> {
    let crop = crop.trim().to_string();
    let record = |fields: &FieldMap, confidence: f64, details: Vec<String>| SeasonRecord {
        crop: crop.clone(),
        best_season: fields.get("best_season"),
        sowing_window: fields.get("sowing_window"),
        harvest_window: fields.get("harvest_window"),
        duration: fields.get("duration"),
        weather_considerations: fields.get("weather_considerations"),
        confidence,
        details,
    };
    let parsed = whole_text_fields(text, &SEASON_FIELDS).map(|fields| {
        let score = extract_confidence(text).unwrap_or_else(|| confidence.default_confidence());
        vec![record(&fields, score, free_lines(text, &SEASON_LINES))]
    });
    recover("optimal-season", parsed, || {
        record(
            &FieldMap::extract(&SEASON_FIELDS, ""),
            SEASON_SYNTHETIC_CONFIDENCE,
            excerpt_details(text),
        )
    })
}

// ---------------------------------------------------------------------------
// Crop swap
// ---------------------------------------------------------------------------

const SWAP_LABELS: [&str; 5] = [
    r"expected\s+roi|roi|return\s+on\s+investment",
    r"break[\s\-]*even(?:\s+period)?",
    r"rotation(?:\s+plan)?",
    r"transition(?:\s+period)?",
    r"investment(?:\s+(?:required|needed))?|initial\s+cost",
];

static SWAP_FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    let [roi, break_even, rotation, transition, investment] = SWAP_LABELS;
    vec![
        FieldSpec::labeled("expected_roi", roi, "Moderate"),
        FieldSpec::labeled("break_even", break_even, "1-2 seasons"),
        FieldSpec::labeled("rotation_plan", rotation, "Not specified"),
        FieldSpec::labeled("transition_period", transition, "1 season"),
        FieldSpec::labeled("investment", investment, "Moderate"),
    ]
});

static SWAP_GRAMMAR: Lazy<SegmentGrammar> = Lazy::new(|| {
    SegmentGrammar::new(
        r"crop(?:\s+name)?|alternative(?:\s+crop)?|replacement(?:\s+crop)?",
        &SWAP_LABELS,
    )
});

pub fn parse_swaps(text: &str, confidence: &dyn ConfidenceSource) -> Vec<SwapStrategyRecord> {
    let record = |name: String,
                  suitability: Suitability,
                  fields: &FieldMap,
                  confidence: f64,
                  details: Vec<String>| SwapStrategyRecord {
        name,
        suitability,
        expected_roi: fields.get("expected_roi"),
        break_even: fields.get("break_even"),
        rotation_plan: fields.get("rotation_plan"),
        transition_period: fields.get("transition_period"),
        investment: fields.get("investment"),
        confidence,
        details,
    };
    let parsed = SWAP_GRAMMAR.segments(text).map(|segments| {
        segments
            .iter()
            .map(|segment| {
                let body = segment.text();
                record(
                    SWAP_GRAMMAR
                        .name(segment.head())
                        .unwrap_or_else(|| RecommendationKind::Crop.unknown_name().to_string()),
                    SUITABILITY_WORDS.level(&body),
                    &FieldMap::extract(&SWAP_FIELDS, &body),
                    extract_confidence(&body).unwrap_or_else(|| confidence.default_confidence()),
                    SWAP_GRAMMAR.details(segment.body()),
                )
            })
            .collect()
    });
    recover("crop-swapping", parsed, || {
        record(
            "Crop Diversification".to_string(),
            Suitability::Medium,
            &FieldMap::extract(&SWAP_FIELDS, ""),
            SWAP_SYNTHETIC_CONFIDENCE,
            excerpt_details(text),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::FixedConfidence;

    const FIXED: FixedConfidence = FixedConfidence(0.66);

    #[test]
    fn test_crop_text_with_three_candidates() {
        let text = "Based on your soil:\n\
            1. Crop: Wheat\n\
            Suitability: High\n\
            Confidence: 82%\n\
            - Sow in mid November\n\
            - Irrigate at crown root stage\n\
            2. Crop: Chickpea\n\
            Suitability: Medium\n\
            - Needs little water\n\
            3. Crop: Mustard\n\
            Suitability: Low\n\
            Confidence: 40%\n";
        let crops = parse_crops(text, &FIXED);
        assert_eq!(crops.len(), 3);
        assert_eq!(crops[0].name, "Wheat");
        assert_eq!(crops[0].confidence, 0.82);
        assert_eq!(crops[0].suitability, Suitability::High);
        assert_eq!(
            crops[0].details,
            vec!["Sow in mid November", "Irrigate at crown root stage"]
        );
        assert_eq!(crops[1].confidence, 0.66);
        assert_eq!(crops[2].suitability, Suitability::Low);
    }

    #[test]
    fn test_empty_text_gives_synthetic_record() {
        let crops = parse_crops("", &FIXED);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].name, "General Recommendation");
        assert_eq!(crops[0].confidence, 0.7);
    }

    #[test]
    fn test_parsers_are_total() {
        for text in ["", "x", "1.", "Crop:", "::::", "confidence: %", "1) 2) 3) 4)", "🌾🌾"] {
            assert!(!parse_crops(text, &FIXED).is_empty());
            assert!(!parse_diagnoses(text, &FIXED).is_empty());
            assert!(!parse_yield(text, "Rice", &FIXED).is_empty());
            assert!(!parse_swaps(text, &FIXED).is_empty());
            assert!(!parse_season(text, "Rice", &FIXED).is_empty());
            assert!(!parse_recommendations(text, RecommendationKind::Advisory, &FIXED).is_empty());
        }
    }

    #[test]
    fn test_unstructured_text_is_excerpted() {
        let prose = "Rice grows well here. ".repeat(20);
        let crops = parse_crops(&prose, &FIXED);
        assert_eq!(crops.len(), 1);
        assert!(crops[0].details[0].starts_with("Rice grows well here."));
        assert!(crops[0].details[0].ends_with("..."));
    }

    #[test]
    fn test_unnamed_segment_uses_unknown_name() {
        let crops = parse_crops("1.\nSuitability: High", &FIXED);
        assert_eq!(crops[0].name, "Unknown Crop");
        let fertilizers =
            parse_recommendations("1. 120 kg/ha", RecommendationKind::Fertilizer, &FIXED);
        assert_eq!(fertilizers[0].name, "Unknown Fertilizer");
    }

    #[test]
    fn test_fertilizer_segments() {
        let text = "1. Fertilizer: Urea\nDosage: 100 kg/ha\nConfidence: 90%\nSplit into two doses";
        let recs = parse_recommendations(text, RecommendationKind::Fertilizer, &FIXED);
        assert_eq!(recs[0].name, "Urea");
        assert_eq!(recs[0].details, vec!["Split into two doses"]);
        assert_eq!(recs[0].confidence, 0.9);
    }

    #[test]
    fn test_disease_fields() {
        let text = "1. Disease: Leaf Blast\n\
            Severity: Severe\n\
            Confidence: 75%\n\
            Symptoms: Spindle-shaped lesions\n\
            Cause: Magnaporthe oryzae\n\
            **Treatment:** Tricyclazole 0.6 g/L\n\
            Prevention: Avoid excess nitrogen\n\
            Organic Alternative: Pseudomonas fluorescens\n\
            Recovery Time: 2 weeks\n\
            Remove infected stubble";
        let records = parse_diagnoses(text, &FIXED);
        let record = &records[0];
        assert_eq!(record.disease_name, "Leaf Blast");
        assert_eq!(record.severity, Suitability::High);
        assert_eq!(record.confidence, 0.75);
        assert_eq!(record.cause, "Magnaporthe oryzae");
        assert_eq!(record.treatment, "Tricyclazole 0.6 g/L");
        assert_eq!(record.organic_alternative, "Pseudomonas fluorescens");
        assert_eq!(record.recovery_time, "2 weeks");
        assert_eq!(record.details, vec!["Remove infected stubble"]);
    }

    #[test]
    fn test_disease_defaults() {
        let records = parse_diagnoses("The plant looks unwell.", &FIXED);
        assert_eq!(records[0].disease_name, UNIDENTIFIED_DISEASE);
        assert_eq!(records[0].confidence, 0.6);
        assert_eq!(records[0].treatment, "Consult a local agricultural expert");
        assert_eq!(records[0].details, vec!["The plant looks unwell."]);
    }

    #[test]
    fn test_yield_fields() {
        let text = "Estimated Yield: 4.5 t/ha\n\
            Total Production: 18 t\n\
            Quality Grade: A\n\
            ROI: 35%\n\
            Confidence: 70%\n\
            Good monsoon expected";
        let records = parse_yield(text, " Rice ", &FIXED);
        let record = &records[0];
        assert_eq!(record.crop, "Rice");
        assert_eq!(record.estimated_yield, "4.5 t/ha");
        assert_eq!(record.total_production, "18 t");
        assert_eq!(record.quality_grade, "A");
        assert_eq!(record.roi, "35%");
        assert_eq!(record.market_value, "Not available");
        assert_eq!(record.confidence, 0.7);
        assert_eq!(record.details, vec!["Good monsoon expected"]);
    }

    #[test]
    fn test_labels_inside_prose_are_ignored() {
        let records = parse_yield("Total Yield: 18 t\nEstimated Yield: 4.5 t/ha", "Rice", &FIXED);
        assert_eq!(records[0].estimated_yield, "4.5 t/ha");
        assert_eq!(records[0].total_production, "18 t");

        let text = "Choose a risk-free variety.\n\
            Grade-A grain fetches a premium.\n\
            Estimated Yield: 3 t/ha\n\
            Risk Factors: late blight";
        let record = &parse_yield(text, "Potato", &FIXED)[0];
        assert_eq!(record.risk_factors, "late blight");
        assert_eq!(record.quality_grade, "Standard");
        assert_eq!(
            record.details,
            vec!["Choose a risk-free variety.", "Grade-A grain fetches a premium."]
        );

        let text = "Use season-long mulching to retain moisture.\nBest Season: Rabi";
        let record = &parse_season(text, "Wheat", &FIXED)[0];
        assert_eq!(record.best_season, "Rabi");
        assert_eq!(record.details, vec!["Use season-long mulching to retain moisture."]);

        let text = "1. Disease: Late Blight\n\
            Avoid treatment-resistant strains by rotating.\n\
            Treatment: Metalaxyl 2 g/L";
        let record = &parse_diagnoses(text, &FIXED)[0];
        assert_eq!(record.treatment, "Metalaxyl 2 g/L");
        assert_eq!(record.details, vec!["Avoid treatment-resistant strains by rotating."]);
    }

    #[test]
    fn test_yield_without_labels_is_synthetic() {
        let records = parse_yield("Hard to say.", "Rice", &FIXED);
        assert_eq!(records[0].confidence, 0.65);
        assert_eq!(records[0].estimated_yield, "Not available");
    }

    #[test]
    fn test_season_fields() {
        let text = "Best Season: Rabi\nSowing Window: November\nHarvest Window: April\nDuration: 120 days";
        let records = parse_season(text, "Wheat", &FIXED);
        assert_eq!(records[0].best_season, "Rabi");
        assert_eq!(records[0].sowing_window, "November");
        assert_eq!(records[0].harvest_window, "April");
        assert_eq!(records[0].weather_considerations, "Monitor local forecasts");
        assert_eq!(records[0].confidence, 0.66);
        assert_eq!(parse_season("", "Wheat", &FIXED)[0].confidence, 0.75);
    }

    #[test]
    fn test_swap_fields() {
        let text = "1. Crop: Chickpea\n\
            Suitability: High\n\
            Expected ROI: 30%\n\
            Break-even: 1 season\n\
            Rotation Plan: Rice → Chickpea\n\
            2. Crop: Mustard\n\
            Investment: Low";
        let records = parse_swaps(text, &FIXED);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Chickpea");
        assert_eq!(records[0].expected_roi, "30%");
        assert_eq!(records[0].break_even, "1 season");
        assert_eq!(records[0].rotation_plan, "Rice → Chickpea");
        assert_eq!(records[0].investment, "Moderate");
        assert_eq!(records[1].investment, "Low");
        assert_eq!(parse_swaps("", &FIXED)[0].confidence, 0.7);
    }
}
