//! Fertilizer rules and soil-health banding.

use super::{bonus, evaluate_table, Condition::*, Factor::*, Rule};
use crate::types::{NutrientLevel, PhClass, Recommendation, SoilEnvironmentInput, SoilHealth};

pub static FERTILIZERS: &[Rule] = &[
    Rule {
        name: "Urea",
        subject: "urea application",
        eligible: &[Below(Nitrogen, 20.0)],
        high: &[Below(Nitrogen, 10.0)],
        bonuses: &[
            bonus(Below(Nitrogen, 15.0), 0.15),
            bonus(Below(Nitrogen, 10.0), 0.15),
            bonus(AtLeast(Rainfall, 50.0), 0.10),
        ],
        advice: &[
            "Apply 100-120 kg/ha in two or three split doses",
            "Avoid application just before heavy rain",
        ],
    },
    Rule {
        name: "DAP",
        subject: "DAP application",
        eligible: &[Below(Phosphorus, 15.0)],
        high: &[Below(Phosphorus, 8.0)],
        bonuses: &[
            bonus(Below(Phosphorus, 10.0), 0.15),
            bonus(Below(Phosphorus, 8.0), 0.10),
            bonus(Within(Ph, 6.0, 7.5), 0.10),
        ],
        advice: &["Apply 50-60 kg/ha as a basal dose at sowing"],
    },
    Rule {
        name: "Muriate of Potash",
        subject: "potash application",
        eligible: &[Below(Potassium, 15.0)],
        high: &[Below(Potassium, 8.0)],
        bonuses: &[
            bonus(Below(Potassium, 10.0), 0.15),
            bonus(Below(Potassium, 8.0), 0.10),
            bonus(AtMost(Ph, 7.5), 0.10),
        ],
        advice: &["Apply 40-60 kg/ha before the last ploughing"],
    },
    Rule {
        name: "Agricultural Lime",
        subject: "liming",
        eligible: &[Below(Ph, 5.5)],
        high: &[Below(Ph, 5.0)],
        bonuses: &[
            bonus(Below(Ph, 5.0), 0.20),
            bonus(AtLeast(Rainfall, 150.0), 0.10),
        ],
        advice: &["Broadcast 2-4 t/ha at least a month before sowing"],
    },
    Rule {
        name: "Gypsum",
        subject: "gypsum application",
        eligible: &[Above(Ph, 7.5)],
        high: &[Above(Ph, 8.5)],
        bonuses: &[bonus(Above(Ph, 8.0), 0.15), bonus(Above(Ph, 8.5), 0.10)],
        advice: &["Apply 2-5 t/ha and leach with good-quality water"],
    },
    Rule {
        name: "Balanced NPK 19-19-19",
        subject: "balanced NPK",
        eligible: &[
            AtLeast(Nitrogen, 20.0),
            AtLeast(Phosphorus, 15.0),
            AtLeast(Potassium, 15.0),
        ],
        high: &[AtMost(Nitrogen, 40.0), AtMost(Phosphorus, 30.0), AtMost(Potassium, 40.0)],
        bonuses: &[
            bonus(Within(Ph, 6.0, 7.5), 0.15),
            bonus(AtLeast(Rainfall, 50.0), 0.10),
        ],
        advice: &["Use as a maintenance dose; 5 g/L foliar spray at flowering"],
    },
    Rule {
        name: "Farmyard Manure",
        subject: "organic matter",
        eligible: &[],
        high: &[Below(Nitrogen, 20.0)],
        bonuses: &[],
        advice: &["Incorporate 10-15 t/ha of well-decomposed manure before sowing"],
    },
];

/// Top three fertilizer actions for the soil reading.
pub fn recommend_fertilizer(input: &SoilEnvironmentInput) -> Vec<Recommendation> {
    evaluate_table(FERTILIZERS, input)
}

fn band(value: f64, low_below: f64, medium_up_to: f64) -> NutrientLevel {
    if !value.is_finite() {
        NutrientLevel::Unknown
    } else if value < low_below {
        NutrientLevel::Low
    } else if value <= medium_up_to {
        NutrientLevel::Medium
    } else {
        NutrientLevel::High
    }
}

fn ph_class(ph: f64) -> PhClass {
    if !ph.is_finite() {
        PhClass::Unknown
    } else if ph < 5.5 {
        PhClass::Acidic
    } else if ph <= 7.5 {
        PhClass::Neutral
    } else {
        PhClass::Alkaline
    }
}

/// Soil-health labels for a reading.
pub fn assess_soil_health(input: &SoilEnvironmentInput) -> SoilHealth {
    SoilHealth {
        nitrogen: band(input.nitrogen, 20.0, 40.0),
        phosphorus: band(input.phosphorus, 15.0, 30.0),
        potassium: band(input.potassium, 15.0, 40.0),
        ph: ph_class(input.ph),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Suitability;

    fn depleted() -> SoilEnvironmentInput {
        SoilEnvironmentInput {
            nitrogen: 8.0,
            phosphorus: 12.0,
            potassium: 30.0,
            temperature: 26.0,
            humidity: 60.0,
            ph: 6.5,
            rainfall: 90.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_deficient_nitrogen_ranks_urea_first() {
        let recs = recommend_fertilizer(&depleted());
        assert_eq!(recs[0].name, "Urea");
        assert_eq!(recs[0].suitability, Suitability::High);
        assert_eq!(recs[0].confidence, 0.9);
        assert_eq!(recs[1].name, "DAP");
        assert_eq!(recs[1].confidence, 0.6);
        assert_eq!(recs[2].name, "Farmyard Manure");
    }

    #[test]
    fn test_adequate_soil_gets_balanced_npk() {
        let soil = SoilEnvironmentInput {
            nitrogen: 30.0,
            phosphorus: 25.0,
            potassium: 28.0,
            ..depleted()
        };
        let recs = recommend_fertilizer(&soil);
        let names: Vec<&str> = recs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Balanced NPK 19-19-19", "Farmyard Manure"]);
        assert_eq!(recs[0].confidence, 0.75);
        assert_eq!(recs[1].suitability, Suitability::Medium);
    }

    #[test]
    fn test_nan_ph_only_loses_ph_bonuses() {
        let soil = SoilEnvironmentInput {
            ph: f64::NAN,
            ..depleted()
        };
        let recs = recommend_fertilizer(&soil);
        let names: Vec<&str> = recs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Urea", "DAP", "Farmyard Manure"]);
        assert_eq!(recs[1].confidence, 0.5);
    }

    #[test]
    fn test_soil_health_bands() {
        let health = assess_soil_health(&SoilEnvironmentInput {
            nitrogen: 10.0,
            phosphorus: 15.0,
            potassium: 41.0,
            ph: 9.0,
            ..Default::default()
        });
        assert_eq!(health.nitrogen, NutrientLevel::Low);
        assert_eq!(health.phosphorus, NutrientLevel::Medium);
        assert_eq!(health.potassium, NutrientLevel::High);
        assert_eq!(health.ph, PhClass::Alkaline);

        let unknown = assess_soil_health(&SoilEnvironmentInput {
            nitrogen: f64::NAN,
            ph: f64::INFINITY,
            ..Default::default()
        });
        assert_eq!(unknown.nitrogen, NutrientLevel::Unknown);
        assert_eq!(unknown.ph, PhClass::Unknown);
    }
}
