//! Weather and soil risk advisories.
//!
//! Risk records reuse the recommendation shape: `suitability` carries the
//! severity (High or Medium) and `confidence` how sure the rule is.

use super::{bonus, evaluate_table, Condition::*, Factor::*, Rule};
use crate::types::{NutrientLevel, Recommendation, SoilEnvironmentInput};

use super::nutrients::assess_soil_health;

pub static RISKS: &[Rule] = &[
    Rule {
        name: "Fungal Disease Risk",
        subject: "fungal outbreaks",
        eligible: &[AtLeast(Humidity, 70.0), Within(Temperature, 20.0, 32.0)],
        high: &[AtLeast(Humidity, 85.0)],
        bonuses: &[
            bonus(AtLeast(Humidity, 85.0), 0.15),
            bonus(AtLeast(Rainfall, 200.0), 0.10),
        ],
        advice: &["Scout weekly for leaf spots and apply preventive fungicide if lesions appear"],
    },
    Rule {
        name: "Heat Stress",
        subject: "heat stress",
        eligible: &[Above(Temperature, 35.0)],
        high: &[Above(Temperature, 40.0)],
        bonuses: &[
            bonus(Above(Temperature, 38.0), 0.15),
            bonus(AtMost(Humidity, 40.0), 0.10),
        ],
        advice: &["Irrigate in the evening and mulch to keep root zones cool"],
    },
    Rule {
        name: "Drought Stress",
        subject: "drought stress",
        eligible: &[Below(Rainfall, 50.0)],
        high: &[Below(Rainfall, 25.0)],
        bonuses: &[
            bonus(Below(Rainfall, 25.0), 0.15),
            bonus(Above(Temperature, 30.0), 0.10),
            bonus(Below(Humidity, 40.0), 0.10),
        ],
        advice: &["Prefer drought-tolerant varieties and schedule protective irrigation"],
    },
    Rule {
        name: "Frost Risk",
        subject: "frost damage",
        eligible: &[Below(Temperature, 10.0)],
        high: &[Below(Temperature, 4.0)],
        bonuses: &[
            bonus(Below(Temperature, 5.0), 0.15),
            bonus(Above(Humidity, 70.0), 0.10),
        ],
        advice: &["Light irrigation or smoke on frost-prone nights protects seedlings"],
    },
    Rule {
        name: "Waterlogging",
        subject: "waterlogging",
        eligible: &[Above(Rainfall, 250.0)],
        high: &[Above(Rainfall, 300.0)],
        bonuses: &[
            bonus(Above(Rainfall, 300.0), 0.15),
            bonus(AtLeast(Humidity, 85.0), 0.10),
        ],
        advice: &["Open drainage channels and avoid fertilizer before heavy rain"],
    },
    Rule {
        name: "Soil Acidity",
        subject: "acidity correction",
        eligible: &[Below(Ph, 5.5)],
        high: &[Below(Ph, 5.0)],
        bonuses: &[bonus(Below(Ph, 5.0), 0.15)],
        advice: &["Apply agricultural lime based on a soil test"],
    },
    Rule {
        name: "Soil Alkalinity",
        subject: "alkalinity correction",
        eligible: &[Above(Ph, 8.0)],
        high: &[Above(Ph, 8.5)],
        bonuses: &[bonus(Above(Ph, 8.5), 0.15)],
        advice: &["Apply gypsum and add organic matter to lower pH"],
    },
];

/// Most pressing risks for the conditions, at most three.
pub fn assess_risks(input: &SoilEnvironmentInput) -> Vec<Recommendation> {
    evaluate_table(RISKS, input)
}

/// Short farm-level advice: the lead advice of every active risk, then
/// nutrient hints. Never empty.
pub fn general_advice(input: &SoilEnvironmentInput) -> Vec<String> {
    let mut advice: Vec<String> = RISKS
        .iter()
        .filter(|rule| rule.is_eligible(input))
        .filter_map(|rule| rule.advice.first())
        .map(|a| a.to_string())
        .collect();

    let health = assess_soil_health(input);
    let hints = [
        (health.nitrogen, "Nitrogen is low; add urea or a legume green manure"),
        (health.phosphorus, "Phosphorus is low; apply DAP or single super phosphate"),
        (health.potassium, "Potassium is low; apply muriate of potash"),
    ];
    advice.extend(
        hints
            .into_iter()
            .filter(|(level, _)| *level == NutrientLevel::Low)
            .map(|(_, hint)| hint.to_string()),
    );

    if advice.is_empty() {
        advice.push("Conditions are within normal ranges; follow standard crop management".into());
    }
    advice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Suitability;

    #[test]
    fn test_humid_monsoon_flags_fungal_risk() {
        let input = SoilEnvironmentInput {
            nitrogen: 30.0,
            phosphorus: 25.0,
            potassium: 28.0,
            temperature: 27.0,
            humidity: 75.0,
            ph: 6.2,
            rainfall: 200.0,
            ..Default::default()
        };
        let risks = assess_risks(&input);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].name, "Fungal Disease Risk");
        assert_eq!(risks[0].suitability, Suitability::Medium);
        assert_eq!(risks[0].confidence, 0.6);
        assert_eq!(general_advice(&input).len(), 1);
    }

    #[test]
    fn test_cold_alkaline_dry_field() {
        let input = SoilEnvironmentInput {
            nitrogen: 10.0,
            phosphorus: 8.0,
            potassium: 5.0,
            temperature: 5.0,
            humidity: 20.0,
            ph: 9.0,
            rainfall: 10.0,
            ..Default::default()
        };
        let risks = assess_risks(&input);
        let names: Vec<&str> = risks.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Drought Stress", "Soil Alkalinity", "Frost Risk"]);

        let advice = general_advice(&input);
        assert!(advice.iter().any(|a| a.starts_with("Nitrogen is low")));
        assert!(advice.iter().any(|a| a.starts_with("Potassium is low")));
    }

    #[test]
    fn test_benign_conditions_still_get_advice() {
        let input = SoilEnvironmentInput {
            nitrogen: 30.0,
            phosphorus: 25.0,
            potassium: 28.0,
            temperature: 24.0,
            humidity: 55.0,
            ph: 6.8,
            rainfall: 100.0,
            ..Default::default()
        };
        assert!(assess_risks(&input).is_empty());
        assert_eq!(general_advice(&input).len(), 1);
    }
}
