//! Irrigation method rules.

use super::{bonus, evaluate_table, Condition::*, Factor::*, Rule};
use crate::types::{Recommendation, SoilEnvironmentInput};

pub static METHODS: &[Rule] = &[
    Rule {
        name: "Drip Irrigation",
        subject: "drip irrigation",
        eligible: &[AtMost(Rainfall, 100.0)],
        high: &[AtLeast(Temperature, 25.0)],
        bonuses: &[
            bonus(Below(Rainfall, 50.0), 0.15),
            bonus(AtLeast(Temperature, 30.0), 0.10),
            bonus(AtMost(Humidity, 50.0), 0.10),
        ],
        advice: &[
            "Saves 30-50% water compared to flood irrigation",
            "Eligible for PM Krishi Sinchayee Yojana subsidy",
        ],
    },
    Rule {
        name: "Sprinkler Irrigation",
        subject: "sprinkler irrigation",
        eligible: &[Within(Rainfall, 30.0, 150.0)],
        high: &[AtMost(Humidity, 60.0)],
        bonuses: &[
            bonus(Within(Temperature, 15.0, 30.0), 0.10),
            bonus(Within(Rainfall, 50.0, 120.0), 0.15),
        ],
        advice: &["Irrigate in early morning to limit evaporation losses"],
    },
    Rule {
        name: "Furrow Irrigation",
        subject: "furrow irrigation",
        eligible: &[Within(Rainfall, 50.0, 200.0)],
        high: &[AtLeast(Humidity, 60.0)],
        bonuses: &[
            bonus(Within(Ph, 5.5, 8.0), 0.10),
            bonus(AtLeast(Humidity, 50.0), 0.10),
        ],
        advice: &["Suits row crops on gentle slopes; level the field first"],
    },
    Rule {
        name: "Rain-fed with Supplemental Irrigation",
        subject: "rain-fed cultivation",
        eligible: &[AtLeast(Rainfall, 150.0)],
        high: &[AtLeast(Rainfall, 200.0)],
        bonuses: &[
            bonus(AtLeast(Rainfall, 200.0), 0.15),
            bonus(AtLeast(Humidity, 70.0), 0.10),
        ],
        advice: &["Harvest runoff in farm ponds for dry spells"],
    },
];

/// Top three irrigation methods for the conditions.
pub fn recommend_irrigation(input: &SoilEnvironmentInput) -> Vec<Recommendation> {
    evaluate_table(METHODS, input)
}
