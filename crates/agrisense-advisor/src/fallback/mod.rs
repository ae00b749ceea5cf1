//! Deterministic rule engine used when the generative model is unavailable.
//!
//! Every variant (crops, fertilizer, irrigation, risk) is a static table of
//! [`Rule`]s evaluated the same way:
//! eligibility predicate → suitability → confidence → details.
//! No randomness, no I/O.

pub mod crops;
pub mod irrigation;
pub mod nutrients;
pub mod risk;
pub mod tasks;

use crate::confidence::{clamp_fallback, rank, round2};
use crate::types::{Recommendation, SoilEnvironmentInput, Suitability};

pub use crops::recommend_crops;
pub use irrigation::recommend_irrigation;
pub use nutrients::{assess_soil_health, recommend_fertilizer};
pub use risk::{assess_risks, general_advice};

/// Starting confidence before bonuses.
pub const BASE_CONFIDENCE: f64 = 0.5;

/// A numeric reading of [`SoilEnvironmentInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    Nitrogen,
    Phosphorus,
    Potassium,
    Temperature,
    Humidity,
    Ph,
    Rainfall,
}

impl Factor {
    pub fn read(&self, input: &SoilEnvironmentInput) -> f64 {
        match self {
            Self::Nitrogen => input.nitrogen,
            Self::Phosphorus => input.phosphorus,
            Self::Potassium => input.potassium,
            Self::Temperature => input.temperature,
            Self::Humidity => input.humidity,
            Self::Ph => input.ph,
            Self::Rainfall => input.rainfall,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Nitrogen => "Nitrogen",
            Self::Phosphorus => "Phosphorus",
            Self::Potassium => "Potassium",
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Ph => "pH",
            Self::Rainfall => "Rainfall",
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            Self::Nitrogen | Self::Phosphorus | Self::Potassium => " ppm",
            Self::Temperature => "°C",
            Self::Humidity => "%",
            Self::Ph => "",
            Self::Rainfall => " mm",
        }
    }
}

/// Threshold check over one factor. Bounds are inclusive unless named
/// `Below`/`Above`. NaN readings fail every check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    Within(Factor, f64, f64),
    AtLeast(Factor, f64),
    AtMost(Factor, f64),
    Below(Factor, f64),
    Above(Factor, f64),
}

impl Condition {
    fn factor(&self) -> Factor {
        match *self {
            Self::Within(f, _, _)
            | Self::AtLeast(f, _)
            | Self::AtMost(f, _)
            | Self::Below(f, _)
            | Self::Above(f, _) => f,
        }
    }

    pub fn holds(&self, input: &SoilEnvironmentInput) -> bool {
        let v = self.factor().read(input);
        match *self {
            Self::Within(_, lo, hi) => v >= lo && v <= hi,
            Self::AtLeast(_, t) => v >= t,
            Self::AtMost(_, t) => v <= t,
            Self::Below(_, t) => v < t,
            Self::Above(_, t) => v > t,
        }
    }

    /// Advisory sentence describing this check against the actual reading.
    pub fn describe(&self, input: &SoilEnvironmentInput, subject: &str) -> String {
        let factor = self.factor();
        let (label, unit) = (factor.label(), factor.unit());
        let v = factor.read(input);
        let held = self.holds(input);
        match *self {
            Self::Within(_, lo, hi) if held => {
                format!("{label} {v}{unit} is ideal for {subject} ({lo}-{hi}{unit})")
            }
            Self::Within(_, lo, hi) => {
                format!("{label} {v}{unit} is outside the {lo}-{hi}{unit} range preferred for {subject}")
            }
            Self::AtLeast(_, t) if held => {
                format!("{label} {v}{unit} meets the {t}{unit} minimum for {subject}")
            }
            Self::AtLeast(_, t) => {
                format!("{label} {v}{unit} is below the {t}{unit} minimum for {subject}")
            }
            Self::AtMost(_, t) if held => {
                format!("{label} {v}{unit} stays within the {t}{unit} limit for {subject}")
            }
            Self::AtMost(_, t) => {
                format!("{label} {v}{unit} exceeds the {t}{unit} limit for {subject}")
            }
            Self::Below(_, t) if held => {
                format!("{label} {v}{unit} is below {t}{unit}, which calls for {subject}")
            }
            Self::Below(_, t) => {
                format!("{label} {v}{unit} is not below {t}{unit}, so {subject} is less urgent")
            }
            Self::Above(_, t) if held => {
                format!("{label} {v}{unit} is above {t}{unit}, which calls for {subject}")
            }
            Self::Above(_, t) => {
                format!("{label} {v}{unit} is not above {t}{unit}, so {subject} is less urgent")
            }
        }
    }
}

/// Confidence bonus awarded when a condition holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bonus {
    pub when: Condition,
    pub weight: f64,
}

pub const fn bonus(when: Condition, weight: f64) -> Bonus {
    Bonus { when, weight }
}

/// One entry of a rule table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    /// Subject used in advisory sentences ("rice", "urea application").
    pub subject: &'static str,
    /// Conjunction; an empty list always holds.
    pub eligible: &'static [Condition],
    /// Conjunction deciding High over Medium.
    pub high: &'static [Condition],
    pub bonuses: &'static [Bonus],
    /// Fixed advice appended after the computed details.
    pub advice: &'static [&'static str],
}

impl Rule {
    pub fn is_eligible(&self, input: &SoilEnvironmentInput) -> bool {
        self.eligible.iter().all(|c| c.holds(input))
    }

    pub fn suitability(&self, input: &SoilEnvironmentInput) -> Suitability {
        if self.high.iter().all(|c| c.holds(input)) {
            Suitability::High
        } else {
            Suitability::Medium
        }
    }

    /// Base score plus satisfied bonuses, clamped into the fallback band.
    pub fn confidence(&self, input: &SoilEnvironmentInput) -> f64 {
        let raw = self
            .bonuses
            .iter()
            .filter(|b| b.when.holds(input))
            .fold(BASE_CONFIDENCE, |acc, b| acc + b.weight);
        round2(clamp_fallback(raw))
    }

    pub fn details(&self, input: &SoilEnvironmentInput) -> Vec<String> {
        self.bonuses
            .iter()
            .map(|b| b.when.describe(input, self.subject))
            .chain(self.advice.iter().map(|a| a.to_string()))
            .collect()
    }

    /// Candidate for this rule, or None when the eligibility predicate fails.
    pub fn evaluate(&self, input: &SoilEnvironmentInput) -> Option<Recommendation> {
        if !self.is_eligible(input) {
            return None;
        }
        Some(Recommendation {
            name: self.name.to_string(),
            suitability: self.suitability(input),
            details: self.details(input),
            confidence: self.confidence(input),
        })
    }
}

/// Evaluate a rule table and return the top three eligible candidates.
pub fn evaluate_table(rules: &[Rule], input: &SoilEnvironmentInput) -> Vec<Recommendation> {
    let mut candidates: Vec<Recommendation> =
        rules.iter().filter_map(|r| r.evaluate(input)).collect();
    rank(&mut candidates);
    candidates
}
