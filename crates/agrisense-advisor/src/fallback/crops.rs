//! Crop suitability table.

use super::{bonus, evaluate_table, Condition::*, Factor::*, Rule};
use crate::types::{CropCandidate, SoilEnvironmentInput};

/// Every supported crop. Minimum temperatures are all at or above 10°C.
pub static CROPS: &[Rule] = &[
    Rule {
        name: "Rice",
        subject: "rice",
        eligible: &[
            AtLeast(Humidity, 70.0),
            AtLeast(Rainfall, 150.0),
            Within(Temperature, 20.0, 35.0),
        ],
        high: &[AtLeast(Nitrogen, 20.0)],
        bonuses: &[
            bonus(Within(Temperature, 22.0, 32.0), 0.15),
            bonus(AtLeast(Rainfall, 200.0), 0.15),
            bonus(AtLeast(Nitrogen, 20.0), 0.10),
            bonus(AtLeast(Humidity, 80.0), 0.10),
        ],
        advice: &[
            "Maintain 5 cm standing water during tillering",
            "Transplant 25-30 day old seedlings",
        ],
    },
    Rule {
        name: "Wheat",
        subject: "wheat",
        eligible: &[
            Within(Temperature, 10.0, 25.0),
            Within(Rainfall, 40.0, 150.0),
            Within(Humidity, 30.0, 70.0),
        ],
        high: &[AtLeast(Nitrogen, 25.0)],
        bonuses: &[
            bonus(Within(Temperature, 15.0, 22.0), 0.15),
            bonus(Within(Rainfall, 50.0, 100.0), 0.10),
            bonus(AtLeast(Nitrogen, 25.0), 0.15),
            bonus(Within(Ph, 6.0, 7.5), 0.10),
        ],
        advice: &[
            "Sow in the first fortnight of November",
            "Give the first irrigation at crown root initiation (21 days)",
        ],
    },
    Rule {
        name: "Corn (Maize)",
        subject: "maize",
        eligible: &[
            Within(Temperature, 20.0, 30.0),
            AtLeast(Rainfall, 50.0),
            Within(Humidity, 40.0, 85.0),
        ],
        high: &[AtLeast(Nitrogen, 15.0)],
        bonuses: &[
            bonus(Within(Temperature, 22.0, 28.0), 0.15),
            bonus(AtLeast(Nitrogen, 15.0), 0.15),
            bonus(Within(Rainfall, 60.0, 200.0), 0.10),
            bonus(Within(Ph, 5.5, 7.5), 0.10),
        ],
        advice: &[
            "Ensure good drainage; maize does not tolerate waterlogging",
            "Side-dress nitrogen at knee-high stage",
        ],
    },
    Rule {
        name: "Cotton",
        subject: "cotton",
        eligible: &[
            Within(Temperature, 21.0, 35.0),
            Within(Humidity, 40.0, 70.0),
            Within(Rainfall, 50.0, 150.0),
        ],
        high: &[AtLeast(Potassium, 20.0)],
        bonuses: &[
            bonus(Within(Temperature, 24.0, 32.0), 0.15),
            bonus(AtLeast(Potassium, 20.0), 0.10),
            bonus(Within(Ph, 6.0, 8.0), 0.10),
        ],
        advice: &["Monitor for pink bollworm from flowering onwards"],
    },
    Rule {
        name: "Sugarcane",
        subject: "sugarcane",
        eligible: &[
            Within(Temperature, 20.0, 38.0),
            AtLeast(Humidity, 65.0),
            AtLeast(Rainfall, 150.0),
        ],
        high: &[AtLeast(Nitrogen, 40.0)],
        bonuses: &[
            bonus(Within(Temperature, 24.0, 34.0), 0.10),
            bonus(AtLeast(Rainfall, 175.0), 0.10),
            bonus(AtLeast(Nitrogen, 40.0), 0.15),
            bonus(AtLeast(Potassium, 30.0), 0.10),
        ],
        advice: &["Plant three-bud setts treated with fungicide"],
    },
    Rule {
        name: "Soybean",
        subject: "soybean",
        eligible: &[
            Within(Temperature, 20.0, 32.0),
            AtLeast(Humidity, 60.0),
            Within(Rainfall, 60.0, 200.0),
        ],
        high: &[AtLeast(Phosphorus, 20.0)],
        bonuses: &[
            bonus(Within(Temperature, 22.0, 30.0), 0.10),
            bonus(AtLeast(Phosphorus, 20.0), 0.15),
            bonus(AtLeast(Potassium, 20.0), 0.10),
        ],
        advice: &["Inoculate seed with Rhizobium before sowing"],
    },
    Rule {
        name: "Chickpea",
        subject: "chickpea",
        eligible: &[
            Within(Temperature, 15.0, 30.0),
            AtMost(Humidity, 60.0),
            Within(Rainfall, 30.0, 120.0),
        ],
        high: &[AtLeast(Phosphorus, 15.0)],
        bonuses: &[
            bonus(Within(Temperature, 18.0, 26.0), 0.15),
            bonus(AtLeast(Phosphorus, 15.0), 0.10),
            bonus(Within(Ph, 6.0, 8.0), 0.10),
        ],
        advice: &["Fixes atmospheric nitrogen; a good follow-up to cereals"],
    },
    Rule {
        name: "Pearl Millet (Bajra)",
        subject: "pearl millet",
        eligible: &[Within(Temperature, 25.0, 38.0), Within(Rainfall, 25.0, 120.0)],
        high: &[AtLeast(Nitrogen, 15.0)],
        bonuses: &[
            bonus(Within(Temperature, 28.0, 35.0), 0.15),
            bonus(Within(Rainfall, 40.0, 90.0), 0.10),
            bonus(AtMost(Humidity, 60.0), 0.10),
        ],
        advice: &["Tolerates drought and poor soils"],
    },
    Rule {
        name: "Potato",
        subject: "potato",
        eligible: &[
            Within(Temperature, 15.0, 25.0),
            Within(Humidity, 60.0, 90.0),
            Within(Rainfall, 50.0, 150.0),
        ],
        high: &[AtLeast(Potassium, 25.0)],
        bonuses: &[
            bonus(Within(Temperature, 17.0, 22.0), 0.15),
            bonus(AtLeast(Potassium, 25.0), 0.15),
            bonus(Within(Ph, 5.0, 6.5), 0.10),
        ],
        advice: &["Earth up the ridges 30 days after planting"],
    },
    Rule {
        name: "Groundnut",
        subject: "groundnut",
        eligible: &[
            Within(Temperature, 22.0, 33.0),
            Within(Rainfall, 50.0, 125.0),
            Within(Humidity, 40.0, 75.0),
        ],
        high: &[AtLeast(Phosphorus, 15.0)],
        bonuses: &[
            bonus(Within(Temperature, 25.0, 30.0), 0.15),
            bonus(AtLeast(Phosphorus, 15.0), 0.10),
            bonus(Within(Ph, 6.0, 7.5), 0.10),
        ],
        advice: &["Apply gypsum at pegging for better pod filling"],
    },
];

/// Top three crops for the given conditions; empty when nothing qualifies.
pub fn recommend_crops(input: &SoilEnvironmentInput) -> Vec<CropCandidate> {
    evaluate_table(CROPS, input)
}

/// Regional and common names, keyed by rule subject.
static ALIASES: &[(&str, &[&str])] = &[
    ("rice", &["paddy"]),
    ("maize", &["corn"]),
    ("sugarcane", &["sugar cane"]),
    ("soybean", &["soya", "soy"]),
    ("chickpea", &["chana", "bengal gram"]),
    ("pearl millet", &["bajra"]),
    ("groundnut", &["peanut"]),
];

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// True when `phrase` appears in `text` as whole words.
pub(crate) fn names_phrase(text: &str, phrase: &str) -> bool {
    let (text, phrase) = (words(text), words(phrase));
    !phrase.is_empty() && text.windows(phrase.len()).any(|w| w == phrase.as_slice())
}

/// Look up a crop rule by display name or common name ("corn", "bajra", "maize").
/// Names match on whole words, so "pea" or "cane" alone match nothing.
pub fn find_crop(name: &str) -> Option<&'static Rule> {
    CROPS.iter().find(|rule| {
        let aliases = ALIASES
            .iter()
            .find(|(subject, _)| *subject == rule.subject)
            .map_or(&[][..], |(_, aliases)| *aliases);
        std::iter::once(rule.subject)
            .chain(aliases.iter().copied())
            .any(|alias| names_phrase(name, alias))
    })
}
