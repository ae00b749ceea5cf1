//! Free-text response parsing.
//!
//! Model output is split into segments (one per candidate) at "Label:" or
//! ordinal ("1.", "2)") markers. Fields are pulled out with one labeled-field
//! extractor driven by per-task [`FieldSpec`] tables. Parsing is total: text
//! with no recognizable structure becomes a single synthetic record.

mod records;

pub use records::{
    parse_crops, parse_diagnoses, parse_recommendations, parse_season, parse_swaps, parse_yield,
    RecommendationKind,
};

use std::collections::HashMap;

use agrisense_core::{Error, Result};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use tracing::debug;

use crate::confidence::{normalize, MAX_RECOMMENDATIONS};
use crate::types::Suitability;

/// Characters of raw text kept in a synthetic record.
pub const EXCERPT_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Default confidence
// ---------------------------------------------------------------------------

/// Supplies a confidence when the model text states none.
pub trait ConfidenceSource: Send + Sync {
    fn default_confidence(&self) -> f64;
}

/// Uniform draw in [0.6, 0.9] from the calling thread's generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomConfidence;

impl ConfidenceSource for RandomConfidence {
    fn default_confidence(&self) -> f64 {
        let value: f64 = rand::thread_rng().gen_range(0.6..=0.9);
        (value * 100.0).round() / 100.0
    }
}

/// Always the same value. Used by tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfidence(pub f64);

impl ConfidenceSource for FixedConfidence {
    fn default_confidence(&self) -> f64 {
        normalize(self.0)
    }
}

// ---------------------------------------------------------------------------
// Labeled fields
// ---------------------------------------------------------------------------

/// Label followed by a colon or a spaced dash. Hyphenated words ("risk-free",
/// "season-long") are not separators.
const LABEL_SEPARATOR: &str = r"[ \t]*\**[ \t]*(?::|[ \t]+-[ \t]+)";

/// A label only counts at the start of a line, after optional bullet or
/// markdown emphasis, so labels quoted inside prose are ignored.
fn label_pattern(labels: &str) -> Regex {
    Regex::new(&format!(
        r"(?im)^[ \t]*(?:[-*•][ \t]*)?\**[ \t]*(?:{labels}){LABEL_SEPARATOR}[ \t]*\**[ \t]*([^\n]+)"
    ))
    .expect("field label pattern")
}

/// Matches a whole line that starts with one of `labels`.
pub(crate) fn label_line_pattern(labels: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)^[ \t]*(?:[-*•][ \t]*)?\**[ \t]*(?:{labels}){LABEL_SEPARATOR}"
    ))
    .expect("label line pattern")
}

fn clean(value: &str) -> String {
    value.trim().trim_matches('*').trim().to_string()
}

/// First capture of `pattern` in `text`, cleaned of markdown emphasis, or
/// `default` when the pattern does not match or captures nothing.
pub fn extract_field(text: &str, pattern: &Regex, default: &str) -> String {
    find_field(text, pattern).unwrap_or_else(|| default.to_string())
}

fn find_field(text: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| clean(m.as_str()))
        .filter(|v| !v.is_empty())
}

/// One (field, pattern, default) entry of a per-task table.
pub struct FieldSpec {
    pub key: &'static str,
    pub pattern: Regex,
    pub default: &'static str,
}

impl FieldSpec {
    /// Field introduced by any of `labels` (a regex alternation) and a colon or dash.
    pub fn labeled(key: &'static str, labels: &str, default: &'static str) -> Self {
        Self {
            key,
            pattern: label_pattern(labels),
            default,
        }
    }
}

/// Extracted values of one field table.
#[derive(Debug, Default)]
pub struct FieldMap {
    values: HashMap<&'static str, String>,
    matched: usize,
}

impl FieldMap {
    pub fn extract(specs: &[FieldSpec], text: &str) -> Self {
        let mut map = Self::default();
        for spec in specs {
            let value = match find_field(text, &spec.pattern) {
                Some(v) => {
                    map.matched += 1;
                    v
                }
                None => spec.default.to_string(),
            };
            map.values.insert(spec.key, value);
        }
        map
    }

    /// Value for `key`; empty for keys outside the table.
    pub fn get(&self, key: &str) -> String {
        self.values.get(key).cloned().unwrap_or_default()
    }

    /// Number of fields found in the text rather than defaulted.
    pub fn matched(&self) -> usize {
        self.matched
    }
}

// ---------------------------------------------------------------------------
// Confidence and level keywords
// ---------------------------------------------------------------------------

static CONFIDENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)confidence(?:\s+(?:level|score))?\s*\**\s*[:\-=]?\s*\**\s*(\d{1,3}(?:\.\d+)?)\s*(%)?",
    )
    .expect("confidence pattern")
});

/// Confidence stated in the text ("Confidence: 82%" or "confidence 0.82"), in [0, 1].
pub fn extract_confidence(text: &str) -> Option<f64> {
    let caps = CONFIDENCE_RE.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let value = if caps.get(2).is_some() || value > 1.0 {
        value / 100.0
    } else {
        value
    };
    Some(normalize(value))
}

/// Keyword sets for a High/Medium/Low classification, checked in that order.
pub struct LevelWords {
    label: Regex,
    high: Regex,
    medium: Regex,
    low: Regex,
}

impl LevelWords {
    fn new(label: &str, high: &str, medium: &str, low: &str) -> Self {
        let words = |w: &str| Regex::new(&format!(r"(?i)\b(?:{w})\b")).expect("level keywords");
        Self {
            label: label_pattern(label),
            high: words(high),
            medium: words(medium),
            low: words(low),
        }
    }

    fn classify(&self, text: &str) -> Option<Suitability> {
        if self.high.is_match(text) {
            Some(Suitability::High)
        } else if self.medium.is_match(text) {
            Some(Suitability::Medium)
        } else if self.low.is_match(text) {
            Some(Suitability::Low)
        } else {
            None
        }
    }

    /// Level from the labeled field when present, else from the whole text.
    /// Medium when nothing matches.
    pub fn level(&self, text: &str) -> Suitability {
        find_field(text, &self.label)
            .and_then(|value| self.classify(&value))
            .or_else(|| self.classify(text))
            .unwrap_or(Suitability::Medium)
    }
}

pub static SUITABILITY_WORDS: Lazy<LevelWords> = Lazy::new(|| {
    LevelWords::new(
        r"suitability|suitable",
        r"high|highly|excellent",
        r"medium|moderate|good",
        r"low|poor",
    )
});

pub static SEVERITY_WORDS: Lazy<LevelWords> = Lazy::new(|| {
    LevelWords::new(
        r"severity",
        r"high|severe|critical",
        r"medium|moderate",
        r"low|mild|minor",
    )
});

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// Contiguous lines describing one candidate; the first line holds the marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    lines: Vec<&'a str>,
}

impl<'a> Segment<'a> {
    pub fn head(&self) -> &'a str {
        self.lines.first().copied().unwrap_or_default()
    }

    pub fn body(&self) -> &[&'a str] {
        self.lines.get(1..).unwrap_or_default()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Marker, name and field-line patterns for one record family.
pub struct SegmentGrammar {
    marker: Regex,
    name: Regex,
    label_line: Regex,
}

impl SegmentGrammar {
    /// `name_labels` introduce a candidate ("crop", "disease"); `field_labels`
    /// are the per-record fields whose lines stay out of `details`.
    pub fn new(name_labels: &str, field_labels: &[&str]) -> Self {
        let mut labels = vec![
            r"suitability|suitable|severity",
            r"confidence(?:\s+(?:level|score))?",
            name_labels,
        ];
        labels.extend_from_slice(field_labels);
        let labels = labels.join("|");
        Self {
            marker: Regex::new(&format!(
                r"(?i)^\s*(?:#+\s*)?\**\s*(?:\d{{1,2}}[.)](?:\s|\*\*|$)|(?:{name_labels})\s*\**\s*:)"
            ))
            .expect("segment marker pattern"),
            name: Regex::new(&format!(
                r"(?i)^\s*(?:#+\s*)?\**\s*(?:\d{{1,2}}[.)]\s*)?\**\s*(?:(?:{name_labels})\s*\**\s*[:\-]\s*\**\s*)?([A-Za-z][A-Za-z0-9()/&']*(?:[ \-][A-Za-z0-9()/&']+)*)"
            ))
            .expect("segment name pattern"),
            label_line: label_line_pattern(&labels),
        }
    }

    pub fn is_marker(&self, line: &str) -> bool {
        self.marker.is_match(line)
    }

    /// Candidate name from a segment's first line.
    pub fn name(&self, head: &str) -> Option<String> {
        self.name
            .captures(head)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|n| !n.is_empty())
    }

    /// Free-text lines of a segment, minus labeled field lines and bullets.
    pub fn details(&self, lines: &[&str]) -> Vec<String> {
        lines
            .iter()
            .filter(|line| !self.label_line.is_match(line))
            .map(|line| {
                line.trim_start_matches(|c: char| c == '-' || c == '*' || c == '•' || c.is_whitespace())
                    .trim_end()
                    .to_string()
            })
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Split `text` into at most three segments. Lines before the first
    /// marker are preamble and dropped.
    pub fn split<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        let mut segments: Vec<Segment<'a>> = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if self.is_marker(line) {
                segments.push(Segment { lines: vec![line] });
            } else if let Some(current) = segments.last_mut() {
                current.lines.push(line);
            }
        }
        segments.truncate(MAX_RECOMMENDATIONS);
        segments
    }

    /// Like [`split`](Self::split) but reports unstructured text as malformed.
    pub fn segments<'a>(&self, text: &'a str) -> Result<Vec<Segment<'a>>> {
        let segments = self.split(text);
        if segments.is_empty() {
            return Err(Error::MalformedModelOutput(
                "no segment markers in model text".into(),
            ));
        }
        Ok(segments)
    }
}

/// First [`EXCERPT_CHARS`] characters of `text`, with an ellipsis when cut.
pub fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    if trimmed.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}

/// Detail lines for a synthetic record: the excerpt, or a note when the
/// model returned nothing.
pub fn excerpt_details(text: &str) -> Vec<String> {
    let excerpt = excerpt(text);
    if excerpt.is_empty() {
        vec!["The response contained no readable detail".to_string()]
    } else {
        vec![excerpt]
    }
}

/// Parse result, or the synthetic record when parsing failed or found nothing.
pub(crate) fn recover<T>(task: &str, parsed: Result<Vec<T>>, synthetic: impl FnOnce() -> T) -> Vec<T> {
    match parsed {
        Ok(records) if !records.is_empty() => records,
        Ok(_) => vec![synthetic()],
        Err(e) => {
            debug!(task, error = %e, "model text unstructured, using synthetic record");
            vec![synthetic()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_field_with_markdown() {
        let pattern = label_pattern(r"treatment");
        let text = "**Treatment:** Spray mancozeb 2 g/L\nPrevention: rotate";
        assert_eq!(extract_field(text, &pattern, "none"), "Spray mancozeb 2 g/L");
        assert_eq!(extract_field("no labels here", &pattern, "none"), "none");
        assert_eq!(extract_field("Treatment: **", &pattern, "none"), "none");
    }

    #[test]
    fn test_field_map_counts_matches() {
        let specs = vec![
            FieldSpec::labeled("cause", r"cause", "Unknown"),
            FieldSpec::labeled("recovery_time", r"recovery(?:\s+time)?", "2-3 weeks"),
        ];
        let map = FieldMap::extract(&specs, "Cause - Fungal infection");
        assert_eq!(map.get("cause"), "Fungal infection");
        assert_eq!(map.get("recovery_time"), "2-3 weeks");
        assert_eq!(map.get("missing"), "");
        assert_eq!(map.matched(), 1);
    }

    #[test]
    fn test_extract_confidence_forms() {
        assert_eq!(extract_confidence("Confidence: 82%"), Some(0.82));
        assert_eq!(extract_confidence("**Confidence Level**: 0.75"), Some(0.75));
        assert_eq!(extract_confidence("confidence 90"), Some(0.9));
        assert_eq!(extract_confidence("confidence: 250%"), Some(1.0));
        assert_eq!(extract_confidence("very sure"), None);
    }

    #[test]
    fn test_level_precedence() {
        assert_eq!(SUITABILITY_WORDS.level("Suitability: Good"), Suitability::Medium);
        assert_eq!(
            SUITABILITY_WORDS.level("Suitability: Low\nneeds high rainfall"),
            Suitability::Low
        );
        assert_eq!(SUITABILITY_WORDS.level("excellent but poor drainage"), Suitability::High);
        assert_eq!(SUITABILITY_WORDS.level("no hints"), Suitability::Medium);
        assert_eq!(SEVERITY_WORDS.level("Severity: mild"), Suitability::Low);
    }

    #[test]
    fn test_split_segments() {
        let grammar = SegmentGrammar::new(r"crop(?:\s+name)?", &[]);
        let text = "Here are options:\n\n1. Crop: Wheat\nSuitability: High\n- Sow early\n2) **Rice**\nCrop: Maize\n4. Potato\n";
        let segments = grammar.split(text);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].head(), "1. Crop: Wheat");
        assert_eq!(segments[0].body(), &["Suitability: High", "- Sow early"]);
        assert_eq!(grammar.details(segments[0].body()), vec!["Sow early"]);
        assert_eq!(grammar.name(segments[1].head()).as_deref(), Some("Rice"));
        assert_eq!(grammar.name(segments[2].head()).as_deref(), Some("Maize"));
    }

    #[test]
    fn test_decimal_is_not_a_marker() {
        let grammar = SegmentGrammar::new(r"crop", &[]);
        assert!(!grammar.is_marker("1.5 t/ha expected"));
        assert!(grammar.is_marker("1."));
        assert!(grammar.segments("just prose").is_err());
    }

    #[test]
    fn test_names() {
        let grammar = SegmentGrammar::new(r"crop(?:\s+name)?", &[]);
        assert_eq!(grammar.name("1. **Crop:** Corn (Maize)").as_deref(), Some("Corn (Maize)"));
        assert_eq!(grammar.name("1. Crop: Wheat ... confidence: 82%").as_deref(), Some("Wheat"));
        assert_eq!(grammar.name("2. Rice - good for monsoon").as_deref(), Some("Rice"));
        assert_eq!(grammar.name("3. NPK 19-19-19").as_deref(), Some("NPK 19-19-19"));
        assert_eq!(grammar.name("1. 42"), None);
    }

    #[test]
    fn test_excerpt() {
        let long = "a".repeat(250);
        let short = excerpt(&long);
        assert_eq!(short.chars().count(), EXCERPT_CHARS + 3);
        assert!(short.ends_with("..."));
        assert_eq!(excerpt("  brief  "), "brief");
        assert_eq!(excerpt_details("").len(), 1);
    }

    #[test]
    fn test_confidence_sources() {
        assert_eq!(FixedConfidence(0.65).default_confidence(), 0.65);
        assert_eq!(FixedConfidence(3.0).default_confidence(), 1.0);
        for _ in 0..50 {
            let v = RandomConfidence.default_confidence();
            assert!((0.6..=0.9).contains(&v));
        }
    }
}
