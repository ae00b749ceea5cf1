//! Confidence aggregation and normalization.

use std::cmp::Ordering;

use crate::types::Scored;

/// Overall confidence reported for an empty record list.
pub const EMPTY_CONFIDENCE: f64 = 0.5;
/// Stand-in for a record that carries no confidence.
pub const MISSING_CONFIDENCE: f64 = 0.7;
/// Rule-based scores never go below this.
pub const FALLBACK_FLOOR: f64 = 0.40;
/// Rule-based scores never go above this.
pub const FALLBACK_CEILING: f64 = 0.95;
/// Maximum records returned to a caller.
pub const MAX_RECOMMENDATIONS: usize = 3;

/// Mean of per-record confidences, rounded to two decimals.
pub fn aggregate<T: Scored>(records: &[T]) -> f64 {
    if records.is_empty() {
        return EMPTY_CONFIDENCE;
    }
    let sum: f64 = records
        .iter()
        .map(|r| r.confidence().map(normalize).unwrap_or(MISSING_CONFIDENCE))
        .sum();
    round2(sum / records.len() as f64)
}

/// Clamp a rule-based score into the fallback band.
pub fn clamp_fallback(score: f64) -> f64 {
    if score.is_nan() {
        return FALLBACK_FLOOR;
    }
    score.clamp(FALLBACK_FLOOR, FALLBACK_CEILING)
}

/// Clamp any score into [0, 1]; NaN becomes the missing-confidence default.
pub fn normalize(score: f64) -> f64 {
    if score.is_nan() {
        return MISSING_CONFIDENCE;
    }
    score.clamp(0.0, 1.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sort by confidence (highest first, stable for ties) and keep the top three.
pub fn rank<T: Scored>(records: &mut Vec<T>) {
    records.sort_by(|a, b| {
        let a = a.confidence().unwrap_or(MISSING_CONFIDENCE);
        let b = b.confidence().unwrap_or(MISSING_CONFIDENCE);
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
    records.truncate(MAX_RECOMMENDATIONS);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Conf(Option<f64>);

    impl Scored for Conf {
        fn confidence(&self) -> Option<f64> {
            self.0
        }
    }

    #[test]
    fn test_empty_is_sentinel() {
        let records: Vec<Conf> = Vec::new();
        assert_eq!(aggregate(&records), 0.5);
    }

    #[test]
    fn test_mean_rounded() {
        assert_eq!(aggregate(&[Conf(Some(0.8)), Conf(Some(0.6))]), 0.70);
        assert_eq!(aggregate(&[Conf(Some(0.333)), Conf(Some(0.334))]), 0.33);
    }

    #[test]
    fn test_missing_defaults_to_point_seven() {
        assert_eq!(aggregate(&[Conf(None), Conf(Some(0.9))]), 0.8);
    }

    #[test]
    fn test_out_of_range_values_normalized() {
        assert_eq!(aggregate(&[Conf(Some(1.7)), Conf(Some(-0.2))]), 0.5);
    }

    #[test]
    fn test_clamp_fallback() {
        assert_eq!(clamp_fallback(1.2), 0.95);
        assert_eq!(clamp_fallback(0.1), 0.40);
        assert_eq!(clamp_fallback(0.65), 0.65);
        assert_eq!(clamp_fallback(f64::NAN), 0.40);
    }

    #[test]
    fn test_rank_sorts_and_truncates() {
        let mut records = vec![
            Conf(Some(0.5)),
            Conf(Some(0.9)),
            Conf(Some(0.7)),
            Conf(Some(0.8)),
        ];
        rank(&mut records);
        let scores: Vec<f64> = records.iter().filter_map(|r| r.0).collect();
        assert_eq!(scores, vec![0.9, 0.8, 0.7]);
    }
}
