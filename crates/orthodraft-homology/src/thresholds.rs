//! Selection thresholds.
//!
//! Every value is range-checked when it is set. A rejected value leaves the
//! previous one in place.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const IDENTITY_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const LENGTH_DIFF_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const E_VALUE_RANGE: RangeInclusive<f64> = 0.0..=10.0;
pub const COVERAGE_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const BIT_SCORE_RANGE: RangeInclusive<f64> = 0.0..=10_000.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{name} must be within [{min}, {max}], got {value}")]
pub struct ConfigurationError {
    pub name: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

fn check(
    name: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> Result<f64, ConfigurationError> {
    // NaN fails `contains`, so it is rejected along with out-of-range values.
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigurationError {
            name,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Unvalidated wire form; everything deserialized goes through
/// [`SelectionThresholds::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawThresholds {
    pub min_identity: f64,
    pub max_length_diff_pct: f64,
    pub max_e_value: f64,
    pub min_coverage_pct: f64,
    pub min_bit_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds", into = "RawThresholds")]
pub struct SelectionThresholds {
    min_identity: f64,
    max_length_diff_pct: f64,
    max_e_value: f64,
    min_coverage_pct: f64,
    min_bit_score: f64,
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            min_identity: 60.0,
            max_length_diff_pct: 30.0,
            max_e_value: 1e-50,
            min_coverage_pct: 20.0,
            min_bit_score: 100.0,
        }
    }
}

impl SelectionThresholds {
    pub fn new(
        min_identity: f64,
        max_length_diff_pct: f64,
        max_e_value: f64,
        min_coverage_pct: f64,
        min_bit_score: f64,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            min_identity: check("min_identity", min_identity, &IDENTITY_RANGE)?,
            max_length_diff_pct: check(
                "max_length_diff_pct",
                max_length_diff_pct,
                &LENGTH_DIFF_RANGE,
            )?,
            max_e_value: check("max_e_value", max_e_value, &E_VALUE_RANGE)?,
            min_coverage_pct: check("min_coverage_pct", min_coverage_pct, &COVERAGE_RANGE)?,
            min_bit_score: check("min_bit_score", min_bit_score, &BIT_SCORE_RANGE)?,
        })
    }

    pub fn min_identity(&self) -> f64 {
        self.min_identity
    }

    pub fn max_length_diff_pct(&self) -> f64 {
        self.max_length_diff_pct
    }

    pub fn max_e_value(&self) -> f64 {
        self.max_e_value
    }

    pub fn min_coverage_pct(&self) -> f64 {
        self.min_coverage_pct
    }

    pub fn min_bit_score(&self) -> f64 {
        self.min_bit_score
    }

    pub fn set_min_identity(&mut self, value: f64) -> Result<(), ConfigurationError> {
        self.min_identity = check("min_identity", value, &IDENTITY_RANGE)?;
        Ok(())
    }

    pub fn set_max_length_diff_pct(&mut self, value: f64) -> Result<(), ConfigurationError> {
        self.max_length_diff_pct = check("max_length_diff_pct", value, &LENGTH_DIFF_RANGE)?;
        Ok(())
    }

    pub fn set_max_e_value(&mut self, value: f64) -> Result<(), ConfigurationError> {
        self.max_e_value = check("max_e_value", value, &E_VALUE_RANGE)?;
        Ok(())
    }

    pub fn set_min_coverage_pct(&mut self, value: f64) -> Result<(), ConfigurationError> {
        self.min_coverage_pct = check("min_coverage_pct", value, &COVERAGE_RANGE)?;
        Ok(())
    }

    pub fn set_min_bit_score(&mut self, value: f64) -> Result<(), ConfigurationError> {
        self.min_bit_score = check("min_bit_score", value, &BIT_SCORE_RANGE)?;
        Ok(())
    }
}

impl TryFrom<RawThresholds> for SelectionThresholds {
    type Error = ConfigurationError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        Self::new(
            raw.min_identity,
            raw.max_length_diff_pct,
            raw.max_e_value,
            raw.min_coverage_pct,
            raw.min_bit_score,
        )
    }
}

impl From<SelectionThresholds> for RawThresholds {
    fn from(t: SelectionThresholds) -> Self {
        Self {
            min_identity: t.min_identity,
            max_length_diff_pct: t.max_length_diff_pct,
            max_e_value: t.max_e_value,
            min_coverage_pct: t.min_coverage_pct,
            min_bit_score: t.min_bit_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let d = SelectionThresholds::default();
        let rebuilt = SelectionThresholds::new(
            d.min_identity(),
            d.max_length_diff_pct(),
            d.max_e_value(),
            d.min_coverage_pct(),
            d.min_bit_score(),
        )
        .unwrap();
        assert_eq!(d, rebuilt);
    }

    #[test]
    fn out_of_range_setter_keeps_previous_value() {
        let mut t = SelectionThresholds::default();
        let err = t.set_min_identity(101.0).unwrap_err();
        assert_eq!(err.name, "min_identity");
        assert_eq!(t.min_identity(), 60.0);

        assert!(t.set_max_e_value(-1.0).is_err());
        assert_eq!(t.max_e_value(), 1e-50);

        assert!(t.set_min_bit_score(f64::NAN).is_err());
        assert_eq!(t.min_bit_score(), 100.0);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let mut t = SelectionThresholds::default();
        t.set_min_identity(100.0).unwrap();
        t.set_max_e_value(10.0).unwrap();
        t.set_min_bit_score(10_000.0).unwrap();
        t.set_min_coverage_pct(0.0).unwrap();
        assert_eq!(t.min_identity(), 100.0);
        assert_eq!(t.max_e_value(), 10.0);
    }

    #[test]
    fn constructor_rejects_any_bad_field() {
        assert!(SelectionThresholds::new(60.0, 130.0, 1e-5, 20.0, 100.0).is_err());
        assert!(SelectionThresholds::new(60.0, 30.0, 1e-5, 20.0, 20_000.0).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: SelectionThresholds = serde_json::from_str(
            r#"{"min_identity":70,"max_length_diff_pct":10,"max_e_value":1e-10,
                "min_coverage_pct":50,"min_bit_score":80}"#,
        )
        .unwrap();
        assert_eq!(ok.min_identity(), 70.0);

        let bad = serde_json::from_str::<SelectionThresholds>(
            r#"{"min_identity":170,"max_length_diff_pct":10,"max_e_value":1e-10,
                "min_coverage_pct":50,"min_bit_score":80}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn json_round_trip_is_exact() {
        let defaults = SelectionThresholds::default();
        let text = serde_json::to_string(&defaults).unwrap();
        let back: SelectionThresholds = serde_json::from_str(&text).unwrap();
        assert_eq!(back, defaults);
        assert_eq!(back.max_e_value().to_bits(), 1e-50f64.to_bits());

        let tight = SelectionThresholds::new(33.3, 12.5, 3.7e-123, 0.1, 99.99).unwrap();
        let back: SelectionThresholds =
            serde_json::from_str(&serde_json::to_string(&tight).unwrap()).unwrap();
        assert_eq!(back, tight);
    }
}
