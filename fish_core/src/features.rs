use log::warn;
use serde::Serialize;

use crate::error::{PredictorError, PredictorResult};

pub const NUM_FEATURES: usize = 4;

/// Column order the regressors were trained on.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = ["weight_kg", "length_cm", "height_cm", "width_cm"];

/// Physical measurements of one fish. Every field is finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    weight_kg: f64,
    length_cm: f64,
    height_cm: f64,
    width_cm: f64,
}

impl FeatureVector {
    pub fn new(weight_kg: f64, length_cm: f64, height_cm: f64, width_cm: f64) -> PredictorResult<Self> {
        validate_features(&[weight_kg, length_cm, height_cm, width_cm])?;

        Ok(Self {
            weight_kg,
            length_cm,
            height_cm,
            width_cm,
        })
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn length_cm(&self) -> f64 {
        self.length_cm
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn width_cm(&self) -> f64 {
        self.width_cm
    }

    /// Values in [`FEATURE_NAMES`] order.
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [self.weight_kg, self.length_cm, self.height_cm, self.width_cm]
    }
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = PredictorError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        match *values {
            [weight_kg, length_cm, height_cm, width_cm] => {
                Self::new(weight_kg, length_cm, height_cm, width_cm)
            }
            _ => {
                warn!("Feature vector has {} entries", values.len());
                Err(PredictorError::InvalidFeatureVector(format!(
                    "expected {} values ({}), got {}",
                    NUM_FEATURES,
                    FEATURE_NAMES.join(", "),
                    values.len()
                )))
            }
        }
    }
}

/// Checks every field and reports all offending ones at once.
pub fn validate_features(values: &[f64; NUM_FEATURES]) -> PredictorResult<()> {
    let mut problems = Vec::new();

    for (name, value) in FEATURE_NAMES.iter().zip(values) {
        if !value.is_finite() {
            warn!("{} is not a finite number", name);
            problems.push(format!("{} must be finite, got {}", name, value));
        } else if *value < 0.0 {
            warn!("{} cannot be negative", name);
            problems.push(format!("{} must be non-negative, got {}", name, value));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PredictorError::InvalidFeatureVector(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accepts_zero_boundary() {
        let features = FeatureVector::new(0.0, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(features.to_array(), [0.0; NUM_FEATURES]);
    }

    #[test]
    fn keeps_training_order() {
        let features = FeatureVector::new(2.5, 30.0, 10.0, 5.0).unwrap();
        assert_eq!(features.to_array(), [2.5, 30.0, 10.0, 5.0]);
        assert_eq!(features.weight_kg(), 2.5);
        assert_eq!(features.width_cm(), 5.0);
    }

    #[test]
    fn rejects_wrong_length() {
        for values in [vec![], vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0, 4.0, 5.0]] {
            let err = FeatureVector::try_from(values.as_slice()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFeatureVector);
            assert!(err.message().contains(&format!("got {}", values.len())));
        }
    }

    #[test]
    fn names_every_invalid_field() {
        let err = FeatureVector::new(-1.0, 30.0, f64::NAN, f64::INFINITY).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFeatureVector);

        let msg = err.message();
        assert!(msg.contains("weight_kg must be non-negative"));
        assert!(msg.contains("height_cm must be finite"));
        assert!(msg.contains("width_cm must be finite"));
        assert!(!msg.contains("length_cm"));
    }

    #[test]
    fn negative_infinity_is_reported_as_non_finite() {
        let err = FeatureVector::try_from(&[1.0, f64::NEG_INFINITY, 1.0, 1.0][..]).unwrap_err();
        assert!(err.message().contains("length_cm must be finite"));
    }
}
