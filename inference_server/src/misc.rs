use fish_core::{ErrorKind, FEATURE_NAMES, FeatureVector, NUM_FEATURES, PredictorError, PredictorResult};
use serde::{Deserialize, Serialize};

/// Tanzanian shilling.
pub const CURRENCY: &str = "TZS";
const CURRENCY_SYMBOL: &str = "Tsh";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_price: f64,
    pub currency: &'static str,
}

impl PredictionResult {
    pub fn new(predicted_price: f64) -> Self {
        Self {
            predicted_price,
            currency: CURRENCY,
        }
    }

    /// Whole shillings with thousands separators, e.g. `Tsh 12,346`.
    pub fn display(&self) -> String {
        format!("{} {}", CURRENCY_SYMBOL, group_thousands(&format!("{:.0}", self.predicted_price)))
    }
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}", sign, grouped)
}

/// Either the four named measurements or a positional `features` array.
#[derive(Debug, Default, Deserialize)]
pub struct PredictRequest {
    pub weight_kg: Option<f64>,
    pub length_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub features: Option<Vec<f64>>,
}

impl PredictRequest {
    pub fn into_features(self) -> PredictorResult<FeatureVector> {
        let named = [self.weight_kg, self.length_cm, self.height_cm, self.width_cm];

        match self.features {
            Some(values) if named.iter().all(Option::is_none) => FeatureVector::try_from(values.as_slice()),
            Some(_) => Err(PredictorError::InvalidFeatureVector(
                "send either named measurements or `features`, not both".to_string(),
            )),
            None => {
                let missing: Vec<&str> = FEATURE_NAMES
                    .iter()
                    .zip(named)
                    .filter(|(_, value)| value.is_none())
                    .map(|(name, _)| *name)
                    .collect();

                if !missing.is_empty() {
                    return Err(PredictorError::InvalidFeatureVector(format!(
                        "missing field(s): {}",
                        missing.join(", ")
                    )));
                }

                let values: Vec<f64> = named.into_iter().flatten().collect();
                FeatureVector::try_from(values.as_slice())
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_price: f64,
    pub currency: String,
    pub display: String,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            predicted_price: result.predicted_price,
            currency: result.currency.to_string(),
            display: result.display(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_kind: ErrorKind,
    pub message: String,
}

impl From<&PredictorError> for ErrorBody {
    fn from(err: &PredictorError) -> Self {
        Self {
            error_kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub model_kind: String,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub model_kind: String,
    pub source: Option<String>,
    pub feature_names: [&'static str; NUM_FEATURES],
    pub currency: &'static str,
}
