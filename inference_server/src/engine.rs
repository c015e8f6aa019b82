use crate::misc::PredictionResult;
use crate::model::{LoadOptions, ModelArtifact};
use fish_core::{FeatureVector, PredictorError, PredictorResult};
use log::{debug, warn};
use std::path::Path;

/// Owns the loaded model and serves predictions from it. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct Predictor {
    model: ModelArtifact,
}

impl Predictor {
    pub fn new(model: ModelArtifact) -> Self {
        Self { model }
    }

    pub fn load(path: &Path, options: &LoadOptions) -> PredictorResult<Self> {
        ModelArtifact::load_with(path, options).map(Self::new)
    }

    pub fn model(&self) -> &ModelArtifact {
        &self.model
    }

    pub fn predict(&self, features: &FeatureVector) -> PredictorResult<PredictionResult> {
        let row = features.to_array();
        let price = self.model.regressor().predict(&row)?;

        if !price.is_finite() {
            return Err(PredictorError::InferenceError(format!(
                "{} model returned a non-finite price ({})",
                self.model.kind(),
                price
            )));
        }
        // Passed through unchanged; plausibility is the model's concern.
        if price < 0.0 {
            warn!("Negative price {:.2} predicted for {:?}", price, features);
        }

        debug!("Predicted {:.2} for {:?}", price, features);
        Ok(PredictionResult::new(price))
    }

    /// Validates raw values before predicting.
    pub fn predict_values(&self, values: &[f64]) -> PredictorResult<PredictionResult> {
        let features = FeatureVector::try_from(values)?;
        self.predict(&features)
    }
}
