use fish_core::{FEATURE_NAMES, NUM_FEATURES, PredictorError, PredictorResult};
use log::info;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub type ForestRegressor = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Evaluates one row of measurements laid out in [`FEATURE_NAMES`] order.
pub trait Regressor: Send + Sync {
    fn predict(&self, row: &[f64; NUM_FEATURES]) -> PredictorResult<f64>;

    fn kind(&self) -> &str;
}

/// Ordinary least squares export: `intercept + coefficients · row`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl Regressor for LinearModel {
    fn predict(&self, row: &[f64; NUM_FEATURES]) -> PredictorResult<f64> {
        if self.coefficients.len() != NUM_FEATURES {
            return Err(PredictorError::InferenceError(format!(
                "linear model has {} coefficients but the input has {} features",
                self.coefficients.len(),
                NUM_FEATURES
            )));
        }

        let weights = ArrayView1::from(&self.coefficients[..]);
        let input = ArrayView1::from(&row[..]);
        Ok(weights.dot(&input) + self.intercept)
    }

    fn kind(&self) -> &str {
        "linear"
    }
}

pub struct ForestModel {
    model: ForestRegressor,
}

impl ForestModel {
    pub fn new(model: ForestRegressor) -> Self {
        Self { model }
    }
}

impl Regressor for ForestModel {
    fn predict(&self, row: &[f64; NUM_FEATURES]) -> PredictorResult<f64> {
        let input = DenseMatrix::from_2d_vec(&vec![row.to_vec()])
            .map_err(|e| PredictorError::InferenceError(format!("Matrix creation failed: {}", e)))?;

        let predictions = self
            .model
            .predict(&input)
            .map_err(|e| PredictorError::InferenceError(format!("Random forest failed: {}", e)))?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| PredictorError::InferenceError("No prediction returned".to_string()))
    }

    fn kind(&self) -> &str {
        "random_forest"
    }
}

#[derive(Deserialize)]
struct ArtifactFile {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    #[serde(flatten)]
    spec: ArtifactSpec,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ArtifactSpec {
    Linear(LinearModel),
    RandomForest { model: ForestRegressor },
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Only used by ONNX artifacts.
    pub onnx_threads: i16,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

/// A deserialized regressor, immutable once loaded.
pub struct ModelArtifact {
    regressor: Box<dyn Regressor>,
    source: Option<PathBuf>,
}

impl ModelArtifact {
    pub fn load(path: impl AsRef<Path>) -> PredictorResult<Self> {
        Self::load_with(path.as_ref(), &LoadOptions::default())
    }

    /// `.onnx` files go to the ONNX runtime, anything else is read as a JSON envelope.
    pub fn load_with(path: &Path, options: &LoadOptions) -> PredictorResult<Self> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(PredictorError::ArtifactNotFound(format!(
                    "{} is not a file",
                    path.display()
                )));
            }
            Err(e) => return Err(not_found(path, e)),
        }

        let regressor = if is_onnx(path) {
            load_onnx(path, options)?
        } else {
            let bytes = fs::read(path).map_err(|e| not_found(path, e))?;
            decode_json(&bytes)?
        };

        info!(
            "Loaded {} model from {}",
            regressor.kind(),
            path.display()
        );

        Ok(Self {
            regressor,
            source: Some(path.to_path_buf()),
        })
    }

    /// Decodes an in-memory JSON envelope.
    pub fn from_slice(bytes: &[u8]) -> PredictorResult<Self> {
        Ok(Self {
            regressor: decode_json(bytes)?,
            source: None,
        })
    }

    pub fn from_regressor(regressor: impl Regressor + 'static) -> Self {
        Self {
            regressor: Box::new(regressor),
            source: None,
        }
    }

    pub fn kind(&self) -> &str {
        self.regressor.kind()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub(crate) fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("kind", &self.kind())
            .field("source", &self.source)
            .finish()
    }
}

fn not_found(path: &Path, err: io::Error) -> PredictorError {
    PredictorError::ArtifactNotFound(format!("cannot read {}: {}", path.display(), err))
}

fn is_onnx(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"))
}

fn decode_json(bytes: &[u8]) -> PredictorResult<Box<dyn Regressor>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(PredictorError::ArtifactCorrupt("artifact is empty".to_string()));
    }

    let file: ArtifactFile = serde_json::from_slice(bytes)
        .map_err(|e| PredictorError::ArtifactCorrupt(format!("invalid model envelope: {}", e)))?;

    if let Some(names) = &file.feature_names {
        check_feature_order(names)?;
    }

    let regressor: Box<dyn Regressor> = match file.spec {
        ArtifactSpec::Linear(model) => Box::new(model),
        ArtifactSpec::RandomForest { model } => Box::new(ForestModel::new(model)),
    };
    Ok(regressor)
}

fn check_feature_order(names: &[String]) -> PredictorResult<()> {
    if names.iter().map(String::as_str).eq(FEATURE_NAMES) {
        Ok(())
    } else {
        Err(PredictorError::ArtifactCorrupt(format!(
            "model was trained on features [{}], expected [{}]",
            names.join(", "),
            FEATURE_NAMES.join(", ")
        )))
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path, options: &LoadOptions) -> PredictorResult<Box<dyn Regressor>> {
    let regressor = crate::onnx::OnnxRegressor::spawn(path, options.onnx_threads)?;
    Ok(Box::new(regressor))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path, _options: &LoadOptions) -> PredictorResult<Box<dyn Regressor>> {
    Err(PredictorError::ArtifactCorrupt(format!(
        "{} is an ONNX graph but the server was built without the `onnx` feature",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fish_core::ErrorKind;

    const LINEAR: &str = r#"{
        "kind": "linear",
        "feature_names": ["weight_kg", "length_cm", "height_cm", "width_cm"],
        "coefficients": [4000.0, 20.0, 15.0, 10.0],
        "intercept": 150.0
    }"#;

    #[test]
    fn decodes_linear_envelope() {
        let artifact = ModelArtifact::from_slice(LINEAR.as_bytes()).unwrap();
        assert_eq!(artifact.kind(), "linear");
        assert!(artifact.source().is_none());

        let price = artifact.regressor().predict(&[2.5, 30.0, 10.0, 5.0]).unwrap();
        assert_eq!(price, 150.0 + 10_000.0 + 600.0 + 150.0 + 50.0);
    }

    #[test]
    fn feature_names_are_optional() {
        let json = r#"{"kind": "linear", "coefficients": [1.0, 1.0, 1.0, 1.0], "intercept": 0.0}"#;
        let artifact = ModelArtifact::from_slice(json.as_bytes()).unwrap();
        assert_eq!(artifact.regressor().predict(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 10.0);
    }

    #[test]
    fn rejects_reordered_features() {
        let json = r#"{
            "kind": "linear",
            "feature_names": ["length_cm", "weight_kg", "height_cm", "width_cm"],
            "coefficients": [1.0, 1.0, 1.0, 1.0],
            "intercept": 0.0
        }"#;
        let err = ModelArtifact::from_slice(json.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactCorrupt);
        assert!(err.message().contains("length_cm, weight_kg"));
    }

    #[test]
    fn rejects_empty_and_garbage_payloads() {
        for payload in ["", "   \n", "not a model", "{\"kind\": \"svm\"}", "{\"kind\": \"linear\"}"] {
            let err = ModelArtifact::from_slice(payload.as_bytes()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ArtifactCorrupt, "payload {:?}", payload);
        }
    }

    #[test]
    fn linear_shape_mismatch_surfaces_at_inference() {
        let json = r#"{"kind": "linear", "coefficients": [1.0, 2.0, 3.0], "intercept": 0.0}"#;
        let artifact = ModelArtifact::from_slice(json.as_bytes()).unwrap();

        let err = artifact.regressor().predict(&[1.0; NUM_FEATURES]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceError);
        assert!(err.message().contains("3 coefficients"));
    }

    #[test]
    fn detects_onnx_extension() {
        assert!(is_onnx(Path::new("model/fish.onnx")));
        assert!(is_onnx(Path::new("FISH.ONNX")));
        assert!(!is_onnx(Path::new("model/fish.json")));
        assert!(!is_onnx(Path::new("model/onnx")));
    }
}
