use serde::Serialize;
use thiserror::Error;

pub type PredictorResult<T> = Result<T, PredictorError>;

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Model artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Model artifact could not be decoded: {0}")]
    ArtifactCorrupt(String),

    #[error("Invalid feature vector: {0}")]
    InvalidFeatureVector(String),

    #[error("Inference failed: {0}")]
    InferenceError(String),
}

/// Wire-level discriminant of [`PredictorError`], serialized as the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ArtifactNotFound,
    ArtifactCorrupt,
    InvalidFeatureVector,
    InferenceError,
}

impl PredictorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ArtifactNotFound(_) => ErrorKind::ArtifactNotFound,
            Self::ArtifactCorrupt(_) => ErrorKind::ArtifactCorrupt,
            Self::InvalidFeatureVector(_) => ErrorKind::InvalidFeatureVector,
            Self::InferenceError(_) => ErrorKind::InferenceError,
        }
    }

    /// Detail message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::ArtifactNotFound(msg)
            | Self::ArtifactCorrupt(msg)
            | Self::InvalidFeatureVector(msg)
            | Self::InferenceError(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_variant_name() {
        let err = PredictorError::InvalidFeatureVector("weight_kg must be non-negative".into());
        let json = serde_json::to_string(&err.kind()).unwrap();
        assert_eq!(json, "\"InvalidFeatureVector\"");
        assert_eq!(err.message(), "weight_kg must be non-negative");
    }
}
