pub mod config;
pub mod error;
pub mod features;
pub mod logger;

pub use error::{ErrorKind, PredictorError, PredictorResult};
pub use features::{FEATURE_NAMES, FeatureVector, NUM_FEATURES};
