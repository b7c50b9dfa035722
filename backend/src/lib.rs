pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod routes;
pub mod validation;

pub use error::ApiError;
pub use inference::{Classifier, InferenceError, LogisticModel, ModelInference};
pub use models::{InputRecord, PredictionEnvelope, PredictionResult, FEATURE_NAMES};
pub use validation::{validate, validate_value, ValidationError};
