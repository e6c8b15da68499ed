//! Error types for the prediction pipeline

use crate::gbdt::ModelError;
use thiserror::Error;

/// Errors surfaced by the classifier and explainer stages.
///
/// Feature derivation and result assembly are infallible and never produce
/// one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathogenicityError {
    /// The feature vector does not carry exactly the fields the model was trained on
    #[error("feature schema mismatch: model expects {expected:?}, got {found:?}")]
    FeatureSchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// No model could be loaded or synthesized
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The attribution engine could not bind to the current model
    #[error("explainer degraded: {0}")]
    ExplainerDegraded(String),

    /// Model parameters are structurally invalid
    #[error("invalid model: {0}")]
    InvalidModel(String),
}

impl From<ModelError> for PathogenicityError {
    fn from(err: ModelError) -> Self {
        PathogenicityError::ModelUnavailable(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PathogenicityError>;
