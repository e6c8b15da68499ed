//! Service error types

use snpath_core::PathogenicityError;
use snpath_trainer::TrainerError;
use thiserror::Error;

/// Service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid input at line {line}: {message}")]
    Input { line: u64, message: String },

    #[error(transparent)]
    Prediction(#[from] PathogenicityError),

    #[error(transparent)]
    Training(#[from] TrainerError),
}

impl ServiceError {
    /// Shorthand for the model-unavailable prediction error
    pub fn model_unavailable(message: impl Into<String>) -> Self {
        ServiceError::Prediction(PathogenicityError::ModelUnavailable(message.into()))
    }

    pub fn is_model_unavailable(&self) -> bool {
        matches!(
            self,
            ServiceError::Prediction(PathogenicityError::ModelUnavailable(_))
        )
    }
}

impl From<toml::de::Error> for ServiceError {
    fn from(err: toml::de::Error) -> Self {
        ServiceError::Config(format!("Failed to parse config: {err}"))
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Io(err.to_string())
    }
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;
