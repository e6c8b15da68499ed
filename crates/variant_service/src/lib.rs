//! Pathogenicity prediction service layer
//!
//! Wraps the scoring pipeline for callers:
//! - Layered configuration (defaults, TOML, environment)
//! - Model artifact loading with hash verification and a trained fallback
//! - A lazily initialized shared predictor with single and batch scoring
//! - Variant list input parsing

pub mod config;
pub mod errors;
pub mod input;
pub mod model_store;
pub mod predictor;

pub use config::ServiceConfig;
pub use errors::{Result, ServiceError};
pub use input::{parse_variants, read_variants};
pub use model_store::{LoadedModel, ModelOrigin, ModelStore};
pub use predictor::{Predictor, SharedPredictor};

/// Re-export core prediction types
pub use snpath_core::{
    AttributionSet, AttributionSource, Classification, ConfidenceInterval, FeatureAttribution,
    PathogenicityError, PredictionResponse, VariantIdentifier,
};

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
