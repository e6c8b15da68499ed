//! Deterministic pathogenicity scoring for missense variants
//!
//! Scores a variant (gene plus protein change) with a fixed-point GBDT and
//! explains the score with per-feature attributions.
//!
//! Modules:
//! - `variant`: Variant identifiers
//! - `features`: Seeded feature derivation and the feature schema
//! - `gbdt`: Fixed-point GBDT model format, inference and hashing
//! - `classifier`: Feature alignment and the probability / class verdict
//! - `uncertainty`: Confidence interval estimators
//! - `explain`: TreeSHAP attributions with a labeled synthetic fallback
//! - `response`: Assembly of the externally visible response
//! - `pipeline`: The whole chain bound to one model
//! - `errors`: Pipeline error type

pub mod classifier;
pub mod errors;
pub mod explain;
pub mod features;
pub mod gbdt;
pub mod pipeline;
pub mod response;
pub mod uncertainty;
pub mod variant;

pub use classifier::{align_features, Classification, Classifier, Verdict, PATHOGENIC_THRESHOLD};
pub use errors::{PathogenicityError, Result};
pub use explain::{
    AttributionSet, AttributionSource, Explainer, FeatureAttribution, TreeExplainer, DEFAULT_TOP_K,
};
pub use features::{derive_features, FeatureVector, FEATURE_NAMES};
pub use gbdt::{Model, ModelError, Node, Tree, SCALE};
pub use pipeline::Pipeline;
pub use response::{assemble, PredictionResponse, PredictionResult};
pub use uncertainty::{ConfidenceInterval, FixedWidthInterval, UncertaintyEstimator};
pub use variant::VariantIdentifier;

/// Crate version string for artifact metadata and reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
