//! Final response assembly

use crate::classifier::{Classification, Verdict};
use crate::explain::AttributionSet;
use crate::features::{FeatureVector, DOMAIN_ANNOTATION, STRUCTURAL_PROXY};
use crate::uncertainty::ConfidenceInterval;
use crate::variant::VariantIdentifier;
use serde::Serialize;

/// `structural_proxy` above this gets a structural impact note
pub const STRUCTURAL_IMPACT_THRESHOLD: f64 = 0.8;

pub const STRUCTURAL_IMPACT_NOTE: &str = "High likelihood of destabilizing protein core.";
pub const NO_DOMAIN_WARNING: &str = "No explicit active domain mapped.";

/// Classifier output paired with its interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub probability: f64,
    pub classification: Classification,
    pub interval: ConfidenceInterval,
}

impl PredictionResult {
    pub fn new(verdict: Verdict, interval: ConfidenceInterval) -> Self {
        Self {
            probability: verdict.probability,
            classification: verdict.classification,
            interval,
        }
    }
}

/// Externally visible prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub variant_id: String,
    pub probability: f64,
    pub classification: Classification,
    pub confidence_interval: ConfidenceInterval,
    pub explanation: AttributionSet,
    pub structural_impact: Option<String>,
    pub warning_flags: Vec<String>,
}

/// Combine pipeline outputs into the response. Never fails.
pub fn assemble(
    variant: &VariantIdentifier,
    features: &FeatureVector,
    result: PredictionResult,
    explanation: AttributionSet,
) -> PredictionResponse {
    let structural_impact = features
        .get(STRUCTURAL_PROXY)
        .filter(|proxy| *proxy > STRUCTURAL_IMPACT_THRESHOLD)
        .map(|_| STRUCTURAL_IMPACT_NOTE.to_string());

    // a missing annotation counts as unmapped
    let warning_flags = match features.get(DOMAIN_ANNOTATION) {
        Some(value) if value == 1.0 => Vec::new(),
        _ => vec![NO_DOMAIN_WARNING.to_string()],
    };

    PredictionResponse {
        variant_id: variant.label(),
        probability: result.probability,
        classification: result.classification,
        confidence_interval: result.interval,
        explanation,
        structural_impact,
        warning_flags,
    }
}
