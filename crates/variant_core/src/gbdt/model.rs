//! GBDT model artifact with deterministic inference
//!
//! The model is a boosted ensemble for a binary logistic objective:
//! - `score` returns the positive-class log-odds as a fixed-point integer
//! - `feature_names` pins the training-time column order
//! - artifacts are canonical JSON (sorted keys, no whitespace) hashed with Blake3

use super::tree::Tree;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// GBDT Model errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Default scale factor for fixed-point arithmetic (1e6)
pub const SCALE: i64 = 1_000_000;

/// Current artifact format version
pub const FORMAT_VERSION: i32 = 1;

/// GBDT Model with integer-only representation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    /// Model format version
    pub version: i32,

    /// Fixed-point scale factor for thresholds, leaves and bias
    pub scale: i64,

    /// Feature names in the order the model was trained with
    pub feature_names: Vec<String>,

    /// Decision trees in the ensemble
    pub trees: Vec<Tree>,

    /// Bias term: prior log-odds (fixed-point integer)
    pub bias: i64,

    /// Post-processing scale factor (same as scale for log-odds output)
    pub post_scale: i64,
}

impl Model {
    /// Create a new GBDT model at the default scale
    pub fn new(feature_names: Vec<String>, trees: Vec<Tree>, bias: i64) -> Self {
        Self {
            version: FORMAT_VERSION,
            scale: SCALE,
            feature_names,
            trees,
            bias,
            post_scale: SCALE,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != FORMAT_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        if self.scale <= 0 {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid scale: {}",
                self.scale
            )));
        }

        if self.post_scale <= 0 {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid post_scale: {}",
                self.post_scale
            )));
        }

        if self.feature_names.is_empty() {
            return Err(ModelError::ValidationFailed(
                "Model declares no feature names".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in &self.feature_names {
            if !seen.insert(name.as_str()) {
                return Err(ModelError::ValidationFailed(format!(
                    "Duplicate feature name: {name}"
                )));
            }
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| {
                ModelError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;

            if let Some(max_idx) = tree.max_feature_index() {
                if max_idx >= self.feature_names.len() {
                    return Err(ModelError::ValidationFailed(format!(
                        "Tree {} splits on feature {} but the model has {} features",
                        i,
                        max_idx,
                        self.feature_names.len()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Deterministic inference on an aligned fixed-point feature vector.
    ///
    /// Returns `bias + Σ leaf * weight / scale`, the positive-class log-odds
    /// at `post_scale`.
    pub fn score(&self, features: &[i64]) -> i64 {
        let mut sum = self.bias;

        for tree in &self.trees {
            let leaf_value = tree.evaluate(features);
            let contribution = (leaf_value as i128 * tree.weight as i128) / self.scale as i128;
            sum = sum.saturating_add(contribution.clamp(i64::MIN as i128, i64::MAX as i128) as i64);
        }

        sum
    }

    /// Log-odds as a float
    pub fn margin(&self, features: &[i64]) -> f64 {
        self.score(features) as f64 / self.post_scale as f64
    }

    /// Probability of the positive class
    pub fn probability(&self, features: &[i64]) -> f64 {
        sigmoid(self.margin(features))
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String, ModelError> {
        let value = canonicalize(serde_json::to_value(self)?);
        Ok(serde_json::to_string(&value)?)
    }

    /// Compute Blake3 hash of canonical JSON representation
    pub fn hash(&self) -> Result<[u8; 32], ModelError> {
        let json = self.to_canonical_json()?;
        Ok(*blake3::hash(json.as_bytes()).as_bytes())
    }

    /// Compute model hash as hex string
    pub fn hash_hex(&self) -> Result<String, ModelError> {
        Ok(hex::encode(self.hash()?))
    }

    /// Save model to JSON file with canonical serialization
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let json = self.to_canonical_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Parse and validate a model from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let model: Model = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Load model from JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Get number of trees in the model
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of input features
    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// True when every tree carries cover statistics
    pub fn has_cover(&self) -> bool {
        self.trees.iter().all(Tree::has_cover)
    }
}

/// Numerically stable logistic function
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inverse of [`sigmoid`]; the input is clamped away from 0 and 1
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-9, 1.0 - 1e-9);
    (p / (1.0 - p)).ln()
}

/// Recursively sort object keys
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
