//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Newton boosting with a binary logistic loss. Margins, gradients,
//! hessians and leaves are fixed-point at the model scale; only the sigmoid
//! is evaluated in floating point, then rounded.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snpath_core::gbdt::{logit, sigmoid, to_fixed, Model, Tree, SCALE};
use tracing::{debug, info};

use crate::cart::{CartBuilder, GradientPair, TreeConfig};
use crate::dataset::Dataset;

/// GBDT training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GbdtConfig {
    pub num_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub learning_rate: i64, // Fixed-point, e.g., 300_000 = 0.3
    pub lambda: i64,        // Fixed-point L2 on leaves
    pub quant_step: i64,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            max_depth: 3,
            min_samples_leaf: 4,
            learning_rate: 300_000, // 0.3 in fixed-point
            lambda: SCALE,
            quant_step: 1000,
        }
    }
}

/// Training summary reported alongside the model
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingReport {
    pub trees: usize,
    pub bias: i64,
    pub log_loss: f64,
    pub accuracy: f64,
}

/// GBDT trainer
pub struct GbdtTrainer {
    config: GbdtConfig,
}

impl GbdtTrainer {
    pub fn new(config: GbdtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GbdtConfig {
        &self.config
    }

    /// Train a GBDT model on the given dataset
    pub fn train(&self, dataset: &Dataset) -> Result<Model> {
        self.train_with_report(dataset).map(|(model, _)| model)
    }

    pub fn train_with_report(&self, dataset: &Dataset) -> Result<(Model, TrainingReport)> {
        if dataset.is_empty() {
            anyhow::bail!("Cannot train on an empty dataset");
        }
        if self.config.num_trees == 0 {
            anyhow::bail!("num_trees must be positive");
        }
        if self.config.learning_rate <= 0 {
            anyhow::bail!("learning_rate must be positive");
        }

        let bias = self.calculate_bias(&dataset.labels);
        let mut margins = vec![bias; dataset.len()];

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_leaf: self.config.min_samples_leaf,
            lambda: self.config.lambda,
            quant_step: self.config.quant_step,
            scale: SCALE,
        };

        let mut trees = Vec::with_capacity(self.config.num_trees);

        for tree_idx in 0..self.config.num_trees {
            let stats = self.gradient_pairs(&dataset.labels, &margins);

            let builder = CartBuilder::new(&dataset.features, &stats, tree_config.clone());
            let tree = builder.build(self.config.learning_rate);

            self.update_margins(&tree, &dataset.features, &mut margins);
            debug!(
                "Tree {}/{}: {} nodes, log loss {:.6}",
                tree_idx + 1,
                self.config.num_trees,
                tree.nodes.len(),
                log_loss(&dataset.labels, &margins)
            );

            trees.push(tree);
        }

        let model = Model::new(dataset.feature_names.clone(), trees, bias);
        model.validate().context("Trained model failed validation")?;

        let report = TrainingReport {
            trees: model.num_trees(),
            bias,
            log_loss: log_loss(&dataset.labels, &margins),
            accuracy: accuracy(&dataset.labels, &margins),
        };
        info!(
            "Trained {} trees: log loss {:.6}, accuracy {:.4}",
            report.trees, report.log_loss, report.accuracy
        );

        Ok((model, report))
    }

    /// Prior log-odds of the positive class, fixed-point
    fn calculate_bias(&self, labels: &[i64]) -> i64 {
        if labels.is_empty() {
            return 0;
        }

        let positives = labels.iter().filter(|&&l| l == 1).count();
        to_fixed(logit(positives as f64 / labels.len() as f64), SCALE)
    }

    /// Logistic loss derivatives
    /// gradient = p - y
    /// hessian = p * (1 - p), floored at one unit so leaves stay finite
    fn gradient_pairs(&self, labels: &[i64], margins: &[i64]) -> Vec<GradientPair> {
        labels
            .iter()
            .zip(margins)
            .map(|(&label, &margin)| {
                let p = to_fixed(sigmoid(margin as f64 / SCALE as f64), SCALE);
                let hessian = ((p as i128 * (SCALE - p) as i128) / SCALE as i128) as i64;

                GradientPair {
                    gradient: p - label * SCALE,
                    hessian: hessian.max(1),
                }
            })
            .collect()
    }

    /// Add `leaf * learning_rate / SCALE` per row, matching `Model::score`
    fn update_margins(&self, tree: &Tree, features: &[Vec<i64>], margins: &mut [i64]) {
        for (margin, row) in margins.iter_mut().zip(features) {
            let leaf = tree.evaluate(row);
            let step = (leaf as i128 * tree.weight as i128) / SCALE as i128;
            *margin = margin.saturating_add(step as i64);
        }
    }
}

/// Mean binary cross-entropy of fixed-point margins
pub fn log_loss(labels: &[i64], margins: &[i64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }

    let total: f64 = labels
        .iter()
        .zip(margins)
        .map(|(&label, &margin)| {
            let p = sigmoid(margin as f64 / SCALE as f64).clamp(1e-12, 1.0 - 1e-12);
            if label == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();

    total / labels.len() as f64
}

/// Fraction of rows whose thresholded margin matches the label
pub fn accuracy(labels: &[i64], margins: &[i64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }

    let correct = labels
        .iter()
        .zip(margins)
        .filter(|(&label, &margin)| (margin >= 0) == (label == 1))
        .count();

    correct as f64 / labels.len() as f64
}
