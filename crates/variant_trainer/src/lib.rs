//! Deterministic offline GBDT trainer for the pathogenicity model
//!
//! Trains binary logistic boosted trees in fixed-point arithmetic so that the
//! same dataset and parameters always yield the same artifact hash.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod synthetic;
pub mod trainer;

use snpath_core::gbdt::Model;
use std::path::Path;

pub use dataset::{Dataset, FeatureStats, LABEL_COLUMN};
pub use deterministic::SplitTieBreaker;
pub use errors::TrainerError;
pub use trainer::{GbdtConfig, GbdtTrainer, TrainingReport};

/// Train a deterministic model directly from a CSV file using the provided parameters.
pub fn train_model_from_csv(path: &Path, config: GbdtConfig) -> Result<Model, TrainerError> {
    let dataset =
        Dataset::from_csv(path).map_err(|err| TrainerError::Dataset(err.to_string()))?;
    let trainer = GbdtTrainer::new(config);
    trainer
        .train(&dataset)
        .map_err(|err| TrainerError::Training(err.to_string()))
}

/// Train the fallback model on a seeded synthetic dataset
pub fn train_fallback(
    samples: usize,
    seed: u64,
    config: GbdtConfig,
) -> Result<Model, TrainerError> {
    let dataset = synthetic::generate(samples, seed)?;
    GbdtTrainer::new(config)
        .train(&dataset)
        .map_err(|err| TrainerError::Training(err.to_string()))
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
