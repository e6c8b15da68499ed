//! Integration tests for deterministic GBDT trainer
//!
//! Ensures identical models are produced across runs and that trained
//! artifacts plug into the prediction pipeline.

use anyhow::Result;
use snpath_core::explain::AttributionSource;
use snpath_core::gbdt::Model;
use snpath_core::{Pipeline, TreeExplainer, VariantIdentifier};
use snpath_trainer::{
    synthetic, train_fallback, train_model_from_csv, Dataset, GbdtConfig, GbdtTrainer,
};
use std::io::Write;
use tempfile::NamedTempFile;

/// Labeled CSV where high conservation and large Grantham distance are pathogenic
fn create_csv_dataset() -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;

    writeln!(file, "conservation_score,grantham_dist,label")?;
    for i in 0..24 {
        let conservation = i as f64 / 24.0;
        let grantham = 5 + (i * 37) % 210;
        let label = u8::from(conservation > 0.5 || grantham > 180);
        writeln!(file, "{conservation:.4},{grantham},{label}")?;
    }

    file.flush()?;
    Ok(file)
}

fn config() -> GbdtConfig {
    GbdtConfig {
        num_trees: 8,
        max_depth: 3,
        min_samples_leaf: 2,
        ..GbdtConfig::default()
    }
}

#[test]
fn test_deterministic_training() -> Result<()> {
    let file = create_csv_dataset()?;
    let dataset = Dataset::from_csv(file.path())?;

    let model1 = GbdtTrainer::new(config()).train(&dataset)?;
    let model2 = GbdtTrainer::new(config()).train(&dataset)?;

    assert_eq!(model1.bias, model2.bias, "Bias should be identical");
    assert_eq!(model1.trees.len(), model2.trees.len());

    for (i, (tree1, tree2)) in model1.trees.iter().zip(model2.trees.iter()).enumerate() {
        assert_eq!(tree1, tree2, "Tree {} should match", i);
    }

    Ok(())
}

#[test]
fn test_cross_run_determinism() -> Result<()> {
    let file = create_csv_dataset()?;
    let dataset = Dataset::from_csv(file.path())?;

    let json_outputs: Vec<String> = (0..3)
        .map(|_| -> Result<String> {
            let model = GbdtTrainer::new(config()).train(&dataset)?;
            Ok(model.to_canonical_json()?)
        })
        .collect::<Result<_>>()?;

    for (i, json) in json_outputs.iter().enumerate().skip(1) {
        assert_eq!(&json_outputs[0], json, "JSON output from run {} should match run 0", i);
    }

    Ok(())
}

#[test]
fn test_csv_helper_round_trips_through_disk() -> Result<()> {
    let file = create_csv_dataset()?;
    let model = train_model_from_csv(file.path(), config())?;
    assert_eq!(model.feature_names, vec!["conservation_score", "grantham_dist"]);

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("model.json");
    model.save_json(&path)?;

    let loaded = Model::load_json(&path)?;
    assert_eq!(loaded, model);
    assert_eq!(loaded.hash_hex()?, model.hash_hex()?);

    Ok(())
}

#[test]
fn test_training_ignores_row_order() -> Result<()> {
    let file = create_csv_dataset()?;
    let dataset = Dataset::from_csv(file.path())?;
    let mut reversed = dataset.clone();
    reversed.features.reverse();
    reversed.labels.reverse();
    assert_ne!(dataset.features, reversed.features);

    let (plain, plain_report) = GbdtTrainer::new(config()).train_with_report(&dataset)?;
    let (mixed, mixed_report) = GbdtTrainer::new(config()).train_with_report(&reversed)?;

    assert_eq!(plain, mixed);
    assert!((plain_report.log_loss - mixed_report.log_loss).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_fallback_model_serves_predictions() -> Result<()> {
    let model = train_fallback(100, 42, GbdtConfig::default())?;
    assert_eq!(model.num_features(), 6);
    assert!(model.has_cover());

    let explainer = TreeExplainer::bind(&model)?;
    let pipeline = Pipeline::new(model.clone())?;
    let variant = VariantIdentifier::new("BRCA1", "c.181T>G", "p.Cys61Gly");
    let response = pipeline.predict(&variant)?;
    assert_eq!(response.explanation.source, AttributionSource::TreeShap);

    // additivity on the trained ensemble
    let features = snpath_core::derive_features("BRCA1", "p.Cys61Gly");
    let aligned = pipeline.classifier().align(&features)?;
    let phi = explainer.shap_values(&model, &aligned);
    let total = explainer.base_value() + phi.iter().sum::<f64>();
    assert!((total - model.margin(&aligned)).abs() < 1e-6 * model.num_trees() as f64);

    Ok(())
}

#[test]
fn test_fallback_is_reproducible() -> Result<()> {
    let a = train_fallback(100, 42, GbdtConfig::default())?;
    let b = train_fallback(100, 42, GbdtConfig::default())?;
    assert_eq!(a.hash_hex()?, b.hash_hex()?);

    let dataset = synthetic::generate(100, 42)?;
    let c = GbdtTrainer::new(GbdtConfig::default()).train(&dataset)?;
    assert_eq!(a, c);

    Ok(())
}
