//! Pathogenicity GBDT Trainer CLI
//!
//! Deterministic offline trainer producing a model artifact and its hash.

use anyhow::{Context, Result};
use clap::Parser;
use snpath_trainer::{synthetic, Dataset, GbdtConfig, GbdtTrainer, VERSION};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "snpath-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic GBDT trainer for the pathogenicity model", long_about = None)]
struct Args {
    /// Input CSV dataset (header of feature names, final `label` column).
    /// Uses the synthetic generator when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for model and hash
    #[arg(short, long, default_value = "models")]
    output: PathBuf,

    /// Artifact base name; writes <name>.json, <name>.hash and <name>.report.json
    #[arg(long, default_value = "pathogenicity_gbdt")]
    name: String,

    /// Synthetic sample count (without --input)
    #[arg(long, default_value = "100")]
    samples: usize,

    /// Number of boosting trees
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value = "3")]
    max_depth: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "4")]
    min_samples_leaf: usize,

    /// Learning rate (fixed-point, e.g., 300000 = 0.3)
    #[arg(long, default_value = "300000")]
    learning_rate: i64,

    /// L2 regularization (fixed-point, e.g., 1000000 = 1.0)
    #[arg(long, default_value = "1000000")]
    lambda: i64,

    /// Quantization step for feature values
    #[arg(long, default_value = "1000")]
    quant_step: i64,

    /// Seed for synthetic generation (without --input)
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Pathogenicity GBDT Trainer v{}", VERSION);

    let dataset = match &args.input {
        Some(path) => {
            info!("Loading dataset from: {}", path.display());
            Dataset::from_csv(path).context("Failed to load dataset")?
        }
        None => {
            info!(
                "No input given, generating {} synthetic samples with seed {}",
                args.samples, args.seed
            );
            synthetic::generate(args.samples, args.seed)
                .context("Failed to generate synthetic dataset")?
        }
    };

    info!(
        "Loaded {} samples with {} features (positive rate {:.3})",
        dataset.len(),
        dataset.feature_count(),
        dataset.positive_rate()
    );

    info!("Feature statistics:");
    for stat in dataset.feature_stats() {
        info!("  {}: min={}, max={}", stat.name, stat.min, stat.max);
    }

    let config = GbdtConfig {
        num_trees: args.trees,
        max_depth: args.max_depth,
        min_samples_leaf: args.min_samples_leaf,
        learning_rate: args.learning_rate,
        lambda: args.lambda,
        quant_step: args.quant_step,
    };
    info!("Training configuration: {:?}", config);

    let (model, report) = GbdtTrainer::new(config.clone())
        .train_with_report(&dataset)
        .context("Training failed")?;

    info!("Training complete!");
    info!("  Bias: {}", report.bias);
    info!("  Trees: {}", report.trees);
    info!("  Log loss: {:.6}", report.log_loss);
    info!("  Accuracy: {:.4}", report.accuracy);

    std::fs::create_dir_all(&args.output).context("Failed to create output directory")?;

    let model_path = args.output.join(format!("{}.json", args.name));
    info!("Saving model to: {}", model_path.display());
    model
        .save_json(&model_path)
        .context("Failed to write model file")?;

    let hash_hex = model.hash_hex().context("Failed to hash model")?;
    let hash_path = args.output.join(format!("{}.hash", args.name));
    std::fs::write(&hash_path, &hash_hex).context("Failed to write hash file")?;

    let report_path = args.output.join(format!("{}.report.json", args.name));
    let report_json = serde_json::to_string_pretty(&serde_json::json!({
        "config": config,
        "report": report,
        "hash": hash_hex,
        "samples": dataset.len(),
        "trainer_version": VERSION,
        "core_version": snpath_core::VERSION,
    }))
    .context("Failed to serialize training report")?;
    std::fs::write(&report_path, report_json).context("Failed to write training report")?;

    info!("Model: {}", model_path.display());
    info!("Hash: {} ({})", hash_path.display(), hash_hex);
    info!("Report: {}", report_path.display());

    Ok(())
}
