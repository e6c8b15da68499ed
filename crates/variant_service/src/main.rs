//! Pathogenicity predictor CLI
//!
//! Scores missense variants with the configured model, bootstrapping a
//! fallback model on first use when no artifact exists.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use snpath_core::derive_features;
use snpath_service::{
    read_variants, ModelStore, ServiceConfig, SharedPredictor, VariantIdentifier, VERSION,
};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "snpath")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic SNP pathogenicity predictor", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one variant
    Predict {
        /// Gene symbol, e.g. BRCA1
        #[arg(long)]
        gene: String,
        /// Coding DNA change, e.g. c.181T>G
        #[arg(long)]
        cdna: String,
        /// Protein change, e.g. p.Cys61Gly
        #[arg(long)]
        protein: String,
    },
    /// Score every variant in a CSV file, one JSON object per line
    Batch {
        /// CSV with gene,cdna_change,protein_change rows
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print the derived feature vector without scoring
    Features {
        #[arg(long)]
        gene: String,
        #[arg(long)]
        protein: String,
    },
    /// Load or bootstrap the model artifact and print its hash
    InitModel,
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config =
        ServiceConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging.level)?;

    info!("snpath v{} (core v{})", VERSION, snpath_core::VERSION);

    match cli.command {
        Command::Predict {
            gene,
            cdna,
            protein,
        } => {
            let predictor = SharedPredictor::new(config).get()?;
            let response = predictor
                .predict_single(&gene, &cdna, &protein)
                .with_context(|| format!("Failed to score {gene}:{cdna}"))?;
            print_json(&response, cli.pretty)?;
        }
        Command::Batch { input } => {
            let variants = read_variants(&input)
                .with_context(|| format!("Failed to read variants from {}", input.display()))?;
            let predictor = SharedPredictor::new(config).get()?;
            info!("Scoring {} variants", variants.len());

            let results = predictor.predict_batch(&variants);
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let mut failures = 0usize;

            for (variant, result) in variants.iter().zip(results) {
                let line = match result {
                    Ok(response) => serde_json::to_string(&response)?,
                    Err(err) => {
                        failures += 1;
                        error!("{}: {}", variant.label(), err);
                        serde_json::to_string(&error_object(variant, &err.to_string()))?
                    }
                };
                writeln!(out, "{line}")?;
            }
            out.flush()?;

            if failures > 0 {
                info!("{} of {} variants failed", failures, variants.len());
            }
        }
        Command::Features { gene, protein } => {
            print_json(&derive_features(&gene, &protein), cli.pretty)?;
        }
        Command::InitModel => {
            let store = ModelStore::new(&config);
            let loaded = store.load_or_bootstrap()?;
            print_json(
                &json!({
                    "path": store.model_path().display().to_string(),
                    "hash": loaded.hash,
                    "origin": format!("{:?}", loaded.origin),
                    "trees": loaded.model.num_trees(),
                    "features": loaded.model.feature_names,
                }),
                cli.pretty,
            )?;
        }
        Command::ShowConfig => {
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{rendered}");
        }
    }

    Ok(())
}

fn error_object(variant: &VariantIdentifier, message: &str) -> serde_json::Value {
    json!({
        "variant_id": variant.label(),
        "error": message,
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

/// Initialize logging; `RUST_LOG` wins over the configured level
fn init_logging(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
                .with_context(|| format!("Invalid log level {level:?}"))?,
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    Ok(())
}
