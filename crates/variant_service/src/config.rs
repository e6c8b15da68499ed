//! Service configuration
//!
//! Defaults, then an optional TOML file, then `SNPATH_*` environment
//! overrides. Unparseable override values are ignored with a warning.

use crate::errors::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use snpath_core::gbdt::{to_fixed, SCALE};
use snpath_core::DEFAULT_TOP_K;
use snpath_trainer::GbdtConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_MODEL_PATH: &str = "SNPATH_MODEL_PATH";
pub const ENV_LOG_LEVEL: &str = "SNPATH_LOG_LEVEL";
pub const ENV_FALLBACK_SEED: &str = "SNPATH_FALLBACK_SEED";
pub const ENV_FALLBACK_SAMPLES: &str = "SNPATH_FALLBACK_SAMPLES";
pub const ENV_TOP_K: &str = "SNPATH_TOP_K";

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub model: ModelConfig,
    pub fallback: FallbackConfig,
    pub explainer: ExplainerConfig,
    pub uncertainty: UncertaintyConfig,
    pub logging: LoggingConfig,
}

/// Model artifact location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Check the `.hash` sidecar when one exists
    pub verify_hash: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/pathogenicity_gbdt.json"),
            verify_hash: true,
        }
    }
}

/// Fallback model trained when no artifact exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub samples: usize,
    pub seed: u64,
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub learning_rate: f64,
    pub lambda: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            samples: 100,
            seed: 42,
            trees: 100,
            max_depth: 3,
            min_samples_leaf: 4,
            learning_rate: 0.3,
            lambda: 1.0,
        }
    }
}

impl FallbackConfig {
    /// Trainer parameters in fixed-point
    pub fn gbdt_config(&self) -> GbdtConfig {
        GbdtConfig {
            num_trees: self.trees,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            learning_rate: to_fixed(self.learning_rate, SCALE),
            lambda: to_fixed(self.lambda, SCALE),
            ..GbdtConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerConfig {
    pub top_k: usize,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyConfig {
    pub half_width: f64,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self { half_width: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Defaults, then `path` if given, then environment overrides; validated
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            ServiceError::Io(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ServiceError::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Apply `SNPATH_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MODEL_PATH) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                self.model.path = PathBuf::from(trimmed);
            }
        }

        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                self.logging.level = trimmed.to_string();
            }
        }

        if let Some(value) = lookup(ENV_FALLBACK_SEED) {
            match value.trim().parse() {
                Ok(seed) => self.fallback.seed = seed,
                Err(_) => warn!("Ignoring invalid {}={}", ENV_FALLBACK_SEED, value),
            }
        }

        if let Some(value) = lookup(ENV_FALLBACK_SAMPLES) {
            match value.trim().parse() {
                Ok(samples) => self.fallback.samples = samples,
                Err(_) => warn!("Ignoring invalid {}={}", ENV_FALLBACK_SAMPLES, value),
            }
        }

        if let Some(value) = lookup(ENV_TOP_K) {
            match value.trim().parse() {
                Ok(top_k) => self.explainer.top_k = top_k,
                Err(_) => warn!("Ignoring invalid {}={}", ENV_TOP_K, value),
            }
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.model.path.as_os_str().is_empty() {
            problems.push("model.path is empty".to_string());
        }
        if self.explainer.top_k == 0 {
            problems.push("explainer.top_k must be at least 1".to_string());
        }
        let half_width = self.uncertainty.half_width;
        if !(half_width > 0.0 && half_width <= 0.5) {
            problems.push(format!(
                "uncertainty.half_width must be in (0, 0.5], got {half_width}"
            ));
        }
        if self.fallback.samples == 0 {
            problems.push("fallback.samples must be positive".to_string());
        }
        if self.fallback.trees == 0 {
            problems.push("fallback.trees must be positive".to_string());
        }
        if self.fallback.min_samples_leaf == 0 {
            problems.push("fallback.min_samples_leaf must be positive".to_string());
        }
        if !(self.fallback.learning_rate > 0.0 && self.fallback.learning_rate <= 1.0) {
            problems.push(format!(
                "fallback.learning_rate must be in (0, 1], got {}",
                self.fallback.learning_rate
            ));
        }
        if !(self.fallback.lambda >= 0.0 && self.fallback.lambda.is_finite()) {
            problems.push(format!(
                "fallback.lambda must be non-negative, got {}",
                self.fallback.lambda
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Config(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        config.validate().unwrap();
        assert_eq!(config.explainer.top_k, 5);
        assert_eq!(config.fallback.samples, 100);
        assert_eq!(config.fallback.seed, 42);
        assert_eq!(config.model.path, PathBuf::from("models/pathogenicity_gbdt.json"));
    }

    #[test]
    fn test_fallback_params_are_fixed_point() {
        let gbdt = FallbackConfig::default().gbdt_config();
        assert_eq!(gbdt.num_trees, 100);
        assert_eq!(gbdt.learning_rate, 300_000);
        assert_eq!(gbdt.lambda, 1_000_000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServiceConfig::default();
        config.apply_overrides_from(lookup(&[
            (ENV_MODEL_PATH, "/tmp/m.json"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_FALLBACK_SEED, "7"),
            (ENV_FALLBACK_SAMPLES, "not-a-number"),
            (ENV_TOP_K, "3"),
        ]));

        assert_eq!(config.model.path, PathBuf::from("/tmp/m.json"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.fallback.seed, 7);
        assert_eq!(config.fallback.samples, 100);
        assert_eq!(config.explainer.top_k, 3);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.explainer.top_k = 0;
        assert!(matches!(config.validate(), Err(ServiceError::Config(_))));

        let mut config = ServiceConfig::default();
        config.uncertainty.half_width = 0.0;
        assert!(config.validate().is_err());
        config.uncertainty.half_width = 0.6;
        assert!(config.validate().is_err());
        config.uncertainty.half_width = 0.5;
        assert!(config.validate().is_ok());

        let mut config = ServiceConfig::default();
        config.fallback.trees = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("snpath.toml");

        let mut config = ServiceConfig::default();
        config.fallback.samples = 250;
        config.uncertainty.half_width = 0.05;
        config.save_to_file(&config_path).unwrap();

        let loaded = ServiceConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("snpath.toml");
        fs::write(&config_path, "[explainer]\ntop_k = 2\n").unwrap();

        let loaded = ServiceConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.explainer.top_k, 2);
        assert_eq!(loaded.model, ModelConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("snpath.toml");
        fs::write(&config_path, "[explainer\ntop_k = ").unwrap();

        assert!(matches!(
            ServiceConfig::load_from_file(&config_path),
            Err(ServiceError::Config(_))
        ));
    }
}
