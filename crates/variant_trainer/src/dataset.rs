//! CSV dataset loading and preprocessing
//!
//! Reads labeled float datasets and converts feature values to fixed-point
//! at the model scale.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use snpath_core::gbdt::{to_fixed, SCALE};
use std::path::Path;

/// Name of the mandatory final CSV column
pub const LABEL_COLUMN: &str = "label";

/// Per-feature value range, in fixed-point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureStats {
    pub name: String,
    pub min: i64,
    pub max: i64,
}

/// Binary-labeled training dataset with fixed-point features
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<i64>>,
    /// 0 (benign) or 1 (pathogenic)
    pub labels: Vec<i64>,
}

impl Dataset {
    /// Build a dataset from already fixed-point rows
    pub fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<i64>>,
        labels: Vec<i64>,
    ) -> Result<Self> {
        if feature_names.is_empty() {
            anyhow::bail!("Dataset declares no features");
        }
        if features.len() != labels.len() {
            anyhow::bail!(
                "Dataset has {} rows but {} labels",
                features.len(),
                labels.len()
            );
        }
        if let Some((i, row)) = features
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != feature_names.len())
        {
            anyhow::bail!(
                "Row {}: expected {} features, got {}",
                i,
                feature_names.len(),
                row.len()
            );
        }
        if let Some(label) = labels.iter().find(|l| **l != 0 && **l != 1) {
            anyhow::bail!("Labels must be 0 or 1, found {}", label);
        }

        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    /// Load dataset from CSV file
    ///
    /// Expected format: a header `name1,name2,...,label`, then float rows.
    /// Lines starting with `#` are skipped. Feature values are scaled to
    /// fixed-point; labels must be 0 or 1.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

        let mut columns: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();
        if columns.is_empty() || columns.iter().all(String::is_empty) {
            anyhow::bail!("Dataset is empty");
        }
        if columns.last().map(String::as_str) != Some(LABEL_COLUMN) {
            anyhow::bail!("Header must end with a `{}` column", LABEL_COLUMN);
        }
        columns.pop();
        let feature_count = columns.len();

        let mut features = Vec::new();
        let mut labels = Vec::new();

        for record in reader.records() {
            let record = record.context("Malformed CSV row")?;
            let line_no = record.position().map_or(0, |p| p.line());

            let mut row = Vec::with_capacity(feature_count);
            for (name, field) in columns.iter().zip(record.iter()) {
                let value = field.parse::<f64>().with_context(|| {
                    format!("Line {}, column {}: invalid number {:?}", line_no, name, field)
                })?;
                if !value.is_finite() {
                    anyhow::bail!("Line {}, column {}: non-finite value", line_no, name);
                }
                row.push(to_fixed(value, SCALE));
            }

            let label = match record.get(feature_count) {
                Some("0") | Some("0.0") => 0,
                Some("1") | Some("1.0") => 1,
                other => anyhow::bail!(
                    "Line {}: label must be 0 or 1, got {:?}",
                    line_no,
                    other.unwrap_or_default()
                ),
            };

            features.push(row);
            labels.push(label);
        }

        if features.is_empty() {
            anyhow::bail!("Dataset has a header but no rows");
        }

        Self::new(columns, features, labels)
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Fraction of pathogenic labels
    pub fn positive_rate(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.labels.iter().sum::<i64>() as f64 / self.labels.len() as f64
    }

    /// Get feature statistics for validation
    pub fn feature_stats(&self) -> Vec<FeatureStats> {
        let mut stats: Vec<FeatureStats> = self
            .feature_names
            .iter()
            .map(|name| FeatureStats {
                name: name.clone(),
                min: i64::MAX,
                max: i64::MIN,
            })
            .collect();

        for row in &self.features {
            for (stat, &val) in stats.iter_mut().zip(row) {
                stat.min = stat.min.min(val);
                stat.max = stat.max.max(val);
            }
        }

        stats
    }
}
