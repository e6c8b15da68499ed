//! Pathogenicity classifier over a loaded GBDT model

use crate::errors::{PathogenicityError, Result};
use crate::features::FeatureVector;
use crate::gbdt::{to_fixed, Model};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Probability at or above which a variant is called pathogenic
pub const PATHOGENIC_THRESHOLD: f64 = 0.5;

/// Binary verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Benign,
    Pathogenic,
}

impl Classification {
    /// `Pathogenic` iff `probability >= 0.5` (ties resolve to pathogenic)
    pub fn from_probability(probability: f64) -> Self {
        if probability >= PATHOGENIC_THRESHOLD {
            Classification::Pathogenic
        } else {
            Classification::Benign
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Benign => "Benign",
            Classification::Pathogenic => "Pathogenic",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point estimate from the classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub probability: f64,
    pub classification: Classification,
    /// Raw log-odds the probability was derived from
    pub margin: f64,
}

/// Reorder `features` into `expected` order and convert to fixed-point.
///
/// Fails unless the two name sets are identical.
pub fn align_features(
    expected: &[String],
    features: &FeatureVector,
    scale: i64,
) -> Result<Vec<i64>> {
    let found = features.names();
    let found_set: HashSet<&str> = found.iter().map(String::as_str).collect();
    let same_fields = found.len() == expected.len()
        && found_set.len() == found.len()
        && expected.iter().all(|name| found_set.contains(name.as_str()));

    if !same_fields {
        return Err(PathogenicityError::FeatureSchemaMismatch {
            expected: expected.to_vec(),
            found,
        });
    }

    expected
        .iter()
        .map(|name| {
            features
                .get(name)
                .map(|value| to_fixed(value, scale))
                .ok_or_else(|| PathogenicityError::FeatureSchemaMismatch {
                    expected: expected.to_vec(),
                    found: features.names(),
                })
        })
        .collect()
}

/// Immutable classifier; cheap to clone and share across threads
#[derive(Debug, Clone)]
pub struct Classifier {
    model: Arc<Model>,
}

impl Classifier {
    /// Wrap a model, rejecting one that fails structural validation
    pub fn new(model: Model) -> Result<Self> {
        Self::from_shared(Arc::new(model))
    }

    pub fn from_shared(model: Arc<Model>) -> Result<Self> {
        model.validate().map_err(|err| {
            PathogenicityError::ModelUnavailable(format!("model failed validation: {err}"))
        })?;
        Ok(Self { model })
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Training-time feature order
    pub fn feature_names(&self) -> &[String] {
        &self.model.feature_names
    }

    /// Align a feature vector to the model's column order
    pub fn align(&self, features: &FeatureVector) -> Result<Vec<i64>> {
        align_features(&self.model.feature_names, features, self.model.scale)
    }

    /// Probability of the pathogenic class and the resulting label
    pub fn predict(&self, features: &FeatureVector) -> Result<Verdict> {
        let aligned = self.align(features)?;
        let margin = self.model.margin(&aligned);
        let probability = crate::gbdt::sigmoid(margin);

        Ok(Verdict {
            probability,
            classification: Classification::from_probability(probability),
            margin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{derive_features, CONSERVATION_SCORE, FEATURE_NAMES};
    use crate::gbdt::{Node, Tree, SCALE};

    fn conservation_model() -> Model {
        // conservation_score > 0.5 pushes log-odds to +1, otherwise -1
        let tree = Tree::new(
            vec![
                Node::internal(0, 0, SCALE / 2, 1, 2),
                Node::leaf(1, -SCALE),
                Node::leaf(2, SCALE),
            ],
            SCALE,
        );
        Model::new(FEATURE_NAMES.map(String::from).to_vec(), vec![tree], 0)
    }

    #[test]
    fn test_threshold_is_closed() {
        assert_eq!(Classification::from_probability(0.5), Classification::Pathogenic);
        assert_eq!(Classification::from_probability(0.499_999), Classification::Benign);
        assert_eq!(Classification::from_probability(1.0), Classification::Pathogenic);
        assert_eq!(Classification::from_probability(0.0), Classification::Benign);
    }

    #[test]
    fn test_predict_uses_named_columns() {
        let classifier = Classifier::new(conservation_model()).unwrap();
        let high = derive_features("BRCA1", "p.Cys61Gly").with_value(CONSERVATION_SCORE, 0.9);
        let low = high.clone().with_value(CONSERVATION_SCORE, 0.1);

        let verdict = classifier.predict(&high).unwrap();
        assert!((verdict.margin - 1.0).abs() < 1e-12);
        assert_eq!(verdict.classification, Classification::Pathogenic);

        let verdict = classifier.predict(&low).unwrap();
        assert_eq!(verdict.classification, Classification::Benign);
    }

    #[test]
    fn test_reordered_input_scores_identically() {
        let classifier = Classifier::new(conservation_model()).unwrap();
        let features = derive_features("TP53", "p.Arg175His");
        let reversed = FeatureVector::from_entries(
            features.iter().collect::<Vec<_>>().into_iter().rev(),
        );

        assert_eq!(
            classifier.predict(&features).unwrap(),
            classifier.predict(&reversed).unwrap()
        );
    }

    #[test]
    fn test_schema_mismatch() {
        let classifier = Classifier::new(conservation_model()).unwrap();

        let missing = FeatureVector::from_entries([(CONSERVATION_SCORE, 0.4)]);
        assert!(matches!(
            classifier.predict(&missing),
            Err(PathogenicityError::FeatureSchemaMismatch { .. })
        ));

        let extra = derive_features("BRCA1", "p.Cys61Gly").with_value("phylop", 2.0);
        assert!(matches!(
            classifier.predict(&extra),
            Err(PathogenicityError::FeatureSchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_model_is_unavailable() {
        let mut model = conservation_model();
        model.scale = 0;
        assert!(matches!(
            Classifier::new(model),
            Err(PathogenicityError::ModelUnavailable(_))
        ));
    }
}
