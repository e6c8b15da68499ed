//! End-to-end prediction over a loaded model
//!
//! derive → classify → interval → explain → assemble. The pipeline is
//! immutable after construction and shared freely across threads.

use crate::classifier::Classifier;
use crate::errors::Result;
use crate::explain::{Explainer, DEFAULT_TOP_K};
use crate::features::{derive_features, FeatureVector};
use crate::gbdt::Model;
use crate::response::{assemble, PredictionResponse, PredictionResult};
use crate::uncertainty::{FixedWidthInterval, UncertaintyEstimator};
use crate::variant::VariantIdentifier;
use std::sync::Arc;

pub struct Pipeline {
    classifier: Classifier,
    explainer: Explainer,
    estimator: Box<dyn UncertaintyEstimator>,
}

impl Pipeline {
    /// Pipeline with the default interval and top-k
    pub fn new(model: Model) -> Result<Self> {
        Self::with_options(
            Arc::new(model),
            DEFAULT_TOP_K,
            Box::new(FixedWidthInterval::default()),
        )
    }

    pub fn with_options(
        model: Arc<Model>,
        top_k: usize,
        estimator: Box<dyn UncertaintyEstimator>,
    ) -> Result<Self> {
        let classifier = Classifier::from_shared(model.clone())?;
        let explainer = Explainer::for_model(model, top_k);

        Ok(Self {
            classifier,
            explainer,
            estimator,
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn explainer(&self) -> &Explainer {
        &self.explainer
    }

    /// Score a variant from its identifier
    pub fn predict(&self, variant: &VariantIdentifier) -> Result<PredictionResponse> {
        let features = derive_features(&variant.gene, &variant.protein_change);
        self.predict_features(variant, &features)
    }

    /// Score externally supplied features
    pub fn predict_features(
        &self,
        variant: &VariantIdentifier,
        features: &FeatureVector,
    ) -> Result<PredictionResponse> {
        let verdict = self.classifier.predict(features)?;
        let interval = self.estimator.estimate(verdict.probability);
        let explanation = self.explainer.explain(features)?;

        Ok(assemble(
            variant,
            features,
            PredictionResult::new(verdict, interval),
            explanation,
        ))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("classifier", &self.classifier)
            .field("explainer", &self.explainer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PathogenicityError;
    use crate::features::{FEATURE_NAMES, GRANTHAM_DIST};
    use crate::gbdt::{Node, Tree, SCALE};

    fn grantham_model() -> Model {
        let tree = Tree::new(
            vec![
                Node::internal(0, 2, 100 * SCALE, 1, 2).with_cover(20),
                Node::leaf(1, -SCALE).with_cover(10),
                Node::leaf(2, SCALE).with_cover(10),
            ],
            SCALE,
        );
        Model::new(FEATURE_NAMES.map(String::from).to_vec(), vec![tree], 0)
    }

    #[test]
    fn test_predict_is_consistent() {
        let pipeline = Pipeline::new(grantham_model()).unwrap();
        let variant = VariantIdentifier::new("BRCA1", "c.181T>G", "p.Cys61Gly");

        let response = pipeline.predict(&variant).unwrap();
        assert!(response.confidence_interval.contains(response.probability));
        assert_eq!(
            response.classification,
            crate::classifier::Classification::from_probability(response.probability)
        );
        assert_eq!(pipeline.predict(&variant).unwrap(), response);
    }

    #[test]
    fn test_grantham_drives_the_score() {
        let pipeline = Pipeline::new(grantham_model()).unwrap();
        let variant = VariantIdentifier::new("BRCA1", "c.181T>G", "p.Cys61Gly");
        let features = derive_features("BRCA1", "p.Cys61Gly").with_value(GRANTHAM_DIST, 180.0);

        let response = pipeline.predict_features(&variant, &features).unwrap();
        assert!(response.probability > 0.5);
        assert_eq!(response.explanation.features[0].feature, GRANTHAM_DIST);
        assert!(response.explanation.summary_text.contains("increased"));
    }

    #[test]
    fn test_schema_mismatch_is_fatal() {
        let pipeline = Pipeline::new(grantham_model()).unwrap();
        let variant = VariantIdentifier::new("BRCA1", "c.181T>G", "p.Cys61Gly");
        let features = FeatureVector::from_entries([(GRANTHAM_DIST, 10.0)]);

        assert!(matches!(
            pipeline.predict_features(&variant, &features),
            Err(PathogenicityError::FeatureSchemaMismatch { .. })
        ));
    }
}
