//! End-to-end scoring through the public pipeline API

use snpath_core::explain::AttributionSource;
use snpath_core::features::{DOMAIN_ANNOTATION, STRUCTURAL_PROXY};
use snpath_core::gbdt::{Model, Node, Tree, SCALE};
use snpath_core::response::{NO_DOMAIN_WARNING, STRUCTURAL_IMPACT_NOTE};
use snpath_core::{derive_features, Classification, Pipeline, VariantIdentifier, FEATURE_NAMES};
use std::sync::Arc;
use std::thread;

fn model_with_cover(cover: bool) -> Model {
    let c = |n: i64| if cover { n } else { 0 };
    let tree = Tree::new(
        vec![
            Node::internal(0, 0, 500_000, 1, 2).with_cover(c(100)),
            Node::internal(1, 5, 800_000, 3, 4).with_cover(c(50)),
            Node::leaf(2, 1_200_000).with_cover(c(50)),
            Node::leaf(3, -1_000_000).with_cover(c(40)),
            Node::leaf(4, 500_000).with_cover(c(10)),
        ],
        SCALE,
    );
    Model::new(FEATURE_NAMES.map(String::from).to_vec(), vec![tree], 0)
}

#[test]
fn brca1_example_is_well_formed() {
    let pipeline = Pipeline::new(model_with_cover(true)).unwrap();
    let variant = VariantIdentifier::new("BRCA1", "c.181T>G", "p.Cys61Gly");
    let features = derive_features("BRCA1", "p.Cys61Gly");

    let response = pipeline.predict(&variant).unwrap();

    assert_eq!(response.variant_id, "BRCA1:c.181T>G");
    assert_eq!(
        response.classification,
        Classification::from_probability(response.probability)
    );
    assert!(response.confidence_interval.contains(response.probability));
    assert_eq!(response.explanation.source, AttributionSource::TreeShap);
    assert_eq!(response.explanation.features.len(), 5);

    let proxy = features.get(STRUCTURAL_PROXY).unwrap();
    assert_eq!(
        response.structural_impact.as_deref(),
        (proxy > 0.8).then_some(STRUCTURAL_IMPACT_NOTE)
    );
    let in_domain = features.get(DOMAIN_ANNOTATION) == Some(1.0);
    assert_eq!(response.warning_flags.is_empty(), in_domain);
    if !in_domain {
        assert_eq!(response.warning_flags, vec![NO_DOMAIN_WARNING.to_string()]);
    }

    let json = serde_json::to_value(&response).unwrap();
    for key in [
        "variant_id",
        "probability",
        "classification",
        "confidence_interval",
        "explanation",
        "structural_impact",
        "warning_flags",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
}

#[test]
fn repeated_requests_are_identical() {
    let pipeline = Pipeline::new(model_with_cover(true)).unwrap();
    let variant = VariantIdentifier::new("TP53", "c.524G>A", "p.Arg175His");

    let first = serde_json::to_string(&pipeline.predict(&variant).unwrap()).unwrap();
    for _ in 0..10 {
        let again = serde_json::to_string(&pipeline.predict(&variant).unwrap()).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn concurrent_requests_match_serial() {
    let pipeline = Arc::new(Pipeline::new(model_with_cover(true)).unwrap());
    let variants: Vec<VariantIdentifier> = (1..=16)
        .map(|i| VariantIdentifier::new("CFTR", format!("c.{i}A>G"), format!("p.Gly{i}Asp")))
        .collect();
    let serial: Vec<_> = variants
        .iter()
        .map(|v| pipeline.predict(v).unwrap())
        .collect();

    let handles: Vec<_> = variants
        .into_iter()
        .map(|variant| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || pipeline.predict(&variant).unwrap())
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(serial) {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn legacy_model_without_cover_is_labeled_synthetic() {
    let pipeline = Pipeline::new(model_with_cover(false)).unwrap();
    assert!(pipeline.explainer().is_degraded());

    let variant = VariantIdentifier::new("BRCA1", "c.181T>G", "p.Cys61Gly");
    let response = pipeline.predict(&variant).unwrap();

    assert_eq!(response.explanation.source, AttributionSource::Synthetic);
    assert_eq!(response.explanation.base_value, 0.5);
    assert_eq!(pipeline.predict(&variant).unwrap(), response);
}
