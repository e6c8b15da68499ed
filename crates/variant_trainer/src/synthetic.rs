//! Synthetic labeled dataset for the fallback model
//!
//! Rows are drawn from the same distributions as the feature deriver. Each
//! row is labeled by a Bernoulli draw on a hand-set logistic score, so the
//! fallback model learns plausible directions: conserved, radical, rare,
//! in-domain and buried substitutions lean pathogenic.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use snpath_core::features::{
    sample_features, FeatureVector, BLOSUM62, CONSERVATION_SCORE, DOMAIN_ANNOTATION,
    FEATURE_NAMES, GNOMAD_MAF, GRANTHAM_DIST, STRUCTURAL_PROXY,
};
use snpath_core::gbdt::{sigmoid, to_fixed, SCALE};

use crate::dataset::Dataset;
use crate::errors::TrainerError;

/// Log-odds of pathogenicity under the labeling rule
pub fn labeling_score(features: &FeatureVector) -> f64 {
    let get = |name| features.get(name).unwrap_or(0.0);

    3.0 * (get(CONSERVATION_SCORE) - 0.5) + 0.015 * (get(GRANTHAM_DIST) - 110.0)
        - 0.2 * (get(BLOSUM62) - 3.0)
        - 40.0 * get(GNOMAD_MAF)
        + 0.8 * (get(DOMAIN_ANNOTATION) - 0.5)
        + 1.5 * (get(STRUCTURAL_PROXY) - 0.5)
}

/// Draw `samples` labeled rows with a fixed seed
pub fn generate(samples: usize, seed: u64) -> Result<Dataset, TrainerError> {
    if samples == 0 {
        return Err(TrainerError::Dataset(
            "synthetic dataset needs at least one sample".to_string(),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(samples);
    let mut labels = Vec::with_capacity(samples);

    for _ in 0..samples {
        let row = sample_features(&mut rng);
        let pathogenic = rng.gen_bool(sigmoid(labeling_score(&row)).clamp(0.0, 1.0));

        features.push(row.iter().map(|(_, v)| to_fixed(v, SCALE)).collect());
        labels.push(i64::from(pathogenic));
    }

    Dataset::new(FEATURE_NAMES.map(String::from).to_vec(), features, labels)
        .map_err(|err| TrainerError::Dataset(err.to_string()))
}
