//! Variant feature derivation
//!
//! Stands in for an annotation service. Features are drawn from fixed
//! distributions by a generator seeded from the variant itself, so the same
//! `(gene, protein_change)` always yields a bit-identical vector.
//!
//! Seeding contract:
//! - seed = first 8 bytes (little-endian) of `blake3(gene ‖ protein_change)`
//! - generator = `ChaCha8Rng::seed_from_u64(seed)`
//! - fields are drawn in schema order:
//!   0. `conservation_score`: Uniform[0, 1)
//!   1. `blosum62`: discrete uniform over [-4, 10]
//!   2. `grantham_dist`: discrete uniform over [5, 214]
//!   3. `gnomad_maf`: Beta(0.1, 10.0), clamped into (0, 1)
//!   4. `domain_annotation`: Bernoulli(0.5) as 0.0 / 1.0
//!   5. `structural_proxy`: Uniform[0, 1)

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Beta, Distribution};
use serde::{Serialize, Serializer};

pub const CONSERVATION_SCORE: &str = "conservation_score";
pub const BLOSUM62: &str = "blosum62";
pub const GRANTHAM_DIST: &str = "grantham_dist";
pub const GNOMAD_MAF: &str = "gnomad_maf";
pub const DOMAIN_ANNOTATION: &str = "domain_annotation";
pub const STRUCTURAL_PROXY: &str = "structural_proxy";

/// Schema order emitted by the deriver
pub const FEATURE_NAMES: [&str; 6] = [
    CONSERVATION_SCORE,
    BLOSUM62,
    GRANTHAM_DIST,
    GNOMAD_MAF,
    DOMAIN_ANNOTATION,
    STRUCTURAL_PROXY,
];

const BLOSUM62_RANGE: (i64, i64) = (-4, 10);
const GRANTHAM_RANGE: (i64, i64) = (5, 214);
const MAF_ALPHA: f64 = 0.1;
const MAF_BETA: f64 = 10.0;
/// Keeps `gnomad_maf` strictly inside (0, 1) when the beta draw underflows
const MAF_FLOOR: f64 = 1e-12;

/// Ordered named feature values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    /// Build a vector from arbitrary entries, keeping their order
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| *v)
    }

    /// Replace the value of an existing field; unknown names are appended
    pub fn with_value(mut self, name: &str, value: f64) -> Self {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

/// Stable seed for a variant's feature draw
pub fn derivation_seed(gene: &str, protein_change: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(gene.as_bytes());
    hasher.update(protein_change.as_bytes());
    let digest = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(seed)
}

/// Derive the feature vector for a variant. Pure and infallible.
pub fn derive_features(gene: &str, protein_change: &str) -> FeatureVector {
    let mut rng = ChaCha8Rng::seed_from_u64(derivation_seed(gene, protein_change));
    sample_features(&mut rng)
}

/// Draw one vector from the schema distributions
pub fn sample_features<R: Rng>(rng: &mut R) -> FeatureVector {
    let conservation_score: f64 = rng.gen();
    let blosum62 = rng.gen_range(BLOSUM62_RANGE.0..=BLOSUM62_RANGE.1) as f64;
    let grantham_dist = rng.gen_range(GRANTHAM_RANGE.0..=GRANTHAM_RANGE.1) as f64;
    // constant parameters are always accepted by Beta::new
    let gnomad_maf = Beta::new(MAF_ALPHA, MAF_BETA)
        .map(|beta| beta.sample(rng))
        .unwrap_or(MAF_FLOOR)
        .clamp(MAF_FLOOR, 1.0 - MAF_FLOOR);
    let domain_annotation = if rng.gen_bool(0.5) { 1.0 } else { 0.0 };
    let structural_proxy: f64 = rng.gen();

    FeatureVector::from_entries([
        (CONSERVATION_SCORE, conservation_score),
        (BLOSUM62, blosum62),
        (GRANTHAM_DIST, grantham_dist),
        (GNOMAD_MAF, gnomad_maf),
        (DOMAIN_ANNOTATION, domain_annotation),
        (STRUCTURAL_PROXY, structural_proxy),
    ])
}

/// Whether `value` lies in the declared domain of the named schema field.
/// Unknown names are never in domain.
pub fn domain_contains(name: &str, value: f64) -> bool {
    let integral = value.fract() == 0.0;
    match name {
        CONSERVATION_SCORE | STRUCTURAL_PROXY => (0.0..=1.0).contains(&value),
        BLOSUM62 => {
            integral && (BLOSUM62_RANGE.0 as f64..=BLOSUM62_RANGE.1 as f64).contains(&value)
        }
        GRANTHAM_DIST => {
            integral && (GRANTHAM_RANGE.0 as f64..=GRANTHAM_RANGE.1 as f64).contains(&value)
        }
        GNOMAD_MAF => value > 0.0 && value < 1.0,
        DOMAIN_ANNOTATION => value == 0.0 || value == 1.0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let a = derive_features("BRCA1", "p.Cys61Gly");
        let b = derive_features("BRCA1", "p.Cys61Gly");
        assert_eq!(a, b);
        for ((_, x), (_, y)) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_derive_emits_schema_in_order() {
        let features = derive_features("TP53", "p.Arg175His");
        assert_eq!(features.names(), FEATURE_NAMES.map(String::from).to_vec());
        for (name, value) in features.iter() {
            assert!(domain_contains(name, value), "{name}={value} out of domain");
        }
    }

    #[test]
    fn test_seed_depends_only_on_concatenation() {
        assert_eq!(derivation_seed("AB", "C"), derivation_seed("A", "BC"));
        assert_ne!(derivation_seed("BRCA1", "p.Cys61Gly"), derivation_seed("BRCA2", "p.Cys61Gly"));
    }

    #[test]
    fn test_different_variants_differ() {
        let a = derive_features("BRCA1", "p.Cys61Gly");
        let b = derive_features("BRCA1", "p.Cys61Arg");
        assert_ne!(a, b);
    }

    #[test]
    fn test_with_value_replaces_in_place() {
        let features = derive_features("BRCA1", "p.Cys61Gly").with_value(DOMAIN_ANNOTATION, 0.0);
        assert_eq!(features.get(DOMAIN_ANNOTATION), Some(0.0));
        assert_eq!(features.len(), 6);
        assert_eq!(features.names()[4], DOMAIN_ANNOTATION);
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let features = FeatureVector::from_entries([("b", 1.0), ("a", 2.0)]);
        let json = serde_json::to_string(&features).unwrap();
        assert_eq!(json, r#"{"b":1.0,"a":2.0}"#);
    }

    #[test]
    fn test_domain_bounds() {
        assert!(domain_contains(BLOSUM62, -4.0));
        assert!(!domain_contains(BLOSUM62, 11.0));
        assert!(!domain_contains(GRANTHAM_DIST, 5.5));
        assert!(!domain_contains(GNOMAD_MAF, 0.0));
        assert!(!domain_contains(DOMAIN_ANNOTATION, 0.5));
        assert!(!domain_contains("unknown", 0.0));
    }
}
