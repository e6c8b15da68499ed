//! Variant identifiers

use serde::{Deserialize, Serialize};

/// A missense variant: gene symbol plus coding-DNA and protein-level notation.
///
/// Notation is not validated; malformed HGVS strings are still scored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantIdentifier {
    pub gene: String,
    pub cdna_change: String,
    pub protein_change: String,
}

impl VariantIdentifier {
    pub fn new(
        gene: impl Into<String>,
        cdna_change: impl Into<String>,
        protein_change: impl Into<String>,
    ) -> Self {
        Self {
            gene: gene.into(),
            cdna_change: cdna_change.into(),
            protein_change: protein_change.into(),
        }
    }

    /// Response label, `gene:cdna_change`
    pub fn label(&self) -> String {
        format!("{}:{}", self.gene, self.cdna_change)
    }
}
