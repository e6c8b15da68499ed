//! Deterministic split tie-breaking
//!
//! Equal-gain candidates must resolve the same way on every platform and run
//! so identical inputs produce byte-identical models.

/// Deterministic tie-breaker for split selection
/// Equal-gain candidates resolve to the smallest (feature_idx, threshold, node_id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: i64,
    pub node_id: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: i64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            node_id,
        }
    }

    /// Whether a candidate with `gain` and this key replaces the incumbent
    pub fn beats(&self, gain: i128, incumbent_gain: i128, incumbent: &SplitTieBreaker) -> bool {
        gain > incumbent_gain || (gain == incumbent_gain && self < incumbent)
    }
}
