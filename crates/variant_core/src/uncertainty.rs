//! Confidence intervals around the point probability

use serde::{Serialize, Serializer};

/// Closed interval within [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, p: f64) -> bool {
        self.lower <= p && p <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Serialized as a two-element `[lower, upper]` array
impl Serialize for ConfidenceInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.lower, self.upper].serialize(serializer)
    }
}

/// Interval policy. Implementations must return a clamped interval that
/// contains the (clamped) point estimate.
pub trait UncertaintyEstimator: Send + Sync {
    fn estimate(&self, probability: f64) -> ConfidenceInterval;
}

/// Symmetric fixed-width placeholder: `p ± half_width`, clamped to [0, 1].
///
/// Not a statistical estimate. A bootstrap or quantile estimator can replace
/// it behind [`UncertaintyEstimator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedWidthInterval {
    half_width: f64,
}

impl FixedWidthInterval {
    pub const DEFAULT_HALF_WIDTH: f64 = 0.1;

    /// `half_width` is clamped to [0, 0.5]
    pub fn new(half_width: f64) -> Self {
        let half_width = if half_width.is_finite() {
            half_width.clamp(0.0, 0.5)
        } else {
            Self::DEFAULT_HALF_WIDTH
        };
        Self { half_width }
    }

    pub fn half_width(&self) -> f64 {
        self.half_width
    }
}

impl Default for FixedWidthInterval {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HALF_WIDTH)
    }
}

impl UncertaintyEstimator for FixedWidthInterval {
    fn estimate(&self, probability: f64) -> ConfidenceInterval {
        let p = if probability.is_nan() {
            0.5
        } else {
            probability.clamp(0.0, 1.0)
        };

        ConfidenceInterval {
            lower: (p - self.half_width).max(0.0),
            upper: (p + self.half_width).min(1.0),
        }
    }
}
