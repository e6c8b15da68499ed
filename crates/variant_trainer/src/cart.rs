//! CART (Classification and Regression Tree) builder
//!
//! Deterministic exact-greedy tree construction over fixed-point gradient
//! and hessian statistics. Candidate thresholds are bucket boundaries of
//! width `quant_step`; every node records the number of rows reaching it
//! as its `cover`.

use snpath_core::gbdt::{Node, Tree};

use crate::deterministic::SplitTieBreaker;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// L2 regularization on leaf values, fixed-point
    pub lambda: i64,
    pub quant_step: i64,
    /// Fixed-point scale of gradients, hessians and leaves
    pub scale: i64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_leaf: 4,
            lambda: 1_000_000,
            quant_step: 1000,
            scale: 1_000_000,
        }
    }
}

/// Per-row first and second order statistics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GradientPair {
    pub gradient: i64,
    pub hessian: i64,
}

#[derive(Clone, Copy, Debug, Default)]
struct Totals {
    gradient: i128,
    hessian: i128,
    count: usize,
}

impl Totals {
    fn add(&mut self, pair: GradientPair) {
        self.gradient += pair.gradient as i128;
        self.hessian += pair.hessian as i128;
        self.count += 1;
    }

    fn minus(self, other: Totals) -> Totals {
        Totals {
            gradient: self.gradient - other.gradient,
            hessian: self.hessian - other.hessian,
            count: self.count - other.count,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    gain: i128,
    tie_breaker: SplitTieBreaker,
}

/// Build a regression tree on gradient statistics
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<i64>],
    stats: &'a [GradientPair],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    /// `features` and `stats` must have one entry per row
    pub fn new(features: &'a [Vec<i64>], stats: &'a [GradientPair], config: TreeConfig) -> Self {
        let feature_count = features.first().map_or(0, Vec::len);

        Self {
            config,
            features,
            stats,
            feature_count,
        }
    }

    /// Build tree; the caller sets the ensemble weight
    pub fn build(&self, weight: i64) -> Tree {
        let mut nodes = Vec::new();
        let rows = self.features.len().min(self.stats.len());
        let indices: Vec<usize> = (0..rows).collect();

        self.build_node(&indices, 0, &mut nodes, 0);

        Tree::new(nodes, weight)
    }

    /// Recursively build tree nodes; children are pushed after their parent
    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        node_id: usize,
    ) -> i32 {
        let current_idx = nodes.len() as i32;
        let totals = self.totals(indices);
        let cover = indices.len() as i64;

        let split = if depth >= self.config.max_depth
            || indices.len() < 2 * self.config.min_samples_leaf.max(1)
        {
            None
        } else {
            self.find_best_split(indices, totals, node_id)
        };

        let Some(split) = split else {
            nodes.push(Node::leaf(current_idx, self.leaf_value(totals)).with_cover(cover));
            return current_idx;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.features[i][split.feature_idx] <= split.threshold);

        // Reserve space for current node
        nodes.push(
            Node::internal(current_idx, split.feature_idx as i32, split.threshold, -1, -1)
                .with_cover(cover),
        );

        let left = self.build_node(&left_indices, depth + 1, nodes, node_id * 2 + 1);
        let right = self.build_node(&right_indices, depth + 1, nodes, node_id * 2 + 2);

        nodes[current_idx as usize].left = left;
        nodes[current_idx as usize].right = right;

        current_idx
    }

    /// Exact-greedy search: one sorted sweep per feature over bucket boundaries
    fn find_best_split(
        &self,
        indices: &[usize],
        totals: Totals,
        node_id: usize,
    ) -> Option<SplitCandidate> {
        let min_leaf = self.config.min_samples_leaf.max(1);
        let parent_score = self.score(totals);
        let step = self.config.quant_step.max(1);
        let mut best: Option<SplitCandidate> = None;

        for feature_idx in 0..self.feature_count {
            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by_key(|&i| (self.features[i][feature_idx], i));

            let mut left = Totals::default();
            for (pos, &row) in sorted.iter().enumerate() {
                left.add(self.stats[row]);

                let Some(&next) = sorted.get(pos + 1) else {
                    break;
                };
                let bucket = self.features[row][feature_idx].div_euclid(step);
                if self.features[next][feature_idx].div_euclid(step) == bucket {
                    continue;
                }

                let right = totals.minus(left);
                if left.count < min_leaf || right.count < min_leaf {
                    continue;
                }

                let gain = self.score(left) + self.score(right) - parent_score;
                if gain <= 0 {
                    continue;
                }

                // largest value still inside the bucket
                let threshold = bucket.saturating_mul(step).saturating_add(step - 1);
                let tie_breaker = SplitTieBreaker::new(feature_idx, threshold, node_id);
                let replace = match &best {
                    None => true,
                    Some(current) => tie_breaker.beats(gain, current.gain, &current.tie_breaker),
                };
                if replace {
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        gain,
                        tie_breaker,
                    });
                }
            }
        }

        best
    }

    /// G² / (H + λ), at the gradient scale
    fn score(&self, totals: Totals) -> i128 {
        let denom = totals.hessian + self.config.lambda as i128;
        if denom <= 0 {
            return 0;
        }
        totals.gradient * totals.gradient / denom
    }

    fn totals(&self, indices: &[usize]) -> Totals {
        let mut totals = Totals::default();
        for &idx in indices {
            totals.add(self.stats[idx]);
        }
        totals
    }

    /// Newton step −G / (H + λ), fixed-point
    fn leaf_value(&self, totals: Totals) -> i64 {
        let denom = totals.hessian + self.config.lambda as i128;
        if denom <= 0 {
            return 0;
        }

        let value = -(totals.gradient * self.config.scale as i128) / denom;
        value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALE: i64 = 1_000_000;

    fn pairs(gradients: &[i64]) -> Vec<GradientPair> {
        gradients
            .iter()
            .map(|&gradient| GradientPair {
                gradient,
                hessian: SCALE / 4,
            })
            .collect()
    }

    #[test]
    fn test_separable_split() {
        let features = vec![
            vec![100_000, 900_000],
            vec![200_000, 100_000],
            vec![700_000, 800_000],
            vec![800_000, 200_000],
        ];
        // rows 2 and 3 are positives (negative gradient)
        let stats = pairs(&[SCALE / 2, SCALE / 2, -SCALE / 2, -SCALE / 2]);

        let config = TreeConfig {
            max_depth: 1,
            min_samples_leaf: 1,
            ..TreeConfig::default()
        };

        let tree = CartBuilder::new(&features, &stats, config).build(SCALE);
        tree.validate().unwrap();

        assert_eq!(tree.nodes.len(), 3);
        let root = &tree.nodes[0];
        assert_eq!(root.feature_idx, 0);
        assert!(root.threshold >= 200_000 && root.threshold < 700_000);
        assert_eq!(root.cover, 4);
        assert_eq!(tree.nodes[1].cover + tree.nodes[2].cover, 4);

        assert!(tree.evaluate(&[100_000, 0]) < 0);
        assert!(tree.evaluate(&[800_000, 0]) > 0);
    }

    #[test]
    fn test_leaf_value_is_newton_step() {
        let features = vec![vec![0], vec![0]];
        let stats = pairs(&[SCALE / 2, SCALE / 2]);

        let tree = CartBuilder::new(&features, &stats, TreeConfig::default()).build(SCALE);

        // -G / (H + λ) = -1.0 / (0.5 + 1.0)
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(-666_666));
        assert_eq!(tree.nodes[0].cover, 2);
    }

    #[test]
    fn test_respects_min_samples_leaf() {
        let features: Vec<Vec<i64>> = (0..10).map(|i| vec![i * 100_000]).collect();
        let mut gradients = vec![SCALE / 2; 10];
        gradients[9] = -SCALE / 2;
        let stats = pairs(&gradients);

        let config = TreeConfig {
            max_depth: 4,
            min_samples_leaf: 3,
            ..TreeConfig::default()
        };
        let tree = CartBuilder::new(&features, &stats, config).build(SCALE);
        tree.validate().unwrap();

        for node in tree.nodes.iter().filter(|n| n.is_leaf()) {
            assert!(node.cover >= 3, "leaf {} has cover {}", node.id, node.cover);
        }
    }

    #[test]
    fn test_equal_gains_pick_lowest_feature() {
        // both features separate identically
        let features = vec![vec![0, 0], vec![0, 0], vec![SCALE, SCALE], vec![SCALE, SCALE]];
        let stats = pairs(&[SCALE / 2, SCALE / 2, -SCALE / 2, -SCALE / 2]);
        let config = TreeConfig {
            max_depth: 1,
            min_samples_leaf: 1,
            ..TreeConfig::default()
        };

        let tree = CartBuilder::new(&features, &stats, config).build(SCALE);
        assert_eq!(tree.nodes[0].feature_idx, 0);
        assert_eq!(tree.nodes[0].threshold, 999);
    }
}
