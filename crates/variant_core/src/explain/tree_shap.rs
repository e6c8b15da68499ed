//! Exact path-dependent TreeSHAP over the fixed-point GBDT
//!
//! Node covers stand in for the background distribution. For each tree the
//! recursion tracks, per unique feature on the current path, the fraction of
//! "zero" (feature absent, follow covers) and "one" (feature present, follow
//! the instance) paths, and the permutation weights of the subsets.
//! Attributions are in log-odds and satisfy
//! `base_value + Σ φ = margin` up to fixed-point rounding.

use crate::errors::{PathogenicityError, Result};
use crate::gbdt::{Model, Tree};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// TreeSHAP engine bound to one model
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    /// Leaf-to-margin factor per tree: `weight / scale / post_scale`
    leaf_factors: Vec<f64>,
    base_value: f64,
    feature_count: usize,
}

impl TreeExplainer {
    /// Bind to a model. Fails when any node lacks cover statistics or a
    /// child claims more cover than its parent.
    pub fn bind(model: &Model) -> Result<Self> {
        model
            .validate()
            .map_err(|err| PathogenicityError::InvalidModel(err.to_string()))?;
        if model.trees.is_empty() {
            return Err(PathogenicityError::ExplainerDegraded(
                "model has no trees".to_string(),
            ));
        }

        for (i, tree) in model.trees.iter().enumerate() {
            if !tree.has_cover() {
                return Err(PathogenicityError::ExplainerDegraded(format!(
                    "tree {i} carries no cover statistics"
                )));
            }
            for node in tree.nodes.iter().filter(|n| !n.is_leaf()) {
                let children = tree.nodes[node.left as usize].cover
                    + tree.nodes[node.right as usize].cover;
                if children > node.cover {
                    return Err(PathogenicityError::ExplainerDegraded(format!(
                        "tree {i} node {} has inconsistent cover",
                        node.id
                    )));
                }
            }
        }

        let post_scale = model.post_scale as f64;
        let leaf_factors: Vec<f64> = model
            .trees
            .iter()
            .map(|tree| tree.weight as f64 / model.scale as f64 / post_scale)
            .collect();

        let expected: f64 = model
            .trees
            .iter()
            .zip(&leaf_factors)
            .map(|(tree, factor)| expected_value(tree, 0) * factor)
            .sum();

        Ok(Self {
            leaf_factors,
            base_value: model.bias as f64 / post_scale + expected,
            feature_count: model.num_features(),
        })
    }

    /// Expected model margin over the training distribution
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// Per-feature contributions for an aligned fixed-point vector, in the
    /// model's feature order
    pub fn shap_values(&self, model: &Model, aligned: &[i64]) -> Vec<f64> {
        let mut phi = vec![0.0; self.feature_count];

        for (tree, factor) in model.trees.iter().zip(&self.leaf_factors) {
            recurse(tree, 0, aligned, *factor, &mut phi, &[], 1.0, 1.0, None);
        }

        phi
    }
}

/// Cover-weighted mean leaf value below `idx`
fn expected_value(tree: &Tree, idx: usize) -> f64 {
    let node = &tree.nodes[idx];
    if node.is_leaf() {
        return node.leaf_value().unwrap_or(0) as f64;
    }

    let left = &tree.nodes[node.left as usize];
    let right = &tree.nodes[node.right as usize];
    let total = (left.cover + right.cover) as f64;
    if total <= 0.0 {
        return 0.0;
    }

    (left.cover as f64 * expected_value(tree, node.left as usize)
        + right.cover as f64 * expected_value(tree, node.right as usize))
        / total
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    idx: usize,
    x: &[i64],
    leaf_factor: f64,
    phi: &mut [f64],
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    let node = &tree.nodes[idx];
    if node.is_leaf() {
        let value = node.leaf_value().unwrap_or(0) as f64 * leaf_factor;
        for i in 1..path.len() {
            let el = path[i];
            if let Some(f) = el.feature {
                let w = unwound_path_sum(&path, i);
                phi[f] += w * (el.one_fraction - el.zero_fraction) * value;
            }
        }
        return;
    }

    let split = node.feature_idx as usize;
    let goes_left = x.get(split).map_or(true, |v| *v <= node.threshold);
    let (hot, cold) = if goes_left {
        (node.left as usize, node.right as usize)
    } else {
        (node.right as usize, node.left as usize)
    };

    let children = (tree.nodes[hot].cover + tree.nodes[cold].cover) as f64;
    let hot_zero = tree.nodes[hot].cover as f64 / children;
    let cold_zero = tree.nodes[cold].cover as f64 / children;

    // a feature seen higher up is unwound and re-entered with combined fractions
    let mut incoming_zero = 1.0;
    let mut incoming_one = 1.0;
    if let Some(pos) = path.iter().position(|el| el.feature == Some(split)) {
        incoming_zero = path[pos].zero_fraction;
        incoming_one = path[pos].one_fraction;
        unwind_path(&mut path, pos);
    }

    recurse(
        tree,
        hot,
        x,
        leaf_factor,
        phi,
        &path,
        hot_zero * incoming_zero,
        incoming_one,
        Some(split),
    );
    recurse(
        tree,
        cold,
        x,
        leaf_factor,
        phi,
        &path,
        cold_zero * incoming_zero,
        0.0,
        Some(split),
    );
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, pos: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[pos].one_fraction;
    let zero_fraction = path[pos].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero_fraction * (depth - i) as f64);
        }
    }

    // pweights stay in place; only the feature bookkeeping shifts down
    for i in pos..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], pos: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[pos].one_fraction;
    let zero_fraction = path[pos].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * ((depth - i) as f64 / denom);
        } else if zero_fraction != 0.0 {
            total += (path[i].pweight / zero_fraction) / ((depth - i) as f64 / denom);
        }
    }

    total
}
