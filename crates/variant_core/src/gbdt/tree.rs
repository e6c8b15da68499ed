//! Decision tree structures for GBDT inference
//!
//! Nodes hold fixed-point thresholds and leaf values at the model scale.
//! Every node also records its `cover`, the number of training rows that
//! reached it, which the TreeSHAP explainer uses as its reference
//! distribution.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the aligned feature vector
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` contains the raw (unweighted) prediction value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    #[serde(rename = "feature_idx", alias = "feature")]
    pub feature_idx: i32,

    /// Threshold value for split (fixed-point integer)
    pub threshold: i64,

    /// Leaf value (Some for leaf nodes, None for internal nodes)
    pub leaf: Option<i64>,

    /// Training rows that reached this node. Zero when unknown.
    #[serde(default)]
    pub cover: i64,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
            cover: 0,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: i64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(value),
            cover: 0,
        }
    }

    /// Attach a training cover count
    pub fn with_cover(mut self, cover: i64) -> Self {
        self.cover = cover;
        self
    }

    /// Check if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }

    /// Get the leaf value if this is a leaf node
    pub fn leaf_value(&self) -> Option<i64> {
        self.leaf
    }
}

/// A single decision tree with integer-only nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,

    /// Tree weight for ensemble aggregation (fixed-point integer).
    /// Boosted trees carry the learning rate here.
    pub weight: i64,
}

impl Tree {
    /// Create a new tree with the given nodes and weight
    pub fn new(nodes: Vec<Node>, weight: i64) -> Self {
        Self { nodes, weight }
    }

    /// Evaluate this tree on an aligned fixed-point feature vector.
    ///
    /// Goes left when `feature <= threshold`. Malformed structure evaluates to 0.
    pub fn evaluate(&self, features: &[i64]) -> i64 {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut idx = 0usize;

        loop {
            if idx >= self.nodes.len() {
                return 0;
            }

            let node = &self.nodes[idx];

            if node.is_leaf() {
                return node.leaf_value().unwrap_or(0);
            }

            let feature_idx = node.feature_idx as usize;
            if feature_idx >= features.len() {
                return 0;
            }

            let next = if features[feature_idx] <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next < 0 || next as usize >= self.nodes.len() {
                return 0;
            }
            idx = next as usize;
        }
    }

    /// Get the root node
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Highest feature index referenced by any split, if the tree splits at all
    pub fn max_feature_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter(|n| !n.is_leaf())
            .map(|n| n.feature_idx as usize)
            .max()
    }

    /// True when every node carries a positive cover count
    pub fn has_cover(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.iter().all(|n| n.cover > 0)
    }

    /// Validate tree structure
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if !node.is_leaf() {
                if node.left < 0 || node.left as usize >= self.nodes.len() {
                    return Err(format!("Node {} has invalid left child: {}", i, node.left));
                }

                if node.right < 0 || node.right as usize >= self.nodes.len() {
                    return Err(format!(
                        "Node {} has invalid right child: {}",
                        i, node.right
                    ));
                }

                // children must come after their parent so traversal terminates
                if node.left as usize <= i || node.right as usize <= i {
                    return Err(format!("Node {i} points backwards in the node list"));
                }

                if node.feature_idx < 0 {
                    return Err(format!(
                        "Internal node {} has invalid feature index: {}",
                        i, node.feature_idx
                    ));
                }
            } else if node.leaf.is_none() {
                return Err(format!("Leaf node {i} has no leaf value"));
            }

            if node.cover < 0 {
                return Err(format!("Node {i} has negative cover: {}", node.cover));
            }
        }

        Ok(())
    }
}
