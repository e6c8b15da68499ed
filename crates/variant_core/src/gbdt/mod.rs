//! Deterministic GBDT (Gradient Boosted Decision Tree) inference
//!
//! - **Fixed-point model format**: thresholds, leaves and bias are integers at `scale` (1e6)
//! - **Logistic output**: the ensemble score is the positive-class log-odds
//! - **Canonical serialization**: sorted JSON keys for reproducible hashing
//! - **Blake3 hashing**: artifact verification via a sidecar hash
//!
//! # Model Format
//!
//! ```json
//! {
//!   "bias": -120000,
//!   "feature_names": ["conservation_score", "blosum62"],
//!   "post_scale": 1000000,
//!   "scale": 1000000,
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"cover":100,"feature_idx":0,"id":0,"leaf":null,"left":1,"right":2,"threshold":512000},
//!         {"cover":41,"feature_idx":-1,"id":1,"leaf":-234000,"left":-1,"right":-1,"threshold":0},
//!         {"cover":59,"feature_idx":-1,"id":2,"leaf":456000,"left":-1,"right":-1,"threshold":0}
//!       ],
//!       "weight": 300000
//!     }
//!   ],
//!   "version": 1
//! }
//! ```
//!
//! # Usage
//!
//! ```rust
//! use snpath_core::gbdt::{Model, Node, Tree, SCALE};
//!
//! let tree = Tree::new(
//!     vec![
//!         Node::internal(0, 0, SCALE / 2, 1, 2),
//!         Node::leaf(1, -SCALE),
//!         Node::leaf(2, SCALE),
//!     ],
//!     SCALE,
//! );
//! let model = Model::new(vec!["conservation_score".into()], vec![tree], 0);
//!
//! let p = model.probability(&[SCALE]);
//! assert!(p > 0.5);
//! ```

pub mod model;
pub mod tree;

pub use model::{logit, sigmoid, Model, ModelError, FORMAT_VERSION, SCALE};
pub use tree::{Node, Tree};

/// Convert a float feature value to the model's fixed-point representation
pub fn to_fixed(value: f64, scale: i64) -> i64 {
    (value * scale as f64).round() as i64
}
