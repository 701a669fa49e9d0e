//! Supervised models used while fitting binning strategies
//!
//! - Depth-limited entropy decision tree classifier

pub mod decision_tree;

pub use decision_tree::{DecisionTree, TreeNode};
