//! Depth-limited entropy decision tree classifier
//!
//! Used by the entropy binning strategy: a tree fitted on a single feature
//! exposes its split thresholds, which become supervised bin boundaries.

use crate::error::{DiscretizerError, Result};
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Decision tree node
#[derive(Debug, Clone)]
pub enum TreeNode {
    /// Leaf node
    Leaf,
    /// Internal node; samples with `x <= threshold` go left
    Split {
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Decision tree classifier splitting on Shannon entropy
#[derive(Debug, Clone)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Distinct class labels, ascending
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Fit the tree to training data. Every distinct label value is its own
    /// class.
    pub fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(DiscretizerError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        if n_samples < self.min_samples_split {
            return Err(DiscretizerError::InvalidInput(format!(
                "Need at least {} samples, got {}",
                self.min_samples_split, n_samples
            )));
        }

        if y.iter().any(|v| !v.is_finite()) {
            return Err(DiscretizerError::InvalidInput(
                "Class labels must be finite".to_string(),
            ));
        }

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.total_cmp(b));
        classes.dedup_by(|a, b| a == b);
        self.classes = classes;

        // Labels as dense class ids for counting
        let class_ids: Vec<usize> = y
            .iter()
            .map(|&v| self.classes.partition_point(|&c| c < v))
            .collect();

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(&x, &class_ids, &indices, 0));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &ArrayView2<'_, f64>,
        class_ids: &[usize],
        indices: &[usize],
        depth: usize,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(class_ids, indices.iter().copied());

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.map_or(false, |d| depth >= d)
            || counts.iter().filter(|&&c| c > 0).count() <= 1;

        if should_stop {
            return TreeNode::Leaf;
        }

        match self.find_best_split(x, class_ids, indices, &counts) {
            Some((feature_idx, threshold)) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature_idx]] <= threshold);

                TreeNode::Split {
                    threshold,
                    left: Box::new(self.build_tree(x, class_ids, &left_indices, depth + 1)),
                    right: Box::new(self.build_tree(x, class_ids, &right_indices, depth + 1)),
                }
            }
            None => TreeNode::Leaf,
        }
    }

    /// Best `(feature, threshold)` over all features, or `None` when no
    /// split reduces entropy.
    fn find_best_split(
        &self,
        x: &ArrayView2<'_, f64>,
        class_ids: &[usize],
        indices: &[usize],
        parent_counts: &[usize],
    ) -> Option<(usize, f64)> {
        let n = indices.len();
        let parent_entropy = entropy(parent_counts, n);

        // Each feature independently sweeps its sorted values
        let feature_results: Vec<Option<(usize, f64, f64)>> = (0..x.ncols())
            .into_par_iter()
            .map(|feature_idx| {
                let mut order: Vec<usize> = indices
                    .iter()
                    .copied()
                    .filter(|&i| !x[[i, feature_idx]].is_nan())
                    .collect();
                if order.len() < n {
                    // NaN rows would land on the right of any threshold
                    return None;
                }
                order.sort_by(|&a, &b| x[[a, feature_idx]].total_cmp(&x[[b, feature_idx]]));

                let mut left_counts = vec![0usize; self.classes.len()];
                let mut right_counts = parent_counts.to_vec();
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..n - 1 {
                    let class = class_ids[order[pos]];
                    left_counts[class] += 1;
                    right_counts[class] -= 1;

                    let current = x[[order[pos], feature_idx]];
                    let next = x[[order[pos + 1], feature_idx]];
                    if current == next {
                        continue;
                    }

                    let left_n = pos + 1;
                    let right_n = n - left_n;
                    let weighted = (left_n as f64 * entropy(&left_counts, left_n)
                        + right_n as f64 * entropy(&right_counts, right_n))
                        / n as f64;
                    let gain = parent_entropy - weighted;

                    if gain > best.map_or(1e-12, |(g, _)| g) {
                        let mut threshold = current + (next - current) / 2.0;
                        if threshold == next {
                            threshold = current;
                        }
                        best = Some((gain, threshold));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        feature_results
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
            .map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    fn class_counts<I>(&self, class_ids: &[usize], indices: I) -> Vec<usize>
    where
        I: Iterator<Item = usize>,
    {
        let mut counts = vec![0usize; self.classes.len()];
        for i in indices {
            counts[class_ids[i]] += 1;
        }
        counts
    }

    /// Thresholds of every internal node, in pre-order
    pub fn split_thresholds(&self) -> Vec<f64> {
        let mut thresholds = Vec::new();
        if let Some(root) = &self.root {
            Self::collect_thresholds(root, &mut thresholds);
        }
        thresholds
    }

    fn collect_thresholds(node: &TreeNode, out: &mut Vec<f64>) {
        if let TreeNode::Split { threshold, left, right } = node {
            out.push(*threshold);
            Self::collect_thresholds(left, out);
            Self::collect_thresholds(right, out);
        }
    }
}

/// Shannon entropy (bits) of a class histogram over `n` samples
fn entropy(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    -counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            p * p.log2()
        })
        .sum::<f64>()
}
