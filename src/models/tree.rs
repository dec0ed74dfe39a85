//! # Decision Trees
//!
//! CART regression trees with the squared-error criterion. The tree storage and
//! growing logic is shared with the forest and boosting ensembles.

use super::{check_fit_input, check_predict_input, FitOptions, Regressor};
use crate::error::ModelError;
use crate::params::{ParamSet, ParamValue};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

// --- Tree Storage ---

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TreeModel {
    nodes: Vec<Node>,
    n_features: usize,
}

impl TreeModel {
    pub(crate) fn n_features(&self) -> usize {
        self.n_features
    }

    pub(crate) fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub(crate) fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        check_predict_input(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }

    pub(crate) fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0, 0)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[id] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        deepest
    }

    pub(crate) fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }
}

// --- Tree Growing ---

/// Stopping and feature-sampling rules for growing one tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeGrower {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features drawn at each split; `None` means all of them.
    pub max_features: Option<usize>,
}

struct Split {
    feature: usize,
    threshold: f64,
}

/// A node waiting to be grown: its arena slot and its rows `indices[start..end]`.
struct PendingNode {
    id: usize,
    start: usize,
    end: usize,
    depth: usize,
}

impl TreeGrower {
    /// Grows a tree on the rows of `x` listed in `indices` (repeats allowed, as in a bootstrap sample).
    ///
    /// Nodes are expanded depth-first from an explicit stack, so unlimited depth
    /// does not grow the call stack.
    pub(crate) fn grow(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        mut indices: Vec<usize>,
        rng: &mut StdRng,
    ) -> TreeModel {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut pending = vec![PendingNode {
            id: 0,
            start: 0,
            end: indices.len(),
            depth: 0,
        }];

        while let Some(node) = pending.pop() {
            let rows = &mut indices[node.start..node.end];
            let n = rows.len();
            let mean = rows.iter().map(|&i| y[i]).sum::<f64>() / n as f64;
            nodes[node.id] = Node::Leaf { value: mean };

            let splittable = n >= self.min_samples_split
                && n >= 2 * self.min_samples_leaf
                && self.max_depth.map_or(true, |d| node.depth < d);
            if !splittable {
                continue;
            }
            let Some(split) = self.best_split(x, y, rows, rng) else {
                continue;
            };

            let mut left_rows = Vec::with_capacity(n);
            let mut right_rows = Vec::with_capacity(n);
            for &i in rows.iter() {
                if x[[i, split.feature]] <= split.threshold {
                    left_rows.push(i);
                } else {
                    right_rows.push(i);
                }
            }
            let mid = left_rows.len();
            rows[..mid].copy_from_slice(&left_rows);
            rows[mid..].copy_from_slice(&right_rows);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[node.id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            // Right first so the left subtree is expanded (and draws from `rng`) first.
            pending.push(PendingNode {
                id: right,
                start: node.start + mid,
                end: node.end,
                depth: node.depth + 1,
            });
            pending.push(PendingNode {
                id: left,
                start: node.start,
                end: node.start + mid,
                depth: node.depth + 1,
            });
        }

        TreeModel {
            nodes,
            n_features: x.ncols(),
        }
    }

    /// Finds the split maximizing the reduction in squared error.
    ///
    /// Uses the proxy `S_l²/n_l + S_r²/n_r`, which differs from the negated child
    /// SSE only by a per-node constant.
    fn best_split(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        indices: &[usize],
        rng: &mut StdRng,
    ) -> Option<Split> {
        let n = indices.len();
        let total: f64 = indices.iter().map(|&i| y[i]).sum();
        let parent_proxy = total * total / n as f64;
        let sum_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        // Pure node: nothing to gain.
        if sum_sq - parent_proxy <= 1e-12 * sum_sq.max(1.0) {
            return None;
        }

        let n_features = x.ncols();
        let features: Vec<usize> = match self.max_features {
            Some(k) if k < n_features => rand::seq::index::sample(rng, n_features, k.max(1)).into_vec(),
            _ => (0..n_features).collect(),
        };

        let min_leaf = self.min_samples_leaf.max(1);
        let mut best: Option<(f64, Split)> = None;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in features {
            column.clear();
            column.extend(indices.iter().map(|&i| (x[[i, feature]], y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for pos in 0..n - 1 {
                left_sum += column[pos].1;
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let (lo, hi) = (column[pos].0, column[pos + 1].0);
                if hi <= lo {
                    continue;
                }
                let right_sum = total - left_sum;
                let proxy = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                if best.as_ref().map_or(true, |(b, _)| proxy > *b) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some((proxy, Split { feature, threshold }));
                }
            }
        }

        best.filter(|(proxy, _)| *proxy > parent_proxy + 1e-12 * parent_proxy.abs().max(1.0))
            .map(|(_, split)| split)
    }
}

/// Seeds are kept within `0..=i64::MAX` so they survive a `get_params`/`set_params` round trip.
pub(crate) fn clamp_seed(seed: u64) -> u64 {
    seed.min(i64::MAX as u64)
}

pub(crate) fn make_rng(random_state: Option<u64>) -> StdRng {
    match random_state {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub(crate) fn validate_at_least(name: &str, value: usize, min: usize) -> Result<usize, ModelError> {
    if value < min {
        return Err(ModelError::invalid_param(name, format!("must be >= {min}, got {value}")));
    }
    Ok(value)
}

// --- Decision Tree Regressor ---

/// A single CART regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: Option<usize>,
    random_state: Option<u64>,
    tree: Option<TreeModel>,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        DecisionTreeRegressor {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            tree: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Result<Self, ModelError> {
        self.min_samples_leaf = validate_at_least("min_samples_leaf", min_samples_leaf, 1)?;
        Ok(self)
    }

    /// Seeds above `i64::MAX` are clamped to it.
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(clamp_seed(seed));
        self
    }

    /// Depth of the fitted tree (a lone leaf has depth 0).
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(TreeModel::depth)
    }

    pub fn n_leaves(&self) -> Option<usize> {
        self.tree.as_ref().map(TreeModel::n_leaves)
    }

    fn grower(&self) -> TreeGrower {
        TreeGrower {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

impl Regressor for DecisionTreeRegressor {
    fn name(&self) -> &'static str {
        "DecisionTreeRegressor"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, _options: &FitOptions) -> Result<(), ModelError> {
        check_fit_input(x, y, 1)?;
        let mut rng = make_rng(self.random_state);
        let indices = (0..x.nrows()).collect();
        self.tree = Some(self.grower().grow(x, y, indices, &mut rng));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        self.tree
            .as_ref()
            .ok_or(ModelError::NotFitted { model: self.name() })?
            .predict(x)
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ModelError> {
        for (name, value) in params {
            match name.as_str() {
                "max_depth" => {
                    self.max_depth = value.as_opt_usize(name)?;
                    if let Some(d) = self.max_depth {
                        validate_at_least(name, d, 1)?;
                    }
                }
                "min_samples_split" => self.min_samples_split = validate_at_least(name, value.as_usize(name)?, 2)?,
                "min_samples_leaf" => self.min_samples_leaf = validate_at_least(name, value.as_usize(name)?, 1)?,
                "max_features" => self.max_features = value.as_opt_usize(name)?,
                "random_state" => self.random_state = value.as_opt_u64(name)?,
                _ => {
                    return Err(ModelError::UnknownParam {
                        model: self.name(),
                        name: name.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    fn get_params(&self) -> ParamSet {
        ParamSet::from([
            ("max_depth".to_string(), ParamValue::from(self.max_depth)),
            ("min_samples_split".to_string(), ParamValue::from(self.min_samples_split)),
            ("min_samples_leaf".to_string(), ParamValue::from(self.min_samples_leaf)),
            ("max_features".to_string(), ParamValue::from(self.max_features)),
            (
                "random_state".to_string(),
                ParamValue::from(self.random_state),
            ),
        ])
    }
}
