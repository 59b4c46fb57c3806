// src/boosting.rs
//! Small gradient-boosted decision tree classifier (binary log-loss).
//!
//! Trees are fitted to the log-loss gradient with exhaustive threshold
//! search and Newton-step leaf values. Training is deterministic: no row or
//! feature subsampling.

use std::cmp::Ordering;
use tracing::debug;

use crate::error::{RecommendError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf(value) => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone)]
pub struct GradientBoostedClassifier {
    init: f64,
    learning_rate: f64,
    trees: Vec<Node>,
}

impl GradientBoostedClassifier {
    /// Fits on `features` (one row per sample) against boolean labels. Both
    /// classes must be present.
    pub fn fit(features: &[Vec<f64>], labels: &[bool], params: &BoostingParams) -> Result<Self> {
        if features.is_empty() || features.len() != labels.len() {
            return Err(RecommendError::InvalidConfig(format!(
                "classifier needs one label per row ({} rows, {} labels)",
                features.len(),
                labels.len()
            )));
        }
        let width = features[0].len();
        if width == 0 || features.iter().any(|row| row.len() != width) {
            return Err(RecommendError::NoFeatures);
        }

        let positives = labels.iter().filter(|&&l| l).count();
        if positives == 0 || positives == labels.len() {
            return Err(RecommendError::InvalidConfig(
                "classifier needs both classes present".to_string(),
            ));
        }

        let n = labels.len();
        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let prior = positives as f64 / n as f64;
        let init = (prior / (1.0 - prior)).ln();

        let mut raw = vec![init; n];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let all: Vec<usize> = (0..n).collect();

        for _ in 0..params.n_estimators {
            let prob: Vec<f64> = raw.iter().map(|&f| sigmoid(f)).collect();
            let residual: Vec<f64> = y.iter().zip(&prob).map(|(y, p)| y - p).collect();
            let hessian: Vec<f64> = prob.iter().map(|p| p * (1.0 - p)).collect();

            let tree = grow(features, &residual, &hessian, &all, 0, params);
            for (i, row) in features.iter().enumerate() {
                raw[i] += params.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        debug!(rows = n, positives, trees = trees.len(), "fitted boosted classifier");
        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let raw = self.trees.iter().fold(self.init, |acc, tree| {
            acc + self.learning_rate * tree.predict(row)
        });
        sigmoid(raw)
    }
}

fn leaf_value(residual: &[f64], hessian: &[f64], indices: &[usize]) -> f64 {
    let numerator: f64 = indices.iter().map(|&i| residual[i]).sum();
    let denominator: f64 = indices.iter().map(|&i| hessian[i]).sum();
    if denominator.abs() < 1e-150 {
        0.0
    } else {
        numerator / denominator
    }
}

fn grow(
    features: &[Vec<f64>],
    residual: &[f64],
    hessian: &[f64],
    indices: &[usize],
    depth: usize,
    params: &BoostingParams,
) -> Node {
    if depth >= params.max_depth || indices.len() < 2 * params.min_samples_leaf.max(1) {
        return Node::Leaf(leaf_value(residual, hessian, indices));
    }

    let Some(split) = best_split(features, residual, indices, params.min_samples_leaf.max(1)) else {
        return Node::Leaf(leaf_value(residual, hessian, indices));
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| features[i][split.feature] <= split.threshold);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(grow(features, residual, hessian, &left, depth + 1, params)),
        right: Box::new(grow(features, residual, hessian, &right, depth + 1, params)),
    }
}

/// Threshold with the largest squared-error reduction of the residuals.
fn best_split(features: &[Vec<f64>], residual: &[f64], indices: &[usize], min_leaf: usize) -> Option<Split> {
    let n = indices.len();
    let total: f64 = indices.iter().map(|&i| residual[i]).sum();
    let parent_score = total * total / n as f64;
    let mut best: Option<Split> = None;

    for feature in 0..features[indices[0]].len() {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            features[a][feature]
                .partial_cmp(&features[b][feature])
                .unwrap_or(Ordering::Equal)
        });

        let mut left_sum = 0.0;
        for pos in 0..n - 1 {
            left_sum += residual[order[pos]];
            let here = features[order[pos]][feature];
            let next = features[order[pos + 1]][feature];
            let left_n = pos + 1;
            let right_n = n - left_n;
            if here == next || left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
                - parent_score;
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(Split {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
    }
    best
}
