//! CART decision tree used as the ensemble base learner.
//!
//! Nodes live in a flat arena so a fitted tree serializes compactly.
//! Regression splits minimize variance; classification splits minimize Gini
//! impurity over 0/1 labels. Either way a leaf stores the mean label, which
//! for classification is the positive-class fraction.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Regression,
    Classification,
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split (randomly chosen)
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Running label statistics for a candidate partition.
#[derive(Debug, Clone, Copy, Default)]
struct LabelStats {
    n: f64,
    sum: f64,
    sum_sq: f64,
}

impl LabelStats {
    fn from_labels(y: &[f64], indices: &[usize]) -> Self {
        let mut stats = Self::default();
        for &i in indices {
            stats.push(y[i]);
        }
        stats
    }

    #[inline]
    fn push(&mut self, v: f64) {
        self.n += 1.0;
        self.sum += v;
        self.sum_sq += v * v;
    }

    #[inline]
    fn minus(&self, other: &Self) -> Self {
        Self {
            n: self.n - other.n,
            sum: self.sum - other.sum,
            sum_sq: self.sum_sq - other.sum_sq,
        }
    }

    #[inline]
    fn mean(&self) -> f64 {
        if self.n > 0.0 {
            self.sum / self.n
        } else {
            0.0
        }
    }

    #[inline]
    fn impurity(&self, task: TaskKind) -> f64 {
        if self.n <= 0.0 {
            return 0.0;
        }
        match task {
            TaskKind::Regression => (self.sum_sq / self.n - self.mean().powi(2)).max(0.0),
            TaskKind::Classification => {
                let p = self.mean();
                2.0 * p * (1.0 - p)
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    task: TaskKind,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Fit on the rows of `x` selected by `sample` (duplicates allowed, as
    /// produced by bootstrap sampling).
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        sample: &[usize],
        task: TaskKind,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self {
            task,
            nodes: Vec::new(),
        };
        let mut indices = sample.to_vec();
        tree.grow(x, y, &mut indices, 0, params, rng);
        tree
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &mut [usize],
        depth: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let stats = LabelStats::from_labels(y, indices);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: stats.mean(),
        });

        if depth >= params.max_depth
            || indices.len() < params.min_samples_split.max(2)
            || stats.impurity(self.task) < 1e-12
        {
            return id;
        }

        let n_features = x.first().map(|r| r.len()).unwrap_or(0);
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);
        features.truncate(params.max_features.clamp(1, n_features.max(1)));

        let Some(split) = self.best_split(x, y, indices, &features, &stats, params) else {
            return id;
        };

        // In-place partition: rows <= threshold first
        let mut boundary = 0;
        for i in 0..indices.len() {
            if x[indices[i]][split.feature] <= split.threshold {
                indices.swap(i, boundary);
                boundary += 1;
            }
        }
        if boundary == 0 || boundary == indices.len() {
            return id;
        }

        let (left_idx, right_idx) = indices.split_at_mut(boundary);
        let left = self.grow(x, y, left_idx, depth + 1, params, rng);
        let right = self.grow(x, y, right_idx, depth + 1, params, rng);

        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    /// Sorted sweep over each candidate feature, O(n log n) per feature.
    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        features: &[usize],
        parent: &LabelStats,
        params: &TreeParams,
    ) -> Option<SplitCandidate> {
        let parent_impurity = parent.impurity(self.task);
        let min_leaf = params.min_samples_leaf.max(1);
        let n = indices.len();
        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for &feature in features {
            order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            let mut left = LabelStats::default();
            for pos in 0..n - 1 {
                left.push(y[order[pos]]);
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let here = x[order[pos]][feature];
                let next = x[order[pos + 1]][feature];
                if next <= here {
                    continue;
                }

                let right = parent.minus(&left);
                let weighted = (left.n * left.impurity(self.task)
                    + right.n * right.impurity(self.task))
                    / parent.n;
                let gain = parent_impurity - weighted;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    id = if v <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes.get(id) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 1,
            }
        }
        walk(&self.nodes, 0)
    }
}
