//! Bagged tree ensembles for the spread, total and moneyline markets.

use super::tree::{DecisionTree, TaskKind, TreeParams};
use super::CancelFlag;
use crate::error::ModelError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random forest configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 12,
            min_samples_split: 4,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    task: TaskKind,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit `n_trees` bootstrapped trees in parallel.
    ///
    /// Every tree checks `cancel` before it starts; a cancelled fit returns
    /// [`ModelError::Cancelled`] and discards any finished trees.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        task: TaskKind,
        params: &ForestParams,
        cancel: &CancelFlag,
    ) -> Result<Self, ModelError> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return Err(ModelError::MalformedTrainingData(format!(
                "{} feature rows vs {} targets",
                n,
                y.len()
            )));
        }
        if task == TaskKind::Classification && y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(ModelError::MalformedTrainingData(
                "classification targets must be 0 or 1".to_string(),
            ));
        }

        let n_features = x[0].len();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: match task {
                TaskKind::Classification => (n_features as f64).sqrt().ceil() as usize,
                TaskKind::Regression => n_features,
            },
        };

        let trees: Option<Vec<DecisionTree>> = (0..params.n_trees.max(1))
            .into_par_iter()
            .map(|i| {
                if cancel.is_cancelled() {
                    return None;
                }
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                Some(DecisionTree::fit(x, y, &sample, task, &tree_params, &mut rng))
            })
            .collect();

        match trees {
            Some(trees) if !cancel.is_cancelled() => Ok(Self {
                task,
                n_features,
                trees,
            }),
            _ => Err(ModelError::Cancelled),
        }
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the tree outputs.
    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_one(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Probability of the positive class (classification ensembles).
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        self.predict(row).clamp(0.0, 1.0)
    }
}
