//! Feature scaling and tree-ensemble learners.

pub mod forest;
pub mod scaler;
pub mod tree;

pub use forest::{ForestParams, RandomForest};
pub use scaler::StandardScaler;
pub use tree::{DecisionTree, TaskKind, TreeParams};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a training job and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
