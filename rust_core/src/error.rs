//! Error taxonomy for the odds, model and strategy layers.

use thiserror::Error;

/// Caller-supplied malformed odds or stake input. Never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OddsError {
    #[error("Invalid odds: {0}")]
    InvalidOdds(String),

    #[error("Invalid stake: {0}")]
    InvalidStake(String),
}

/// Failures of the predictive model lifecycle.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Insufficient training data: {got} samples (minimum {required})")]
    InsufficientData { got: usize, required: usize },

    #[error("Malformed training data: {0}")]
    MalformedTrainingData(String),

    #[error("Model not ready: {0}")]
    ModelNotReady(String),

    #[error("Artifact set incomplete: missing {missing}")]
    ArtifactIncomplete { missing: String },

    #[error("Model unavailable after recovery attempt: {source}")]
    ModelUnavailable {
        #[source]
        source: Box<ModelError>,
    },

    #[error("Training cancelled")]
    Cancelled,

    #[error("Training task failed: {0}")]
    TrainingTaskFailed(String),

    #[error("Artifact storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    /// Errors that the lazy train-or-load path is allowed to recover from.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ModelError::ModelNotReady(_) | ModelError::ArtifactIncomplete { .. }
        )
    }
}

/// Strategy engine errors. Underlying failures pass through unchanged.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error(transparent)]
    Odds(#[from] OddsError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
