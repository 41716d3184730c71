//! Model configuration loaded from environment variables with safe defaults.

use crate::ml::ForestParams;
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Training and storage settings for the predictive model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Ensemble hyperparameters shared by all three market models
    pub forest: ForestParams,
    /// Fewer labelled games than this fails training (default: 50)
    pub min_training_samples: usize,
    /// Directory holding the persisted artifact set (default: "models")
    pub artifact_dir: PathBuf,
    /// Games generated by the synthetic provider (default: 1000)
    pub synthetic_samples: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ModelConfig {
    pub fn from_env() -> Self {
        let defaults = ForestParams::default();
        Self {
            forest: ForestParams {
                n_trees: env_parse("MODEL_N_TREES", defaults.n_trees),
                max_depth: env_parse("MODEL_MAX_DEPTH", defaults.max_depth),
                min_samples_split: env_parse("MODEL_MIN_SAMPLES_SPLIT", defaults.min_samples_split),
                min_samples_leaf: env_parse("MODEL_MIN_SAMPLES_LEAF", defaults.min_samples_leaf),
                seed: env_parse("MODEL_SEED", defaults.seed),
            },
            min_training_samples: env_parse("MODEL_MIN_TRAINING_SAMPLES", 50),
            artifact_dir: env::var("MODEL_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
            synthetic_samples: env_parse("SYNTHETIC_TRAINING_SAMPLES", 1000),
        }
    }

    /// Log current configuration (useful at startup)
    pub fn log_config(&self) {
        info!("ModelConfig loaded:");
        info!("  n_trees: {}", self.forest.n_trees);
        info!("  max_depth: {}", self.forest.max_depth);
        info!(
            "  min_samples split/leaf: {}/{}",
            self.forest.min_samples_split, self.forest.min_samples_leaf
        );
        info!("  seed: {}", self.forest.seed);
        info!("  min_training_samples: {}", self.min_training_samples);
        info!("  artifact_dir: {:?}", self.artifact_dir);
        info!("  synthetic_samples: {}", self.synthetic_samples);
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            min_training_samples: 50,
            artifact_dir: PathBuf::from("models"),
            synthetic_samples: 1000,
        }
    }
}
