//! Predictive model: scaler + spread/total/moneyline ensembles with an
//! explicit lifecycle.
//!
//! ```text
//! Untrained --train--> Trained --persist--> Persisted
//!     |                   ^                     |
//!     +------load---------+--------load---------+
//! ```
//!
//! `predict` on an untrained model runs one load-or-train recovery (under a
//! lock, so concurrent callers wait for the same attempt) and reports every
//! step on the status channel. A failed recovery escalates to
//! [`ModelError::ModelUnavailable`].

use crate::artifacts::{ArtifactManifest, ArtifactSet, ArtifactStore};
use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::ml::{CancelFlag, RandomForest, StandardScaler, TaskKind};
use crate::models::{FeatureVector, GamePredictions, Market, MarketPrediction, FEATURE_COUNT};
use crate::training::{TrainingData, TrainingDataProvider};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Confidence assigned to every Total prediction until it is calibrated.
pub const TOTAL_CONFIDENCE: f64 = 0.7;

/// Confidence bounds for Spread and Moneyline predictions
pub const MIN_CONFIDENCE: f64 = 0.5;
pub const MAX_CONFIDENCE: f64 = 0.9;

/// `clamp(0.5 + |margin| / 20, 0.5, 0.9)`
#[inline]
pub fn spread_confidence(predicted_margin: f64) -> f64 {
    (0.5 + predicted_margin.abs() / 20.0).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// `clamp(|p - 0.5| * 2, 0.5, 0.9)`
#[inline]
pub fn moneyline_confidence(home_win_probability: f64) -> f64 {
    ((home_win_probability - 0.5).abs() * 2.0).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Lifecycle signal published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Untrained,
    Loading,
    Training,
    Trained,
    Persisted,
    /// Lazy recovery failed
    Unavailable,
}

/// Fit the scaler, then the three market models on the same scaled matrix.
pub fn fit_artifact_set(
    data: &TrainingData,
    config: &ModelConfig,
    cancel: &CancelFlag,
) -> Result<ArtifactSet, ModelError> {
    data.validate(config.min_training_samples)?;

    let raw = data.matrix();
    let scaler = StandardScaler::fit(&raw).ok_or(ModelError::InsufficientData {
        got: 0,
        required: config.min_training_samples,
    })?;
    // Trees index rows
    let x: Vec<Vec<f64>> = scaler
        .transform(&raw)
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect();
    let params = &config.forest;

    let (spread, (total, moneyline)) = rayon::join(
        || RandomForest::fit(&x, &data.point_diff, TaskKind::Regression, params, cancel),
        || {
            rayon::join(
                || RandomForest::fit(&x, &data.total_points, TaskKind::Regression, params, cancel),
                || RandomForest::fit(&x, &data.home_win, TaskKind::Classification, params, cancel),
            )
        },
    );

    Ok(ArtifactSet {
        manifest: ArtifactManifest {
            generation: Uuid::new_v4(),
            trained_at: Utc::now(),
            sample_count: data.len(),
        },
        scaler,
        spread_model: spread?,
        total_model: total?,
        moneyline_model: moneyline?,
    })
}

/// Reject sets whose members were fitted on a different feature layout.
fn check_layout(set: &ArtifactSet) -> Result<(), ModelError> {
    let members = [
        ("scaler", set.scaler.n_features()),
        ("spread_model", set.spread_model.n_features()),
        ("total_model", set.total_model.n_features()),
        ("moneyline_model", set.moneyline_model.n_features()),
    ];
    for (name, n) in members {
        if n != FEATURE_COUNT {
            return Err(ModelError::ArtifactIncomplete {
                missing: format!("{} for {} features (found {})", name, FEATURE_COUNT, n),
            });
        }
    }
    Ok(())
}

/// Run one fitted set over one game.
pub fn predict_with(set: &ArtifactSet, features: &FeatureVector) -> GamePredictions {
    let row = set.scaler.transform_one(&features.to_array());

    let margin = set.spread_model.predict(&row);
    let total = set.total_model.predict(&row);
    let p_home = set.moneyline_model.predict_proba(&row);

    GamePredictions {
        spread: MarketPrediction::new(Market::Spread, margin, spread_confidence(margin)),
        total: MarketPrediction::new(Market::Total, total, TOTAL_CONFIDENCE),
        moneyline: MarketPrediction::new(Market::Moneyline, p_home, moneyline_confidence(p_home)),
    }
}

pub struct PredictiveModel {
    config: ModelConfig,
    provider: Arc<dyn TrainingDataProvider>,
    store: Arc<dyn ArtifactStore>,
    artifacts: RwLock<Option<Arc<ArtifactSet>>>,
    /// Held for the duration of a lazy recovery
    init_lock: Mutex<()>,
    status_tx: watch::Sender<ModelStatus>,
}

impl PredictiveModel {
    pub fn new(
        config: ModelConfig,
        provider: Arc<dyn TrainingDataProvider>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ModelStatus::Untrained);
        Self {
            config,
            provider,
            store,
            artifacts: RwLock::new(None),
            init_lock: Mutex::new(()),
            status_tx,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn status(&self) -> ModelStatus {
        *self.status_tx.borrow()
    }

    /// Receive every lifecycle transition, including lazy recovery steps.
    pub fn subscribe(&self) -> watch::Receiver<ModelStatus> {
        self.status_tx.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts.read().is_some()
    }

    /// Currently installed artifact set, if any.
    pub fn artifacts(&self) -> Option<Arc<ArtifactSet>> {
        self.artifacts.read().clone()
    }

    fn set_status(&self, status: ModelStatus) {
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            info!("Model status {:?} -> {:?}", previous, status);
        }
    }

    /// Leave `in_flight` after a failed step. A status another caller has
    /// set since is kept; otherwise the status follows the installed set.
    fn settle_after_failure(&self, in_flight: ModelStatus, previous: ModelStatus) {
        let fallback = match (self.is_ready(), previous) {
            (true, ModelStatus::Persisted) => ModelStatus::Persisted,
            (true, _) => ModelStatus::Trained,
            (false, ModelStatus::Unavailable) => ModelStatus::Unavailable,
            (false, _) => ModelStatus::Untrained,
        };
        self.status_tx.send_if_modified(|status| {
            if *status != in_flight || *status == fallback {
                return false;
            }
            info!("Model status {:?} -> {:?}", status, fallback);
            *status = fallback;
            true
        });
    }

    fn install(&self, set: ArtifactSet) -> Arc<ArtifactSet> {
        let set = Arc::new(set);
        *self.artifacts.write() = Some(set.clone());
        set
    }

    /// Train from the configured provider and install the result.
    pub fn train(&self) -> Result<Arc<ArtifactSet>, ModelError> {
        self.train_with_cancel(&CancelFlag::new())
    }

    /// As [`train`](Self::train), checking `cancel` between trees.
    ///
    /// A failed or cancelled run leaves the installed set as it was. The
    /// status is reset only if no other caller moved it meanwhile.
    pub fn train_with_cancel(&self, cancel: &CancelFlag) -> Result<Arc<ArtifactSet>, ModelError> {
        let previous = self.status();
        self.set_status(ModelStatus::Training);
        let started = Instant::now();

        let result = self
            .provider
            .training_data()
            .and_then(|data| fit_artifact_set(&data, &self.config, cancel));

        match result {
            Ok(set) => {
                info!(
                    "Trained artifact generation {} on {} samples from {} provider in {:.1}s",
                    set.manifest.generation,
                    set.manifest.sample_count,
                    self.provider.provider_name(),
                    started.elapsed().as_secs_f64()
                );
                let set = self.install(set);
                self.set_status(ModelStatus::Trained);
                Ok(set)
            }
            Err(e) => {
                warn!("Training failed: {}", e);
                self.settle_after_failure(ModelStatus::Training, previous);
                Err(e)
            }
        }
    }

    /// Write `set` to the artifact store as one unit.
    pub fn persist(&self, set: &ArtifactSet) -> Result<(), ModelError> {
        self.store.put(set)?;
        let installed = self
            .artifacts()
            .map_or(false, |a| a.manifest.generation == set.manifest.generation);
        if installed {
            self.set_status(ModelStatus::Persisted);
        }
        Ok(())
    }

    /// Load and install the stored set. `Ok(None)` when nothing is stored.
    pub fn load(&self) -> Result<Option<Arc<ArtifactSet>>, ModelError> {
        let previous = self.status();
        self.set_status(ModelStatus::Loading);

        let loaded = self
            .store
            .get()
            .and_then(|set| set.map(|s| check_layout(&s).map(|_| s)).transpose());

        match loaded {
            Ok(Some(set)) => {
                info!(
                    "Loaded artifact generation {} from {} store",
                    set.manifest.generation,
                    self.store.store_name()
                );
                let set = self.install(set);
                self.set_status(ModelStatus::Trained);
                Ok(Some(set))
            }
            Ok(None) => {
                self.settle_after_failure(ModelStatus::Loading, previous);
                Ok(None)
            }
            Err(e) => {
                self.settle_after_failure(ModelStatus::Loading, previous);
                Err(e)
            }
        }
    }

    /// Installed set, or the result of one load-or-train recovery.
    pub fn ensure_ready(&self) -> Result<Arc<ArtifactSet>, ModelError> {
        match self.artifacts() {
            Some(set) => Ok(set),
            None => self.recover(ModelError::ModelNotReady("no fitted scaler".to_string())),
        }
    }

    fn recover(&self, cause: ModelError) -> Result<Arc<ArtifactSet>, ModelError> {
        let _guard = self.init_lock.lock();
        if let Some(set) = self.artifacts() {
            return Ok(set);
        }

        warn!("{}; attempting load-or-train recovery", cause);

        let outcome = match self.load() {
            Ok(Some(set)) => Ok(set),
            Ok(None) => {
                info!("No stored artifact set; training from provider");
                self.train_and_persist(&CancelFlag::new())
            }
            Err(e) => {
                warn!("Artifact load failed ({}); training from provider", e);
                self.train_and_persist(&CancelFlag::new())
            }
        };

        outcome.map_err(|e| {
            error!("Model recovery failed: {}", e);
            self.set_status(ModelStatus::Unavailable);
            ModelError::ModelUnavailable {
                source: Box::new(e),
            }
        })
    }

    /// Train, then persist. A persist failure is logged and the freshly
    /// trained set stays installed.
    fn train_and_persist(&self, cancel: &CancelFlag) -> Result<Arc<ArtifactSet>, ModelError> {
        let set = self.train_with_cancel(cancel)?;
        if let Err(e) = self.persist(&set) {
            warn!("Failed to persist artifact set {}: {}", set.manifest.generation, e);
        }
        Ok(set)
    }

    /// Predict spread, total and moneyline for one game.
    pub fn predict(&self, features: &FeatureVector) -> Result<GamePredictions, ModelError> {
        let set = self.ensure_ready()?;
        Ok(predict_with(&set, features))
    }

    /// Predict many games against one artifact snapshot.
    pub fn predict_batch(
        &self,
        features: &[FeatureVector],
    ) -> Result<Vec<GamePredictions>, ModelError> {
        let set = self.ensure_ready()?;
        Ok(features.par_iter().map(|f| predict_with(&set, f)).collect())
    }

    /// Train and persist on the blocking pool. Must be called within a Tokio
    /// runtime. Predictions keep using the installed set until the job
    /// finishes.
    pub fn spawn_training(self: &Arc<Self>) -> TrainingJob {
        let cancel = CancelFlag::new();
        let model = Arc::clone(self);
        let job_cancel = cancel.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let set = model.train_with_cancel(&job_cancel)?;
            model.persist(&set)?;
            Ok::<_, ModelError>(set)
        });

        TrainingJob { cancel, handle }
    }
}

/// Handle to a background training run.
pub struct TrainingJob {
    cancel: CancelFlag,
    handle: JoinHandle<Result<Arc<ArtifactSet>, ModelError>>,
}

impl TrainingJob {
    /// Request cooperative cancellation; the job resolves to `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Flag that cancels this job, usable after `join` consumed the handle.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> Result<Arc<ArtifactSet>, ModelError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ModelError::Cancelled),
            Err(e) => Err(ModelError::TrainingTaskFailed(e.to_string())),
        }
    }
}
