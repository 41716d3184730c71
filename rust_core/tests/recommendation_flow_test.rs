//! End-to-end flow tests
//!
//! train -> persist -> load -> predict -> recommend, plus lazy recovery and
//! background training against a file-backed artifact store.

use courtside_core::artifacts::{ArtifactStore, FileArtifactStore};
use courtside_core::ml::ForestParams;
use courtside_core::{
    FeatureVector, Market, ModelConfig, ModelError, ModelStatus, OddsQuote, PredictiveModel,
    RiskTier, StrategyEngine, SyntheticTrainingData, TrainingData, TrainingDataProvider,
    UpcomingGame, UserContext,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

fn temp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("courtside-flow-{}-{}", tag, uuid::Uuid::new_v4()))
}

fn config(dir: &Path) -> ModelConfig {
    ModelConfig {
        forest: ForestParams {
            n_trees: 10,
            max_depth: 8,
            min_samples_split: 4,
            min_samples_leaf: 2,
            seed: 42,
        },
        min_training_samples: 50,
        artifact_dir: dir.to_path_buf(),
        synthetic_samples: 400,
    }
}

fn model_at(dir: &Path, provider: Arc<dyn TrainingDataProvider>) -> Arc<PredictiveModel> {
    Arc::new(PredictiveModel::new(
        config(dir),
        provider,
        Arc::new(FileArtifactStore::new(dir)),
    ))
}

fn slate() -> Vec<UpcomingGame> {
    let game = |id: &str, home: &str, away: &str, f: [f64; 9], spread: f64| UpcomingGame {
        game_id: id.to_string(),
        home_team: home.to_string(),
        away_team: away.to_string(),
        features: FeatureVector::from_array(f),
        odds: OddsQuote {
            home_moneyline: -180,
            away_moneyline: 155,
            spread,
            over_under: 221.5,
        },
    };
    vec![
        game("g1", "Bucks", "Pistons", [0.75, 0.25, 119.0, 96.0, 119.0, 96.0, 4.5, 3.0, 1.0], -9.5),
        game("g2", "Heat", "Knicks", [0.50, 0.52, 108.0, 109.0, 107.0, 108.0, 2.5, 2.0, 2.0], -1.5),
        game("g3", "Spurs", "Nuggets", [0.28, 0.72, 96.0, 119.5, 96.0, 119.0, 1.0, 1.0, 4.0], 8.0),
    ]
}

#[test]
fn test_full_flow_through_file_store() {
    let dir = temp_dir("full");
    let trainer = model_at(&dir, Arc::new(SyntheticTrainingData::new(400, 42)));

    let set = trainer.train().unwrap();
    trainer.persist(&set).unwrap();
    assert_eq!(trainer.status(), ModelStatus::Persisted);

    // A fresh process sees the same set
    let reader = model_at(&dir, Arc::new(TrainingData::default()));
    let loaded = reader.load().unwrap().expect("persisted set");
    assert_eq!(loaded.manifest, set.manifest);

    let engine = StrategyEngine::new(reader.clone());
    let scored = engine.score_games(&slate()).unwrap();
    assert_eq!(scored.len(), 3);
    for (s, g) in scored.iter().zip(slate()) {
        assert_eq!(s.game_id, g.game_id);
        let from_trainer = trainer.predict(&g.features).unwrap();
        assert!((s.predictions.spread.value - from_trainer.spread.value).abs() < 1e-9);
        assert!((s.predictions.moneyline.value - from_trainer.moneyline.value).abs() < 1e-9);
        assert_eq!(s.predictions.total.confidence, 0.7);
    }

    // The lopsided matchups favor their stronger side
    assert!(scored[0].predictions.spread.value > 0.0);
    assert!(scored[2].predictions.spread.value < 0.0);

    let ctx = UserContext {
        user_id: "flow-user".to_string(),
        risk_tier: RiskTier::Aggressive,
        bankroll: 500.0,
    };
    let bets = engine.recommend_bets(&ctx, &scored, None).unwrap();
    assert!(!bets.is_empty());
    for bet in &bets {
        assert!(bet.confidence >= 0.55);
        assert!(bet.stake > 0.0 && bet.stake <= 500.0 * 0.15);
    }
    // Every Total prediction clears 0.55 at its fixed 0.7 confidence
    assert_eq!(bets.iter().filter(|b| b.market == Market::Total).count(), 3);

    let parlay = engine
        .recommend_parlay(&ctx, &scored)
        .unwrap()
        .expect("three totals always qualify");
    assert!(parlay.legs.len() >= 2 && parlay.legs.len() <= 4);
    assert_eq!(parlay.stake, 40.0);
    assert!(parlay.potential_payout > 0.0);
    assert!(parlay
        .legs
        .windows(2)
        .all(|w| w[0].confidence >= w[1].confidence));

    let only_g2 = engine.recommend_bets(&ctx, &scored, Some("g2")).unwrap();
    assert!(only_g2.iter().all(|b| b.game_id == "g2"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_lazy_recovery_loads_and_signals() {
    let dir = temp_dir("lazy");
    let trainer = model_at(&dir, Arc::new(SyntheticTrainingData::new(200, 7)));
    let set = trainer.train().unwrap();
    trainer.persist(&set).unwrap();

    let model = model_at(&dir, Arc::new(TrainingData::default()));
    let mut status = model.subscribe();
    assert_eq!(*status.borrow_and_update(), ModelStatus::Untrained);

    model.predict(&slate()[0].features).unwrap();

    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), ModelStatus::Trained);
    assert_eq!(
        model.artifacts().unwrap().manifest.generation,
        set.manifest.generation
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_incomplete_store_retrains() {
    let dir = temp_dir("incomplete");
    let trainer = model_at(&dir, Arc::new(SyntheticTrainingData::new(200, 7)));
    let set = trainer.train().unwrap();
    trainer.persist(&set).unwrap();

    let member = dir
        .join("sets")
        .join(set.manifest.generation.to_string())
        .join("scaler.json");
    std::fs::remove_file(member).unwrap();

    let store = FileArtifactStore::new(&dir);
    assert!(matches!(
        store.get(),
        Err(ModelError::ArtifactIncomplete { .. })
    ));

    let model = model_at(&dir, Arc::new(SyntheticTrainingData::new(200, 8)));
    model.predict(&slate()[1].features).unwrap();

    let recovered = model.artifacts().unwrap();
    assert_ne!(recovered.manifest.generation, set.manifest.generation);
    assert_eq!(model.status(), ModelStatus::Persisted);
    // The retrained set replaced the broken one
    assert_eq!(
        store.get().unwrap().unwrap().manifest.generation,
        recovered.manifest.generation
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_unrecoverable_model_is_unavailable() {
    let dir = temp_dir("unavailable");
    let model = model_at(&dir, Arc::new(TrainingData::default()));

    let err = model.predict(&slate()[0].features).unwrap_err();
    assert!(matches!(err, ModelError::ModelUnavailable { .. }));
    assert_eq!(model.status(), ModelStatus::Unavailable);

    let engine = StrategyEngine::new(model);
    assert!(engine.score_games(&slate()).is_err());

    let _ = std::fs::remove_dir_all(dir);
}

/// Blocks `training_data` until the test releases it.
struct GatedProvider {
    inner: SyntheticTrainingData,
    gate: Mutex<mpsc::Receiver<()>>,
}

impl TrainingDataProvider for GatedProvider {
    fn training_data(&self) -> Result<TrainingData, ModelError> {
        if let Ok(gate) = self.gate.lock() {
            let _ = gate.recv();
        }
        self.inner.training_data()
    }

    fn provider_name(&self) -> &str {
        "gated"
    }
}

#[tokio::test]
async fn test_background_training_cancel() {
    let dir = temp_dir("cancel");
    let (release, gate) = mpsc::channel();
    let provider = GatedProvider {
        inner: SyntheticTrainingData::new(200, 42),
        gate: Mutex::new(gate),
    };
    let model = model_at(&dir, Arc::new(provider));

    let job = model.spawn_training();
    job.cancel();
    release.send(()).unwrap();

    assert!(matches!(job.join().await, Err(ModelError::Cancelled)));
    assert!(!model.is_ready());
    assert_eq!(model.status(), ModelStatus::Untrained);
    assert!(FileArtifactStore::new(&dir).get().unwrap().is_none());

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_cancelled_job_keeps_status_from_concurrent_recovery() {
    let dir = temp_dir("race");
    let trainer = model_at(&dir, Arc::new(SyntheticTrainingData::new(200, 7)));
    let stored = trainer.train().unwrap();
    trainer.persist(&stored).unwrap();

    let (release, gate) = mpsc::channel();
    let provider = GatedProvider {
        inner: SyntheticTrainingData::new(200, 42),
        gate: Mutex::new(gate),
    };
    let model = model_at(&dir, Arc::new(provider));
    let mut status = model.subscribe();

    let job = model.spawn_training();
    status
        .wait_for(|s| *s == ModelStatus::Training)
        .await
        .unwrap();

    // The job is parked in its provider while a lazy predict loads the stored set
    model.predict(&slate()[0].features).unwrap();
    assert!(model.is_ready());
    assert_eq!(model.status(), ModelStatus::Trained);

    job.cancel();
    release.send(()).unwrap();
    assert!(matches!(job.join().await, Err(ModelError::Cancelled)));

    assert!(model.is_ready());
    assert_eq!(model.status(), ModelStatus::Trained);
    assert_eq!(
        model.artifacts().unwrap().manifest.generation,
        stored.manifest.generation
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_background_training_completes() {
    let dir = temp_dir("background");
    let model = model_at(&dir, Arc::new(SyntheticTrainingData::new(200, 42)));
    let mut status = model.subscribe();

    let job = model.spawn_training();
    let set = job.join().await.unwrap();

    status.changed().await.unwrap();
    assert_eq!(*status.borrow(), ModelStatus::Persisted);
    assert_eq!(
        FileArtifactStore::new(&dir)
            .get()
            .unwrap()
            .unwrap()
            .manifest
            .generation,
        set.manifest.generation
    );

    let _ = std::fs::remove_dir_all(dir);
}
