mod config;

use crate::config::RecommenderConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use courtside_core::risk_profile::QuestionResponse;
use courtside_core::{
    BetRecommendation, FileArtifactStore, ModelConfig, ModelError, ParlayRecommendation,
    PredictiveModel, RiskProfile, RiskTier, ScoredGame, StrategyEngine, SyntheticTrainingData,
    UpcomingGame, UserContext,
};
use dotenv::dotenv;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Everything produced for one user in one run
#[derive(Debug, Serialize)]
struct RecommendationReport {
    user_id: String,
    risk_tier: RiskTier,
    bankroll: f64,
    generated_at: DateTime<Utc>,
    model_generation: Option<String>,
    games: Vec<ScoredGame>,
    bets: Vec<BetRecommendation>,
    parlay: Option<ParlayRecommendation>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} from {:?}", what, path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid {} JSON in {:?}", what, path))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Courtside Recommender...");

    let model_config = ModelConfig::from_env();
    model_config.log_config();
    let config = RecommenderConfig::from_env();
    config.log_config();

    let store = Arc::new(FileArtifactStore::new(&model_config.artifact_dir));
    let provider = Arc::new(SyntheticTrainingData::new(
        model_config.synthetic_samples,
        model_config.forest.seed,
    ));
    let model = Arc::new(PredictiveModel::new(model_config, provider, store));

    if config.retrain_on_start {
        let job = model.spawn_training();
        let cancel = job.cancel_flag();
        let join = job.join();
        tokio::pin!(join);

        let outcome = tokio::select! {
            result = &mut join => result,
            _ = tokio::signal::ctrl_c() => {
                warn!("Received shutdown signal, cancelling training");
                cancel.cancel();
                join.await
            }
        };

        match outcome {
            Ok(set) => info!(
                "Background training finished: generation {}",
                set.manifest.generation
            ),
            Err(ModelError::Cancelled) => {
                info!("Training cancelled, exiting");
                return Ok(());
            }
            Err(e) => return Err(e).context("Background training failed"),
        }
    }

    let risk_tier = match &config.risk_questionnaire_file {
        Some(path) => {
            let answers: Vec<QuestionResponse> = read_json(path, "risk questionnaire")?;
            let profile = RiskProfile::from_questionnaire(&answers);
            info!(
                "Questionnaire appetite {} -> {} tier (max bet {}%)",
                profile.appetite,
                profile.tier,
                profile.max_bet_percentage()
            );
            profile.tier
        }
        None => config.risk_tier,
    };

    let games: Vec<UpcomingGame> = read_json(&config.games_file, "upcoming games")?;
    info!("Loaded {} upcoming games", games.len());

    let ctx = UserContext {
        user_id: config.user_id.clone(),
        risk_tier,
        bankroll: config.bankroll,
    };

    let engine = StrategyEngine::new(model.clone());
    let scored = engine
        .score_games(&games)
        .context("Failed to score upcoming games")?;
    let bets = engine.recommend_bets(&ctx, &scored, config.game_filter.as_deref())?;
    let parlay = engine.recommend_parlay(&ctx, &scored)?;

    info!(
        "{} bets, parlay: {} for {} ({} tier, model status {:?})",
        bets.len(),
        parlay
            .as_ref()
            .map_or("none".to_string(), |p| format!("{} legs @ {:+}", p.legs.len(), p.combined_american_odds)),
        ctx.user_id,
        ctx.risk_tier,
        model.status()
    );

    let report = RecommendationReport {
        user_id: ctx.user_id,
        risk_tier: ctx.risk_tier,
        bankroll: ctx.bankroll,
        generated_at: Utc::now(),
        model_generation: model
            .artifacts()
            .map(|a| a.manifest.generation.to_string()),
        games: scored,
        bets,
        parlay,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
