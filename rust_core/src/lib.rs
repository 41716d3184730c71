//! Courtside Core - Game outcome models and risk-tiered bet recommendations.
//!
//! This module provides:
//! - American/decimal odds conversion, parlay combination and payouts
//! - Spread, total and moneyline ensembles over a shared feature scaler
//! - Model lifecycle (train / persist / load / predict) with observable
//!   lazy recovery and cancellable background training
//! - Risk-tier policies and the strategy engine that sizes single bets and
//!   composes parlays
//! - Questionnaire and behaviour based risk-tier assessment

pub mod artifacts;
pub mod config;
pub mod error;
pub mod ml;
pub mod models;
pub mod odds;
pub mod policy;
pub mod predictor;
pub mod risk_profile;
pub mod strategy;
pub mod training;

pub use artifacts::{ArtifactManifest, ArtifactSet, ArtifactStore, FileArtifactStore, InMemoryArtifactStore};
pub use config::ModelConfig;
pub use error::{ModelError, OddsError, StrategyError};
pub use models::*;
pub use policy::RecommendationPolicy;
pub use predictor::{ModelStatus, PredictiveModel, TrainingJob};
pub use risk_profile::RiskProfile;
pub use strategy::StrategyEngine;
pub use training::{SyntheticTrainingData, TrainingData, TrainingDataProvider};
