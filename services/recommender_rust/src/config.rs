//! Request settings for one recommendation run, loaded from environment variables.

use courtside_core::RiskTier;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    /// JSON array of upcoming games (default: "games.json")
    pub games_file: PathBuf,
    pub user_id: String,
    /// Used when no questionnaire file is given (default: moderate)
    pub risk_tier: RiskTier,
    /// JSON array of questionnaire answers; overrides `risk_tier` when set
    pub risk_questionnaire_file: Option<PathBuf>,
    /// Bankroll in dollars (default: 1000)
    pub bankroll: f64,
    /// Retrain in the background before recommending (default: false)
    pub retrain_on_start: bool,
    /// Restrict single bets to one game id
    pub game_filter: Option<String>,
}

impl RecommenderConfig {
    pub fn from_env() -> Self {
        Self {
            games_file: env::var("GAMES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("games.json")),

            user_id: env::var("USER_ID").unwrap_or_else(|_| "demo".to_string()),

            risk_tier: match env::var("RISK_TIER") {
                Ok(v) => v.parse().unwrap_or_else(|e| {
                    warn!("{}; using moderate", e);
                    RiskTier::Moderate
                }),
                Err(_) => RiskTier::Moderate,
            },

            risk_questionnaire_file: env::var("RISK_QUESTIONNAIRE_FILE")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),

            bankroll: env::var("BANKROLL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000.0),

            retrain_on_start: env::var("RETRAIN_ON_START")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),

            game_filter: env::var("GAME_FILTER").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn log_config(&self) {
        info!("RecommenderConfig loaded:");
        info!("  games_file: {:?}", self.games_file);
        info!("  user_id: {}", self.user_id);
        info!("  risk_tier: {}", self.risk_tier);
        info!("  risk_questionnaire_file: {:?}", self.risk_questionnaire_file);
        info!("  bankroll: ${:.2}", self.bankroll);
        info!("  retrain_on_start: {}", self.retrain_on_start);
        info!("  game_filter: {:?}", self.game_filter);
    }
}
