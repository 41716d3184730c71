//! Shared data model: features, predictions, quotes and recommendations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of predictors in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 9;

/// Column order used by the scaler and every model.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "home_team_win_pct",
    "away_team_win_pct",
    "home_team_ppg",
    "away_team_ppg",
    "home_team_points_allowed",
    "away_team_points_allowed",
    "home_court_advantage",
    "days_rest_home",
    "days_rest_away",
];

/// Named numeric predictors for one game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub home_team_win_pct: f64,
    pub away_team_win_pct: f64,
    pub home_team_ppg: f64,
    pub away_team_ppg: f64,
    pub home_team_points_allowed: f64,
    pub away_team_points_allowed: f64,
    pub home_court_advantage: f64,
    pub days_rest_home: f64,
    pub days_rest_away: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.home_team_win_pct,
            self.away_team_win_pct,
            self.home_team_ppg,
            self.away_team_ppg,
            self.home_team_points_allowed,
            self.away_team_points_allowed,
            self.home_court_advantage,
            self.days_rest_home,
            self.days_rest_away,
        ]
    }

    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [home_team_win_pct, away_team_win_pct, home_team_ppg, away_team_ppg, home_team_points_allowed, away_team_points_allowed, home_court_advantage, days_rest_home, days_rest_away] =
            values;
        Self {
            home_team_win_pct,
            away_team_win_pct,
            home_team_ppg,
            away_team_ppg,
            home_team_points_allowed,
            away_team_points_allowed,
            home_court_advantage,
            days_rest_home,
            days_rest_away,
        }
    }

    /// Iterate `(name, value)` pairs in column order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.to_array())
    }
}

/// Betting market a prediction or recommendation refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Spread,
    Total,
    Moneyline,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::Spread, Market::Total, Market::Moneyline];
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Spread => write!(f, "spread"),
            Market::Total => write!(f, "total"),
            Market::Moneyline => write!(f, "moneyline"),
        }
    }
}

/// One market's model output.
///
/// `value` is a point margin for Spread (negative favors the away side), a
/// point total for Total, and a home-win probability for Moneyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketPrediction {
    pub market: Market,
    pub value: f64,
    pub confidence: f64,
}

impl MarketPrediction {
    /// Build a prediction, clamping confidence into [0, 1].
    pub fn new(market: Market, value: f64, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            market,
            value,
            confidence,
        }
    }
}

/// The three predictions produced per game per inference call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GamePredictions {
    pub spread: MarketPrediction,
    pub total: MarketPrediction,
    pub moneyline: MarketPrediction,
}

impl GamePredictions {
    pub fn get(&self, market: Market) -> &MarketPrediction {
        match market {
            Market::Spread => &self.spread,
            Market::Total => &self.total,
            Market::Moneyline => &self.moneyline,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketPrediction> {
        [&self.spread, &self.total, &self.moneyline].into_iter()
    }
}

/// User-selected aggressiveness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Conservative,
    Moderate,
    Aggressive,
}

impl std::str::FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(RiskTier::Conservative),
            "moderate" => Ok(RiskTier::Moderate),
            "aggressive" => Ok(RiskTier::Aggressive),
            other => Err(format!("unknown risk tier: {}", other)),
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Conservative => write!(f, "conservative"),
            RiskTier::Moderate => write!(f, "moderate"),
            RiskTier::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Book prices for one game. Read-only to the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub home_moneyline: i32,
    pub away_moneyline: i32,
    pub spread: f64,
    pub over_under: f64,
}

/// An upcoming game as supplied by the game/odds store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingGame {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub features: FeatureVector,
    pub odds: OddsQuote,
}

/// A game paired with the model's predictions for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredGame {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub odds: OddsQuote,
    pub predictions: GamePredictions,
}

/// Explicit per-request context replacing ambient session lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub risk_tier: RiskTier,
    pub bankroll: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecommendation {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub market: Market,
    pub description: String,
    pub american_odds: i32,
    pub confidence: f64,
    pub stake: f64,
}

/// A combined bet. Always holds at least two legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParlayRecommendation {
    pub legs: Vec<BetRecommendation>,
    pub combined_american_odds: i32,
    pub stake: f64,
    pub potential_payout: f64,
}
