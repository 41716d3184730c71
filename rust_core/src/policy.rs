//! Risk-tier recommendation policy.
//!
//! | Tier         | single | parlay | single stake | legs | parlay stake |
//! |--------------|--------|--------|--------------|------|--------------|
//! | Conservative | 0.75   | 0.75   | 5%           | 2    | 2%           |
//! | Moderate     | 0.65   | 0.65   | 10%          | 3    | 5%           |
//! | Aggressive   | 0.55   | 0.60   | 15%          | 4    | 8%           |
//!
//! Aggressive uses a stricter threshold for parlay eligibility than for
//! single bets.

use crate::models::RiskTier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPolicy {
    /// Minimum confidence for a single-bet recommendation
    pub confidence_threshold: f64,
    /// Minimum confidence for a parlay leg
    pub parlay_confidence_threshold: f64,
    pub max_single_stake_fraction: f64,
    pub max_parlay_legs: usize,
    pub max_parlay_stake_fraction: f64,
}

impl RecommendationPolicy {
    pub const CONSERVATIVE: Self = Self {
        confidence_threshold: 0.75,
        parlay_confidence_threshold: 0.75,
        max_single_stake_fraction: 0.05,
        max_parlay_legs: 2,
        max_parlay_stake_fraction: 0.02,
    };

    pub const MODERATE: Self = Self {
        confidence_threshold: 0.65,
        parlay_confidence_threshold: 0.65,
        max_single_stake_fraction: 0.10,
        max_parlay_legs: 3,
        max_parlay_stake_fraction: 0.05,
    };

    pub const AGGRESSIVE: Self = Self {
        confidence_threshold: 0.55,
        parlay_confidence_threshold: 0.60,
        max_single_stake_fraction: 0.15,
        max_parlay_legs: 4,
        max_parlay_stake_fraction: 0.08,
    };

    pub fn for_tier(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Conservative => Self::CONSERVATIVE,
            RiskTier::Moderate => Self::MODERATE,
            RiskTier::Aggressive => Self::AGGRESSIVE,
        }
    }

    /// Largest single-bet stake this policy allows for `bankroll`.
    pub fn single_stake_cap(&self, bankroll: f64) -> f64 {
        bankroll * self.max_single_stake_fraction
    }

    pub fn parlay_stake_cap(&self, bankroll: f64) -> f64 {
        bankroll * self.max_parlay_stake_fraction
    }
}

impl From<RiskTier> for RecommendationPolicy {
    fn from(tier: RiskTier) -> Self {
        Self::for_tier(tier)
    }
}
