//! Risk-tier assessment.
//!
//! A new user answers a five-question questionnaire; the averaged option
//! scores give a 1-10 risk appetite, which maps onto a [`RiskTier`]. Later the
//! appetite drifts toward the user's observed betting behaviour, one point per
//! update at most.

use crate::models::{Market, RiskTier};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MIN_APPETITE: u8 = 1;
pub const MAX_APPETITE: u8 = 10;
/// Appetite used when no usable answers or bets are available
pub const NEUTRAL_APPETITE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionOption {
    pub value: u8,
    pub text: &'static str,
    pub score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub id: &'static str,
    pub text: &'static str,
    pub options: [QuestionOption; 5],
}

impl Question {
    fn score_for(&self, value: u8) -> Option<u8> {
        self.options.iter().find(|o| o.value == value).map(|o| o.score)
    }
}

const fn opt(value: u8, text: &'static str, score: u8) -> QuestionOption {
    QuestionOption { value, text, score }
}

pub const BETTING_FREQUENCY: &str = "betting_frequency";
pub const BET_SIZE: &str = "bet_size";
pub const PARLAY_PREFERENCE: &str = "parlay_preference";
pub const LOSING_STREAK: &str = "losing_streak";
pub const ODDS_PREFERENCE: &str = "odds_preference";

pub static QUESTIONNAIRE: [Question; 5] = [
    Question {
        id: BETTING_FREQUENCY,
        text: "How often do you typically place bets?",
        options: [
            opt(1, "Rarely (a few times a year)", 1),
            opt(2, "Occasionally (monthly)", 3),
            opt(3, "Regularly (weekly)", 6),
            opt(4, "Frequently (multiple times per week)", 8),
            opt(5, "Daily", 10),
        ],
    },
    Question {
        id: BET_SIZE,
        text: "What percentage of your betting budget would you be comfortable risking on a single bet?",
        options: [
            opt(1, "1-2% (very conservative)", 1),
            opt(2, "3-5% (conservative)", 3),
            opt(3, "6-10% (moderate)", 5),
            opt(4, "11-20% (aggressive)", 8),
            opt(5, "21%+ (very aggressive)", 10),
        ],
    },
    Question {
        id: PARLAY_PREFERENCE,
        text: "When it comes to parlays, which best describes your preference?",
        options: [
            opt(1, "I avoid parlays completely", 1),
            opt(2, "I prefer 2-leg parlays with high probability", 3),
            opt(3, "I like 3-4 leg parlays with moderate odds", 6),
            opt(4, "I enjoy 5+ leg parlays for the bigger payouts", 9),
            opt(5, "The more legs the better - I want huge paydays", 10),
        ],
    },
    Question {
        id: LOSING_STREAK,
        text: "How would you react to a 5-bet losing streak?",
        options: [
            opt(1, "Stop betting for a while to reassess", 1),
            opt(2, "Reduce my bet size significantly", 3),
            opt(3, "Continue with slightly smaller bets", 5),
            opt(4, "Maintain my regular betting pattern", 7),
            opt(5, "Increase my bets to recover losses faster", 10),
        ],
    },
    Question {
        id: ODDS_PREFERENCE,
        text: "Which type of odds do you generally prefer?",
        options: [
            opt(1, "Heavy favorites (-200 or higher)", 2),
            opt(2, "Moderate favorites (-120 to -190)", 4),
            opt(3, "Near even odds (-110 to +110)", 6),
            opt(4, "Moderate underdogs (+120 to +200)", 8),
            opt(5, "Heavy underdogs (+250 or higher)", 10),
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question_id: String,
    pub value: u8,
}

/// Appetite <= 3 is Conservative, >= 8 Aggressive, anything else Moderate.
pub fn tier_from_appetite(appetite: u8) -> RiskTier {
    match appetite {
        0..=3 => RiskTier::Conservative,
        8.. => RiskTier::Aggressive,
        _ => RiskTier::Moderate,
    }
}

/// Kinds of bet a user may place or prefer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetKind {
    Moneyline,
    Spread,
    Total,
    Parlay,
}

impl BetKind {
    pub const ALL: [BetKind; 4] = [
        BetKind::Moneyline,
        BetKind::Spread,
        BetKind::Total,
        BetKind::Parlay,
    ];
}

impl From<Market> for BetKind {
    fn from(market: Market) -> Self {
        match market {
            Market::Spread => BetKind::Spread,
            Market::Total => BetKind::Total,
            Market::Moneyline => BetKind::Moneyline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetPreferences {
    pub bet_kinds: Vec<BetKind>,
    pub min_odds: i32,
    pub max_odds: i32,
    pub max_parlay_legs: usize,
}

impl Default for BetPreferences {
    fn default() -> Self {
        Self {
            bet_kinds: vec![BetKind::Moneyline, BetKind::Spread, BetKind::Total],
            min_odds: -200,
            max_odds: 1000,
            max_parlay_legs: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// 1 (most cautious) to 10
    pub appetite: u8,
    pub tier: RiskTier,
    pub preferences: BetPreferences,
}

impl RiskProfile {
    pub fn from_appetite(appetite: u8, preferences: BetPreferences) -> Self {
        let appetite = appetite.clamp(MIN_APPETITE, MAX_APPETITE);
        Self {
            appetite,
            tier: tier_from_appetite(appetite),
            preferences,
        }
    }

    /// Score a questionnaire. Unknown questions or option values are skipped.
    pub fn from_questionnaire(responses: &[QuestionResponse]) -> Self {
        let scores: Vec<u32> = responses
            .iter()
            .filter_map(|r| {
                let score = QUESTIONNAIRE
                    .iter()
                    .find(|q| q.id == r.question_id)
                    .and_then(|q| q.score_for(r.value));
                if score.is_none() {
                    debug!("Ignoring response {}={}", r.question_id, r.value);
                }
                score.map(u32::from)
            })
            .collect();

        let appetite = if scores.is_empty() {
            NEUTRAL_APPETITE
        } else {
            (scores.iter().sum::<u32>() as f64 / scores.len() as f64).round() as u8
        };

        Self::from_appetite(appetite, preferences_from_answers(responses))
    }

    /// Largest single bet the user is comfortable with, as a percentage of
    /// budget: twice the appetite, kept within 2..=25.
    pub fn max_bet_percentage(&self) -> u8 {
        self.appetite.saturating_mul(2).clamp(2, 25)
    }

    /// Move one point toward the behavioural score and adopt the observed
    /// preferences.
    pub fn adjust_from_behavior(&self, analysis: &BehaviorAnalysis) -> Self {
        let appetite = match analysis.risk_score.cmp(&self.appetite) {
            std::cmp::Ordering::Greater => (self.appetite + 1).min(MAX_APPETITE),
            std::cmp::Ordering::Less => self.appetite.saturating_sub(1).max(MIN_APPETITE),
            std::cmp::Ordering::Equal => self.appetite,
        };
        if appetite != self.appetite {
            debug!(
                "Risk appetite {} -> {} (behaviour score {})",
                self.appetite, appetite, analysis.risk_score
            );
        }
        Self::from_appetite(appetite, analysis.preferences.clone())
    }
}

fn answer(responses: &[QuestionResponse], id: &str) -> Option<u8> {
    responses.iter().find(|r| r.question_id == id).map(|r| r.value)
}

fn preferences_from_answers(responses: &[QuestionResponse]) -> BetPreferences {
    let defaults = BetPreferences::default();

    let mut bet_kinds = defaults.bet_kinds.clone();
    if answer(responses, PARLAY_PREFERENCE).map_or(false, |v| v > 1) {
        bet_kinds.push(BetKind::Parlay);
    }

    let odds = answer(responses, ODDS_PREFERENCE);
    let (min_odds, max_odds) = match odds {
        Some(1) => (-300, 200),
        Some(2) => (-200, 300),
        Some(3) => (-150, 500),
        Some(4) => (-110, 750),
        Some(5) => (100, 2000),
        _ => (defaults.min_odds, defaults.max_odds),
    };

    let max_parlay_legs = match answer(responses, PARLAY_PREFERENCE) {
        Some(1) => 2,
        Some(2) => 3,
        Some(3) => 5,
        Some(4) => 8,
        Some(5) => 12,
        _ => defaults.max_parlay_legs,
    };

    BetPreferences {
        bet_kinds,
        min_odds,
        max_odds,
        max_parlay_legs,
    }
}

/// A bet the user actually placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBet {
    pub kind: BetKind,
    pub american_odds: i32,
    /// Number of legs for parlays
    #[serde(default)]
    pub legs: usize,
    /// Stake as a fraction of bankroll, when known
    #[serde(default)]
    pub stake_fraction: Option<f64>,
}

impl PlacedBet {
    /// 1-10 risk score of a single bet.
    pub fn risk_score(&self) -> u8 {
        let mut score: i32 = match self.american_odds {
            o if o <= -250 => 2,
            o if o <= -150 => 3,
            o if o <= -110 => 4,
            o if o <= 150 => 6,
            o if o <= 250 => 8,
            _ => 10,
        };

        if self.kind == BetKind::Parlay {
            score += self.legs.saturating_sub(1).min(5) as i32;
        }

        match self.stake_fraction {
            Some(f) if f <= 0.02 => score -= 2,
            Some(f) if f <= 0.05 => score -= 1,
            Some(f) if f >= 0.15 => score += 2,
            Some(f) if f >= 0.10 => score += 1,
            _ => {}
        }

        score.clamp(MIN_APPETITE as i32, MAX_APPETITE as i32) as u8
    }
}

/// Share of history a bet kind needs to count as preferred
const PREFERRED_KIND_SHARE: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorAnalysis {
    pub risk_score: u8,
    pub preferences: BetPreferences,
}

/// Round up to a multiple of 10, saturating at `i32::MAX`.
fn ceil_to_ten(odds: i32) -> i32 {
    let tens = odds.div_euclid(10) + i32::from(odds.rem_euclid(10) != 0);
    tens.saturating_mul(10)
}

pub fn analyze_behavior(history: &[PlacedBet]) -> BehaviorAnalysis {
    if history.is_empty() {
        return BehaviorAnalysis {
            risk_score: NEUTRAL_APPETITE,
            preferences: BetPreferences::default(),
        };
    }

    let n = history.len() as f64;
    let total: u32 = history.iter().map(|b| u32::from(b.risk_score())).sum();
    let risk_score = (total as f64 / n).round() as u8;

    let mut bet_kinds: Vec<BetKind> = BetKind::ALL
        .into_iter()
        .filter(|kind| {
            let count = history.iter().filter(|b| b.kind == *kind).count();
            count as f64 / n >= PREFERRED_KIND_SHARE
        })
        .collect();
    if bet_kinds.is_empty() {
        bet_kinds.push(BetKind::Moneyline);
    }

    // Non-empty history, so both bounds exist
    let min_odds = history.iter().map(|b| b.american_odds).min().unwrap_or(-200);
    let max_odds = history.iter().map(|b| b.american_odds).max().unwrap_or(1000);

    let max_parlay_legs = history
        .iter()
        .filter(|b| b.kind == BetKind::Parlay)
        .map(|b| b.legs)
        .max()
        .filter(|&legs| legs > 0)
        .unwrap_or(BetPreferences::default().max_parlay_legs);

    BehaviorAnalysis {
        risk_score,
        preferences: BetPreferences {
            bet_kinds,
            min_odds: min_odds.div_euclid(10).saturating_mul(10),
            max_odds: ceil_to_ten(max_odds),
            max_parlay_legs,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responses(values: [u8; 5]) -> Vec<QuestionResponse> {
        QUESTIONNAIRE
            .iter()
            .zip(values)
            .map(|(q, value)| QuestionResponse {
                question_id: q.id.to_string(),
                value,
            })
            .collect()
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(tier_from_appetite(1), RiskTier::Conservative);
        assert_eq!(tier_from_appetite(3), RiskTier::Conservative);
        assert_eq!(tier_from_appetite(4), RiskTier::Moderate);
        assert_eq!(tier_from_appetite(7), RiskTier::Moderate);
        assert_eq!(tier_from_appetite(8), RiskTier::Aggressive);
        assert_eq!(tier_from_appetite(10), RiskTier::Aggressive);
    }

    #[test]
    fn test_cautious_questionnaire() {
        let profile = RiskProfile::from_questionnaire(&responses([1, 1, 1, 1, 1]));
        // (1 + 1 + 1 + 1 + 2) / 5 = 1.2
        assert_eq!(profile.appetite, 1);
        assert_eq!(profile.tier, RiskTier::Conservative);
        assert_eq!(profile.max_bet_percentage(), 2);
        assert_eq!(profile.preferences.max_parlay_legs, 2);
        assert!(!profile.preferences.bet_kinds.contains(&BetKind::Parlay));
        assert_eq!(profile.preferences.min_odds, -300);
    }

    #[test]
    fn test_bold_questionnaire() {
        let profile = RiskProfile::from_questionnaire(&responses([5, 5, 4, 5, 5]));
        // (10 + 10 + 9 + 10 + 10) / 5 = 9.8
        assert_eq!(profile.appetite, 10);
        assert_eq!(profile.tier, RiskTier::Aggressive);
        assert_eq!(profile.max_bet_percentage(), 20);
        assert!(profile.preferences.bet_kinds.contains(&BetKind::Parlay));
        assert_eq!(profile.preferences.max_parlay_legs, 8);
        assert_eq!(profile.preferences.max_odds, 2000);
    }

    #[test]
    fn test_unknown_answers_are_skipped() {
        let mut answers = responses([3, 3, 3, 3, 3]);
        answers.push(QuestionResponse {
            question_id: "favorite_team".to_string(),
            value: 5,
        });
        answers[0].value = 9;
        // (5 + 6 + 5 + 6) / 4 = 5.5
        let profile = RiskProfile::from_questionnaire(&answers);
        assert_eq!(profile.appetite, 6);
        assert_eq!(profile.tier, RiskTier::Moderate);

        let empty = RiskProfile::from_questionnaire(&[]);
        assert_eq!(empty.appetite, NEUTRAL_APPETITE);
        assert_eq!(empty.preferences, BetPreferences::default());
    }

    #[test]
    fn test_bet_risk_score() {
        let single = |odds, stake_fraction| PlacedBet {
            kind: BetKind::Moneyline,
            american_odds: odds,
            legs: 0,
            stake_fraction,
        };
        assert_eq!(single(-300, None).risk_score(), 2);
        assert_eq!(single(-300, Some(0.01)).risk_score(), 1);
        assert_eq!(single(-110, None).risk_score(), 4);
        assert_eq!(single(120, Some(0.12)).risk_score(), 7);
        assert_eq!(single(400, Some(0.2)).risk_score(), 10);

        let parlay = PlacedBet {
            kind: BetKind::Parlay,
            american_odds: 600,
            legs: 4,
            stake_fraction: None,
        };
        assert_eq!(parlay.risk_score(), 10);
    }

    #[test]
    fn test_analyze_behavior() {
        let history = vec![
            PlacedBet {
                kind: BetKind::Spread,
                american_odds: -155,
                legs: 0,
                stake_fraction: Some(0.03),
            },
            PlacedBet {
                kind: BetKind::Spread,
                american_odds: -110,
                legs: 0,
                stake_fraction: None,
            },
            PlacedBet {
                kind: BetKind::Parlay,
                american_odds: 264,
                legs: 2,
                stake_fraction: None,
            },
        ];
        let analysis = analyze_behavior(&history);

        // (2 + 4 + 10) / 3 = 5.33
        assert_eq!(analysis.risk_score, 5);
        assert_eq!(
            analysis.preferences.bet_kinds,
            vec![BetKind::Spread, BetKind::Parlay]
        );
        assert_eq!(analysis.preferences.min_odds, -160);
        assert_eq!(analysis.preferences.max_odds, 270);
        assert_eq!(analysis.preferences.max_parlay_legs, 2);
    }

    #[test]
    fn test_out_of_range_inputs_saturate() {
        let profile = RiskProfile {
            appetite: 200,
            tier: RiskTier::Aggressive,
            preferences: BetPreferences::default(),
        };
        assert_eq!(profile.max_bet_percentage(), 25);

        let extreme = |american_odds| PlacedBet {
            kind: BetKind::Moneyline,
            american_odds,
            legs: 0,
            stake_fraction: None,
        };
        let analysis = analyze_behavior(&[extreme(i32::MIN), extreme(i32::MAX)]);
        assert_eq!(analysis.preferences.min_odds, i32::MIN);
        assert_eq!(analysis.preferences.max_odds, i32::MAX);

        assert_eq!(ceil_to_ten(-155), -150);
        assert_eq!(ceil_to_ten(270), 270);
        assert_eq!(ceil_to_ten(i32::MIN), -2147483640);
    }

    #[test]
    fn test_appetite_moves_one_point() {
        let profile = RiskProfile::from_appetite(3, BetPreferences::default());
        let bold = BehaviorAnalysis {
            risk_score: 9,
            preferences: BetPreferences::default(),
        };

        let next = profile.adjust_from_behavior(&bold);
        assert_eq!(next.appetite, 4);
        assert_eq!(next.tier, RiskTier::Moderate);

        let top = RiskProfile::from_appetite(10, BetPreferences::default());
        assert_eq!(top.adjust_from_behavior(&bold).appetite, 9);

        let floor = RiskProfile::from_appetite(1, BetPreferences::default());
        let cautious = BehaviorAnalysis {
            risk_score: 1,
            preferences: BetPreferences::default(),
        };
        assert_eq!(floor.adjust_from_behavior(&cautious).appetite, 1);
    }
}
