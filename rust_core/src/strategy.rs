//! Strategy engine: predictions + odds + risk tier -> bets and parlays.

use crate::error::StrategyError;
use crate::models::{
    BetRecommendation, Market, MarketPrediction, ParlayRecommendation, ScoredGame, UpcomingGame,
    UserContext,
};
use crate::odds::{self, STANDARD_TOTAL_ODDS};
use crate::policy::RecommendationPolicy;
use crate::predictor::PredictiveModel;
use std::sync::Arc;
use tracing::debug;

/// Round to cents without exceeding `cap`.
fn capped_stake(raw: f64, cap: f64) -> f64 {
    let stake = odds::round_to_cents(raw);
    if stake > cap {
        (cap * 100.0).floor() / 100.0
    } else {
        stake
    }
}

/// Book line as quoted: `-3.25`, `220.5`, `7.0`. Keeps every significant
/// decimal and at least one.
fn format_line(line: f64) -> String {
    let s = line.to_string();
    if s.contains('.') || !line.is_finite() {
        s
    } else {
        format!("{}.0", s)
    }
}

/// Side, description and price for one market of one game.
fn pick_side(game: &ScoredGame, prediction: &MarketPrediction) -> (String, i32) {
    let quote = &game.odds;
    match prediction.market {
        Market::Spread if prediction.value > 0.0 => (
            format!("{} {}", game.home_team, format_line(quote.spread)),
            quote.home_moneyline,
        ),
        Market::Spread => (
            format!("{} +{}", game.away_team, format_line(quote.spread.abs())),
            quote.away_moneyline,
        ),
        Market::Moneyline if prediction.value > 0.5 => {
            (format!("{} ML", game.home_team), quote.home_moneyline)
        }
        Market::Moneyline => (format!("{} ML", game.away_team), quote.away_moneyline),
        Market::Total if prediction.value > quote.over_under => {
            (format!("Over {}", format_line(quote.over_under)), STANDARD_TOTAL_ODDS)
        }
        Market::Total => (format!("Under {}", format_line(quote.over_under)), STANDARD_TOTAL_ODDS),
    }
}

pub struct StrategyEngine {
    model: Arc<PredictiveModel>,
}

impl StrategyEngine {
    pub fn new(model: Arc<PredictiveModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<PredictiveModel> {
        &self.model
    }

    /// Attach predictions to each upcoming game, preserving order.
    pub fn score_games(&self, games: &[UpcomingGame]) -> Result<Vec<ScoredGame>, StrategyError> {
        let features: Vec<_> = games.iter().map(|g| g.features).collect();
        let predictions = self.model.predict_batch(&features)?;

        Ok(games
            .iter()
            .zip(predictions)
            .map(|(game, predictions)| ScoredGame {
                game_id: game.game_id.clone(),
                home_team: game.home_team.clone(),
                away_team: game.away_team.clone(),
                odds: game.odds,
                predictions,
            })
            .collect())
    }

    fn candidates(
        ctx: &UserContext,
        policy: &RecommendationPolicy,
        threshold: f64,
        games: &[ScoredGame],
        game_filter: Option<&str>,
    ) -> Result<Vec<BetRecommendation>, StrategyError> {
        odds::validate_stake(ctx.bankroll)?;
        let cap = policy.single_stake_cap(ctx.bankroll);

        let mut bets = Vec::new();
        for game in games {
            if game_filter.map_or(false, |id| id != game.game_id) {
                continue;
            }
            for prediction in game.predictions.iter() {
                if prediction.confidence < threshold {
                    continue;
                }

                let (description, american_odds) = pick_side(game, prediction);
                odds::american_to_decimal(american_odds)?;

                let stake = capped_stake(
                    ctx.bankroll * policy.max_single_stake_fraction * prediction.confidence,
                    cap,
                );
                if stake <= 0.0 {
                    debug!(
                        "Dropping {} {} for {}: stake rounds to zero",
                        game.game_id, prediction.market, ctx.user_id
                    );
                    continue;
                }

                bets.push(BetRecommendation {
                    game_id: game.game_id.clone(),
                    home_team: game.home_team.clone(),
                    away_team: game.away_team.clone(),
                    market: prediction.market,
                    description,
                    american_odds,
                    confidence: prediction.confidence,
                    stake,
                });
            }
        }
        Ok(bets)
    }

    /// Single-bet recommendations clearing the tier's confidence threshold,
    /// in game order then market order. `game_filter` restricts to one game.
    pub fn recommend_bets(
        &self,
        ctx: &UserContext,
        games: &[ScoredGame],
        game_filter: Option<&str>,
    ) -> Result<Vec<BetRecommendation>, StrategyError> {
        let policy = RecommendationPolicy::for_tier(ctx.risk_tier);
        let bets = Self::candidates(ctx, &policy, policy.confidence_threshold, games, game_filter)?;
        debug!(
            "{} single bets for {} ({} tier, {} games)",
            bets.len(),
            ctx.user_id,
            ctx.risk_tier,
            games.len()
        );
        Ok(bets)
    }

    /// Highest-confidence parlay-eligible legs combined into one bet.
    /// `Ok(None)` when fewer than two legs qualify.
    pub fn recommend_parlay(
        &self,
        ctx: &UserContext,
        games: &[ScoredGame],
    ) -> Result<Option<ParlayRecommendation>, StrategyError> {
        let policy = RecommendationPolicy::for_tier(ctx.risk_tier);
        let mut legs = Self::candidates(ctx, &policy, policy.parlay_confidence_threshold, games, None)?;

        // Stable: equal confidences keep game order
        legs.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        legs.truncate(policy.max_parlay_legs);

        if legs.len() < 2 {
            debug!(
                "No parlay for {}: {} eligible legs",
                ctx.user_id,
                legs.len()
            );
            return Ok(None);
        }

        let leg_odds: Vec<i32> = legs.iter().map(|l| l.american_odds).collect();
        let combined_american_odds = odds::combine_legs(&leg_odds)?;

        let stake = capped_stake(
            ctx.bankroll * policy.max_parlay_stake_fraction,
            policy.parlay_stake_cap(ctx.bankroll),
        );
        if stake <= 0.0 {
            debug!("No parlay for {}: stake rounds to zero", ctx.user_id);
            return Ok(None);
        }
        let potential_payout = odds::round_to_cents(odds::payout(stake, combined_american_odds)?);

        Ok(Some(ParlayRecommendation {
            legs,
            combined_american_odds,
            stake,
            potential_payout,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::InMemoryArtifactStore;
    use crate::config::ModelConfig;
    use crate::error::OddsError;
    use crate::models::{GamePredictions, OddsQuote, RiskTier};
    use crate::training::TrainingData;

    fn engine() -> StrategyEngine {
        let model = PredictiveModel::new(
            ModelConfig::default(),
            Arc::new(TrainingData::default()),
            Arc::new(InMemoryArtifactStore::new()),
        );
        StrategyEngine::new(Arc::new(model))
    }

    fn ctx(tier: RiskTier, bankroll: f64) -> UserContext {
        UserContext {
            user_id: "u1".to_string(),
            risk_tier: tier,
            bankroll,
        }
    }

    fn game(id: &str, spread: (f64, f64), total: (f64, f64), ml: (f64, f64)) -> ScoredGame {
        ScoredGame {
            game_id: id.to_string(),
            home_team: "Lakers".to_string(),
            away_team: "Celtics".to_string(),
            odds: OddsQuote {
                home_moneyline: -150,
                away_moneyline: 130,
                spread: -3.5,
                over_under: 220.5,
            },
            predictions: GamePredictions {
                spread: MarketPrediction::new(Market::Spread, spread.0, spread.1),
                total: MarketPrediction::new(Market::Total, total.0, total.1),
                moneyline: MarketPrediction::new(Market::Moneyline, ml.0, ml.1),
            },
        }
    }

    #[test]
    fn test_moderate_stake_scenario() {
        let games = vec![game("g1", (6.0, 0.8), (225.0, 0.5), (0.5, 0.5))];
        let bets = engine()
            .recommend_bets(&ctx(RiskTier::Moderate, 1000.0), &games, None)
            .unwrap();

        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].market, Market::Spread);
        assert_eq!(bets[0].stake, 80.0);
        assert_eq!(bets[0].description, "Lakers -3.5");
        assert_eq!(bets[0].american_odds, -150);
    }

    #[test]
    fn test_quarter_point_lines_keep_precision() {
        let mut g = game("g1", (6.0, 0.9), (210.0, 0.9), (0.5, 0.5));
        g.odds.spread = -3.25;
        g.odds.over_under = 221.0;
        let bets = engine()
            .recommend_bets(&ctx(RiskTier::Aggressive, 1000.0), &[g.clone()], None)
            .unwrap();
        assert_eq!(bets[0].description, "Lakers -3.25");
        assert_eq!(bets[1].description, "Under 221.0");

        g.predictions.spread = MarketPrediction::new(Market::Spread, -6.0, 0.9);
        g.odds.spread = 7.75;
        let bets = engine()
            .recommend_bets(&ctx(RiskTier::Aggressive, 1000.0), &[g], None)
            .unwrap();
        assert_eq!(bets[0].description, "Celtics +7.75");

        assert_eq!(format_line(-3.5), "-3.5");
        assert_eq!(format_line(7.0), "7.0");
        assert_eq!(format_line(-0.25), "-0.25");
    }

    #[test]
    fn test_side_selection() {
        let games = vec![game("g1", (-4.0, 0.9), (210.0, 0.9), (0.3, 0.9))];
        let bets = engine()
            .recommend_bets(&ctx(RiskTier::Aggressive, 1000.0), &games, None)
            .unwrap();

        let by_market = |m: Market| bets.iter().find(|b| b.market == m).unwrap();
        assert_eq!(by_market(Market::Spread).description, "Celtics +3.5");
        assert_eq!(by_market(Market::Spread).american_odds, 130);
        assert_eq!(by_market(Market::Total).description, "Under 220.5");
        assert_eq!(by_market(Market::Total).american_odds, -110);
        assert_eq!(by_market(Market::Moneyline).description, "Celtics ML");

        let over = vec![game("g2", (1.0, 0.2), (230.0, 0.9), (0.7, 0.9))];
        let bets = engine()
            .recommend_bets(&ctx(RiskTier::Aggressive, 1000.0), &over, None)
            .unwrap();
        assert_eq!(bets[0].description, "Over 220.5");
        assert_eq!(bets[1].description, "Lakers ML");
        assert_eq!(bets[1].american_odds, -150);
    }

    #[test]
    fn test_threshold_filters_and_game_filter() {
        let games = vec![
            game("g1", (6.0, 0.8), (225.0, 0.7), (0.9, 0.8)),
            game("g2", (2.0, 0.6), (225.0, 0.7), (0.6, 0.6)),
        ];
        let e = engine();

        let conservative = e
            .recommend_bets(&ctx(RiskTier::Conservative, 1000.0), &games, None)
            .unwrap();
        assert_eq!(conservative.len(), 2);
        assert!(conservative.iter().all(|b| b.confidence >= 0.75));

        let only_g2 = e
            .recommend_bets(&ctx(RiskTier::Aggressive, 1000.0), &games, Some("g2"))
            .unwrap();
        assert_eq!(only_g2.len(), 3);
        assert!(only_g2.iter().all(|b| b.game_id == "g2"));
    }

    #[test]
    fn test_stakes_never_exceed_cap() {
        let games = vec![game("g1", (9.0, 0.9), (225.0, 0.7), (0.95, 0.9))];
        for tier in [RiskTier::Conservative, RiskTier::Moderate, RiskTier::Aggressive] {
            let policy = RecommendationPolicy::for_tier(tier);
            for bankroll in [0.5, 1.0, 33.33, 1000.0, 12345.67] {
                let c = ctx(tier, bankroll);
                for bet in engine().recommend_bets(&c, &games, None).unwrap() {
                    assert!(bet.stake > 0.0);
                    assert!(bet.stake <= policy.single_stake_cap(bankroll));
                }
                if let Some(p) = engine().recommend_parlay(&c, &games).unwrap() {
                    assert!(p.stake > 0.0);
                    assert!(p.stake <= policy.parlay_stake_cap(bankroll));
                }
            }
        }
    }

    #[test]
    fn test_zero_stake_dropped() {
        let games = vec![game("g1", (6.0, 0.8), (225.0, 0.5), (0.5, 0.5))];
        let bets = engine()
            .recommend_bets(&ctx(RiskTier::Conservative, 0.01), &games, None)
            .unwrap();
        assert!(bets.is_empty());
    }

    #[test]
    fn test_invalid_bankroll_rejected() {
        let games = vec![game("g1", (6.0, 0.8), (225.0, 0.5), (0.5, 0.5))];
        let err = engine()
            .recommend_bets(&ctx(RiskTier::Moderate, 0.0), &games, None)
            .unwrap_err();
        assert!(matches!(err, StrategyError::Odds(OddsError::InvalidStake(_))));
    }

    #[test]
    fn test_zero_book_price_surfaces_invalid_odds() {
        let mut g = game("g1", (6.0, 0.8), (225.0, 0.5), (0.5, 0.5));
        g.odds.home_moneyline = 0;
        let err = engine()
            .recommend_bets(&ctx(RiskTier::Moderate, 1000.0), &[g], None)
            .unwrap_err();
        assert!(matches!(err, StrategyError::Odds(OddsError::InvalidOdds(_))));
    }

    #[test]
    fn test_parlay_none_with_one_leg() {
        let games = vec![game("g1", (6.0, 0.8), (225.0, 0.5), (0.5, 0.5))];
        let parlay = engine()
            .recommend_parlay(&ctx(RiskTier::Moderate, 1000.0), &games)
            .unwrap();
        assert!(parlay.is_none());
    }

    #[test]
    fn test_parlay_takes_top_legs() {
        let games = vec![
            game("g1", (6.0, 0.8), (225.0, 0.7), (0.9, 0.8)),
            game("g2", (9.0, 0.9), (210.0, 0.7), (0.6, 0.6)),
        ];
        let parlay = engine()
            .recommend_parlay(&ctx(RiskTier::Moderate, 1000.0), &games)
            .unwrap()
            .expect("parlay");

        assert_eq!(parlay.legs.len(), 3);
        assert_eq!(parlay.legs[0].game_id, "g2");
        assert_eq!(parlay.legs[0].confidence, 0.9);
        // Ties keep game order
        assert_eq!(parlay.legs[1].market, Market::Spread);
        assert_eq!(parlay.legs[1].game_id, "g1");
        assert_eq!(parlay.legs[2].market, Market::Moneyline);
        assert_eq!(parlay.stake, 50.0);

        let odds: Vec<i32> = parlay.legs.iter().map(|l| l.american_odds).collect();
        assert_eq!(parlay.combined_american_odds, odds::combine_legs(&odds).unwrap());
        assert_eq!(
            parlay.potential_payout,
            odds::round_to_cents(odds::payout(50.0, parlay.combined_american_odds).unwrap())
        );
    }

    #[test]
    fn test_aggressive_parlay_uses_stricter_threshold() {
        // 0.58 clears the single-bet bar but not the parlay bar
        let games = vec![
            game("g1", (1.6, 0.58), (225.0, 0.7), (0.5, 0.5)),
            game("g2", (1.6, 0.58), (210.0, 0.5), (0.5, 0.5)),
        ];
        let c = ctx(RiskTier::Aggressive, 1000.0);
        let e = engine();

        assert_eq!(e.recommend_bets(&c, &games, None).unwrap().len(), 3);
        assert!(e.recommend_parlay(&c, &games).unwrap().is_none());
    }

    #[test]
    fn test_parlay_of_two_standard_totals() {
        let games = vec![
            game("g1", (1.0, 0.5), (230.0, 0.8), (0.5, 0.5)),
            game("g2", (1.0, 0.5), (200.0, 0.8), (0.5, 0.5)),
        ];
        let parlay = engine()
            .recommend_parlay(&ctx(RiskTier::Conservative, 1000.0), &games)
            .unwrap()
            .expect("parlay");
        assert_eq!(parlay.combined_american_odds, 264);
        assert_eq!(parlay.stake, 20.0);
        assert_eq!(parlay.potential_payout, 52.8);
    }
}
