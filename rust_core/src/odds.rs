//! American/decimal odds arithmetic.
//!
//! - American odds: positive = profit per 100 staked, negative = stake
//!   required per 100 profit. Zero is never a valid American price.
//! - Decimal odds: total returned per unit staked (stake included).
//!
//! Magnitudes below 100 are accepted on input but normalize to the canonical
//! form on the way back (`+50` -> `1.5` -> `-200`).

use crate::error::OddsError;

/// Price used for Over/Under recommendations when no book price is quoted.
pub const STANDARD_TOTAL_ODDS: i32 = -110;

/// Convert American odds to decimal odds.
pub fn american_to_decimal(odds: i32) -> Result<f64, OddsError> {
    match odds {
        0 => Err(OddsError::InvalidOdds(
            "American odds cannot be zero".to_string(),
        )),
        o if o > 0 => Ok(1.0 + o as f64 / 100.0),
        o => Ok(1.0 + 100.0 / (o as f64).abs()),
    }
}

/// Convert decimal odds back to American odds, rounded to the nearest integer.
pub fn decimal_to_american(decimal_odds: f64) -> Result<i32, OddsError> {
    if !decimal_odds.is_finite() || decimal_odds <= 1.0 {
        return Err(OddsError::InvalidOdds(format!(
            "decimal odds {} pay nothing above stake",
            decimal_odds
        )));
    }

    let american = if decimal_odds >= 2.0 {
        ((decimal_odds - 1.0) * 100.0).round()
    } else {
        (-100.0 / (decimal_odds - 1.0)).round()
    };

    if american.abs() > i32::MAX as f64 {
        return Err(OddsError::InvalidOdds(format!(
            "decimal odds {} overflow American range",
            decimal_odds
        )));
    }

    Ok(american as i32)
}

/// Combine parlay legs into a single American price.
///
/// The product of decimal odds is taken over the legs sorted by price, so the
/// result does not depend on leg order.
pub fn combine_legs(odds_list: &[i32]) -> Result<i32, OddsError> {
    match odds_list {
        [] => Err(OddsError::InvalidOdds(
            "a parlay needs at least one leg".to_string(),
        )),
        [single] => {
            american_to_decimal(*single)?;
            Ok(*single)
        }
        legs => {
            let mut decimals = legs
                .iter()
                .map(|&o| american_to_decimal(o))
                .collect::<Result<Vec<f64>, _>>()?;
            decimals.sort_by(f64::total_cmp);

            let combined: f64 = decimals.iter().product();
            decimal_to_american(combined)
        }
    }
}

/// Profit (stake excluded) returned by a winning bet at `american_odds`.
pub fn payout(stake: f64, american_odds: i32) -> Result<f64, OddsError> {
    validate_stake(stake)?;
    match american_odds {
        0 => Err(OddsError::InvalidOdds(
            "American odds cannot be zero".to_string(),
        )),
        o if o > 0 => Ok(stake * o as f64 / 100.0),
        o => Ok(stake * 100.0 / (o as f64).abs()),
    }
}

/// Reject stakes (and bankrolls) that are not strictly positive amounts.
pub fn validate_stake(amount: f64) -> Result<(), OddsError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(OddsError::InvalidStake(format!(
            "amount must be positive, got {}",
            amount
        )))
    }
}

/// Round a dollar amount to the nearest cent
#[inline]
pub fn round_to_cents(dollars: f64) -> f64 {
    (dollars * 100.0).round() / 100.0
}
