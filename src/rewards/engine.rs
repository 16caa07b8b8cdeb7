//! Reward-rate engine
//!
//! Combines the global emission rate with per-gauge relative weights into a
//! payout per gauge over the reporting period, then converts payout into a
//! price-denominated yield figure. Pure and total: every lookup defaults to
//! the neutral element on missing data, and nothing here ever fails.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Seconds in the weekly reporting window (7 * 86400).
pub const SECONDS_PER_WEEK: f64 = 604_800.0;

/// Reporting window for payout figures. The choice changes the displayed
/// unit only, never correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardPeriod {
    /// One week of emissions (the figure the dashboard shows by default).
    #[default]
    Weekly,
    /// 52 weeks of emissions.
    Annual,
}

impl RewardPeriod {
    pub fn seconds(self) -> f64 {
        match self {
            RewardPeriod::Weekly => SECONDS_PER_WEEK,
            RewardPeriod::Annual => SECONDS_PER_WEEK * 52.0,
        }
    }
}

impl std::fmt::Display for RewardPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewardPeriod::Weekly => write!(f, "weekly"),
            RewardPeriod::Annual => write!(f, "annual"),
        }
    }
}

/// Lenient decimal-string parse. Anything unparseable or non-finite reads
/// as the neutral 0.
pub fn parse_decimal(value: &str) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Token payout per gauge over `period`:
/// `payout[g] = inflation_rate * period_seconds * weight[g]`, with a
/// missing weight entry behaving exactly like an explicit zero. Negative
/// or non-finite inputs clamp to 0, so non-negative inputs can never
/// produce a negative payout.
pub fn compute_payouts(
    inflation_rate: f64,
    weights: &HashMap<Address, f64>,
    gauge_addresses: &[Address],
    period: RewardPeriod,
) -> HashMap<Address, f64> {
    let rate = if inflation_rate.is_finite() && inflation_rate > 0.0 {
        inflation_rate
    } else {
        0.0
    };
    let period_emission = rate * period.seconds();

    gauge_addresses
        .iter()
        .map(|gauge| {
            let weight = weights
                .get(gauge)
                .copied()
                .filter(|w| w.is_finite() && *w > 0.0)
                .unwrap_or(0.0);
            (*gauge, period_emission * weight)
        })
        .collect()
}

/// Price-denominated payout per gauge. An unavailable price degrades the
/// whole map to zeros rather than erroring.
pub fn compute_aprs(
    payouts: &HashMap<Address, f64>,
    reward_token_price: Option<f64>,
) -> HashMap<Address, f64> {
    let price = reward_token_price
        .filter(|p| p.is_finite() && *p > 0.0)
        .unwrap_or(0.0);
    payouts
        .iter()
        .map(|(gauge, payout)| (*gauge, payout * price))
        .collect()
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn g1() -> Address {
        Address::from_str("0x1111111111111111111111111111111111111111").unwrap()
    }

    fn g2() -> Address {
        Address::from_str("0x2222222222222222222222222222222222222222").unwrap()
    }

    #[test]
    fn test_weekly_payout_scenario() {
        // inflation 1000 token/s, weight 0.5 => 1000 * 604800 * 0.5
        let weights = HashMap::from([(g1(), 0.5)]);
        let payouts = compute_payouts(1000.0, &weights, &[g1()], RewardPeriod::Weekly);
        assert_eq!(payouts[&g1()], 302_400_000.0);
    }

    #[test]
    fn test_zero_inflation_zeroes_everything() {
        let weights = HashMap::from([(g1(), 0.5), (g2(), 0.3)]);
        let payouts = compute_payouts(0.0, &weights, &[g1(), g2()], RewardPeriod::Weekly);
        assert!(payouts.values().all(|p| *p == 0.0));
        assert_eq!(payouts.len(), 2);
    }

    #[test]
    fn test_missing_weight_equals_explicit_zero() {
        let explicit = HashMap::from([(g1(), 0.4), (g2(), 0.0)]);
        let missing = HashMap::from([(g1(), 0.4)]);
        let a = compute_payouts(10.0, &explicit, &[g1(), g2()], RewardPeriod::Weekly);
        let b = compute_payouts(10.0, &missing, &[g1(), g2()], RewardPeriod::Weekly);
        assert_eq!(a, b);
        assert_eq!(a[&g2()], 0.0);
    }

    #[test]
    fn test_linearity() {
        let weights = HashMap::from([(g1(), 0.25)]);
        let base = compute_payouts(100.0, &weights, &[g1()], RewardPeriod::Weekly);
        let doubled_rate = compute_payouts(200.0, &weights, &[g1()], RewardPeriod::Weekly);
        assert_eq!(doubled_rate[&g1()], 2.0 * base[&g1()]);

        let doubled_weight = HashMap::from([(g1(), 0.5)]);
        let doubled = compute_payouts(100.0, &doubled_weight, &[g1()], RewardPeriod::Weekly);
        assert_eq!(doubled[&g1()], 2.0 * base[&g1()]);
    }

    #[test]
    fn test_never_negative_for_non_negative_inputs() {
        let weights = HashMap::from([(g1(), 0.7)]);
        let payouts = compute_payouts(5.0, &weights, &[g1(), g2()], RewardPeriod::Annual);
        assert!(payouts.values().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_negative_inputs_clamp_to_zero() {
        let weights = HashMap::from([(g1(), -0.5)]);
        let payouts = compute_payouts(-10.0, &weights, &[g1()], RewardPeriod::Weekly);
        assert_eq!(payouts[&g1()], 0.0);
    }

    #[test]
    fn test_annual_period_is_52_weeks() {
        let weights = HashMap::from([(g1(), 1.0)]);
        let weekly = compute_payouts(1.0, &weights, &[g1()], RewardPeriod::Weekly);
        let annual = compute_payouts(1.0, &weights, &[g1()], RewardPeriod::Annual);
        assert_eq!(annual[&g1()], 52.0 * weekly[&g1()]);
    }

    #[test]
    fn test_aprs_degrade_without_price() {
        let payouts = HashMap::from([(g1(), 1000.0)]);
        let aprs = compute_aprs(&payouts, None);
        assert_eq!(aprs[&g1()], 0.0);

        let aprs = compute_aprs(&payouts, Some(2.5));
        assert_eq!(aprs[&g1()], 2500.0);
    }

    #[test]
    fn test_parse_decimal_is_lenient() {
        assert_eq!(parse_decimal("1000"), 1000.0);
        assert_eq!(parse_decimal(" 0.5 "), 0.5);
        assert_eq!(parse_decimal("not-a-number"), 0.0);
        assert_eq!(parse_decimal("NaN"), 0.0);
    }
}
