//! Gauge discovery
//!
//! Derives the full set of gauge addresses relevant to a user: gauges they
//! are staked in, plus gauges tied to pools they hold liquidity in.

use crate::indexer::{GaugeShare, LiquidityGauge};
use alloy_primitives::Address;
use std::collections::HashSet;

/// Union of staked-in gauges and gauges of the user's pools, deduplicated
/// preserving first-seen order. Pure and total: empty input yields empty
/// output, rows without a gauge id are skipped.
pub fn gauge_addresses(
    gauge_shares: &[GaugeShare],
    liquidity_gauges: &[LiquidityGauge],
) -> Vec<Address> {
    let staked = gauge_shares.iter().map(|share| share.gauge.id);
    let held = liquidity_gauges.iter().filter_map(|gauge| gauge.id);

    let mut seen = HashSet::new();
    let mut addresses = Vec::new();
    for address in staked.chain(held) {
        if seen.insert(address) {
            addresses.push(address);
        }
    }
    addresses
}

// ============================================
// TESTS
// ============================================
