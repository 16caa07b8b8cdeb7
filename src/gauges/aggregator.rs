//! Staking data aggregator
//!
//! Fetches, in one pass, the user's gauge-share balances and the
//! liquidity-gauge records for their pools. Disabled until the pool-id
//! list is non-empty so we never issue a query with a vacuous filter.

use crate::errors::StakingError;
use crate::indexer::{GaugeShare, Indexer, LiquidityGauge};
use crate::remote::Remote;
use alloy_primitives::Address;
use std::collections::HashSet;
use tracing::debug;

/// One immutable snapshot of the user's staking inputs. Replaced wholesale
/// on each fetch cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StakingData {
    pub gauge_shares: Vec<GaugeShare>,
    pub liquidity_gauges: Vec<LiquidityGauge>,
}

impl StakingData {
    /// Pool ids drawn from the user's gauge shares, deduplicated in
    /// first-seen order. Drives the staked-pool-set fetch.
    pub fn staked_pool_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for share in &self.gauge_shares {
            if seen.insert(share.gauge.pool_id.clone()) {
                ids.push(share.gauge.pool_id.clone());
            }
        }
        ids
    }
}

pub struct StakingDataAggregator<'a, I: Indexer> {
    indexer: &'a I,
}

impl<'a, I: Indexer> StakingDataAggregator<'a, I> {
    pub fn new(indexer: &'a I) -> Self {
        Self { indexer }
    }

    /// Fetch both views concurrently. Idle while `pool_ids` is empty;
    /// remote "no match" is an empty snapshot, not an error.
    pub async fn fetch(&self, account: Address, pool_ids: &[String]) -> Remote<StakingData> {
        if pool_ids.is_empty() {
            return Remote::Idle;
        }

        let shares = self.indexer.gauge_shares(account);
        let gauges = self.indexer.liquidity_gauges_for_pools(pool_ids);
        match futures::try_join!(shares, gauges) {
            Ok((gauge_shares, liquidity_gauges)) => {
                debug!(
                    "staking data: {} share(s), {} gauge(s) across {} pool(s)",
                    gauge_shares.len(),
                    liquidity_gauges.len(),
                    pool_ids.len()
                );
                Remote::Ready(StakingData {
                    gauge_shares,
                    liquidity_gauges,
                })
            }
            Err(err) => Remote::Failed(err),
        }
    }
}

// ============================================
// TESTS
// ============================================
