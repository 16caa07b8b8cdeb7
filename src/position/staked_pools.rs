//! Staked pool set
//!
//! Resolves the decorated pool records for the pool ids the user is staked
//! in. Gated on the aggregator: while its snapshot is still loading, or the
//! id list is empty, nothing fires - so a partial id list never reaches the
//! indexer. The session keys the fetch by the id-list identity, which makes
//! the empty-to-populated transition fire exactly once.

use crate::errors::StakingError;
use crate::indexer::{DecoratedPool, Indexer};
use crate::remote::Remote;
use tracing::debug;

pub struct StakedPoolFetcher<'a, I: Indexer> {
    indexer: &'a I,
}

impl<'a, I: Indexer> StakedPoolFetcher<'a, I> {
    pub fn new(indexer: &'a I) -> Self {
        Self { indexer }
    }

    /// Decorated records for `staked_pool_ids`. Idle while disabled.
    pub async fn fetch(
        &self,
        staked_pool_ids: &[String],
        aggregator_loading: bool,
    ) -> Remote<Vec<DecoratedPool>> {
        if aggregator_loading || staked_pool_ids.is_empty() {
            return Remote::Idle;
        }
        match self.indexer.pools_by_ids(staked_pool_ids).await {
            Ok(pools) => {
                debug!(
                    "staked pools: {} record(s) for {} id(s)",
                    pools.len(),
                    staked_pool_ids.len()
                );
                Remote::Ready(pools)
            }
            Err(err) => Remote::Failed(err),
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{GaugeShare, LiquidityGauge};
    use alloy_primitives::Address;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingIndexer {
        pools: Vec<DecoratedPool>,
        calls: AtomicUsize,
    }

    impl Indexer for CountingIndexer {
        async fn gauge_shares(&self, _: Address) -> Result<Vec<GaugeShare>, StakingError> {
            Ok(Vec::new())
        }
        async fn liquidity_gauges_for_pools(
            &self,
            _: &[String],
        ) -> Result<Vec<LiquidityGauge>, StakingError> {
            Ok(Vec::new())
        }
        async fn liquidity_gauges_for_pool_address(
            &self,
            _: Address,
        ) -> Result<Vec<LiquidityGauge>, StakingError> {
            Ok(Vec::new())
        }
        async fn pools_by_ids(&self, _: &[String]) -> Result<Vec<DecoratedPool>, StakingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.pools.clone())
        }
        async fn pool_ids_for_account(&self, _: Address) -> Result<Vec<String>, StakingError> {
            Ok(Vec::new())
        }
    }

    fn sample_pool() -> DecoratedPool {
        DecoratedPool {
            id: "P1".to_string(),
            address: Address::from_str("0x1111111111111111111111111111111111111111").unwrap(),
            pool_type: "Weighted".to_string(),
            total_liquidity: "1000".to_string(),
            tokens: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_no_fetch_while_aggregator_loading() {
        let indexer = CountingIndexer {
            pools: vec![sample_pool()],
            calls: AtomicUsize::new(0),
        };
        let fetcher = StakedPoolFetcher::new(&indexer);
        let state = fetcher.fetch(&["P1".to_string()], true).await;
        assert!(state.is_idle());
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_fetch_for_empty_id_list() {
        let indexer = CountingIndexer {
            pools: Vec::new(),
            calls: AtomicUsize::new(0),
        };
        let fetcher = StakedPoolFetcher::new(&indexer);
        assert!(fetcher.fetch(&[], false).await.is_idle());
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_populated_list_fetches_once() {
        let indexer = CountingIndexer {
            pools: vec![sample_pool()],
            calls: AtomicUsize::new(0),
        };
        let fetcher = StakedPoolFetcher::new(&indexer);
        let state = fetcher.fetch(&["P1".to_string()], false).await;
        assert_eq!(state.ready().map(Vec::len), Some(1));
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 1);
    }
}
