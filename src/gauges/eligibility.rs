//! Stakeability check
//!
//! A pool is stakeable iff the indexer knows at least one liquidity gauge
//! for its address. Without a pool address the check is disabled and reads
//! as Idle, which callers must not confuse with a loaded `false`.

use crate::errors::StakingError;
use crate::indexer::Indexer;
use crate::remote::Remote;
use alloy_primitives::Address;
use tracing::debug;

pub struct EligibilityCheck<'a, I: Indexer> {
    indexer: &'a I,
}

impl<'a, I: Indexer> EligibilityCheck<'a, I> {
    pub fn new(indexer: &'a I) -> Self {
        Self { indexer }
    }

    /// Tri-state eligibility for `pool_address`. Idle while disabled,
    /// Ready(first-record-exists) when the query ran.
    pub async fn is_eligible(&self, pool_address: Option<Address>) -> Remote<bool> {
        let Some(pool) = pool_address else {
            return Remote::Idle;
        };
        match self.indexer.liquidity_gauges_for_pool_address(pool).await {
            Ok(rows) => {
                debug!("eligibility for {pool}: {} gauge record(s)", rows.len());
                Remote::Ready(!rows.is_empty())
            }
            Err(err) => Remote::Failed(err),
        }
    }
}

/// Collapse the tri-state for callers that only need a boolean now.
/// Idle, Loading and Failed all read as not-eligible.
pub fn eligible_now(state: &Remote<bool>) -> bool {
    matches!(state, Remote::Ready(true))
}

// Used by the session to surface fetch failures without losing the
// distinction from a loaded `false`.
#[allow(dead_code)]
pub fn eligibility_error(state: &Remote<bool>) -> Option<&StakingError> {
    state.error()
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{DecoratedPool, GaugeShare, LiquidityGauge};
    use std::str::FromStr;

    struct FixtureIndexer {
        gauges_for_address: Result<Vec<LiquidityGauge>, StakingError>,
    }

    impl Indexer for FixtureIndexer {
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
            self.gauges_for_address.clone()
        }
        async fn pools_by_ids(&self, _: &[String]) -> Result<Vec<DecoratedPool>, StakingError> {
            Ok(Vec::new())
        }
        async fn pool_ids_for_account(&self, _: Address) -> Result<Vec<String>, StakingError> {
            Ok(Vec::new())
        }
    }

    fn pool() -> Address {
        Address::from_str("0x3210321032103210321032103210321032103210").unwrap()
    }

    #[tokio::test]
    async fn test_disabled_without_pool_address() {
        let indexer = FixtureIndexer {
            gauges_for_address: Ok(vec![LiquidityGauge {
                id: Some(pool()),
                pool_id: None,
            }]),
        };
        let check = EligibilityCheck::new(&indexer);
        let state = check.is_eligible(None).await;
        assert!(state.is_idle());
        assert!(!eligible_now(&state));
    }

    #[tokio::test]
    async fn test_first_record_exists_means_eligible() {
        let indexer = FixtureIndexer {
            gauges_for_address: Ok(vec![LiquidityGauge {
                id: Some(pool()),
                pool_id: None,
            }]),
        };
        let check = EligibilityCheck::new(&indexer);
        let state = check.is_eligible(Some(pool())).await;
        assert_eq!(state, Remote::Ready(true));
        assert!(eligible_now(&state));
    }

    #[tokio::test]
    async fn test_no_records_means_not_eligible() {
        let indexer = FixtureIndexer {
            gauges_for_address: Ok(Vec::new()),
        };
        let check = EligibilityCheck::new(&indexer);
        assert_eq!(check.is_eligible(Some(pool())).await, Remote::Ready(false));
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_error() {
        let indexer = FixtureIndexer {
            gauges_for_address: Err(StakingError::remote("indexer down")),
        };
        let check = EligibilityCheck::new(&indexer);
        let state = check.is_eligible(Some(pool())).await;
        assert!(state.error().is_some());
        assert!(!eligible_now(&state));
    }
}
