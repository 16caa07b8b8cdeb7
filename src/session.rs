//! Staking session - the dataflow graph
//!
//! Owns every derived view as an explicit node over named inputs and
//! recomputes in topological order:
//!
//!   pool ids -> staking data -> gauge set -> {weights, inflation}
//!            -> payouts -> price-denominated figures
//!
//! The staked-position views hang off the pool address alone. A node
//! re-fires only when its upstream input's identity changes; in-flight
//! results carry the key captured at dispatch and are discarded if the key
//! moved on before completion (see `KeyedSlot`).
//!
//! All collaborators are injected at construction. Nothing here is a
//! process-wide singleton and the wall clock enters exactly once, through
//! the injected `clock` hook.

use crate::errors::StakingError;
use crate::gauges::{gauge_addresses, EligibilityCheck, StakingData, StakingDataAggregator};
use crate::indexer::{DecoratedPool, Indexer};
use crate::position::{
    GaugeFactory, StakedPoolFetcher, StakedPositionResolver, StakingVault, TxHandle,
};
use crate::remote::{KeyedSlot, Remote};
use crate::rewards::{
    compute_aprs, compute_payouts, InflationOracle, PriceFeed, RelativeWeightOracle, RewardPeriod,
};
use alloy_primitives::Address;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Current wall-clock seconds since epoch. The default `clock` hook; tests
/// inject a fixed function instead.
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Derived reward state for one gauge-set snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RewardSnapshot {
    /// Global emission, token units per second (0 while unloaded).
    pub inflation_rate: f64,
    /// Fractional weight per gauge; missing entries read as 0.
    pub weights: HashMap<Address, f64>,
    /// Token payout per gauge over the session's reward period.
    pub payouts: HashMap<Address, f64>,
    /// Payouts converted through the reward token's spot price.
    pub aprs: HashMap<Address, f64>,
}

/// Everything a consumer can observe, cloned out in one consistent read.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub pool_address: Option<Address>,
    pub pool_ids: Remote<Vec<String>>,
    pub staking: Remote<StakingData>,
    pub gauge_set: Vec<Address>,
    pub eligibility: Remote<bool>,
    pub rewards: Remote<RewardSnapshot>,
    pub staked_pools: Remote<Vec<DecoratedPool>>,
    pub staked_shares: Remote<String>,
}

#[derive(Default)]
struct SessionState {
    pool_address: Option<Address>,
    pool_ids: KeyedSlot<Address, Vec<String>>,
    staking: KeyedSlot<Vec<String>, StakingData>,
    eligibility: KeyedSlot<Address, bool>,
    rewards: KeyedSlot<Vec<Address>, RewardSnapshot>,
    staked_pools: KeyedSlot<Vec<String>, Vec<DecoratedPool>>,
    staked_shares: KeyedSlot<Address, String>,
}

pub struct StakingSession<I, F, V, W, N, P>
where
    I: Indexer,
    F: GaugeFactory,
    V: StakingVault,
    W: RelativeWeightOracle,
    N: InflationOracle,
    P: PriceFeed,
{
    indexer: I,
    resolver: StakedPositionResolver<F, V>,
    weight_oracle: W,
    inflation_oracle: N,
    price_feed: P,
    account: Address,
    reward_token: Address,
    period: RewardPeriod,
    clock: fn() -> u64,
    /// Pool ids supplied up front; when absent the session derives them
    /// from the user's pool shares on the indexer.
    supplied_pool_ids: Option<Vec<String>>,
    state: RwLock<SessionState>,
}

impl<I, F, V, W, N, P> StakingSession<I, F, V, W, N, P>
where
    I: Indexer,
    F: GaugeFactory,
    V: StakingVault,
    W: RelativeWeightOracle,
    N: InflationOracle,
    P: PriceFeed,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        indexer: I,
        factory: F,
        vault: V,
        weight_oracle: W,
        inflation_oracle: N,
        price_feed: P,
        account: Address,
        reward_token: Address,
        period: RewardPeriod,
        supplied_pool_ids: Option<Vec<String>>,
        clock: fn() -> u64,
    ) -> Self {
        Self {
            indexer,
            resolver: StakedPositionResolver::new(factory, vault, account),
            weight_oracle,
            inflation_oracle,
            price_feed,
            account,
            reward_token,
            period,
            clock,
            supplied_pool_ids,
            state: RwLock::new(SessionState::default()),
        }
    }

    // ============================================
    // POOL CONTEXT
    // ============================================

    /// Session-level pool override. Changing it resets the pool-keyed
    /// views, which also discards any of their in-flight results.
    pub async fn set_pool_address(&self, pool: Option<Address>) {
        self.resolver.set_default_pool(pool).await;
        let mut state = self.state.write().await;
        state.pool_address = pool;
        state.eligibility.reset();
        state.staked_shares.reset();
    }

    /// Explicit parameter wins, else the session override.
    pub async fn pool_address(&self, explicit: Option<Address>) -> Option<Address> {
        if explicit.is_some() {
            return explicit;
        }
        self.state.read().await.pool_address
    }

    // ============================================
    // REFRESH PIPELINE
    // ============================================

    /// Run the full dataflow once, in dependency order. Stages whose input
    /// identity is unchanged are skipped.
    pub async fn refresh(&self) {
        self.refresh_pool_ids().await;
        let pool_ids = {
            let state = self.state.read().await;
            state.pool_ids.current().cloned().unwrap_or_default()
        };

        self.refresh_staking(&pool_ids).await;
        let (staking_loading, staking) = {
            let state = self.state.read().await;
            (
                state.staking.state().is_loading(),
                state.staking.current().cloned().unwrap_or_default(),
            )
        };

        let gauges = gauge_addresses(&staking.gauge_shares, &staking.liquidity_gauges);
        self.refresh_rewards(&gauges).await;
        self.refresh_staked_pools(&staking.staked_pool_ids(), staking_loading)
            .await;
        self.refresh_eligibility().await;
        self.refresh_staked_shares().await;
    }

    async fn refresh_pool_ids(&self) {
        let key = self.account;
        if let Some(ids) = &self.supplied_pool_ids {
            let mut state = self.state.write().await;
            if state.pool_ids.needs_fetch(&key) {
                state.pool_ids.begin(key);
                state.pool_ids.complete(&key, Ok(ids.clone()));
            }
            return;
        }

        {
            let mut state = self.state.write().await;
            if !state.pool_ids.needs_fetch(&key) {
                return;
            }
            state.pool_ids.begin(key);
        }
        let result = self.indexer.pool_ids_for_account(key).await;
        let mut state = self.state.write().await;
        state.pool_ids.complete(&key, result);
    }

    async fn refresh_staking(&self, pool_ids: &[String]) {
        if pool_ids.is_empty() {
            // Disabled: a query with a vacuous filter never fires, and a
            // snapshot for pools the user exited must not linger.
            let mut state = self.state.write().await;
            state.staking.reset();
            return;
        }
        let key = pool_ids.to_vec();
        {
            let mut state = self.state.write().await;
            if !state.staking.needs_fetch(&key) {
                return;
            }
            state.staking.begin(key.clone());
        }

        let aggregator = StakingDataAggregator::new(&self.indexer);
        let result = match aggregator.fetch(self.account, pool_ids).await {
            Remote::Ready(data) => Ok(data),
            Remote::Failed(err) => Err(err),
            _ => return,
        };
        let mut state = self.state.write().await;
        state.staking.complete(&key, result);
    }

    async fn refresh_rewards(&self, gauges: &[Address]) {
        let key = gauges.to_vec();
        {
            let mut state = self.state.write().await;
            if !state.rewards.needs_fetch(&key) {
                return;
            }
            state.rewards.begin(key.clone());
        }

        let result = self.compute_reward_snapshot(gauges).await;
        let mut state = self.state.write().await;
        state.rewards.complete(&key, result);
    }

    async fn compute_reward_snapshot(
        &self,
        gauges: &[Address],
    ) -> Result<RewardSnapshot, StakingError> {
        if gauges.is_empty() {
            return Ok(RewardSnapshot::default());
        }

        // The timestamp is captured here, once, and injected downward.
        let now = (self.clock)();
        let (inflation, weights) = tokio::join!(
            self.inflation_oracle.inflation_rate(),
            self.weight_oracle.relative_weights(gauges, now)
        );

        // A single failed input degrades to its neutral element; only a
        // total failure marks the whole node failed.
        let (inflation, weights) = match (inflation, weights) {
            (Err(err), Err(_)) => return Err(err),
            (inflation, weights) => (
                inflation.unwrap_or_else(|err| {
                    warn!("inflation fetch failed, using 0: {err}");
                    0.0
                }),
                weights.unwrap_or_else(|err| {
                    warn!("weight fetch failed, using empty map: {err}");
                    HashMap::new()
                }),
            ),
        };

        let price = match self.price_feed.usd_price(self.reward_token).await {
            Ok(price) => price,
            Err(err) => {
                warn!("price fetch failed, figures degrade to 0: {err}");
                None
            }
        };

        let payouts = compute_payouts(inflation, &weights, gauges, self.period);
        let aprs = compute_aprs(&payouts, price);
        debug!(
            "reward snapshot: {} gauge(s), inflation {inflation}, period {}",
            gauges.len(),
            self.period
        );
        Ok(RewardSnapshot {
            inflation_rate: inflation,
            weights,
            payouts,
            aprs,
        })
    }

    async fn refresh_staked_pools(&self, staked_pool_ids: &[String], staking_loading: bool) {
        if staking_loading {
            // Partial id list; report what we have, fetch nothing.
            return;
        }
        if staked_pool_ids.is_empty() {
            let mut state = self.state.write().await;
            state.staked_pools.reset();
            return;
        }
        let key = staked_pool_ids.to_vec();
        {
            let mut state = self.state.write().await;
            if !state.staked_pools.needs_fetch(&key) {
                return;
            }
            state.staked_pools.begin(key.clone());
        }

        let fetcher = StakedPoolFetcher::new(&self.indexer);
        let result = match fetcher.fetch(staked_pool_ids, false).await {
            Remote::Ready(pools) => Ok(pools),
            Remote::Failed(err) => Err(err),
            _ => return,
        };
        let mut state = self.state.write().await;
        state.staked_pools.complete(&key, result);
    }

    async fn refresh_eligibility(&self) {
        let Some(pool) = self.pool_address(None).await else {
            let mut state = self.state.write().await;
            state.eligibility.reset();
            return;
        };
        {
            let mut state = self.state.write().await;
            if !state.eligibility.needs_fetch(&pool) {
                return;
            }
            state.eligibility.begin(pool);
        }

        let check = EligibilityCheck::new(&self.indexer);
        let result = match check.is_eligible(Some(pool)).await {
            Remote::Ready(eligible) => Ok(eligible),
            Remote::Failed(err) => Err(err),
            _ => return,
        };
        let mut state = self.state.write().await;
        state.eligibility.complete(&pool, result);
    }

    async fn refresh_staked_shares(&self) {
        let Some(pool) = self.pool_address(None).await else {
            return;
        };
        {
            let mut state = self.state.write().await;
            if !state.staked_shares.needs_fetch(&pool) {
                return;
            }
            state.staked_shares.begin(pool);
        }

        let result = self.resolver.staked_shares(Some(pool)).await;
        let mut state = self.state.write().await;
        state.staked_shares.complete(&pool, result);
    }

    // ============================================
    // MUTATIONS
    // ============================================

    /// Stake the full pool-token balance. See the resolver for the
    /// serialization and resolution rules.
    pub async fn stake(&self, pool: Option<Address>) -> Result<TxHandle, StakingError> {
        self.resolver.stake_bpt(pool).await
    }

    /// Withdraw the full tracked staked balance.
    pub async fn unstake(&self, pool: Option<Address>) -> Result<TxHandle, StakingError> {
        self.resolver.unstake_bpt(pool).await
    }

    /// One-off staked-share read (outside the cached view).
    pub async fn staked_shares(&self, pool: Option<Address>) -> Result<String, StakingError> {
        self.resolver.staked_shares(pool).await
    }

    /// Invalidate the views a stake/unstake touches and refetch. Call this
    /// only after the transaction confirmed; calling it earlier just reads
    /// the pre-transaction balances back.
    pub async fn refetch_after_confirmation(&self) {
        {
            let mut state = self.state.write().await;
            state.staking.invalidate();
            state.staked_pools.invalidate();
            state.staked_shares.invalidate();
        }
        self.refresh().await;
    }

    // ============================================
    // OBSERVATION
    // ============================================

    /// Clone out every derived view in one consistent read.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        let staking = state.staking.current().cloned().unwrap_or_default();
        SessionSnapshot {
            pool_address: state.pool_address,
            pool_ids: state.pool_ids.state().clone(),
            staking: state.staking.state().clone(),
            gauge_set: gauge_addresses(&staking.gauge_shares, &staking.liquidity_gauges),
            eligibility: state.eligibility.state().clone(),
            rewards: state.rewards.state().clone(),
            staked_pools: state.staked_pools.state().clone(),
            staked_shares: state.staked_shares.state().clone(),
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{GaugeRef, GaugeShare, LiquidityGauge};
    use alloy_primitives::{B256, U256};
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn addr(n: u8) -> Address {
        Address::from_str(&format!("0x{:040x}", n)).unwrap()
    }

    fn account() -> Address {
        addr(0xAA)
    }

    fn fixed_clock() -> u64 {
        1_700_000_000
    }

    #[derive(Default)]
    struct FixtureIndexer {
        shares: Vec<GaugeShare>,
        gauges: Vec<LiquidityGauge>,
        pools: Vec<DecoratedPool>,
        pools_calls: AtomicUsize,
    }

    impl Indexer for &FixtureIndexer {
        async fn gauge_shares(&self, _: Address) -> Result<Vec<GaugeShare>, StakingError> {
            Ok(self.shares.clone())
        }
        async fn liquidity_gauges_for_pools(
            &self,
            _: &[String],
        ) -> Result<Vec<LiquidityGauge>, StakingError> {
            Ok(self.gauges.clone())
        }
        async fn liquidity_gauges_for_pool_address(
            &self,
            _: Address,
        ) -> Result<Vec<LiquidityGauge>, StakingError> {
            Ok(self.gauges.clone())
        }
        async fn pools_by_ids(&self, _: &[String]) -> Result<Vec<DecoratedPool>, StakingError> {
            self.pools_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.pools.clone())
        }
        async fn pool_ids_for_account(&self, _: Address) -> Result<Vec<String>, StakingError> {
            Ok(Vec::new())
        }
    }

    struct FixtureFactory;
    impl GaugeFactory for FixtureFactory {
        async fn pool_gauge(&self, _: Address) -> Result<Address, StakingError> {
            Ok(addr(0xB1))
        }
    }

    /// Vault whose balance read can be slowed down to stage races.
    struct SlowVault {
        delay: Duration,
        balance: U256,
    }

    impl StakingVault for SlowVault {
        async fn stake(&self, gauge: Address, _: U256) -> Result<TxHandle, StakingError> {
            Ok(TxHandle {
                hash: B256::ZERO,
                gauge,
                submitted_at: chrono::Utc::now(),
            })
        }
        async fn unstake(&self, gauge: Address, _: U256) -> Result<TxHandle, StakingError> {
            Ok(TxHandle {
                hash: B256::ZERO,
                gauge,
                submitted_at: chrono::Utc::now(),
            })
        }
        async fn staked_balance(&self, _: Address, _: Address) -> Result<U256, StakingError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.balance)
        }
        async fn pool_token_balance(&self, _: Address, _: Address) -> Result<U256, StakingError> {
            Ok(self.balance)
        }
    }

    struct FixtureWeights;
    impl RelativeWeightOracle for FixtureWeights {
        async fn relative_weights(
            &self,
            gauges: &[Address],
            _: u64,
        ) -> Result<HashMap<Address, f64>, StakingError> {
            Ok(gauges.iter().map(|g| (*g, 0.5)).collect())
        }
    }

    struct FixtureInflation;
    impl InflationOracle for FixtureInflation {
        async fn inflation_rate(&self) -> Result<f64, StakingError> {
            Ok(1000.0)
        }
    }

    struct FixturePrice;
    impl PriceFeed for FixturePrice {
        async fn usd_price(&self, _: Address) -> Result<Option<f64>, StakingError> {
            Ok(Some(2.0))
        }
    }

    fn share(gauge: Address, pool_id: &str) -> GaugeShare {
        GaugeShare {
            gauge: GaugeRef {
                id: gauge,
                pool_id: pool_id.to_string(),
            },
            balance: "10".to_string(),
        }
    }

    type TestSession<'a> = StakingSession<
        &'a FixtureIndexer,
        FixtureFactory,
        SlowVault,
        FixtureWeights,
        FixtureInflation,
        FixturePrice,
    >;

    fn session<'a>(
        indexer: &'a FixtureIndexer,
        pool_ids: Option<Vec<String>>,
        vault_delay: Duration,
    ) -> TestSession<'a> {
        StakingSession::new(
            indexer,
            FixtureFactory,
            SlowVault {
                delay: vault_delay,
                balance: U256::from(10).pow(U256::from(18)),
            },
            FixtureWeights,
            FixtureInflation,
            FixturePrice,
            account(),
            addr(0xBA),
            RewardPeriod::Weekly,
            pool_ids,
            fixed_clock,
        )
    }

    #[tokio::test]
    async fn test_full_pipeline_derives_payouts_and_figures() {
        let g1 = addr(1);
        let indexer = FixtureIndexer {
            shares: vec![share(g1, "P1")],
            gauges: vec![LiquidityGauge {
                id: Some(g1),
                pool_id: Some("P1".to_string()),
            }],
            ..Default::default()
        };
        let s = session(&indexer, Some(vec!["P1".to_string()]), Duration::ZERO);
        s.refresh().await;

        let snap = s.snapshot().await;
        assert_eq!(snap.gauge_set, vec![g1]);
        let rewards = snap.rewards.ready().unwrap();
        // 1000 token/s * 604800 s * 0.5
        assert_eq!(rewards.payouts[&g1], 302_400_000.0);
        assert_eq!(rewards.aprs[&g1], 604_800_000.0);
    }

    #[tokio::test]
    async fn test_no_pool_ids_keeps_downstream_idle() {
        let indexer = FixtureIndexer::default();
        let s = session(&indexer, Some(Vec::new()), Duration::ZERO);
        s.refresh().await;

        let snap = s.snapshot().await;
        assert!(snap.staking.is_idle());
        assert!(snap.staked_pools.is_idle());
        assert!(snap.gauge_set.is_empty());
        assert_eq!(indexer.pools_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_staked_pools_fetch_fires_once_per_id_change() {
        let g1 = addr(1);
        let indexer = FixtureIndexer {
            shares: vec![share(g1, "P1")],
            ..Default::default()
        };
        let s = session(&indexer, Some(vec!["P1".to_string()]), Duration::ZERO);
        s.refresh().await;
        s.refresh().await;
        s.refresh().await;
        // Same id list every pass: exactly one decorated-pool fetch.
        assert_eq!(indexer.pools_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_eligibility_idle_without_pool_address() {
        let indexer = FixtureIndexer::default();
        let s = session(&indexer, Some(Vec::new()), Duration::ZERO);
        s.refresh().await;
        assert!(s.snapshot().await.eligibility.is_idle());
    }

    #[tokio::test]
    async fn test_eligibility_reflects_record_existence() {
        let indexer = FixtureIndexer {
            gauges: vec![LiquidityGauge {
                id: Some(addr(1)),
                pool_id: None,
            }],
            ..Default::default()
        };
        let s = session(&indexer, Some(Vec::new()), Duration::ZERO);
        s.set_pool_address(Some(addr(0xF0))).await;
        s.refresh().await;
        assert_eq!(s.snapshot().await.eligibility, Remote::Ready(true));
    }

    #[tokio::test]
    async fn test_stale_balance_for_old_pool_is_discarded() {
        let indexer = FixtureIndexer::default();
        let s = Arc::new(session(
            &indexer,
            Some(Vec::new()),
            Duration::from_millis(50),
        ));
        s.set_pool_address(Some(addr(0x0A))).await;

        // Balance query for pool A goes in flight, then the pool changes.
        let bg = {
            let s = Arc::clone(&s);
            async move { s.refresh().await }
        };
        let switch = {
            let s = Arc::clone(&s);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                s.set_pool_address(Some(addr(0x0B))).await;
            }
        };
        tokio::join!(bg, switch);

        // The late result for A must not have been written for B.
        let snap = s.snapshot().await;
        assert_eq!(snap.pool_address, Some(addr(0x0B)));
        assert!(!snap.staked_shares.is_ready());
    }

    #[tokio::test]
    async fn test_refetch_after_confirmation_reloads_position() {
        let g1 = addr(1);
        let indexer = FixtureIndexer {
            shares: vec![share(g1, "P1")],
            ..Default::default()
        };
        let s = session(&indexer, Some(vec!["P1".to_string()]), Duration::ZERO);
        s.refresh().await;
        assert_eq!(indexer.pools_calls.load(Ordering::SeqCst), 1);

        s.refetch_after_confirmation().await;
        // Invalidation forces one more decorated-pool fetch.
        assert_eq!(indexer.pools_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explicit_pool_address_wins_over_override() {
        let indexer = FixtureIndexer::default();
        let s = session(&indexer, Some(Vec::new()), Duration::ZERO);
        s.set_pool_address(Some(addr(0x0A))).await;
        assert_eq!(s.pool_address(Some(addr(0x0B))).await, Some(addr(0x0B)));
        assert_eq!(s.pool_address(None).await, Some(addr(0x0A)));
    }
}
