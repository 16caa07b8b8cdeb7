//! Staked-position resolver
//!
//! The only operations with externally visible side effects: stake the
//! user's full pool-token balance into the pool's gauge, withdraw the full
//! tracked staked balance, and read the raw staked balance as a human
//! decimal string. All three resolve the gauge through the factory first
//! and are serialized per pool address so a stake/unstake never races a
//! concurrent balance refresh for the same pool.
//!
//! A write-then-immediate-read can observe a stale balance until the
//! transaction confirms. The refresh after confirmation is an explicit
//! caller step (`StakingSession::refetch_after_confirmation`), not a
//! synchronization primitive baked in here.

use crate::errors::StakingError;
use crate::rewards::oracles::call_view;
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

sol! {
    interface ILiquidityGaugeFactory {
        function getPoolGauge(address pool) external view returns (address);
    }

    interface ILiquidityGauge {
        function deposit(uint256 value) external;
        function withdraw(uint256 value) external;
        function balanceOf(address account) external view returns (uint256);
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

/// Pool tokens (BPT) are minted at a fixed 18-decimal scale.
pub const BPT_DECIMALS: usize = 18;

/// Handle to a submitted stake/unstake transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxHandle {
    pub hash: B256,
    pub gauge: Address,
    pub submitted_at: DateTime<Utc>,
}

/// Raw 18-decimal balance as a human decimal string ("1.5", "0", ...).
pub fn format_bpt(raw: U256) -> String {
    let base = U256::from(10).pow(U256::from(BPT_DECIMALS));
    let int = raw / base;
    let frac = raw % base;
    if frac.is_zero() {
        return int.to_string();
    }
    let digits = frac.to_string();
    let padded = format!("{}{}", "0".repeat(BPT_DECIMALS - digits.len()), digits);
    format!("{}.{}", int, padded.trim_end_matches('0'))
}

// ============================================
// CONTRACT SEAMS
// ============================================

/// Pool address -> gauge address lookup. A pool without a gauge is a
/// resolution failure, never a null result.
#[allow(async_fn_in_trait)]
pub trait GaugeFactory {
    async fn pool_gauge(&self, pool: Address) -> Result<Address, StakingError>;
}

/// Per-gauge staking contract plus the pool-token balance read the stake
/// path needs.
#[allow(async_fn_in_trait)]
pub trait StakingVault {
    async fn stake(&self, gauge: Address, amount: U256) -> Result<TxHandle, StakingError>;
    async fn unstake(&self, gauge: Address, amount: U256) -> Result<TxHandle, StakingError>;
    async fn staked_balance(&self, gauge: Address, account: Address)
        -> Result<U256, StakingError>;
    async fn pool_token_balance(
        &self,
        pool: Address,
        account: Address,
    ) -> Result<U256, StakingError>;
}

// ============================================
// ON-CHAIN IMPLEMENTATIONS
// ============================================

pub struct OnchainGaugeFactory {
    rpc_url: String,
    factory: Address,
}

impl OnchainGaugeFactory {
    pub fn new(rpc_url: String, factory: Address) -> Self {
        Self { rpc_url, factory }
    }
}

impl GaugeFactory for OnchainGaugeFactory {
    async fn pool_gauge(&self, pool: Address) -> Result<Address, StakingError> {
        let calldata = ILiquidityGaugeFactory::getPoolGaugeCall { pool }.abi_encode();
        let raw = call_view(&self.rpc_url, self.factory, calldata).await?;
        let gauge = ILiquidityGaugeFactory::getPoolGaugeCall::abi_decode_returns(&raw)
            .map_err(StakingError::remote)?;
        if gauge == Address::ZERO {
            return Err(StakingError::GaugeResolution { pool });
        }
        debug!("pool {pool} -> gauge {gauge}");
        Ok(gauge)
    }
}

pub struct OnchainStakingVault {
    rpc_url: String,
    account: Address,
}

impl OnchainStakingVault {
    pub fn new(rpc_url: String, account: Address) -> Self {
        Self { rpc_url, account }
    }

    /// Submit a contract call through the node-managed account. Signing and
    /// broadcast mechanics live on the node side.
    async fn submit(&self, gauge: Address, calldata: Vec<u8>) -> Result<TxHandle, StakingError> {
        let provider = ProviderBuilder::new()
            .connect_http(self.rpc_url.parse().map_err(StakingError::tx)?);
        let tx = TransactionRequest::default()
            .from(self.account)
            .to(gauge)
            .input(calldata.into());
        let pending = provider.send_transaction(tx).await.map_err(StakingError::tx)?;
        let hash = *pending.tx_hash();
        info!("submitted gauge tx {hash} to {gauge}");
        Ok(TxHandle {
            hash,
            gauge,
            submitted_at: Utc::now(),
        })
    }
}

impl StakingVault for OnchainStakingVault {
    async fn stake(&self, gauge: Address, amount: U256) -> Result<TxHandle, StakingError> {
        let calldata = ILiquidityGauge::depositCall { value: amount }.abi_encode();
        self.submit(gauge, calldata).await
    }

    async fn unstake(&self, gauge: Address, amount: U256) -> Result<TxHandle, StakingError> {
        let calldata = ILiquidityGauge::withdrawCall { value: amount }.abi_encode();
        self.submit(gauge, calldata).await
    }

    async fn staked_balance(
        &self,
        gauge: Address,
        account: Address,
    ) -> Result<U256, StakingError> {
        let calldata = ILiquidityGauge::balanceOfCall { account }.abi_encode();
        let raw = call_view(&self.rpc_url, gauge, calldata).await?;
        ILiquidityGauge::balanceOfCall::abi_decode_returns(&raw).map_err(StakingError::remote)
    }

    async fn pool_token_balance(
        &self,
        pool: Address,
        account: Address,
    ) -> Result<U256, StakingError> {
        let calldata = IERC20::balanceOfCall { account }.abi_encode();
        let raw = call_view(&self.rpc_url, pool, calldata).await?;
        IERC20::balanceOfCall::abi_decode_returns(&raw).map_err(StakingError::remote)
    }
}

// ============================================
// RESOLVER
// ============================================

pub struct StakedPositionResolver<F: GaugeFactory, V: StakingVault> {
    factory: F,
    vault: V,
    account: Address,
    default_pool: RwLock<Option<Address>>,
    /// One lock per pool address; mutations and balance reads for the same
    /// pool take it, operations on different pools do not contend.
    pool_locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl<F: GaugeFactory, V: StakingVault> StakedPositionResolver<F, V> {
    pub fn new(factory: F, vault: V, account: Address) -> Self {
        Self {
            factory,
            vault,
            account,
            default_pool: RwLock::new(None),
            pool_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Session-level pool override used when no explicit address is passed.
    pub async fn set_default_pool(&self, pool: Option<Address>) {
        *self.default_pool.write().await = pool;
    }

    async fn resolve_pool(&self, explicit: Option<Address>) -> Result<Address, StakingError> {
        if let Some(pool) = explicit {
            return Ok(pool);
        }
        self.default_pool
            .read()
            .await
            .ok_or(StakingError::MissingPoolAddress)
    }

    async fn pool_lock(&self, pool: Address) -> Arc<Mutex<()>> {
        let mut locks = self.pool_locks.lock().await;
        locks
            .entry(pool)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Stake the user's full pool-token balance into the pool's gauge.
    pub async fn stake_bpt(&self, pool: Option<Address>) -> Result<TxHandle, StakingError> {
        let pool = self.resolve_pool(pool).await?;
        let lock = self.pool_lock(pool).await;
        let _guard = lock.lock().await;

        let gauge = self.factory.pool_gauge(pool).await?;
        let balance = self.vault.pool_token_balance(pool, self.account).await?;
        if balance.is_zero() {
            return Err(StakingError::tx("no pool token balance to stake"));
        }
        info!("staking {} raw BPT of pool {pool} into {gauge}", balance);
        self.vault.stake(gauge, balance).await
    }

    /// Withdraw the user's full tracked staked balance from the gauge.
    pub async fn unstake_bpt(&self, pool: Option<Address>) -> Result<TxHandle, StakingError> {
        let pool = self.resolve_pool(pool).await?;
        let lock = self.pool_lock(pool).await;
        let _guard = lock.lock().await;

        let gauge = self.factory.pool_gauge(pool).await?;
        let staked = self.vault.staked_balance(gauge, self.account).await?;
        if staked.is_zero() {
            return Err(StakingError::tx("no staked balance to withdraw"));
        }
        info!("unstaking {} raw BPT of pool {pool} from {gauge}", staked);
        self.vault.unstake(gauge, staked).await
    }

    /// Current staked-share balance as a human decimal string.
    pub async fn staked_shares(&self, pool: Option<Address>) -> Result<String, StakingError> {
        let pool = self.resolve_pool(pool).await?;
        let lock = self.pool_lock(pool).await;
        let _guard = lock.lock().await;

        let gauge = self.factory.pool_gauge(pool).await?;
        let staked = self.vault.staked_balance(gauge, self.account).await?;
        Ok(format_bpt(staked))
    }
}

// ============================================
// TESTS
// ============================================
