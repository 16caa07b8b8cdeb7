//! Staked-position reads, mutations and the staked pool set

pub mod resolver;
pub mod staked_pools;

pub use resolver::{
    format_bpt, GaugeFactory, OnchainGaugeFactory, OnchainStakingVault, StakedPositionResolver,
    StakingVault, TxHandle, BPT_DECIMALS,
};
pub use staked_pools::StakedPoolFetcher;
