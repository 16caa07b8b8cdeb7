//! Gauge discovery, eligibility and staking-data aggregation

pub mod aggregator;
pub mod discovery;
pub mod eligibility;

pub use aggregator::{StakingData, StakingDataAggregator};
pub use discovery::gauge_addresses;
pub use eligibility::{eligible_now, EligibilityCheck};
