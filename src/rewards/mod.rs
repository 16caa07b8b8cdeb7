//! Reward-rate derivation: emission oracles, payout math, price conversion

pub mod engine;
pub mod oracles;
pub mod price;

pub use engine::{compute_aprs, compute_payouts, parse_decimal, RewardPeriod, SECONDS_PER_WEEK};
pub use oracles::{
    InflationOracle, OnchainInflationOracle, OnchainWeightOracle, RelativeWeightOracle,
};
pub use price::{HttpPriceFeed, PriceFeed};
