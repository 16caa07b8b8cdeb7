//! Indexing-service access: query descriptions, HTTP client, record types

pub mod client;
pub mod query;
pub mod types;

pub use client::{Indexer, SubgraphClient};
pub use query::Query;
pub use types::{DecoratedPool, GaugeShare, GaugeRef, LiquidityGauge, PoolShare, PoolToken};
