//! Record types returned by the staking subgraph
//!
//! All of these are immutable value snapshots replaced wholesale on each
//! fetch cycle; nothing here is mutated in place.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Gauge reference embedded in a share record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeRef {
    pub id: Address,
    #[serde(rename = "poolId")]
    pub pool_id: String,
}

/// A user's staked balance in one gauge. One record per (user, gauge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeShare {
    pub gauge: GaugeRef,
    /// Human decimal string as reported by the indexer.
    pub balance: String,
}

/// Existence record: a pool has (at most) one active liquidity gauge.
/// The indexer omits fields that were not requested, so both are optional
/// at the wire level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityGauge {
    #[serde(default)]
    pub id: Option<Address>,
    #[serde(rename = "poolId", default)]
    pub pool_id: Option<String>,
}

/// Membership record used to derive the pool ids a user holds liquidity in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolShare {
    #[serde(rename = "poolId")]
    pub pool_id: String,
    pub balance: String,
}

/// Token row inside a decorated pool record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolToken {
    pub address: Address,
    pub symbol: String,
    pub balance: String,
}

/// Full pool record for display: the decorated form of a staked pool id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoratedPool {
    pub id: String,
    pub address: Address,
    #[serde(rename = "poolType")]
    pub pool_type: String,
    #[serde(rename = "totalLiquidity")]
    pub total_liquidity: String,
    #[serde(default)]
    pub tokens: Vec<PoolToken>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_share_deserializes_subgraph_shape() {
        let json = r#"{
            "balance": "10.5",
            "gauge": { "id": "0x1111111111111111111111111111111111111111", "poolId": "P1" }
        }"#;
        let share: GaugeShare = serde_json::from_str(json).unwrap();
        assert_eq!(share.balance, "10.5");
        assert_eq!(share.gauge.pool_id, "P1");
    }

    #[test]
    fn test_liquidity_gauge_tolerates_missing_fields() {
        let gauge: LiquidityGauge = serde_json::from_str(r#"{ "poolId": "P2" }"#).unwrap();
        assert!(gauge.id.is_none());
        assert_eq!(gauge.pool_id.as_deref(), Some("P2"));
    }

    #[test]
    fn test_decorated_pool_round_trip() {
        let json = r#"{
            "id": "P1",
            "address": "0x2222222222222222222222222222222222222222",
            "poolType": "Weighted",
            "totalLiquidity": "123456.7",
            "tokens": [
                { "address": "0x3333333333333333333333333333333333333333",
                  "symbol": "WETH", "balance": "100" }
            ]
        }"#;
        let pool: DecoratedPool = serde_json::from_str(json).unwrap();
        assert_eq!(pool.pool_type, "Weighted");
        assert_eq!(pool.tokens.len(), 1);
        assert_eq!(pool.tokens[0].symbol, "WETH");
    }
}
