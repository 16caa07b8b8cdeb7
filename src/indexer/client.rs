//! Subgraph HTTP client
//!
//! Posts rendered queries to a Graph-node style endpoint and decodes the
//! result rows. The `Indexer` trait is the seam the rest of the session
//! depends on, so tests substitute in-memory fixtures.

use crate::errors::StakingError;
use crate::indexer::query::Query;
use crate::indexer::types::{DecoratedPool, GaugeShare, LiquidityGauge, PoolShare};
use alloy_primitives::Address;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

/// Subgraph addresses are stored lower-cased; normalize before filtering.
pub fn lower(address: &Address) -> String {
    format!("{:#x}", address)
}

// ============================================
// INDEXER SEAM
// ============================================

/// Query surface the staking views are built on.
#[allow(async_fn_in_trait)]
pub trait Indexer {
    /// Gauge-share rows for an account (staked balances per gauge).
    async fn gauge_shares(&self, account: Address) -> Result<Vec<GaugeShare>, StakingError>;

    /// Liquidity-gauge rows for a set of pool ids.
    async fn liquidity_gauges_for_pools(
        &self,
        pool_ids: &[String],
    ) -> Result<Vec<LiquidityGauge>, StakingError>;

    /// Liquidity-gauge rows matching one pool address (eligibility probe).
    async fn liquidity_gauges_for_pool_address(
        &self,
        pool: Address,
    ) -> Result<Vec<LiquidityGauge>, StakingError>;

    /// Decorated pool records for a set of pool ids.
    async fn pools_by_ids(&self, ids: &[String]) -> Result<Vec<DecoratedPool>, StakingError>;

    /// Pool ids the account currently holds liquidity in.
    async fn pool_ids_for_account(&self, account: Address) -> Result<Vec<String>, StakingError>;
}

// ============================================
// HTTP CLIENT
// ============================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

pub struct SubgraphClient {
    http: Client,
    endpoint: String,
}

impl SubgraphClient {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { http, endpoint }
    }

    /// Execute a query and decode its rows. A remote "no match" comes back
    /// as an empty array, never an error.
    pub async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, StakingError> {
        let document = query.to_graphql();
        trace!("subgraph query: {}", document);

        let response: GraphQlResponse = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": document }))
            .send()
            .await
            .map_err(StakingError::remote)?
            .json()
            .await
            .map_err(StakingError::remote)?;

        if let Some(errors) = response.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(StakingError::remote(messages.join("; ")));
        }

        let data = response
            .data
            .ok_or_else(|| StakingError::remote("subgraph returned no data"))?;
        let rows = data
            .get(query.entity())
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));

        let decoded: Vec<T> = serde_json::from_value(rows).map_err(StakingError::remote)?;
        debug!("subgraph {}: {} rows", query.entity(), decoded.len());
        Ok(decoded)
    }
}

impl Indexer for SubgraphClient {
    async fn gauge_shares(&self, account: Address) -> Result<Vec<GaugeShare>, StakingError> {
        let query = Query::new("gaugeShares")
            .filter_eq("user", lower(&account))
            .field("balance")
            .field("gauge { id poolId }");
        self.fetch(&query).await
    }

    async fn liquidity_gauges_for_pools(
        &self,
        pool_ids: &[String],
    ) -> Result<Vec<LiquidityGauge>, StakingError> {
        let query = Query::new("liquidityGauges")
            .filter_in("poolId", pool_ids.iter().cloned())
            .field("id")
            .field("poolId");
        self.fetch(&query).await
    }

    async fn liquidity_gauges_for_pool_address(
        &self,
        pool: Address,
    ) -> Result<Vec<LiquidityGauge>, StakingError> {
        let query = Query::new("liquidityGauges")
            .filter_eq("poolAddress", lower(&pool))
            .field("id");
        self.fetch(&query).await
    }

    async fn pools_by_ids(&self, ids: &[String]) -> Result<Vec<DecoratedPool>, StakingError> {
        let query = Query::new("pools")
            .filter_in("id", ids.iter().cloned())
            .field("id")
            .field("address")
            .field("poolType")
            .field("totalLiquidity")
            .field("tokens { address symbol balance }");
        self.fetch(&query).await
    }

    async fn pool_ids_for_account(&self, account: Address) -> Result<Vec<String>, StakingError> {
        let query = Query::new("poolShares")
            .filter_eq("userAddress", lower(&account))
            .field("poolId")
            .field("balance");
        let shares: Vec<PoolShare> = self.fetch(&query).await?;

        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::new();
        for share in shares {
            if seen.insert(share.pool_id.clone()) {
                ids.push(share.pool_id);
            }
        }
        Ok(ids)
    }
}

// ============================================
// TESTS
// ============================================
