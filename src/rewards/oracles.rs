//! Emission-rate and relative-weight oracles
//!
//! Both are contract views. The inflation rate is fetched once and cached
//! for the session; relative weights are queried per gauge-set snapshot at
//! a caller-supplied timestamp (the engine never reads the ambient clock).

use crate::errors::StakingError;
use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

sol! {
    /// Token admin holding the reward token's emission schedule.
    interface ITokenAdmin {
        function getInflationRate() external view returns (uint256);
    }

    /// Gauge controller allocating emissions across gauges.
    interface IGaugeController {
        function gauge_relative_weight(address gauge, uint256 time)
            external view returns (uint256);
    }
}

/// On-chain fixed-point scale for rates and weights.
const WAD: f64 = 1e18;

fn u256_to_f64_wad(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(0.0) / WAD
}

// ============================================
// ORACLE SEAMS
// ============================================

/// Global reward-token emission, token units per second.
#[allow(async_fn_in_trait)]
pub trait InflationOracle {
    async fn inflation_rate(&self) -> Result<f64, StakingError>;
}

/// Fractional emission weight per gauge at a given timestamp. Gauges the
/// controller does not know are absent from the map, not an error.
#[allow(async_fn_in_trait)]
pub trait RelativeWeightOracle {
    async fn relative_weights(
        &self,
        gauge_addresses: &[Address],
        timestamp: u64,
    ) -> Result<HashMap<Address, f64>, StakingError>;
}

// ============================================
// ON-CHAIN IMPLEMENTATIONS
// ============================================

pub struct OnchainInflationOracle {
    rpc_url: String,
    token_admin: Address,
    /// Session cache: the emission schedule only steps once a year, so one
    /// fetch per session is enough. Refetch policy is external.
    cache: RwLock<Option<f64>>,
}

impl OnchainInflationOracle {
    pub fn new(rpc_url: String, token_admin: Address) -> Self {
        Self {
            rpc_url,
            token_admin,
            cache: RwLock::new(None),
        }
    }

    async fn call(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>, StakingError> {
        call_view(&self.rpc_url, to, calldata).await
    }
}

impl InflationOracle for OnchainInflationOracle {
    async fn inflation_rate(&self) -> Result<f64, StakingError> {
        {
            let cache = self.cache.read().await;
            if let Some(rate) = *cache {
                return Ok(rate);
            }
        }

        let calldata = ITokenAdmin::getInflationRateCall {}.abi_encode();
        let raw = self.call(self.token_admin, calldata).await?;
        let value = ITokenAdmin::getInflationRateCall::abi_decode_returns(&raw)
            .map_err(StakingError::remote)?;
        let rate = u256_to_f64_wad(value);
        debug!("inflation rate: {rate} token/s");

        let mut cache = self.cache.write().await;
        *cache = Some(rate);
        Ok(rate)
    }
}

pub struct OnchainWeightOracle {
    rpc_url: String,
    controller: Address,
}

impl OnchainWeightOracle {
    pub fn new(rpc_url: String, controller: Address) -> Self {
        Self {
            rpc_url,
            controller,
        }
    }
}

impl RelativeWeightOracle for OnchainWeightOracle {
    async fn relative_weights(
        &self,
        gauge_addresses: &[Address],
        timestamp: u64,
    ) -> Result<HashMap<Address, f64>, StakingError> {
        let mut weights = HashMap::with_capacity(gauge_addresses.len());
        for gauge in gauge_addresses {
            let calldata = IGaugeController::gauge_relative_weightCall {
                gauge: *gauge,
                time: U256::from(timestamp),
            }
            .abi_encode();

            // A revert means the controller does not track this gauge;
            // leave it out and let the engine treat it as weight 0.
            match call_view(&self.rpc_url, self.controller, calldata).await {
                Ok(raw) => {
                    match IGaugeController::gauge_relative_weightCall::abi_decode_returns(&raw) {
                        Ok(value) => {
                            weights.insert(*gauge, u256_to_f64_wad(value));
                        }
                        Err(err) => warn!("weight decode failed for {gauge}: {err}"),
                    }
                }
                Err(err) => warn!("weight lookup failed for {gauge}: {err}"),
            }
        }
        debug!(
            "relative weights at t={timestamp}: {}/{} gauges known",
            weights.len(),
            gauge_addresses.len()
        );
        Ok(weights)
    }
}

/// One eth_call against a contract view.
pub(crate) async fn call_view(
    rpc_url: &str,
    to: Address,
    calldata: Vec<u8>,
) -> Result<Vec<u8>, StakingError> {
    let provider = ProviderBuilder::new()
        .connect_http(rpc_url.parse().map_err(StakingError::remote)?);
    let tx = TransactionRequest::default().to(to).input(calldata.into());
    let bytes = provider.call(tx).await.map_err(StakingError::remote)?;
    Ok(bytes.to_vec())
}

// ============================================
// TESTS
// ============================================
