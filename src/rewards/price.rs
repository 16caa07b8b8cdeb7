//! Reward-token spot price lookup
//!
//! Coingecko token-price endpoint, mirroring the shape of the other HTTP
//! collaborators. An unknown token is `None`, never an error the engine
//! has to care about: display degrades to zero instead.

use crate::errors::StakingError;
use alloy_primitives::Address;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const PRICE_API_URL: &str = "https://api.coingecko.com/api/v3/simple/token_price/ethereum";

/// Spot-price seam injected into the session.
#[allow(async_fn_in_trait)]
pub trait PriceFeed {
    /// USD spot price for `token`, `None` when the feed has no quote.
    async fn usd_price(&self, token: Address) -> Result<Option<f64>, StakingError>;
}

pub struct HttpPriceFeed {
    http: Client,
    base_url: String,
}

impl HttpPriceFeed {
    pub fn new(timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            base_url: PRICE_API_URL.to_string(),
        }
    }
}

impl PriceFeed for HttpPriceFeed {
    async fn usd_price(&self, token: Address) -> Result<Option<f64>, StakingError> {
        let contract = format!("{:#x}", token);
        let url = format!(
            "{}?contract_addresses={}&vs_currencies=usd",
            self.base_url, contract
        );

        // Response shape: { "<contract>": { "usd": 4.21 } }
        let body: HashMap<String, HashMap<String, f64>> = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(StakingError::remote)?
            .json()
            .await
            .map_err(StakingError::remote)?;

        let price = body
            .get(&contract)
            .and_then(|quotes| quotes.get("usd"))
            .copied();
        match price {
            Some(p) => debug!("price for {contract}: ${p}"),
            None => warn!("no price quote for {contract}"),
        }
        Ok(price)
    }
}
