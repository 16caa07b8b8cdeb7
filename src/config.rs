//! Configuration for stakewatch
//!
//! All contract addresses and endpoints the session needs, loadable from
//! environment variables (with .env support) or a TOML file.

use crate::rewards::RewardPeriod;
use alloy_primitives::Address;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

// ============================================
// DEFAULT CONTRACT SET (Ethereum mainnet)
// ============================================

const DEFAULT_RPC_URL: &str = "https://eth.llamarpc.com";
const DEFAULT_SUBGRAPH_URL: &str =
    "https://api.thegraph.com/subgraphs/name/balancer-labs/balancer-gauges";
/// Gauge controller allocating emissions across gauges.
const DEFAULT_GAUGE_CONTROLLER: &str = "0xC128468b7Ce63eA702C1f104D55A2566b13D3ABD";
/// Liquidity gauge factory (pool -> gauge lookup).
const DEFAULT_GAUGE_FACTORY: &str = "0x4E7bBd911cf1EFa442BC1b2e9Ea01ffE785412EC";
/// BAL reward token.
const DEFAULT_REWARD_TOKEN: &str = "0xba100000625a3754423978a60c9317c58a424e3D";
/// Token admin holding the emission schedule.
const DEFAULT_TOKEN_ADMIN: &str = "0xf302f9F50958c5593770FDf4d4812309fF77414f";

// ============================================
// MAIN CONFIGURATION
// ============================================

/// Main configuration struct for stakewatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// Chain RPC URL
    pub rpc_url: String,

    /// Staking subgraph endpoint
    pub subgraph_url: String,

    /// Chain ID (1 = Ethereum Mainnet)
    pub chain_id: u64,

    // ========== Session Settings ==========
    /// Connected account whose position is aggregated
    pub account: String,

    /// Optional session-level pool address override
    pub pool_address: Option<String>,

    /// Reporting window for payout figures
    pub reward_period: RewardPeriod,

    // ========== Contract Addresses ==========
    pub gauge_controller: String,
    pub gauge_factory: String,
    pub reward_token: String,
    pub token_admin: String,

    // ========== Timing ==========
    /// Timeout for HTTP calls (subgraph, price feed)
    pub request_timeout_secs: u64,

    /// Seconds between refreshes in watch mode
    pub refresh_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            subgraph_url: env::var("SUBGRAPH_URL")
                .unwrap_or_else(|_| DEFAULT_SUBGRAPH_URL.to_string()),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
            account: env::var("ACCOUNT").unwrap_or_default(),
            pool_address: env::var("POOL_ADDRESS").ok(),
            reward_period: match env::var("REWARD_PERIOD")
                .unwrap_or_else(|_| "weekly".to_string())
                .to_lowercase()
                .as_str()
            {
                "annual" | "yearly" => RewardPeriod::Annual,
                _ => RewardPeriod::Weekly,
            },
            gauge_controller: env::var("GAUGE_CONTROLLER")
                .unwrap_or_else(|_| DEFAULT_GAUGE_CONTROLLER.to_string()),
            gauge_factory: env::var("GAUGE_FACTORY")
                .unwrap_or_else(|_| DEFAULT_GAUGE_FACTORY.to_string()),
            reward_token: env::var("REWARD_TOKEN")
                .unwrap_or_else(|_| DEFAULT_REWARD_TOKEN.to_string()),
            token_admin: env::var("TOKEN_ADMIN")
                .unwrap_or_else(|_| DEFAULT_TOKEN_ADMIN.to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            refresh_interval_secs: env::var("REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration before a session starts
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre::eyre!("Invalid RPC_URL - please set a valid RPC URL"));
        }
        if self.subgraph_url.is_empty() {
            return Err(eyre::eyre!("SUBGRAPH_URL must be set"));
        }
        let account = self.account_address()?;
        if account == Address::ZERO {
            return Err(eyre::eyre!("ACCOUNT must be a non-zero address"));
        }
        self.gauge_controller_address()?;
        self.gauge_factory_address()?;
        self.reward_token_address()?;
        self.token_admin_address()?;
        Ok(())
    }

    pub fn account_address(&self) -> Result<Address> {
        parse_address("ACCOUNT", &self.account)
    }

    /// The configured pool override, if any.
    pub fn pool_address(&self) -> Result<Option<Address>> {
        self.pool_address
            .as_deref()
            .map(|raw| parse_address("POOL_ADDRESS", raw))
            .transpose()
    }

    pub fn gauge_controller_address(&self) -> Result<Address> {
        parse_address("GAUGE_CONTROLLER", &self.gauge_controller)
    }

    pub fn gauge_factory_address(&self) -> Result<Address> {
        parse_address("GAUGE_FACTORY", &self.gauge_factory)
    }

    pub fn reward_token_address(&self) -> Result<Address> {
        parse_address("REWARD_TOKEN", &self.reward_token)
    }

    pub fn token_admin_address(&self) -> Result<Address> {
        parse_address("TOKEN_ADMIN", &self.token_admin)
    }
}

fn parse_address(name: &str, raw: &str) -> Result<Address> {
    Address::from_str(raw).map_err(|e| eyre::eyre!("{name} is not a valid address: {e}"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            subgraph_url: DEFAULT_SUBGRAPH_URL.to_string(),
            chain_id: 1,
            account: String::new(),
            pool_address: None,
            reward_period: RewardPeriod::Weekly,
            gauge_controller: DEFAULT_GAUGE_CONTROLLER.to_string(),
            gauge_factory: DEFAULT_GAUGE_FACTORY.to_string(),
            reward_token: DEFAULT_REWARD_TOKEN.to_string(),
            token_admin: DEFAULT_TOKEN_ADMIN.to_string(),
            request_timeout_secs: 10,
            refresh_interval_secs: 30,
        }
    }
}

// ============================================
// TESTS
// ============================================
