//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;

use crate::client::TxSettings;
use crate::errors::{LaunchpadError, Result};
use crate::math::{DEFAULT_DEADLINE_SECS, DEFAULT_GAS_BUFFER_PERCENT};
use crate::networks::{NetworkConfig, FLOW_TESTNET};

#[derive(Debug, Clone)]
pub struct Config {
    /// Chain, RPC endpoint and contract deployment.
    pub network: NetworkConfig,
    /// Account writes are sent from; reads only when unset.
    pub wallet: Option<Address>,
    /// Path to the SQLite database file
    pub database_url: String,
    pub api_host: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) to poll the RPC for new logs
    pub poll_interval_secs: u64,
    /// Widest block span requested in one `eth_getLogs`
    pub log_block_range: u64,
    /// Block to start from if no cursor is saved
    pub start_block: u64,
    pub indexer_enabled: bool,
    pub tx: TxSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let chain_id = parse_or(&var, "CHAIN_ID", FLOW_TESTNET)?;
        let mut network = NetworkConfig::for_chain(chain_id).ok_or_else(|| {
            LaunchpadError::Config(format!(
                "Unsupported CHAIN_ID {chain_id}; expected one of {:?}",
                NetworkConfig::supported_chain_ids()
            ))
        })?;
        if let Some(url) = var("RPC_URL") {
            network.rpc_url = url;
        }
        if let Some(addr) = var("LAUNCHPAD_ADDRESS") {
            network.launchpad = parse_address("LAUNCHPAD_ADDRESS", &addr)?;
        }
        if let Some(addr) = var("AMM_ADDRESS") {
            network.amm = parse_address("AMM_ADDRESS", &addr)?;
        }
        if network.launchpad == Address::ZERO {
            return Err(LaunchpadError::Config(format!(
                "LAUNCHPAD_ADDRESS is required for {}",
                network.name
            )));
        }
        if network.amm == Address::ZERO {
            return Err(LaunchpadError::Config(format!(
                "AMM_ADDRESS is required for {}",
                network.name
            )));
        }

        let wallet = var("WALLET_ADDRESS")
            .map(|addr| parse_address("WALLET_ADDRESS", &addr))
            .transpose()?;

        let default_slippage_percent: u32 = parse_or(&var, "DEFAULT_SLIPPAGE_PERCENT", 5)?;
        if default_slippage_percent > 100 {
            return Err(LaunchpadError::Config(
                "DEFAULT_SLIPPAGE_PERCENT must be between 0 and 100".to_string(),
            ));
        }
        let tx = TxSettings {
            deadline_secs: parse_or(&var, "TX_DEADLINE_SECS", DEFAULT_DEADLINE_SECS)?,
            gas_buffer_percent: parse_or(&var, "GAS_BUFFER_PERCENT", DEFAULT_GAS_BUFFER_PERCENT)?,
            default_slippage_percent,
            receipt_timeout: Duration::from_secs(parse_or(&var, "RECEIPT_TIMEOUT_SECS", 180)?),
            ..TxSettings::default()
        };

        let log_block_range: u64 = parse_or(&var, "LOG_BLOCK_RANGE", 1000)?;
        if log_block_range == 0 {
            return Err(LaunchpadError::Config(
                "LOG_BLOCK_RANGE must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            network,
            wallet,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:./launchpad.db".to_string()),
            api_host: var("API_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            api_port: parse_or(&var, "API_PORT", 3001)?,
            poll_interval_secs: parse_or(&var, "POLL_INTERVAL_SECS", 5)?,
            log_block_range,
            start_block: parse_or(&var, "START_BLOCK", 0)?,
            indexer_enabled: parse_or(&var, "INDEXER_ENABLED", true)?,
            tx,
        })
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LaunchpadError::Config(format!("Invalid {key}: {raw:?}"))),
        None => Ok(default),
    }
}

fn parse_address(key: &str, raw: &str) -> Result<Address> {
    raw.trim()
        .parse()
        .map_err(|_| LaunchpadError::Config(format!("Invalid {key}: {raw:?}")))
}
