//! Supported EVM testnets and their block-explorer conventions.

use alloy_primitives::{Address, B256};
use serde::Serialize;

pub const FLOW_TESTNET: u64 = 545;
pub const HEDERA_TESTNET: u64 = 296;
pub const ROOTSTOCK_TESTNET: u64 = 31;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    /// Explorer base URL without a trailing slash.
    pub explorer_url: String,
    pub native_symbol: String,
    /// `AgentLaunchpadV2` core contract.
    pub launchpad: Address,
    /// Bonding-curve AMM contract holding the agent liquidity pools.
    pub amm: Address,
}

impl NetworkConfig {
    /// Built-in settings for a supported chain.
    ///
    /// Contract addresses are zero until a deployment is supplied through
    /// `LAUNCHPAD_ADDRESS` / `AMM_ADDRESS`.
    pub fn for_chain(chain_id: u64) -> Option<Self> {
        let (name, rpc_url, explorer_url, native_symbol) = match chain_id {
            FLOW_TESTNET => (
                "Flow EVM Testnet",
                "https://testnet.evm.nodes.onflow.org",
                "https://evm-testnet.flowscan.io",
                "FLOW",
            ),
            HEDERA_TESTNET => (
                "Hedera Testnet",
                "https://testnet.hashio.io/api",
                "https://hashscan.io/testnet",
                "HBAR",
            ),
            ROOTSTOCK_TESTNET => (
                "Rootstock Testnet",
                "https://public-node.testnet.rsk.co",
                "https://explorer.testnet.rootstock.io",
                "tRBTC",
            ),
            _ => return None,
        };

        Some(NetworkConfig {
            chain_id,
            name: name.to_string(),
            rpc_url: rpc_url.to_string(),
            explorer_url: explorer_url.to_string(),
            native_symbol: native_symbol.to_string(),
            launchpad: Address::ZERO,
            amm: Address::ZERO,
        })
    }

    pub fn supported_chain_ids() -> [u64; 3] {
        [FLOW_TESTNET, HEDERA_TESTNET, ROOTSTOCK_TESTNET]
    }

    /// Link to a transaction on this network's explorer.
    pub fn explorer_tx_url(&self, tx_hash: &B256) -> String {
        explorer_tx_url(&self.explorer_url, self.chain_id, &tx_hash.to_string())
    }
}

/// Hashscan names the path segment `transaction`; every other explorer uses `tx`.
pub fn explorer_tx_url(explorer_url: &str, chain_id: u64, tx_hash: &str) -> String {
    let segment = if chain_id == HEDERA_TESTNET {
        "transaction"
    } else {
        "tx"
    };
    format!("{}/{segment}/{tx_hash}", explorer_url.trim_end_matches('/'))
}
