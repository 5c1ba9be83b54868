//! Named result shapes returned by the facade.
//!
//! Every on-chain amount is exposed as a [`TokenAmount`] so callers get both
//! the raw integer string and a formatted decimal string.

use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use serde_json::Value;

use crate::abi::{IAgentAmm, IAgentLaunchpad};
use crate::math::funding_progress;
use crate::units::TokenAmount;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub agent_name: String,
    pub archetype: String,
    pub metadata_uri: String,
    pub funding_target: TokenAmount,
    pub total_raised: TokenAmount,
    /// Percent of the target raised, 0-100.
    pub progress: u8,
    pub is_bonded: bool,
    pub creator: Address,
    pub token_address: Address,
    pub lp_pair_address: Address,
    /// Parsed `agentConfigJSON`; `null` when the stored blob is not JSON.
    pub agent_config: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

impl AgentInfo {
    pub fn from_info(agent_id: U256, info: IAgentLaunchpad::getAgentInfoReturn) -> Self {
        AgentInfo {
            id: agent_id.to_string(),
            progress: funding_progress(info.totalRaised, info.fundingTarget),
            funding_target: TokenAmount::ether(info.fundingTarget),
            total_raised: TokenAmount::ether(info.totalRaised),
            name: info.name,
            symbol: info.symbol,
            agent_name: info.agentName,
            archetype: info.archetype,
            metadata_uri: info.metadataURI,
            is_bonded: info.isBonded,
            creator: info.creator,
            token_address: info.tokenAddress,
            lp_pair_address: info.lpPairAddress,
            agent_config: parse_config(&info.agentConfigJSON),
            created_at: None,
        }
    }

    pub fn from_data(agent_id: U256, data: IAgentLaunchpad::AgentData) -> Self {
        AgentInfo {
            id: agent_id.to_string(),
            progress: funding_progress(data.totalRaised, data.fundingTarget),
            funding_target: TokenAmount::ether(data.fundingTarget),
            total_raised: TokenAmount::ether(data.totalRaised),
            name: data.name,
            symbol: data.symbol,
            agent_name: data.agentName,
            archetype: data.archetype,
            metadata_uri: data.metadataURI,
            is_bonded: data.isBonded,
            creator: data.creator,
            token_address: data.tokenAddress,
            lp_pair_address: data.lpPairAddress,
            agent_config: parse_config(&data.agentConfigJSON),
            created_at: Some(data.createdAt.saturating_to::<u64>()),
        }
    }

    /// Unused ids read back as an all-default record.
    pub fn exists(&self) -> bool {
        self.creator != Address::ZERO
    }
}

fn parse_config(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BondedTokenView {
    pub agent_id: String,
    pub token_address: Address,
    pub lp_pair_address: Address,
    pub name: String,
    pub symbol: String,
    pub total_raised: TokenAmount,
    pub bonded_at: u64,
}

impl From<IAgentLaunchpad::BondedToken> for BondedTokenView {
    fn from(t: IAgentLaunchpad::BondedToken) -> Self {
        BondedTokenView {
            agent_id: t.agentId.to_string(),
            token_address: t.tokenAddress,
            lp_pair_address: t.lpPairAddress,
            name: t.name,
            symbol: t.symbol,
            total_raised: TokenAmount::ether(t.totalRaised),
            bonded_at: t.bondedAt.saturating_to::<u64>(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InProgressAgentView {
    pub agent_id: String,
    pub name: String,
    pub symbol: String,
    pub creator: Address,
    pub funding_target: TokenAmount,
    pub total_raised: TokenAmount,
    pub progress: u8,
    pub created_at: u64,
}

impl From<IAgentLaunchpad::InProgressAgent> for InProgressAgentView {
    fn from(a: IAgentLaunchpad::InProgressAgent) -> Self {
        InProgressAgentView {
            agent_id: a.agentId.to_string(),
            progress: funding_progress(a.totalRaised, a.fundingTarget),
            funding_target: TokenAmount::ether(a.fundingTarget),
            total_raised: TokenAmount::ether(a.totalRaised),
            name: a.name,
            symbol: a.symbol,
            creator: a.creator,
            created_at: a.createdAt.saturating_to::<u64>(),
        }
    }
}

/// One page of an on-chain listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: u64,
    pub limit: u64,
    pub total_count: u64,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolReserves {
    pub agent_id: String,
    pub reserve_eth: TokenAmount,
    pub reserve_token: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairView {
    pub agent_id: String,
    pub token_address: Address,
    pub reserve_eth: TokenAmount,
    pub reserve_token: TokenAmount,
    pub total_liquidity: TokenAmount,
}

impl From<IAgentAmm::PairInfo> for PairView {
    fn from(p: IAgentAmm::PairInfo) -> Self {
        PairView {
            agent_id: p.agentId.to_string(),
            token_address: p.tokenAddress,
            reserve_eth: TokenAmount::ether(p.reserveETH),
            reserve_token: TokenAmount::ether(p.reserveToken),
            total_liquidity: TokenAmount::ether(p.totalLiquidity),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCounts {
    pub total_agents: u64,
    pub total_bonded: u64,
    pub total_in_progress: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSettings {
    pub owner: Address,
    pub treasury: Address,
    pub platform_fee_bps: u64,
    pub paused: bool,
}

/// A confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    pub explorer_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAgent {
    #[serde(flatten)]
    pub outcome: TxOutcome,
    /// `None` when the receipt carried no decodable `AgentCreated` log.
    pub agent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOutcome {
    #[serde(flatten)]
    pub outcome: TxOutcome,
    pub amount_in: TokenAmount,
    pub expected_amount_out: TokenAmount,
    pub min_amount_out: TokenAmount,
    /// Set when an ERC20 approval had to be sent first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<TxOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityOutcome {
    #[serde(flatten)]
    pub outcome: TxOutcome,
    pub token_amount: TokenAmount,
    pub eth_amount: TokenAmount,
    pub min_token_amount: TokenAmount,
    pub min_eth_amount: TokenAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<TxOutcome>,
}
