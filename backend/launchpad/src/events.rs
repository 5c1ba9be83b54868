//! Canonical event types emitted by the launchpad and AMM contracts.
//!
//! Logs are matched on `topic0` and decoded with the `sol!` bindings in
//! [`crate::abi`]. Logs from either contract that match none of the tracked
//! signatures are kept as [`EventKind::Unknown`].

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::abi::{IAgentAmm, IAgentLaunchpad};
use crate::rpc::RpcLog;

/// Fields every `agentConfigJSON` blob must carry for the UI to render it.
pub const REQUIRED_CONFIG_FIELDS: [&str; 8] = [
    "id",
    "display_name",
    "archetype",
    "core_traits",
    "origin_story",
    "primary_mediums",
    "influences",
    "colour_palette",
];

/// All recognised event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new agent crowdfund was opened.
    AgentCreated,
    /// Native coin was contributed to a crowdfund.
    Contributed,
    /// The agent reached its target; token and pool deployed.
    AgentBonded,
    /// The agent's generative seed was fixed.
    SeedGenerated,
    LiquidityPoolCreated,
    LiquidityAdded,
    Swap,
    /// An event from one of our contracts that we don't track.
    Unknown,
}

impl EventKind {
    /// Classify a log by its signature hash.
    pub fn from_topic(topic0: &B256) -> Self {
        let topic0 = *topic0;
        if topic0 == IAgentLaunchpad::AgentCreated::SIGNATURE_HASH {
            Self::AgentCreated
        } else if topic0 == IAgentLaunchpad::Contributed::SIGNATURE_HASH {
            Self::Contributed
        } else if topic0 == IAgentLaunchpad::AgentBonded::SIGNATURE_HASH {
            Self::AgentBonded
        } else if topic0 == IAgentLaunchpad::SeedGenerated::SIGNATURE_HASH {
            Self::SeedGenerated
        } else if topic0 == IAgentAmm::LiquidityPoolCreated::SIGNATURE_HASH {
            Self::LiquidityPoolCreated
        } else if topic0 == IAgentAmm::LiquidityAdded::SIGNATURE_HASH {
            Self::LiquidityAdded
        } else if topic0 == IAgentAmm::Swap::SIGNATURE_HASH {
            Self::Swap
        } else {
            Self::Unknown
        }
    }

    /// Return a short identifier string suitable for storage in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentCreated => "agent_created",
            Self::Contributed => "contributed",
            Self::AgentBonded => "agent_bonded",
            Self::SeedGenerated => "seed_generated",
            Self::LiquidityPoolCreated => "liquidity_pool_created",
            Self::LiquidityAdded => "liquidity_added",
            Self::Swap => "swap",
            Self::Unknown => "unknown",
        }
    }
}

/// A fully decoded event, ready to be stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchpadEvent {
    pub event_type: String,
    pub agent_id: Option<String>,
    /// Creator, contributor, provider or trader.
    pub actor: Option<String>,
    /// Headline amount in wei: contribution, liquidity or swap input.
    pub amount: Option<String>,
    pub block_number: i64,
    pub log_index: i64,
    pub tx_hash: String,
    pub contract: String,
    /// Every decoded field as JSON text.
    pub payload: String,
    /// Block time, filled in by the indexer; `0` until then.
    pub timestamp: i64,
}

/// A raw event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_type: String,
    pub agent_id: Option<String>,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub block_number: i64,
    pub log_index: i64,
    pub tx_hash: String,
    pub contract: String,
    pub payload: String,
    pub timestamp: i64,
    pub created_at: i64,
}

struct Decoded {
    kind: EventKind,
    agent_id: Option<U256>,
    actor: Option<Address>,
    amount: Option<U256>,
    payload: Value,
}

pub(crate) fn decode_as<E: SolEvent>(log: &RpcLog) -> Option<E> {
    match E::decode_raw_log(log.topics.iter().copied(), &log.data, true) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(event = E::SIGNATURE, address = %log.address, error = %e, "log decode failed");
            None
        }
    }
}

fn decode_fields(log: &RpcLog) -> Option<Decoded> {
    let topic0 = log.topics.first()?;
    let kind = EventKind::from_topic(topic0);
    let decoded = match kind {
        EventKind::AgentCreated => {
            let e = decode_as::<IAgentLaunchpad::AgentCreated>(log)?;
            Decoded {
                kind,
                agent_id: Some(e.agentId),
                actor: Some(e.creator),
                amount: Some(e.fundingTarget),
                payload: json!({
                    "creator": e.creator,
                    "tokenAddress": e.tokenAddress,
                    "agentName": e.agentName,
                    "fundingTarget": e.fundingTarget.to_string(),
                    "agentConfigJSON": e.agentConfigJSON,
                }),
            }
        }
        EventKind::Contributed => {
            let e = decode_as::<IAgentLaunchpad::Contributed>(log)?;
            Decoded {
                kind,
                agent_id: Some(e.agentId),
                actor: Some(e.contributor),
                amount: Some(e.amount),
                payload: json!({
                    "contributor": e.contributor,
                    "amount": e.amount.to_string(),
                    "totalRaised": e.totalRaised.to_string(),
                }),
            }
        }
        EventKind::AgentBonded => {
            let e = decode_as::<IAgentLaunchpad::AgentBonded>(log)?;
            Decoded {
                kind,
                agent_id: Some(e.agentId),
                actor: None,
                amount: Some(e.liquidityAdded),
                payload: json!({
                    "tokenAddress": e.tokenAddress,
                    "lpPairAddress": e.lpPairAddress,
                    "liquidityAdded": e.liquidityAdded.to_string(),
                    "seed": e.seed.to_string(),
                    "agentConfigJSON": e.agentConfigJSON,
                }),
            }
        }
        EventKind::SeedGenerated => {
            let e = decode_as::<IAgentLaunchpad::SeedGenerated>(log)?;
            Decoded {
                kind,
                agent_id: Some(e.agentId),
                actor: None,
                amount: None,
                payload: json!({ "seed": e.seed.to_string() }),
            }
        }
        EventKind::LiquidityPoolCreated => {
            let e = decode_as::<IAgentAmm::LiquidityPoolCreated>(log)?;
            Decoded {
                kind,
                agent_id: Some(e.agentId),
                actor: None,
                amount: Some(e.ethAmount),
                payload: json!({
                    "tokenAddress": e.tokenAddress,
                    "ethAmount": e.ethAmount.to_string(),
                    "tokenAmount": e.tokenAmount.to_string(),
                }),
            }
        }
        EventKind::LiquidityAdded => {
            let e = decode_as::<IAgentAmm::LiquidityAdded>(log)?;
            Decoded {
                kind,
                agent_id: Some(e.agentId),
                actor: Some(e.provider),
                amount: Some(e.ethAmount),
                payload: json!({
                    "provider": e.provider,
                    "ethAmount": e.ethAmount.to_string(),
                    "tokenAmount": e.tokenAmount.to_string(),
                    "liquidity": e.liquidity.to_string(),
                }),
            }
        }
        EventKind::Swap => {
            let e = decode_as::<IAgentAmm::Swap>(log)?;
            Decoded {
                kind,
                agent_id: Some(e.agentId),
                actor: Some(e.trader),
                amount: Some(e.amountIn),
                payload: json!({
                    "trader": e.trader,
                    "isBuy": e.isBuy,
                    "amountIn": e.amountIn.to_string(),
                    "amountOut": e.amountOut.to_string(),
                }),
            }
        }
        EventKind::Unknown => Decoded {
            kind,
            agent_id: None,
            actor: None,
            amount: None,
            payload: json!({ "topics": log.topics, "data": log.data }),
        },
    };
    Some(decoded)
}

/// Decode one log. Pending logs (no block number or hash yet) and logs
/// whose body doesn't match their signature yield `None`.
pub fn decode_log(log: &RpcLog) -> Option<LaunchpadEvent> {
    let (Some(block), Some(tx_hash)) = (log.block_number, log.transaction_hash) else {
        debug!(address = %log.address, "skipping pending log");
        return None;
    };
    let decoded = decode_fields(log)?;
    Some(LaunchpadEvent {
        event_type: decoded.kind.as_str().to_string(),
        agent_id: decoded.agent_id.map(|id| id.to_string()),
        actor: decoded.actor.map(|a| a.to_string()),
        amount: decoded.amount.map(|a| a.to_string()),
        block_number: to_i64(block.to::<u64>()),
        log_index: log.log_index.map(|i| to_i64(i.to::<u64>())).unwrap_or(0),
        tx_hash: tx_hash.to_string(),
        contract: log.address.to_string(),
        payload: decoded.payload.to_string(),
        timestamp: 0,
    })
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Decode a batch of logs.
pub fn decode_logs(logs: &[RpcLog]) -> Vec<LaunchpadEvent> {
    logs.iter().filter_map(decode_log).collect()
}

/// The id announced by the first `AgentCreated` log emitted by `launchpad`.
pub fn find_created_agent_id(logs: &[RpcLog], launchpad: Address) -> Option<U256> {
    logs.iter()
        .filter(|log| log.address == launchpad)
        .filter(|log| log.topics.first() == Some(&IAgentLaunchpad::AgentCreated::SIGNATURE_HASH))
        .find_map(|log| decode_as::<IAgentLaunchpad::AgentCreated>(log))
        .map(|event| event.agentId)
}

/// Required display fields absent from a config blob. A blob that isn't a
/// JSON object is missing all of them.
pub fn missing_config_fields(raw: &str) -> Vec<&'static str> {
    let parsed: Value = serde_json::from_str(raw).unwrap_or(Value::Null);
    missing_fields(&parsed)
}

pub(crate) fn missing_fields(config: &Value) -> Vec<&'static str> {
    let Some(object) = config.as_object() else {
        return REQUIRED_CONFIG_FIELDS.to_vec();
    };
    REQUIRED_CONFIG_FIELDS
        .iter()
        .copied()
        .filter(|field| !object.contains_key(*field))
        .collect()
}
