//! Per-agent records folded from the launchpad's lifecycle events.
//!
//! `AgentCreated` opens a record with its creator, token and config,
//! `AgentBonded` marks it bonded with the pair address and seed, and
//! `SeedGenerated` updates the seed of an existing record. Events whose
//! config blob lacks a required display field are not synced.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::abi::IAgentLaunchpad;
use crate::db;
use crate::errors::Result;
use crate::events::{self, decode_as, EventKind};
use crate::rpc::RpcLog;

/// A state change for one agent record.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentUpdate {
    Created {
        agent_id: String,
        creator: Address,
        token_address: Address,
        agent_name: String,
        funding_target: U256,
        config: Value,
        block: i64,
    },
    Bonded {
        agent_id: String,
        token_address: Address,
        lp_pair_address: Address,
        liquidity_added: U256,
        seed: U256,
        config: Value,
        block: i64,
    },
    Seed {
        agent_id: String,
        seed: U256,
        block: i64,
    },
}

impl AgentUpdate {
    pub fn agent_id(&self) -> &str {
        match self {
            AgentUpdate::Created { agent_id, .. }
            | AgentUpdate::Bonded { agent_id, .. }
            | AgentUpdate::Seed { agent_id, .. } => agent_id,
        }
    }
}

/// Row of the `agents` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgentRecord {
    pub agent_id: String,
    pub creator: Option<String>,
    pub token_address: Option<String>,
    pub agent_name: Option<String>,
    pub funding_target: Option<String>,
    pub config: String,
    pub is_bonded: bool,
    pub lp_pair_address: Option<String>,
    pub liquidity_added: Option<String>,
    pub blockchain_seed: Option<String>,
    pub updated_block: i64,
    pub updated_at: i64,
}

/// JSON shape of a synced agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedAgent {
    pub agent_id: String,
    pub creator: Option<String>,
    pub token_address: Option<String>,
    pub agent_name: Option<String>,
    pub funding_target: Option<String>,
    pub config: Value,
    pub is_bonded: bool,
    pub lp_pair_address: Option<String>,
    pub liquidity_added: Option<String>,
    pub blockchain_seed: Option<String>,
    pub updated_block: i64,
}

impl From<AgentRecord> for SyncedAgent {
    fn from(r: AgentRecord) -> Self {
        SyncedAgent {
            config: serde_json::from_str(&r.config).unwrap_or(Value::Null),
            agent_id: r.agent_id,
            creator: r.creator,
            token_address: r.token_address,
            agent_name: r.agent_name,
            funding_target: r.funding_target,
            is_bonded: r.is_bonded,
            lp_pair_address: r.lp_pair_address,
            liquidity_added: r.liquidity_added,
            blockchain_seed: r.blockchain_seed,
            updated_block: r.updated_block,
        }
    }
}

/// Parse a config blob and stamp it with the on-chain id. Blobs that are not
/// JSON objects or miss a required field yield `None`.
pub fn parse_agent_config(agent_id: &str, raw: &str) -> Option<Value> {
    let mut config: Value = match serde_json::from_str(raw) {
        Ok(config) => config,
        Err(e) => {
            warn!(agent_id, error = %e, "Agent config is not valid JSON");
            return None;
        }
    };
    let missing = events::missing_fields(&config);
    if !missing.is_empty() {
        warn!(agent_id, ?missing, "Agent config is missing required fields");
        return None;
    }
    if let Some(object) = config.as_object_mut() {
        object.insert("id".to_string(), Value::String(agent_id.to_string()));
    }
    Some(config)
}

/// The record change carried by `log`, if any.
pub fn agent_update(log: &RpcLog) -> Option<AgentUpdate> {
    let block = i64::try_from(log.block_number?.to::<u64>()).unwrap_or(i64::MAX);
    match EventKind::from_topic(log.topics.first()?) {
        EventKind::AgentCreated => {
            let e = decode_as::<IAgentLaunchpad::AgentCreated>(log)?;
            let agent_id = e.agentId.to_string();
            let config = parse_agent_config(&agent_id, &e.agentConfigJSON)?;
            Some(AgentUpdate::Created {
                agent_id,
                creator: e.creator,
                token_address: e.tokenAddress,
                agent_name: e.agentName,
                funding_target: e.fundingTarget,
                config,
                block,
            })
        }
        EventKind::AgentBonded => {
            let e = decode_as::<IAgentLaunchpad::AgentBonded>(log)?;
            let agent_id = e.agentId.to_string();
            let config = parse_agent_config(&agent_id, &e.agentConfigJSON)?;
            Some(AgentUpdate::Bonded {
                agent_id,
                token_address: e.tokenAddress,
                lp_pair_address: e.lpPairAddress,
                liquidity_added: e.liquidityAdded,
                seed: e.seed,
                config,
                block,
            })
        }
        EventKind::SeedGenerated => {
            let e = decode_as::<IAgentLaunchpad::SeedGenerated>(log)?;
            Some(AgentUpdate::Seed {
                agent_id: e.agentId.to_string(),
                seed: e.seed,
                block,
            })
        }
        _ => None,
    }
}

pub fn agent_updates(logs: &[RpcLog]) -> Vec<AgentUpdate> {
    logs.iter().filter_map(agent_update).collect()
}

/// Apply updates in log order; returns how many records changed.
pub async fn apply_updates(pool: &SqlitePool, updates: &[AgentUpdate]) -> Result<usize> {
    let mut applied = 0;
    for update in updates {
        if db::apply_agent_update(pool, update).await? {
            info!(agent_id = update.agent_id(), "Agent synced");
            applied += 1;
        } else {
            warn!(agent_id = update.agent_id(), "Agent not found for seed update");
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::testing::{log_for, LAUNCHPAD, TOKEN, WALLET};

    fn config() -> Value {
        json!({
            "id": "draft",
            "display_name": "Nova",
            "archetype": "artist",
            "core_traits": ["curious"],
            "origin_story": "",
            "primary_mediums": ["oil"],
            "influences": [],
            "colour_palette": ["#000"],
        })
    }

    fn created(id: u64, config: &Value) -> IAgentLaunchpad::AgentCreated {
        IAgentLaunchpad::AgentCreated {
            agentId: U256::from(id),
            creator: WALLET,
            tokenAddress: Address::ZERO,
            agentName: "Nova".to_string(),
            fundingTarget: U256::from(5u8),
            agentConfigJSON: config.to_string(),
        }
    }

    fn bonded(id: u64, seed: u64) -> IAgentLaunchpad::AgentBonded {
        IAgentLaunchpad::AgentBonded {
            agentId: U256::from(id),
            tokenAddress: TOKEN,
            lpPairAddress: Address::repeat_byte(0x77),
            liquidityAdded: U256::from(1_000u64),
            seed: U256::from(seed),
            agentConfigJSON: config().to_string(),
        }
    }

    fn seed(id: u64, seed: u64) -> IAgentLaunchpad::SeedGenerated {
        IAgentLaunchpad::SeedGenerated {
            agentId: U256::from(id),
            seed: U256::from(seed),
        }
    }

    #[test]
    fn config_is_stamped_with_chain_id() {
        let parsed = parse_agent_config("12", &config().to_string()).unwrap();
        assert_eq!(parsed["id"], "12");
        assert_eq!(parsed["display_name"], "Nova");
    }

    #[test]
    fn incomplete_or_invalid_config_is_not_synced() {
        let mut partial = config();
        partial.as_object_mut().unwrap().remove("colour_palette");
        assert!(parse_agent_config("1", &partial.to_string()).is_none());
        assert!(parse_agent_config("1", "not json").is_none());
        assert!(parse_agent_config("1", "[]").is_none());

        let log = log_for(LAUNCHPAD, &created(1, &partial), 10, 0);
        assert!(agent_update(&log).is_none());
    }

    #[test]
    fn lifecycle_logs_map_to_updates() {
        let logs = vec![
            log_for(LAUNCHPAD, &created(3, &config()), 10, 0),
            log_for(
                LAUNCHPAD,
                &IAgentLaunchpad::Contributed {
                    agentId: U256::from(3u8),
                    contributor: WALLET,
                    amount: U256::from(5u8),
                    totalRaised: U256::from(5u8),
                },
                11,
                0,
            ),
            log_for(LAUNCHPAD, &bonded(3, 42), 12, 0),
            log_for(LAUNCHPAD, &seed(3, 42), 12, 1),
        ];
        let updates = agent_updates(&logs);
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].agent_id(), "3");
        assert!(matches!(updates[0], AgentUpdate::Created { block: 10, .. }));
        assert!(matches!(
            &updates[1],
            AgentUpdate::Bonded { lp_pair_address, .. }
                if *lp_pair_address == Address::repeat_byte(0x77)
        ));
        assert!(matches!(
            &updates[2],
            AgentUpdate::Seed { seed, .. } if *seed == U256::from(42u8)
        ));
    }

    async fn synced(pool: &SqlitePool, agent_id: &str) -> SyncedAgent {
        db::get_synced_agent(pool, agent_id).await.unwrap().unwrap().into()
    }

    #[tokio::test]
    async fn projection_follows_the_lifecycle() {
        let pool = db::init_pool("sqlite::memory:").await.unwrap();
        let created_log = log_for(LAUNCHPAD, &created(3, &config()), 10, 0);

        let applied = apply_updates(&pool, &agent_updates(&[created_log.clone()]))
            .await
            .unwrap();
        assert_eq!(applied, 1);
        let record = synced(&pool, "3").await;
        assert!(!record.is_bonded);
        assert_eq!(record.creator, Some(WALLET.to_string()));
        assert_eq!(record.funding_target.as_deref(), Some("5"));
        assert_eq!(record.config["id"], "3");
        assert_eq!(record.blockchain_seed, None);

        let later = vec![
            log_for(LAUNCHPAD, &bonded(3, 42), 12, 0),
            log_for(LAUNCHPAD, &seed(3, 43), 13, 0),
        ];
        apply_updates(&pool, &agent_updates(&later)).await.unwrap();
        let record = synced(&pool, "3").await;
        assert!(record.is_bonded);
        assert_eq!(record.token_address, Some(TOKEN.to_string()));
        assert_eq!(record.lp_pair_address, Some(Address::repeat_byte(0x77).to_string()));
        assert_eq!(record.liquidity_added.as_deref(), Some("1000"));
        assert_eq!(record.blockchain_seed.as_deref(), Some("43"));
        assert_eq!(record.updated_block, 13);

        // replaying the creation keeps the bonded state
        apply_updates(&pool, &agent_updates(&[created_log])).await.unwrap();
        let record = synced(&pool, "3").await;
        assert!(record.is_bonded);
        assert_eq!(record.token_address, Some(TOKEN.to_string()));
        assert_eq!(record.updated_block, 13);
    }

    #[tokio::test]
    async fn seed_for_unknown_agent_changes_nothing() {
        let pool = db::init_pool("sqlite::memory:").await.unwrap();
        let updates = agent_updates(&[log_for(LAUNCHPAD, &seed(9, 1), 5, 0)]);
        assert_eq!(apply_updates(&pool, &updates).await.unwrap(), 0);
        assert!(db::get_synced_agent(&pool, "9").await.unwrap().is_none());
    }
}
