//! Long-running background task that follows the launchpad and AMM
//! contracts' logs and writes decoded events to the database.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::agents;
use crate::config::Config;
use crate::db;
use crate::errors::Result;
use crate::events;
use crate::rpc::{self, EthRpc, LogFilter};

pub struct IndexerState {
    pub pool: SqlitePool,
    pub rpc: Arc<dyn EthRpc>,
    pub config: Config,
}

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    pub next_block: u64,
    pub stored: usize,
    /// The scan has reached the chain head.
    pub caught_up: bool,
}

/// Run the indexer loop until `shutdown` fires.
///
/// While behind the head the loop polls back to back; once caught up it
/// waits `poll_interval_secs` between polls.
pub async fn run(state: Arc<IndexerState>, shutdown: CancellationToken) {
    info!(
        "Indexer starting, launchpad: {}, amm: {}",
        state.config.network.launchpad, state.config.network.amm
    );

    // Load the cursor from the DB; fall back to config start_block.
    let mut next_block = match db::get_next_block(&state.pool).await {
        Ok(Some(block)) => block,
        Ok(None) => state.config.start_block,
        Err(e) => {
            error!("Failed to read indexer cursor: {e}");
            state.config.start_block
        }
    };
    info!("Resuming from block {next_block}");

    let interval = Duration::from_secs(state.config.poll_interval_secs);
    loop {
        let mut wait = interval;
        tokio::select! {
            _ = shutdown.cancelled() => break,
            polled = poll_once(&state, next_block) => match polled {
                Ok(outcome) => {
                    next_block = outcome.next_block;
                    if !outcome.caught_up {
                        wait = Duration::ZERO;
                    }
                }
                Err(e) => error!("Indexer poll error: {e}"),
            },
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }
    info!("Indexer stopped at block {next_block}");
}

/// Scan at most `log_block_range` blocks starting at `from_block`.
pub async fn poll_once(state: &IndexerState, from_block: u64) -> Result<PollOutcome> {
    let head = state.rpc.block_number().await?;
    if from_block > head {
        return Ok(PollOutcome {
            next_block: from_block,
            stored: 0,
            caught_up: true,
        });
    }

    let range = state.config.log_block_range.max(1);
    let to_block = from_block.saturating_add(range - 1).min(head);
    let filter = LogFilter {
        from_block,
        to_block,
        addresses: vec![state.config.network.launchpad, state.config.network.amm],
    };
    let logs = rpc::get_logs_with_backoff(state.rpc.as_ref(), &filter).await?;

    let mut decoded = events::decode_logs(&logs);
    let mut timestamps: HashMap<i64, i64> = HashMap::new();
    for event in &mut decoded {
        if let Some(ts) = timestamps.get(&event.block_number) {
            event.timestamp = *ts;
            continue;
        }
        let block = u64::try_from(event.block_number).unwrap_or_default();
        let ts = state
            .rpc
            .block_timestamp(block)
            .await?
            .and_then(|t| i64::try_from(t).ok())
            .unwrap_or_default();
        timestamps.insert(event.block_number, ts);
        event.timestamp = ts;
    }

    let stored = if decoded.is_empty() {
        0
    } else {
        let inserted = db::insert_events(&state.pool, &decoded).await?;
        let synced = agents::apply_updates(&state.pool, &agents::agent_updates(&logs)).await?;
        info!(
            "Polled {} logs in blocks {from_block}..={to_block} → {} new records stored, \
             {} agents synced",
            logs.len(),
            inserted,
            synced
        );
        inserted
    };

    // Persist cursor so restarts are deterministic.
    let next_block = to_block + 1;
    db::save_next_block(&state.pool, next_block).await?;

    Ok(PollOutcome {
        next_block,
        stored,
        caught_up: to_block == head,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};

    use crate::abi::{IAgentAmm, IAgentLaunchpad};
    use crate::client::TxSettings;
    use crate::testing::{log_for, test_network, MockRpc, AMM, LAUNCHPAD, TOKEN, WALLET};

    fn config(range: u64, start_block: u64) -> Config {
        Config {
            network: test_network(),
            wallet: None,
            database_url: "sqlite::memory:".to_string(),
            api_host: "127.0.0.1".to_string(),
            api_port: 0,
            poll_interval_secs: 1,
            log_block_range: range,
            start_block,
            indexer_enabled: true,
            tx: TxSettings::default(),
        }
    }

    async fn state(rpc: Arc<MockRpc>, range: u64) -> IndexerState {
        IndexerState {
            pool: db::init_pool("sqlite::memory:").await.unwrap(),
            rpc,
            config: config(range, 0),
        }
    }

    fn contributed(agent: u64, amount: u64) -> IAgentLaunchpad::Contributed {
        IAgentLaunchpad::Contributed {
            agentId: U256::from(agent),
            contributor: WALLET,
            amount: U256::from(amount),
            totalRaised: U256::from(amount),
        }
    }

    #[tokio::test]
    async fn scans_in_bounded_ranges() {
        let rpc = Arc::new(MockRpc::new());
        rpc.set_head(250);
        rpc.add_chain_log(log_for(LAUNCHPAD, &contributed(1, 10), 50, 0));
        rpc.add_chain_log(log_for(LAUNCHPAD, &contributed(1, 20), 150, 0));
        rpc.add_chain_log(log_for(
            AMM,
            &IAgentAmm::LiquidityPoolCreated {
                agentId: U256::from(1u8),
                tokenAddress: TOKEN,
                ethAmount: U256::from(5u8),
                tokenAmount: U256::from(500u16),
            },
            150,
            1,
        ));
        // other contracts are not followed
        rpc.add_chain_log(log_for(Address::repeat_byte(0x99), &contributed(2, 30), 60, 0));
        let state = state(rpc, 100).await;

        let first = poll_once(&state, 0).await.unwrap();
        assert_eq!(
            first,
            PollOutcome {
                next_block: 100,
                stored: 1,
                caught_up: false
            }
        );

        let second = poll_once(&state, first.next_block).await.unwrap();
        assert_eq!(second.stored, 2);
        let third = poll_once(&state, second.next_block).await.unwrap();
        assert_eq!(
            third,
            PollOutcome {
                next_block: 251,
                stored: 0,
                caught_up: true
            }
        );

        let stored = db::get_events_for_agent(&state.pool, "1").await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].timestamp, 1_700_000_000 + 50 * 12);
        assert_eq!(stored[2].event_type, "liquidity_pool_created");
        assert_eq!(db::get_next_block(&state.pool).await.unwrap(), Some(251));
    }

    #[tokio::test]
    async fn lifecycle_events_sync_agent_records() {
        let rpc = Arc::new(MockRpc::new());
        rpc.set_head(40);
        let config = serde_json::json!({
            "id": "draft",
            "display_name": "Nova",
            "archetype": "artist",
            "core_traits": [],
            "origin_story": "",
            "primary_mediums": [],
            "influences": [],
            "colour_palette": [],
        });
        rpc.add_chain_log(log_for(
            LAUNCHPAD,
            &IAgentLaunchpad::AgentCreated {
                agentId: U256::from(6u8),
                creator: WALLET,
                tokenAddress: TOKEN,
                agentName: "Nova".to_string(),
                fundingTarget: U256::from(10u8),
                agentConfigJSON: config.to_string(),
            },
            5,
            0,
        ));
        // no config fields at all
        rpc.add_chain_log(log_for(
            LAUNCHPAD,
            &IAgentLaunchpad::AgentCreated {
                agentId: U256::from(7u8),
                creator: WALLET,
                tokenAddress: TOKEN,
                agentName: "Bare".to_string(),
                fundingTarget: U256::from(10u8),
                agentConfigJSON: "{}".to_string(),
            },
            6,
            0,
        ));
        rpc.add_chain_log(log_for(
            LAUNCHPAD,
            &IAgentLaunchpad::SeedGenerated {
                agentId: U256::from(6u8),
                seed: U256::from(99u8),
            },
            30,
            0,
        ));
        let state = state(rpc, 100).await;

        let outcome = poll_once(&state, 0).await.unwrap();
        assert_eq!(outcome.stored, 3);

        let record = db::get_synced_agent(&state.pool, "6").await.unwrap().unwrap();
        assert_eq!(record.agent_name.as_deref(), Some("Nova"));
        assert_eq!(record.blockchain_seed.as_deref(), Some("99"));
        assert_eq!(record.updated_block, 30);
        assert!(db::get_synced_agent(&state.pool, "7").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ahead_of_head_is_a_no_op() {
        let rpc = Arc::new(MockRpc::new());
        rpc.set_head(10);
        let state = state(rpc.clone(), 100).await;

        let outcome = poll_once(&state, 11).await.unwrap();
        assert!(outcome.caught_up);
        assert_eq!(outcome.next_block, 11);
        assert_eq!(rpc.get_logs_calls(), 0);
    }

    #[tokio::test]
    async fn rescanning_is_idempotent() {
        let rpc = Arc::new(MockRpc::new());
        rpc.set_head(20);
        rpc.add_chain_log(log_for(LAUNCHPAD, &contributed(3, 10), 5, 0));
        let state = state(rpc, 100).await;

        poll_once(&state, 0).await.unwrap();
        let again = poll_once(&state, 0).await.unwrap();
        assert_eq!(again.stored, 0);
        assert_eq!(db::get_all_events(&state.pool, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_resumes_from_cursor_and_stops_on_shutdown() {
        let rpc = Arc::new(MockRpc::new());
        rpc.set_head(30);
        rpc.add_chain_log(log_for(LAUNCHPAD, &contributed(4, 10), 5, 0));
        rpc.add_chain_log(log_for(LAUNCHPAD, &contributed(4, 20), 25, 0));
        let state = Arc::new(state(rpc, 100).await);
        db::save_next_block(&state.pool, 10).await.unwrap();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run(state.clone(), shutdown.clone()));
        for _ in 0..100 {
            if db::get_next_block(&state.pool).await.unwrap() == Some(31) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();

        // block 5 lies before the saved cursor
        let stored = db::get_all_events(&state.pool, None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].block_number, 25);
    }
}
