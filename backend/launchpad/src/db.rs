//! Database layer: migrations, event queries, the indexer cursor, synced
//! agent records and a small key/value store.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::agents::{AgentRecord, AgentUpdate};
use crate::errors::Result;
use crate::events::{EventRecord, LaunchpadEvent};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // Every connection to `:memory:` opens its own database, so keep exactly
    // one alive for the life of the pool.
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Cursor helpers
// ─────────────────────────────────────────────────────────

/// The next block the indexer should scan, or `None` before the first poll.
pub async fn get_next_block(pool: &SqlitePool) -> Result<Option<u64>> {
    let row: Option<(Option<i64>,)> =
        sqlx::query_as("SELECT next_block FROM indexer_cursor WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row
        .and_then(|(v,)| v)
        .and_then(|v| u64::try_from(v).ok()))
}

pub async fn save_next_block(pool: &SqlitePool, next_block: u64) -> Result<()> {
    let next_block = i64::try_from(next_block).unwrap_or(i64::MAX);
    sqlx::query("UPDATE indexer_cursor SET next_block = ?1 WHERE id = 1")
        .bind(next_block)
        .execute(pool)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of decoded events. A log already stored under the same
/// `(tx_hash, log_index)` is ignored, which makes re-scanning a range safe.
pub async fn insert_events(pool: &SqlitePool, events: &[LaunchpadEvent]) -> Result<usize> {
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_type, agent_id, actor, amount, block_number, log_index,
                 tx_hash, contract, payload, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&ev.event_type)
        .bind(&ev.agent_id)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(ev.block_number)
        .bind(ev.log_index)
        .bind(&ev.tx_hash)
        .bind(&ev.contract)
        .bind(&ev.payload)
        .bind(ev.timestamp)
        .execute(pool)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events for a given agent, oldest first.
pub async fn get_events_for_agent(pool: &SqlitePool, agent_id: &str) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_type, agent_id, actor, amount, block_number, log_index,
               tx_hash, contract, payload, timestamp, created_at
        FROM   events
        WHERE  agent_id = ?1
        ORDER  BY block_number ASC, log_index ASC
        "#,
    )
    .bind(agent_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events, oldest first, optionally restricted to one `event_type`.
pub async fn get_all_events(
    pool: &SqlitePool,
    event_type: Option<&str>,
) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_type, agent_id, actor, amount, block_number, log_index,
               tx_hash, contract, payload, timestamp, created_at
        FROM   events
        WHERE  ?1 IS NULL OR event_type = ?1
        ORDER  BY block_number ASC, log_index ASC
        "#,
    )
    .bind(event_type)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────
// Agent records
// ─────────────────────────────────────────────────────────

/// Fold one lifecycle update into the `agents` table. Returns `false` when a
/// seed update names an agent with no record yet.
pub async fn apply_agent_update(pool: &SqlitePool, update: &AgentUpdate) -> Result<bool> {
    let rows_affected = match update {
        AgentUpdate::Created {
            agent_id,
            creator,
            token_address,
            agent_name,
            funding_target,
            config,
            block,
        } => {
            // A replayed creation must not undo a later bonding.
            sqlx::query(
                r#"
                INSERT INTO agents
                    (agent_id, creator, token_address, agent_name, funding_target,
                     config, updated_block)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT (agent_id) DO UPDATE SET
                    creator        = excluded.creator,
                    agent_name     = excluded.agent_name,
                    funding_target = excluded.funding_target,
                    token_address  = CASE WHEN agents.is_bonded = 1
                                          THEN agents.token_address
                                          ELSE excluded.token_address END,
                    config         = CASE WHEN agents.is_bonded = 1
                                          THEN agents.config
                                          ELSE excluded.config END,
                    updated_block  = MAX(agents.updated_block, excluded.updated_block),
                    updated_at     = strftime('%s', 'now')
                "#,
            )
            .bind(agent_id)
            .bind(creator.to_string())
            .bind(token_address.to_string())
            .bind(agent_name)
            .bind(funding_target.to_string())
            .bind(config.to_string())
            .bind(block)
            .execute(pool)
            .await?
            .rows_affected()
        }
        AgentUpdate::Bonded {
            agent_id,
            token_address,
            lp_pair_address,
            liquidity_added,
            seed,
            config,
            block,
        } => {
            sqlx::query(
                r#"
                INSERT INTO agents
                    (agent_id, token_address, config, is_bonded, lp_pair_address,
                     liquidity_added, blockchain_seed, updated_block)
                VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7)
                ON CONFLICT (agent_id) DO UPDATE SET
                    token_address   = excluded.token_address,
                    config          = excluded.config,
                    is_bonded       = 1,
                    lp_pair_address = excluded.lp_pair_address,
                    liquidity_added = excluded.liquidity_added,
                    blockchain_seed = CASE WHEN agents.updated_block > excluded.updated_block
                                           THEN agents.blockchain_seed
                                           ELSE excluded.blockchain_seed END,
                    updated_block   = MAX(agents.updated_block, excluded.updated_block),
                    updated_at      = strftime('%s', 'now')
                "#,
            )
            .bind(agent_id)
            .bind(token_address.to_string())
            .bind(config.to_string())
            .bind(lp_pair_address.to_string())
            .bind(liquidity_added.to_string())
            .bind(seed.to_string())
            .bind(block)
            .execute(pool)
            .await?
            .rows_affected()
        }
        AgentUpdate::Seed {
            agent_id,
            seed,
            block,
        } => {
            sqlx::query(
                r#"
                UPDATE agents
                SET    blockchain_seed = ?2,
                       updated_block   = MAX(updated_block, ?3),
                       updated_at      = strftime('%s', 'now')
                WHERE  agent_id = ?1
                "#,
            )
            .bind(agent_id)
            .bind(seed.to_string())
            .bind(block)
            .execute(pool)
            .await?
            .rows_affected()
        }
    };
    Ok(rows_affected > 0)
}

pub async fn get_synced_agent(pool: &SqlitePool, agent_id: &str) -> Result<Option<AgentRecord>> {
    let row = sqlx::query_as::<_, AgentRecord>(
        r#"
        SELECT agent_id, creator, token_address, agent_name, funding_target, config,
               is_bonded, lp_pair_address, liquidity_added, blockchain_seed,
               updated_block, updated_at
        FROM   agents
        WHERE  agent_id = ?1
        "#,
    )
    .bind(agent_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ─────────────────────────────────────────────────────────
// Key/value store
// ─────────────────────────────────────────────────────────

pub async fn kv_get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v))
}

pub async fn kv_put(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO kv_store (key, value, updated_at)
        VALUES (?1, ?2, strftime('%s', 'now'))
        ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn kv_delete(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM kv_store WHERE key = ?1")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}
