//! Per-wallet, per-chain log of recent transactions.
//!
//! The list lives as one JSON array under a key in the `kv_store` table,
//! newest first and capped at [`MAX_TRANSACTIONS`]. Concurrent writers race:
//! the last write wins.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db;
use crate::errors::Result;

pub const MAX_TRANSACTIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    /// Short label such as `createAgent`, `contribute` or `swap`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub explorer_url: String,
    pub network: String,
    #[serde(default)]
    pub details: Value,
}

/// `agentlaunchpad_transactions_0x…_<chainId>`, address lower-cased.
pub fn storage_key(address: Address, chain_id: u64) -> String {
    format!(
        "agentlaunchpad_transactions_0x{}_{}",
        hex::encode(address.as_slice()),
        chain_id
    )
}

#[derive(Clone)]
pub struct TransactionLog {
    pool: SqlitePool,
}

impl TransactionLog {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionLog { pool }
    }

    /// Prepend `record` and keep the newest [`MAX_TRANSACTIONS`].
    pub async fn add_transaction(
        &self,
        address: Address,
        chain_id: u64,
        record: TransactionRecord,
    ) -> Result<()> {
        let key = storage_key(address, chain_id);
        let mut records = self.recent_transactions(address, chain_id).await?;
        records.insert(0, record);
        records.truncate(MAX_TRANSACTIONS);
        db::kv_put(&self.pool, &key, &serde_json::to_string(&records)?).await?;
        debug!(%key, count = records.len(), "transaction log updated");
        Ok(())
    }

    /// Stored records, newest first. Malformed contents read as empty.
    pub async fn recent_transactions(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<Vec<TransactionRecord>> {
        let key = storage_key(address, chain_id);
        let Some(raw) = db::kv_get(&self.pool, &key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(%key, error = %e, "discarding malformed transaction log");
                Ok(Vec::new())
            }
        }
    }

    pub async fn clear_transactions(&self, address: Address, chain_id: u64) -> Result<()> {
        db::kv_delete(&self.pool, &storage_key(address, chain_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ALICE: Address = address!("abcdef0123456789abcdef0123456789abcdef01");

    fn record(n: usize) -> TransactionRecord {
        TransactionRecord {
            hash: format!("0x{n:064x}"),
            kind: "contribute".to_string(),
            timestamp: 1_700_000_000_000 + n as i64,
            explorer_url: format!("https://evm-testnet.flowscan.io/tx/0x{n:064x}"),
            network: "Flow EVM Testnet".to_string(),
            details: serde_json::json!({ "agentId": "1" }),
        }
    }

    async fn log() -> (TransactionLog, SqlitePool) {
        let pool = db::init_pool("sqlite::memory:").await.unwrap();
        (TransactionLog::new(pool.clone()), pool)
    }

    #[test]
    fn key_uses_lowercase_hex() {
        assert_eq!(
            storage_key(ALICE, 545),
            "agentlaunchpad_transactions_0xabcdef0123456789abcdef0123456789abcdef01_545"
        );
    }

    #[test]
    fn record_json_shape() {
        let v = serde_json::to_value(record(1)).unwrap();
        assert_eq!(v["type"], "contribute");
        assert!(v["explorerUrl"].is_string());
    }

    #[tokio::test]
    async fn newest_first_and_capped() {
        let (log, _) = log().await;
        for n in 0..25 {
            log.add_transaction(ALICE, 545, record(n)).await.unwrap();
        }
        let recent = log.recent_transactions(ALICE, 545).await.unwrap();
        assert_eq!(recent.len(), MAX_TRANSACTIONS);
        assert_eq!(recent[0], record(24));
        assert_eq!(recent[19], record(5));

        // other chains are separate
        assert!(log.recent_transactions(ALICE, 296).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_storage_reads_empty() {
        let (log, pool) = log().await;
        db::kv_put(&pool, &storage_key(ALICE, 545), "{not json").await.unwrap();
        assert!(log.recent_transactions(ALICE, 545).await.unwrap().is_empty());

        log.add_transaction(ALICE, 545, record(1)).await.unwrap();
        assert_eq!(log.recent_transactions(ALICE, 545).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let (log, _) = log().await;
        log.add_transaction(ALICE, 545, record(1)).await.unwrap();
        log.clear_transactions(ALICE, 545).await.unwrap();
        assert!(log.recent_transactions(ALICE, 545).await.unwrap().is_empty());
    }
}
