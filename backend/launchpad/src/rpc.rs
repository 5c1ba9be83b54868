//! Ethereum JSON-RPC transport.
//!
//! [`EthRpc`] is the seam between the contract facade and the network; the
//! production implementation is [`HttpRpc`] over `reqwest`.
//!
//! ## Resilience
//!
//! * Facade reads and writes are single-shot: failures surface to the caller.
//! * The indexer's log fetch ([`get_logs_with_backoff`]) applies exponential
//!   back-off on transport errors, rate limits and soft RPC errors, up to
//!   [`MAX_BACKOFF_SECS`] seconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::{Revert, SolError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{LaunchpadError, Result};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────

/// Call or transaction parameters for `eth_call`, `eth_estimateGas` and
/// `eth_sendTransaction`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
}

impl TxRequest {
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        TxRequest {
            to,
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Attach a native-coin value; zero is omitted from the request.
    pub fn value(mut self, value: U256) -> Self {
        self.value = (!value.is_zero()).then_some(value);
        self
    }

    /// Four-byte function selector of the calldata, if present.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub log_index: Option<U64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: U64,
    pub gas_used: U64,
    /// `1` success, `0` reverted. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |s| !s.is_zero())
    }
}

/// `eth_getLogs` filter over an inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub from_block: u64,
    pub to_block: u64,
    pub addresses: Vec<Address>,
}

impl LogFilter {
    fn to_params(&self) -> Value {
        json!([{
            "fromBlock": format!("0x{:x}", self.from_block),
            "toBlock": format!("0x{:x}", self.to_block),
            "address": self.addresses,
        }])
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// JSON-RPC `error` member.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcErrorObject {
    pub(crate) code: i64,
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) data: Option<Value>,
}

impl From<RpcErrorObject> for LaunchpadError {
    fn from(err: RpcErrorObject) -> Self {
        let reason = err
            .data
            .as_ref()
            .and_then(revert_data)
            .and_then(|data| revert_reason(&data))
            .or_else(|| {
                err.message
                    .strip_prefix("execution reverted: ")
                    .map(str::to_string)
            });
        LaunchpadError::Rpc {
            code: err.code,
            message: err.message,
            reason,
        }
    }
}

/// `Error(string)` payloads yield the bare reason; panics and custom errors
/// fall back to their display form.
fn revert_reason(data: &[u8]) -> Option<String> {
    match Revert::abi_decode(data, true) {
        Ok(revert) => Some(revert.reason),
        Err(_) => alloy_sol_types::decode_revert_reason(data),
    }
}

/// Revert payload from an RPC error's `data`, which nodes report either as a
/// bare hex string or nested under `data`.
fn revert_data(value: &Value) -> Option<Vec<u8>> {
    let hex_str = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("data")?.as_str()?,
        _ => return None,
    };
    hex::decode(hex_str.trim_start_matches("0x")).ok()
}

// ─────────────────────────────────────────────────────────
// Transport trait
// ─────────────────────────────────────────────────────────

#[async_trait]
pub trait EthRpc: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    async fn block_number(&self) -> Result<u64>;

    /// `eth_call` against the latest block.
    async fn call(&self, tx: &TxRequest) -> Result<Bytes>;

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64>;

    /// Submit through the account behind the RPC endpoint; returns the hash.
    async fn send_transaction(&self, tx: &TxRequest) -> Result<B256>;

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>>;

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RpcLog>>;

    /// Unix timestamp of a block, `None` if the node does not know it.
    async fn block_timestamp(&self, block_number: u64) -> Result<Option<u64>>;
}

// ─────────────────────────────────────────────────────────
// HTTP implementation
// ─────────────────────────────────────────────────────────

pub struct HttpRpc {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    timestamp: U64,
}

impl HttpRpc {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        HttpRpc {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LaunchpadError::RateLimited);
        }

        let body: RpcResponse<T> = response.json().await?;
        if let Some(err) = body.error {
            return Err(err.into());
        }
        debug!(method, id, "rpc call completed");
        Ok(body.result)
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        self.request_optional(method, params)
            .await?
            .ok_or_else(|| LaunchpadError::EmptyResult(method.to_string()))
    }
}

#[async_trait]
impl EthRpc for HttpRpc {
    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self.request("eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }

    async fn block_number(&self) -> Result<u64> {
        let number: U64 = self.request("eth_blockNumber", json!([])).await?;
        Ok(number.to::<u64>())
    }

    async fn call(&self, tx: &TxRequest) -> Result<Bytes> {
        self.request("eth_call", json!([tx, "latest"])).await
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64> {
        let gas: U64 = self.request("eth_estimateGas", json!([tx])).await?;
        Ok(gas.to::<u64>())
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<B256> {
        self.request("eth_sendTransaction", json!([tx])).await
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>> {
        self.request_optional("eth_getTransactionReceipt", json!([tx_hash]))
            .await
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RpcLog>> {
        self.request("eth_getLogs", filter.to_params()).await
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<Option<u64>> {
        let header: Option<BlockHeader> = self
            .request_optional(
                "eth_getBlockByNumber",
                json!([format!("0x{block_number:x}"), false]),
            )
            .await?;
        Ok(header.map(|h| h.timestamp.to::<u64>()))
    }
}

// ─────────────────────────────────────────────────────────
// Helpers built on the trait
// ─────────────────────────────────────────────────────────

/// Poll for a receipt until it appears, the transaction reverts, or
/// `timeout` elapses.
pub async fn wait_for_receipt(
    rpc: &dyn EthRpc,
    tx_hash: B256,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<TxReceipt> {
    let started = tokio::time::Instant::now();
    loop {
        if let Some(receipt) = rpc.transaction_receipt(tx_hash).await? {
            if !receipt.succeeded() {
                return Err(LaunchpadError::Reverted { tx_hash });
            }
            return Ok(receipt);
        }
        if started.elapsed() >= timeout {
            return Err(LaunchpadError::ReceiptTimeout { tx_hash });
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Codes -32600 (invalid request) and -32601 (method not found) will not
/// succeed on retry.
fn is_retryable(err: &LaunchpadError) -> bool {
    match err {
        LaunchpadError::Http(_) | LaunchpadError::RateLimited => true,
        LaunchpadError::Rpc { code, .. } => *code != -32600 && *code != -32601,
        _ => false,
    }
}

/// `eth_getLogs` with exponential back-off on transient failures.
pub async fn get_logs_with_backoff(rpc: &dyn EthRpc, filter: &LogFilter) -> Result<Vec<RpcLog>> {
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        match rpc.get_logs(filter).await {
            Ok(logs) => {
                debug!(
                    "Fetched {} logs for blocks {}..={}",
                    logs.len(),
                    filter.from_block,
                    filter.to_block
                );
                return Ok(logs);
            }
            Err(e) if is_retryable(&e) => {
                warn!("Log fetch failed (will retry in {backoff}s): {e}");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
            }
            Err(e) => return Err(e),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
