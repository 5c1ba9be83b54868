//! In-memory [`EthRpc`] and fixtures shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{address, Address, Bytes, B256, U64};
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;

use crate::client::{LaunchpadClient, TxSettings};
use crate::errors::{LaunchpadError, Result};
use crate::networks::NetworkConfig;
use crate::rpc::{EthRpc, LogFilter, RpcErrorObject, RpcLog, TxReceipt, TxRequest};

pub(crate) const LAUNCHPAD: Address = address!("1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a");
pub(crate) const AMM: Address = address!("2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b");
pub(crate) const WALLET: Address = address!("3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c3c");
pub(crate) const TOKEN: Address = address!("4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d4d");

pub(crate) const GAS_ESTIMATE: u64 = 100_000;
pub(crate) const GAS_USED: u64 = 87_000;
pub(crate) const RECEIPT_BLOCK: u64 = 4_242;

type CallHandler = Box<dyn Fn(&TxRequest) -> Result<Bytes> + Send + Sync>;

pub(crate) struct MockRpc {
    head: Mutex<u64>,
    handlers: Mutex<HashMap<[u8; 4], CallHandler>>,
    estimate_revert: Mutex<Option<RpcErrorObject>>,
    calls: Mutex<Vec<TxRequest>>,
    estimates: Mutex<Vec<TxRequest>>,
    sent: Mutex<Vec<(B256, TxRequest)>>,
    receipts: Mutex<VecDeque<Option<TxReceipt>>>,
    receipt_logs: Mutex<Vec<RpcLog>>,
    logs_results: Mutex<VecDeque<Result<Vec<RpcLog>>>>,
    chain_logs: Mutex<Vec<RpcLog>>,
    logs_calls: AtomicUsize,
}

impl MockRpc {
    pub(crate) fn new() -> Self {
        MockRpc {
            head: Mutex::new(0),
            handlers: Mutex::new(HashMap::new()),
            estimate_revert: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            estimates: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            receipts: Mutex::new(VecDeque::new()),
            receipt_logs: Mutex::new(Vec::new()),
            logs_results: Mutex::new(VecDeque::new()),
            chain_logs: Mutex::new(Vec::new()),
            logs_calls: AtomicUsize::new(0),
        }
    }

    /// Answer `eth_call`s to `C` with the bytes produced by `f`.
    pub(crate) fn on_call<C, F>(&self, f: F)
    where
        C: SolCall + 'static,
        F: Fn(C) -> Vec<u8> + Send + Sync + 'static,
    {
        self.on_call_result::<C, _>(move |call| Ok(f(call)));
    }

    pub(crate) fn on_call_result<C, F>(&self, f: F)
    where
        C: SolCall + 'static,
        F: Fn(C) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        let handler: CallHandler = Box::new(move |tx: &TxRequest| {
            let call = C::abi_decode(&tx.data, true)?;
            f(call).map(Bytes::from)
        });
        self.handlers.lock().unwrap().insert(C::SELECTOR, handler);
    }

    /// Fail `eth_estimateGas` the way nodes that only report the reason in
    /// the message do.
    pub(crate) fn revert_estimates_with(&self, reason: &str) {
        *self.estimate_revert.lock().unwrap() = Some(RpcErrorObject {
            code: 3,
            message: format!("execution reverted: {reason}"),
            data: None,
        });
    }

    /// Fail `eth_estimateGas` with ABI-encoded revert data and a bare message.
    pub(crate) fn revert_estimates_with_data(&self, data: &[u8]) {
        *self.estimate_revert.lock().unwrap() = Some(RpcErrorObject {
            code: 3,
            message: "execution reverted".to_string(),
            data: Some(serde_json::Value::String(format!("0x{}", hex::encode(data)))),
        });
    }

    pub(crate) fn set_head(&self, block: u64) {
        *self.head.lock().unwrap() = block;
    }

    pub(crate) fn set_receipt_logs(&self, logs: Vec<RpcLog>) {
        *self.receipt_logs.lock().unwrap() = logs;
    }

    pub(crate) fn push_receipt(&self, receipt: Option<TxReceipt>) {
        self.receipts.lock().unwrap().push_back(receipt);
    }

    pub(crate) fn push_logs_result(&self, result: Result<Vec<RpcLog>>) {
        self.logs_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn add_chain_log(&self, log: RpcLog) {
        self.chain_logs.lock().unwrap().push(log);
    }

    pub(crate) fn calls(&self) -> Vec<TxRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn estimates(&self) -> Vec<TxRequest> {
        self.estimates.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<TxRequest> {
        self.sent.lock().unwrap().iter().map(|(_, tx)| tx.clone()).collect()
    }

    pub(crate) fn get_logs_calls(&self) -> usize {
        self.logs_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EthRpc for MockRpc {
    async fn chain_id(&self) -> Result<u64> {
        Ok(545)
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(*self.head.lock().unwrap())
    }

    async fn call(&self, tx: &TxRequest) -> Result<Bytes> {
        self.calls.lock().unwrap().push(tx.clone());
        let handlers = self.handlers.lock().unwrap();
        match tx.selector().and_then(|s| handlers.get(&s)) {
            Some(handler) => handler(tx),
            None => Err(LaunchpadError::Rpc {
                code: 3,
                message: "execution reverted".to_string(),
                reason: None,
            }),
        }
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64> {
        self.estimates.lock().unwrap().push(tx.clone());
        match self.estimate_revert.lock().unwrap().clone() {
            Some(error) => Err(error.into()),
            None => Ok(GAS_ESTIMATE),
        }
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<B256> {
        let mut sent = self.sent.lock().unwrap();
        let hash = B256::with_last_byte(sent.len() as u8 + 1);
        sent.push((hash, tx.clone()));
        Ok(hash)
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>> {
        if let Some(queued) = self.receipts.lock().unwrap().pop_front() {
            return Ok(queued);
        }
        let known = self.sent.lock().unwrap().iter().any(|(h, _)| *h == tx_hash);
        if !known {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            transaction_hash: tx_hash,
            block_number: U64::from(RECEIPT_BLOCK),
            gas_used: U64::from(GAS_USED),
            status: Some(U64::from(1u64)),
            logs: self.receipt_logs.lock().unwrap().clone(),
        }))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RpcLog>> {
        self.logs_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.logs_results.lock().unwrap().pop_front() {
            return result;
        }
        Ok(self
            .chain_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                let block = log.block_number.map(|b| b.to::<u64>()).unwrap_or(0);
                block >= filter.from_block
                    && block <= filter.to_block
                    && (filter.addresses.is_empty() || filter.addresses.contains(&log.address))
            })
            .cloned()
            .collect())
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<Option<u64>> {
        Ok(Some(1_700_000_000 + block_number * 12))
    }
}

/// Encode `event` as a log emitted by `address`.
pub(crate) fn log_for<E: SolEvent>(address: Address, event: &E, block: u64, index: u64) -> RpcLog {
    let data = event.encode_log_data();
    RpcLog {
        address,
        topics: data.topics().to_vec(),
        data: data.data.clone(),
        block_number: Some(U64::from(block)),
        transaction_hash: Some(B256::with_last_byte(block as u8)),
        log_index: Some(U64::from(index)),
    }
}

pub(crate) fn test_network() -> NetworkConfig {
    let mut network = NetworkConfig::for_chain(545).expect("flow testnet is built in");
    network.launchpad = LAUNCHPAD;
    network.amm = AMM;
    network
}

pub(crate) fn test_settings() -> TxSettings {
    TxSettings {
        receipt_poll_interval: Duration::from_millis(10),
        receipt_timeout: Duration::from_secs(1),
        ..TxSettings::default()
    }
}

pub(crate) fn client_with(rpc: Arc<MockRpc>, wallet: Option<Address>) -> LaunchpadClient {
    LaunchpadClient::new(rpc, test_network(), wallet, test_settings())
}
