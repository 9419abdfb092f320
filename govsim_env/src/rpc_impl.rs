//! Production ledger backed by an HTTP JSON-RPC development node.
//!
//! Targets Ganache-style nodes: accounts are unlocked, so transactions are
//! sent with `eth_sendTransaction` and signed by the node.

use alloy_primitives::{hex, Address, Bytes, B256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::abi;
use crate::error::LedgerError;
use crate::ledger::{DeployedContract, LedgerConnection};
use crate::types::{DecisionCall, DecisionReceipt, TxHandle};

/// Connection settings for the JSON-RPC node.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// HTTP endpoint
    pub url: String,

    /// Delay between receipt polls
    pub poll_interval: Duration,

    /// Give up waiting for a receipt after this long
    pub receipt_timeout: Duration,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:7545".to_string(),
            poll_interval: Duration::from_millis(250),
            receipt_timeout: Duration::from_secs(120),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RpcConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: B256,
    gas_used: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
}

/// Parses a hex quantity such as `0x4a817c800`.
pub fn parse_quantity(value: &str) -> Result<u128, LedgerError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::decode(format!("quantity without 0x prefix: {}", value)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::decode(format!("bad quantity {}: {}", value, e)))
}

impl RawReceipt {
    /// Converts into a receipt, decoding decision events emitted by `contract`.
    fn into_decision_receipt(self, contract: Option<Address>) -> Result<DecisionReceipt, LedgerError> {
        if self.status.as_deref() == Some("0x0") {
            return Err(LedgerError::Reverted(self.transaction_hash.to_string()));
        }

        let gas_used = u64::try_from(parse_quantity(&self.gas_used)?)
            .map_err(|_| LedgerError::decode("gasUsed does not fit in u64"))?;

        let mut event = None;
        for log in &self.logs {
            if contract.is_some_and(|c| c != log.address) {
                continue;
            }
            if let Some(decoded) = abi::decode_decision_event(&log.topics, &log.data)? {
                event = Some(decoded);
                break;
            }
        }

        Ok(DecisionReceipt {
            tx_hash: self.transaction_hash,
            gas_used,
            contract_address: self.contract_address,
            event,
        })
    }
}

struct RpcClient {
    http: reqwest::Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

impl RpcClient {
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let timeout = self.config.request_timeout;
        let transport = |e: reqwest::Error| LedgerError::transport(e, timeout);
        let response: RpcResponse<T> = self
            .http
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;

        if let Some(err) = response.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        self.request(method, params)
            .await?
            .ok_or_else(|| LedgerError::decode(format!("{} returned no result", method)))
    }

    async fn send_transaction(&self, tx: Value) -> Result<B256, LedgerError> {
        self.call("eth_sendTransaction", json!([tx])).await
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<RawReceipt, LedgerError> {
        let start = tokio::time::Instant::now();
        loop {
            let receipt: Option<RawReceipt> = self
                .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
                .await?;
            if let Some(receipt) = receipt {
                return Ok(receipt);
            }

            let waited = start.elapsed();
            if waited >= self.config.receipt_timeout {
                return Err(LedgerError::Timeout(waited.as_millis() as u64));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

/// Ledger connection over JSON-RPC.
pub struct JsonRpcLedger {
    client: Arc<RpcClient>,
}

impl JsonRpcLedger {
    /// Creates a client for the configured endpoint (no I/O yet).
    pub fn new(config: RpcConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(LedgerError::unreachable)?;
        Ok(Self {
            client: Arc::new(RpcClient {
                http,
                config,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.client.config.url
    }

    /// Returns a handle to an already deployed contract.
    pub fn attach(&self, address: Address) -> RpcDecisionContract {
        RpcDecisionContract {
            client: Arc::clone(&self.client),
            address,
        }
    }

    /// Deploys the decision contract from its creation bytecode.
    pub async fn deploy(
        &self,
        creation_code: &[u8],
        sender: Address,
    ) -> Result<RpcDecisionContract, LedgerError> {
        if creation_code.is_empty() {
            return Err(LedgerError::deployment("empty creation bytecode"));
        }

        let tx_hash = self
            .client
            .send_transaction(json!({
                "from": sender.to_string(),
                "data": hex::encode_prefixed(creation_code),
            }))
            .await?;
        let receipt = self
            .client
            .wait_for_receipt(tx_hash)
            .await?
            .into_decision_receipt(None)?;

        let address = receipt
            .contract_address
            .ok_or_else(|| LedgerError::deployment(format!("no contract address in receipt {}", tx_hash)))?;
        debug!("Deployed decision contract at {} (gas={})", address, receipt.gas_used);

        Ok(self.attach(address))
    }
}

#[async_trait]
impl LedgerConnection for JsonRpcLedger {
    async fn is_reachable(&self) -> bool {
        self.client
            .call::<String>("net_version", json!([]))
            .await
            .is_ok()
    }

    async fn primary_account(&self) -> Result<Address, LedgerError> {
        let accounts: Vec<Address> = self.client.call("eth_accounts", json!([])).await?;
        accounts.first().copied().ok_or(LedgerError::NoAccounts)
    }

    async fn current_gas_price(&self) -> Result<u128, LedgerError> {
        let price: String = self.client.call("eth_gasPrice", json!([])).await?;
        parse_quantity(&price)
    }
}

/// Decision contract reached through JSON-RPC.
pub struct RpcDecisionContract {
    client: Arc<RpcClient>,
    address: Address,
}

#[async_trait]
impl DeployedContract for RpcDecisionContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn submit_decision(
        &self,
        call: DecisionCall,
        sender: Address,
    ) -> Result<TxHandle, LedgerError> {
        let data = abi::encode_execute_decision(&call);
        let tx_hash = self
            .client
            .send_transaction(json!({
                "from": sender.to_string(),
                "to": self.address.to_string(),
                "data": hex::encode_prefixed(data),
            }))
            .await?;
        Ok(TxHandle(tx_hash))
    }

    async fn await_receipt(&self, tx: &TxHandle) -> Result<DecisionReceipt, LedgerError> {
        self.client
            .wait_for_receipt(tx.hash())
            .await?
            .into_decision_receipt(Some(self.address))
    }

    async fn decision_count(&self) -> Result<u64, LedgerError> {
        let output: Bytes = self
            .client
            .call(
                "eth_call",
                json!([
                    {
                        "to": self.address.to_string(),
                        "data": hex::encode_prefixed(abi::encode_decision_count()),
                    },
                    "latest"
                ]),
            )
            .await?;
        abi::decode_u64_word(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn receipt_json(status: &str, logs: Value) -> Value {
        json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "gasUsed": "0x1a0f6",
            "status": status,
            "contractAddress": null,
            "logs": logs,
        })
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(parse_quantity("0x4a817c800").unwrap(), 20_000_000_000);
        assert!(parse_quantity("1234").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_receipt_without_logs() {
        let raw: RawReceipt = serde_json::from_value(receipt_json("0x1", json!([]))).unwrap();
        let receipt = raw.into_decision_receipt(None).unwrap();

        assert_eq!(receipt.gas_used, 0x1a0f6);
        assert_eq!(receipt.event, None);
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn test_reverted_receipt_is_error() {
        let raw: RawReceipt = serde_json::from_value(receipt_json("0x0", json!([]))).unwrap();
        assert!(matches!(
            raw.into_decision_receipt(None),
            Err(LedgerError::Reverted(_))
        ));
    }

    #[test]
    fn test_receipt_decodes_decision_event() {
        let contract = Address::repeat_byte(0x42);
        let executor = Address::repeat_byte(0x11);
        let word = |v: u64| hex::encode_prefixed(abi::encode_u64_word(v));

        let mut data = vec![0u8; 12];
        data.extend_from_slice(executor.as_slice());
        data.extend_from_slice(&abi::encode_u64_word(1_704_067_201));

        let logs = json!([{
            "address": contract.to_string(),
            "topics": [
                abi::decision_executed_topic().to_string(),
                word(1),
                word(1),
                word(1),
            ],
            "data": hex::encode_prefixed(&data),
        }]);
        let raw: RawReceipt = serde_json::from_value(receipt_json("0x1", logs)).unwrap();

        let receipt = raw.into_decision_receipt(Some(contract)).unwrap();
        let event = receipt.event.unwrap();
        assert_eq!(event.decision_id, 1);
        assert_eq!(event.proposal_id, 1);
        assert_eq!(event.dao_version, 1);
        assert_eq!(event.executor, executor);
        assert_eq!(event.timestamp, 1_704_067_201);
    }

    #[test]
    fn test_receipt_ignores_logs_from_other_contracts() {
        let word = |v: u64| hex::encode_prefixed(abi::encode_u64_word(v));
        let logs = json!([{
            "address": Address::repeat_byte(0x99).to_string(),
            "topics": [abi::decision_executed_topic().to_string(), word(1), word(1), word(1)],
            "data": hex::encode_prefixed([0u8; 64]),
        }]);
        let raw: RawReceipt = serde_json::from_value(receipt_json("0x1", logs)).unwrap();

        let receipt = raw.into_decision_receipt(Some(Address::repeat_byte(0x42))).unwrap();
        assert_eq!(receipt.event, None);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let config = RpcConfig::default()
            .with_url("http://127.0.0.1:1");
        let ledger = JsonRpcLedger::new(RpcConfig {
            request_timeout: Duration::from_secs(2),
            ..config
        })
        .unwrap();

        assert!(!ledger.is_reachable().await);
        assert!(ledger.primary_account().await.is_err());
    }

    /// Local JSON-RPC node answering every request with `handler(method, params)`.
    async fn spawn_node<F>(handler: F) -> String
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handler = Arc::new(handler);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(answer(socket, Arc::clone(&handler)));
            }
        });
        url
    }

    async fn answer<F>(mut socket: TcpStream, handler: Arc<F>)
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let request: Value = serde_json::from_slice(&buf[header_end..header_end + length]).unwrap();
        let method = request["method"].as_str().unwrap_or_default();
        let mut reply = handler(method, &request["params"]);
        reply["jsonrpc"] = json!("2.0");
        reply["id"] = request["id"].clone();

        let body = reply.to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    }

    fn result(value: Value) -> Value {
        json!({ "result": value })
    }

    fn method_not_found() -> Value {
        json!({ "error": { "code": -32601, "message": "Method not found" } })
    }

    fn tx_hash() -> B256 {
        B256::repeat_byte(0xab)
    }

    fn local_config(url: String) -> RpcConfig {
        RpcConfig {
            url,
            poll_interval: Duration::from_millis(5),
            receipt_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn decision_logs(contract: Address, executor: Address, proposal_id: u64, dao_version: u8) -> Value {
        let word = |v: u64| hex::encode_prefixed(abi::encode_u64_word(v));
        let mut data = vec![0u8; 12];
        data.extend_from_slice(executor.as_slice());
        data.extend_from_slice(&abi::encode_u64_word(1_704_067_201));
        json!([{
            "address": contract.to_string(),
            "topics": [
                abi::decision_executed_topic().to_string(),
                word(proposal_id),
                word(proposal_id),
                word(dao_version as u64),
            ],
            "data": hex::encode_prefixed(&data),
        }])
    }

    #[tokio::test]
    async fn test_decision_with_delayed_receipt() {
        let contract = Address::repeat_byte(0x42);
        let executor = Address::repeat_byte(0x11);
        let polls = Arc::new(AtomicU64::new(0));
        let sent = Arc::new(Mutex::new(Vec::<Value>::new()));

        let url = {
            let polls = Arc::clone(&polls);
            let sent = Arc::clone(&sent);
            spawn_node(move |method, params| match method {
                "eth_sendTransaction" => {
                    sent.lock().unwrap().push(params[0].clone());
                    result(json!(tx_hash().to_string()))
                }
                "eth_getTransactionReceipt" => {
                    // Pending for the first two polls
                    if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                        result(Value::Null)
                    } else {
                        result(receipt_json("0x1", decision_logs(contract, executor, 7, 2)))
                    }
                }
                _ => method_not_found(),
            })
            .await
        };
        let ledger = JsonRpcLedger::new(local_config(url)).unwrap();
        let handle = ledger.attach(contract);

        let call = DecisionCall::new(7, 2);
        let tx = handle.submit_decision(call, executor).await.unwrap();
        assert_eq!(tx.hash(), tx_hash());

        let receipt = handle.await_receipt(&tx).await.unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        assert_eq!(receipt.gas_used, 0x1a0f6);
        let event = receipt.event.unwrap();
        assert_eq!((event.proposal_id, event.dao_version), (7, 2));

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["from"], json!(executor.to_string()));
        assert_eq!(sent[0]["to"], json!(contract.to_string()));
        assert_eq!(
            sent[0]["data"],
            json!(hex::encode_prefixed(abi::encode_execute_decision(&call)))
        );
    }

    #[tokio::test]
    async fn test_receipt_timeout() {
        let url = spawn_node(|method, _| match method {
            "eth_getTransactionReceipt" => result(Value::Null),
            _ => method_not_found(),
        })
        .await;
        let ledger = JsonRpcLedger::new(RpcConfig {
            receipt_timeout: Duration::from_millis(50),
            ..local_config(url)
        })
        .unwrap();
        let handle = ledger.attach(Address::repeat_byte(0x42));

        match handle.await_receipt(&TxHandle(tx_hash())).await {
            Err(LedgerError::Timeout(ms)) => assert!(ms >= 50),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rpc_error_object() {
        let url = spawn_node(|method, _| match method {
            "net_version" => result(json!("5777")),
            _ => method_not_found(),
        })
        .await;
        let ledger = JsonRpcLedger::new(local_config(url)).unwrap();

        assert!(ledger.is_reachable().await);
        match ledger.primary_account().await {
            Err(LedgerError::Rpc { code, message }) => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_accounts_and_gas_price() {
        let first = Address::repeat_byte(0x01);
        let url = spawn_node(move |method, _| match method {
            "eth_accounts" => result(json!([first.to_string(), Address::repeat_byte(0x02).to_string()])),
            "eth_gasPrice" => result(json!("0x4a817c800")),
            _ => method_not_found(),
        })
        .await;
        let ledger = JsonRpcLedger::new(local_config(url)).unwrap();

        assert_eq!(ledger.primary_account().await.unwrap(), first);
        assert_eq!(ledger.current_gas_price().await.unwrap(), 20_000_000_000);
    }

    #[tokio::test]
    async fn test_deploy_and_read_decision_count() {
        let deployed = Address::repeat_byte(0x42);
        let sent = Arc::new(Mutex::new(Vec::<Value>::new()));

        let url = {
            let sent = Arc::clone(&sent);
            spawn_node(move |method, params| match method {
                "eth_sendTransaction" => {
                    sent.lock().unwrap().push(params[0].clone());
                    result(json!(tx_hash().to_string()))
                }
                "eth_getTransactionReceipt" => {
                    let mut receipt = receipt_json("0x1", json!([]));
                    receipt["contractAddress"] = json!(deployed.to_string());
                    result(receipt)
                }
                "eth_call" => result(json!(hex::encode_prefixed(abi::encode_u64_word(7)))),
                _ => method_not_found(),
            })
            .await
        };
        let ledger = JsonRpcLedger::new(local_config(url)).unwrap();

        let handle = ledger
            .deploy(&[0x60, 0x00], Address::repeat_byte(0x11))
            .await
            .unwrap();
        assert_eq!(handle.address(), deployed);
        assert_eq!(handle.decision_count().await.unwrap(), 7);

        let sent = sent.lock().unwrap();
        assert_eq!(sent[0]["data"], json!("0x6000"));
        assert!(sent[0].get("to").is_none());
    }

    #[tokio::test]
    async fn test_deploy_without_contract_address() {
        let url = spawn_node(|method, _| match method {
            "eth_sendTransaction" => result(json!(tx_hash().to_string())),
            "eth_getTransactionReceipt" => result(receipt_json("0x1", json!([]))),
            _ => method_not_found(),
        })
        .await;
        let ledger = JsonRpcLedger::new(local_config(url)).unwrap();

        assert!(matches!(
            ledger.deploy(&[0x60, 0x00], Address::repeat_byte(0x11)).await,
            Err(LedgerError::Deployment(_))
        ));
        assert!(matches!(
            ledger.deploy(&[], Address::repeat_byte(0x11)).await,
            Err(LedgerError::Deployment(_))
        ));
    }

    #[tokio::test]
    async fn test_request_timeout_reports_limit() {
        // Accepts connections but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let ledger = JsonRpcLedger::new(RpcConfig {
            request_timeout: Duration::from_millis(100),
            ..local_config(url)
        })
        .unwrap();

        match ledger.primary_account().await {
            Err(err @ LedgerError::Timeout(100)) => {
                assert_eq!(err.to_string(), "Timeout after 100ms");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
