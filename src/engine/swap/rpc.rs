// Sol TWAP Swap: Ledger Network
// LedgerNetwork trait (checkpoint / broadcast / confirm) and RpcClient, its
// Solana JSON-RPC implementation.

use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use super::transaction::SignedTransaction;
use crate::atoms::constants::{
    BLOCKHASH_LEN, CONFIRM_POLL_INTERVAL_MS, DEFAULT_CONFIRM_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::Commitment;

/// The three network operations a swap run needs.
#[async_trait]
pub trait LedgerNetwork: Send + Sync {
    /// Recent blockhash. Fetch it as late as possible; it expires quickly.
    async fn latest_blockhash(&self) -> EngineResult<[u8; BLOCKHASH_LEN]>;

    /// Broadcast; returns the base58 signature the node reports.
    async fn send_transaction(&self, tx: &SignedTransaction) -> EngineResult<String>;

    /// Resolve once `signature` reaches `commitment`.
    async fn confirm_transaction(&self, signature: &str, commitment: Commitment) -> EngineResult<()>;
}

pub struct RpcClient {
    client: Client,
    url: String,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> EngineResult<Self> {
        Self::with_timeouts(
            url,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
        )
    }

    pub fn with_timeouts(
        url: impl Into<String>,
        request_timeout: Duration,
        confirm_timeout: Duration,
    ) -> EngineResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("HTTP client init failed: {}", e)))?;
        Ok(RpcClient {
            client,
            url: url.into(),
            confirm_timeout,
            poll_interval: Duration::from_millis(CONFIRM_POLL_INTERVAL_MS),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make a Solana JSON-RPC call and return its `result`.
    pub async fn rpc_call(&self, method: &str, params: Value) -> EngineResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let resp = self.client.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        let json: Value = resp
            .json()
            .await
            .map_err(|e| EngineError::Transport(format!("Solana RPC {} returned HTTP {} with unreadable body: {}", method, status, e)))?;

        if let Some(error) = json.get("error") {
            return Err(EngineError::Transport(format!("Solana RPC error in {}: {}", method, error)));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| EngineError::Transport(format!("Solana RPC {}: missing 'result' field", method)))
    }
}

#[async_trait]
impl LedgerNetwork for RpcClient {
    async fn latest_blockhash(&self) -> EngineResult<[u8; BLOCKHASH_LEN]> {
        let result = self
            .rpc_call("getLatestBlockhash", json!([{ "commitment": "finalized" }]))
            .await?;
        parse_blockhash(&result)
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> EngineResult<String> {
        let result = self
            .rpc_call(
                "sendTransaction",
                json!([
                    tx.to_base64(),
                    { "encoding": "base64", "skipPreflight": false, "maxRetries": 3 }
                ]),
            )
            .await?;
        let sig = result
            .as_str()
            .ok_or_else(|| EngineError::Transport("sendTransaction returned no signature".into()))?;
        if sig != tx.signature() {
            warn!("[rpc] Node reported signature {} but the transaction carries {}", sig, tx.signature());
        }
        info!("[rpc] Transaction sent: {}", sig);
        Ok(sig.to_string())
    }

    async fn confirm_transaction(&self, signature: &str, commitment: Commitment) -> EngineResult<()> {
        let started = Instant::now();
        loop {
            let result = self
                .rpc_call(
                    "getSignatureStatuses",
                    json!([[signature], { "searchTransactionHistory": false }]),
                )
                .await?;
            if let Some(reached) = parse_signature_status(&result)? {
                if reached >= commitment {
                    info!("[rpc] {} reached {}", signature, reached.as_str());
                    return Ok(());
                }
            }
            if started.elapsed() >= self.confirm_timeout {
                return Err(EngineError::TransportTimeout(format!(
                    "{} not {} after {}s",
                    signature,
                    commitment.as_str(),
                    self.confirm_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// `getLatestBlockhash` result → raw 32-byte hash.
pub(crate) fn parse_blockhash(result: &Value) -> EngineResult<[u8; BLOCKHASH_LEN]> {
    let encoded = result
        .pointer("/value/blockhash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EngineError::Transport("getLatestBlockhash: missing blockhash".into()))?;
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| EngineError::Transport(format!("getLatestBlockhash: invalid base58: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| EngineError::Transport("getLatestBlockhash: blockhash is not 32 bytes".into()))
}

/// `getSignatureStatuses` result → commitment reached so far, `None` while
/// the node has not seen the transaction. An on-chain error is terminal.
pub(crate) fn parse_signature_status(result: &Value) -> EngineResult<Option<Commitment>> {
    let status = match result.pointer("/value/0") {
        Some(s) if !s.is_null() => s,
        _ => return Ok(None),
    };
    if let Some(err) = status.get("err").filter(|e| !e.is_null()) {
        return Err(EngineError::Transport(format!("transaction failed on chain: {}", err)));
    }
    Ok(status
        .get("confirmationStatus")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok()))
}
