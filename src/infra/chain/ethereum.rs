//! Ethereum JSON-RPC chain client.
//!
//! Thin HTTP client over a node's JSON-RPC surface. Broadcasting uses
//! `eth_sendTransaction`, delegating signing to the node-side account;
//! key management is deliberately outside this service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::domain::{AppError, ChainClient, ChainError, ChainTxStatus, TransferRequest};

/// Configuration for the RPC client
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    /// Per-request HTTP timeout
    pub timeout: Duration,
    /// Sender account used when a request carries no `from` address
    pub default_from: Option<String>,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            default_from: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: T,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// `eth_sendTransaction` call object
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TxCallObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    to: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas: Option<String>,
}

/// `eth_getTransactionReceipt` result; only the status field matters here
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxReceipt {
    status: Option<String>,
}

/// HTTP JSON-RPC implementation of [`ChainClient`]
pub struct EthereumRpcClient {
    http_client: Client,
    rpc_url: String,
    default_from: Option<String>,
}

impl EthereumRpcClient {
    pub fn new(rpc_url: &str, config: RpcClientConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Chain(ChainError::Connection(e.to_string())))?;

        Ok(Self {
            http_client,
            rpc_url: rpc_url.to_string(),
            default_from: config.default_from,
        })
    }

    pub fn with_defaults(rpc_url: &str) -> Result<Self, AppError> {
        Self::new(rpc_url, RpcClientConfig::default())
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<Option<R>, AppError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Chain(ChainError::Connection(e.to_string())))?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| AppError::Chain(ChainError::Connection(e.to_string())))?;

        if let Some(error) = rpc_response.error {
            return Err(AppError::Chain(ChainError::Rpc {
                code: error.code,
                message: error.message,
            }));
        }

        Ok(rpc_response.result)
    }
}

/// Parse a `0x`-prefixed hex quantity
fn parse_hex_u64(raw: &str) -> Result<u64, AppError> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| AppError::Chain(ChainError::Connection(format!("bad hex quantity: {}", e))))
}

/// Map a receipt status field onto the closed [`ChainTxStatus`] set.
///
/// Anything outside `0x1`/`0x0` is rejected loudly rather than persisted.
fn map_receipt_status(raw: &str) -> Result<ChainTxStatus, AppError> {
    match raw {
        "0x1" => Ok(ChainTxStatus::Confirmed),
        "0x0" => Ok(ChainTxStatus::Failed),
        other => Err(AppError::Chain(ChainError::UnrecognizedStatus(
            other.to_string(),
        ))),
    }
}

#[async_trait]
impl ChainClient for EthereumRpcClient {
    async fn health_check(&self) -> Result<(), AppError> {
        self.latest_block_number().await.map(|_| ())
    }

    #[instrument(skip(self, request), fields(to = %request.to))]
    async fn send_transfer(&self, request: &TransferRequest) -> Result<String, AppError> {
        let call = TxCallObject {
            from: request.from.clone().or_else(|| self.default_from.clone()),
            to: request.to.clone(),
            value: request.value.clone(),
            gas_price: request.gas_price.clone(),
            gas: request.gas_limit.clone(),
        };

        let tx_hash: Option<String> = self
            .call("eth_sendTransaction", [call])
            .await
            .map_err(|e| match e {
                // An RPC-level rejection of the send is a broadcast failure.
                AppError::Chain(ChainError::Rpc { message, .. }) => {
                    AppError::Chain(ChainError::Broadcast(message))
                }
                other => other,
            })?;

        tx_hash.ok_or_else(|| {
            AppError::Chain(ChainError::Broadcast(
                "node returned no transaction hash".to_string(),
            ))
        })
    }

    #[instrument(skip(self))]
    async fn transaction_status(&self, tx_hash: &str) -> Result<Option<ChainTxStatus>, AppError> {
        let receipt: Option<TxReceipt> = self
            .call("eth_getTransactionReceipt", [tx_hash])
            .await?;

        match receipt {
            // No receipt yet: not an error, just not available.
            None => {
                debug!(tx_hash = %tx_hash, "No receipt available yet");
                Ok(None)
            }
            Some(receipt) => match receipt.status {
                Some(raw) => map_receipt_status(&raw).map(Some),
                None => Err(AppError::Chain(ChainError::UnrecognizedStatus(
                    "receipt without status field".to_string(),
                ))),
            },
        }
    }

    async fn latest_block_number(&self) -> Result<u64, AppError> {
        let raw: Option<String> = self.call("eth_blockNumber", Vec::<String>::new()).await?;
        let raw = raw.ok_or_else(|| {
            AppError::Chain(ChainError::Connection(
                "node returned no block number".to_string(),
            ))
        })?;
        parse_hex_u64(&raw)
    }
}
