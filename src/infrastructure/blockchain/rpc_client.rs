//! EVM JSON-RPC client for read-only contract calls

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::shared::errors::{AppError, RpcError};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// `eth_call` client shared by every source; the endpoint is chosen per call
pub struct EvmRpcClient {
    http_client: Client,
    next_id: AtomicU64,
}

impl EvmRpcClient {
    /// Create new RPC client. `timeout` applies to calls that do not set their own.
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::BlockchainError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Execute a read-only call against `to` at the latest block
    pub async fn eth_call(
        &self,
        rpc_url: &str,
        to: &str,
        data: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: "eth_call",
            params: json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]),
        };

        debug!(rpc_url, to, id = request.id, "eth_call");

        let mut builder = self.http_client.post(rpc_url).json(&request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(RpcError::Status(response.status().as_u16()));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
        decode_call_result(body)
    }
}

fn decode_call_result(body: JsonRpcResponse) -> Result<Vec<u8>, RpcError> {
    if let Some(err) = body.error {
        return Err(RpcError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    let result = body
        .result
        .ok_or_else(|| RpcError::InvalidResponse("missing result".to_string()))?;
    let hex_part = result.strip_prefix("0x").unwrap_or(&result);
    hex::decode(hex_part).map_err(|e| RpcError::InvalidResponse(format!("bad hex result: {}", e)))
}
