use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use wp_chain_client::{ChainError, ChainResult};

/// EIP-1193 "user rejected the request".
const USER_REJECTED_CODE: i64 = 4001;
/// Geth/anvil code for reverted calls.
const EXECUTION_REVERTED_CODE: i64 = 3;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

pub fn classify_rpc_error(error: &RpcErrorObject) -> ChainError {
    if error.code == USER_REJECTED_CODE {
        return ChainError::UserRejected(error.message.clone());
    }
    if error.code == EXECUTION_REVERTED_CODE
        || error.message.to_ascii_lowercase().contains("execution reverted")
    {
        return ChainError::Reverted(error.message.clone());
    }
    ChainError::Network(format!("rpc error {}: {}", error.code, error.message))
}

/// Minimal JSON-RPC 2.0 client over HTTP.
pub struct JsonRpcClient {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("json-rpc {} #{} -> {}", method, id, self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .map_err(|err| ChainError::Network(format!("{method} transport: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChainError::Network(format!("{method} HTTP {status}: {text}")));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|err| ChainError::InvalidResponse(format!("{method} parse: {err}")))?;

        if let Some(error) = body.error {
            return Err(classify_rpc_error(&error));
        }

        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|err| ChainError::InvalidResponse(format!("{method} result: {err}")))
    }
}
