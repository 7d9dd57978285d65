use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::{RpcError, RpcErrorObject, RpcTransport};

/// JSON-RPC 2.0 over HTTP, e.g. a local Hardhat or Anvil node.
pub struct HttpTransport {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpTransport {
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
}

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

#[async_trait(?Send)]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| RpcError::Transport(format!("{method}: {err}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        // Nodes answer JSON-RPC errors with 200, but some proxies use 4xx/5xx
        // with a JSON-RPC body; try the body first.
        match serde_json::from_str::<RpcResponse>(&text) {
            Ok(RpcResponse { error: Some(err), .. }) => Err(err.into()),
            Ok(RpcResponse { result, .. }) if status.is_success() => Ok(result.unwrap_or(Value::Null)),
            _ => Err(RpcError::Transport(format!("{method}: HTTP {status}: {text}"))),
        }
    }

    async fn pause(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}
