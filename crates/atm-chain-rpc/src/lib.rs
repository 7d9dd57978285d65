//! Ethereum JSON-RPC adapter.
//!
//! Everything here speaks EIP-1193 style `request(method, params)` through an
//! [`RpcTransport`], so the same agent and contract backend work against a
//! node over HTTP and against an injected browser provider.

use alloy_primitives::{Bytes, U64};
use async_trait::async_trait;
use atm_agent::{AgentError, SigningAgent};
use atm_api_types::{Address, B256};
use atm_chain_client::{ChainError, ContractBackend, PendingTx, TxReceipt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use http::HttpTransport;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// EIP-1474: method not found.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Geth/Anvil code for `execution reverted` during estimation or `eth_call`.
pub const EXECUTION_REVERTED: i64 = 3;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum RpcError {
    #[error("provider error {code}: {message}")]
    Provider {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("rpc transport: {0}")]
    Transport(String),
    #[error("rpc decode: {0}")]
    Decode(String),
}

impl RpcError {
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Provider { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The contract's revert reason, if this error is a revert. Wallets
    /// often wrap the node's error as `-32603` with the revert in `data`.
    fn revert_reason(&self) -> Option<String> {
        let Self::Provider { code, message, data } = self else {
            return None;
        };
        let nested = data.as_ref().and_then(|data| {
            let code = data.get("code").and_then(Value::as_i64);
            let message = data.get("message").and_then(Value::as_str);
            match (code, message) {
                (Some(EXECUTION_REVERTED), Some(message)) => Some(message.to_owned()),
                (Some(EXECUTION_REVERTED), None) => Some("execution reverted".to_owned()),
                (_, Some(message)) if is_revert_message(message) => Some(message.to_owned()),
                _ => None,
            }
        });
        nested.or_else(|| (*code == EXECUTION_REVERTED || is_revert_message(message)).then(|| message.clone()))
    }

    /// Failures that say nothing about the transaction itself.
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }
}

fn is_revert_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("revert")
}

/// `error` member of a JSON-RPC response or EIP-1193 rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl From<RpcErrorObject> for RpcError {
    fn from(err: RpcErrorObject) -> Self {
        Self::Provider {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

#[async_trait(?Send)]
pub trait RpcTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Waits between confirmation polls, using the host's timer.
    async fn pause(&self, interval: Duration);
}

async fn request_as<T, R>(transport: &T, method: &str, params: Value) -> Result<R, RpcError>
where
    T: RpcTransport + ?Sized,
    R: DeserializeOwned,
{
    debug!(method, "rpc request");
    let value = transport.request(method, params).await?;
    serde_json::from_value(value).map_err(|err| RpcError::Decode(format!("{method}: {err}")))
}

fn agent_error(err: RpcError) -> AgentError {
    match err.code() {
        Some(USER_REJECTED) => AgentError::UserRejected,
        _ => AgentError::Transport(err.to_string()),
    }
}

fn chain_error(err: RpcError) -> ChainError {
    if err.code() == Some(USER_REJECTED) {
        return ChainError::Rejected;
    }
    if let Some(reason) = err.revert_reason() {
        return ChainError::Reverted { reason };
    }
    ChainError::Transport(err.to_string())
}

/// Signing agent reached through a JSON-RPC provider.
pub struct ProviderAgent<T> {
    name: String,
    transport: Rc<T>,
}

impl<T: RpcTransport> ProviderAgent<T> {
    pub fn new(name: impl Into<String>, transport: Rc<T>) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }
}

#[async_trait(?Send)]
impl<T: RpcTransport> SigningAgent for ProviderAgent<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn request_silent(&self) -> Result<Vec<Address>, AgentError> {
        request_as(self.transport.as_ref(), "eth_accounts", json!([]))
            .await
            .map_err(agent_error)
    }

    async fn request_interactive(&self) -> Result<Vec<Address>, AgentError> {
        match request_as::<_, Vec<Address>>(self.transport.as_ref(), "eth_requestAccounts", json!([])).await {
            Ok(accounts) => Ok(accounts),
            // Plain nodes manage their own accounts and have no prompt.
            Err(err) if err.code() == Some(METHOD_NOT_FOUND) => {
                debug!(agent = %self.name, "eth_requestAccounts unsupported, using eth_accounts");
                self.request_silent().await
            }
            Err(err) => {
                warn!(agent = %self.name, "account request failed: {err}");
                Err(agent_error(err))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptFields {
    transaction_hash: B256,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    status: Option<U64>,
}

/// Contract backend issuing `eth_sendTransaction`, `eth_getTransactionReceipt`
/// and `eth_call`.
pub struct RpcContractBackend<T> {
    transport: Rc<T>,
    poll_interval: Duration,
}

impl<T: RpcTransport> RpcContractBackend<T> {
    pub fn new(transport: Rc<T>) -> Self {
        Self {
            transport,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[async_trait(?Send)]
impl<T: RpcTransport> ContractBackend for RpcContractBackend<T> {
    async fn send_transaction(&self, from: Address, to: Address, data: Bytes) -> Result<PendingTx, ChainError> {
        let params = json!([{ "from": from, "to": to, "data": data }]);
        let hash: B256 = request_as(self.transport.as_ref(), "eth_sendTransaction", params)
            .await
            .map_err(chain_error)?;
        info!(%hash, %from, %to, "transaction submitted");
        Ok(PendingTx { hash })
    }

    async fn wait_for_confirmation(&self, pending: &PendingTx) -> Result<TxReceipt, ChainError> {
        loop {
            let polled: Result<Option<ReceiptFields>, RpcError> = request_as(
                self.transport.as_ref(),
                "eth_getTransactionReceipt",
                json!([pending.hash]),
            )
            .await;
            let receipt = match polled {
                Ok(receipt) => receipt,
                // The transaction is out; a failed poll does not mean it failed.
                Err(err) if err.is_transient() => {
                    warn!(hash = %pending.hash, "receipt poll failed, retrying: {err}");
                    None
                }
                Err(err) => return Err(chain_error(err)),
            };

            let Some(receipt) = receipt else {
                self.transport.pause(self.poll_interval).await;
                continue;
            };

            let block_number = receipt.block_number.map(|n| n.to::<u64>());
            if receipt.status == Some(U64::ZERO) {
                return Err(ChainError::Reverted {
                    reason: format!(
                        "transaction {} reverted in block {}",
                        receipt.transaction_hash,
                        block_number.map_or_else(|| "?".to_owned(), |n| n.to_string())
                    ),
                });
            }

            info!(hash = %receipt.transaction_hash, block = ?block_number, "transaction confirmed");
            return Ok(TxReceipt {
                hash: receipt.transaction_hash,
                block_number,
            });
        }
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        request_as(
            self.transport.as_ref(),
            "eth_call",
            json!([{ "to": to, "data": data }, "latest"]),
        )
        .await
        .map_err(chain_error)
    }
}
