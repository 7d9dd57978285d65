use atm_api_types::{AmountInput, B256, OperationKind, U256, parse_display_amount};
use atm_chain_client::{ContractCall, ContractHandle};
use tracing::{info, warn};

use crate::error::{AtmError, TxError};

/// Emitted once a transaction is confirmed; the balance must be re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceRefreshSignal {
    pub op: OperationKind,
    pub hash: B256,
    pub block_number: Option<u64>,
}

/// Converts the amount field to wei. Negative and unparsable input becomes
/// zero; it is never rejected.
pub fn normalize_amount(raw: Option<&str>) -> U256 {
    let Some(raw) = raw else {
        return U256::ZERO;
    };
    match parse_display_amount(raw) {
        AmountInput::Valid(value) => value,
        AmountInput::Negative => {
            warn!(amount = raw, "negative amount clamped to zero");
            U256::ZERO
        }
        AmountInput::Malformed(err) => {
            warn!(amount = raw, "unparsable amount treated as zero: {err}");
            U256::ZERO
        }
    }
}

/// Submits operations through a bound contract handle.
pub struct TransactionRunner<'a> {
    handle: &'a ContractHandle,
}

impl<'a> TransactionRunner<'a> {
    pub fn new(handle: &'a ContractHandle) -> Self {
        Self { handle }
    }

    /// Sends `op`, waits for it to be mined and reports whether the balance
    /// needs refreshing. Waits as long as the chain takes; nothing is retried.
    pub async fn submit(&self, op: OperationKind, amount: Option<&str>) -> Result<BalanceRefreshSignal, TxError> {
        let operations = self.handle.operations();
        if !operations.contains(op) {
            return Err(AtmError::precondition(format!(
                "{op} is not offered by the {operations} contract"
            )));
        }

        let call = self.prepare(op, amount).await?;
        let pending = self.handle.send(&call).await.map_err(|err| {
            warn!(%op, "transaction not submitted: {err}");
            AtmError::from(err)
        })?;

        let receipt = self.handle.wait(&pending).await.map_err(|err| {
            warn!(%op, hash = %pending.hash, "transaction failed: {err}");
            AtmError::from(err)
        })?;

        info!(%op, hash = %receipt.hash, "operation confirmed");
        Ok(BalanceRefreshSignal {
            op,
            hash: receipt.hash,
            block_number: receipt.block_number,
        })
    }

    async fn prepare(&self, op: OperationKind, amount: Option<&str>) -> Result<ContractCall, TxError> {
        let args = match op {
            OperationKind::ClearBalance => {
                let current = self
                    .handle
                    .balance()
                    .await
                    .map_err(|err| AtmError::BalanceFetchFailed(err.to_string()))?;
                vec![current]
            }
            op if op.takes_amount() => vec![normalize_amount(amount)],
            _ => Vec::new(),
        };
        Ok(ContractCall::new(op.function_name(), args))
    }
}

/// Read-only balance query in wei.
pub async fn fetch_balance(handle: &ContractHandle) -> Result<U256, AtmError> {
    handle
        .balance()
        .await
        .map_err(|err| AtmError::BalanceFetchFailed(err.to_string()))
}
