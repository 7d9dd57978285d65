use atm_api_types::{Transaction, U256};
use atm_chain_client::ContractHandle;

use crate::error::AtmError;
use crate::session::Session;

/// Last-known balance in wei.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceView {
    pub value: Option<U256>,
    /// A confirmed transaction changed the on-chain value since `value` was read.
    pub stale: bool,
    /// The last read failed; no automatic retry until the next trigger.
    pub failed: bool,
}

/// Everything the front end renders from. Mutated only by [`crate::App`],
/// one intent or outcome at a time.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub session: Session,
    pub contract: Option<ContractHandle>,
    pub balance: BalanceView,
    /// Bumped whenever previously started balance reads become outdated.
    pub balance_generation: u64,
    /// Generation of the balance read currently running, if any.
    pub fetching_balance: Option<u64>,
    pub pending_amount: String,
    pub in_flight: Option<Transaction>,
    pub connecting: bool,
    pub notice: Option<AtmError>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    /// Drops the balance and invalidates reads that are still running.
    pub(crate) fn reset_balance(&mut self) {
        self.balance = BalanceView::default();
        self.balance_generation += 1;
        self.fetching_balance = None;
    }

    pub(crate) fn mark_balance_stale(&mut self) {
        self.balance.stale = true;
        self.balance.failed = false;
        self.balance_generation += 1;
    }
}
