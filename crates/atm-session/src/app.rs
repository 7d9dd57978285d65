use atm_agent::SigningAgentHandle;
use atm_api_types::{Address, OperationKind, Transaction, U256};
use atm_chain_client::{ContractDeployment, ContractHandle};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

use crate::binding::bind;
use crate::effects::{self, Effect, Triggers};
use crate::error::AtmError;
use crate::runner::{BalanceRefreshSignal, TransactionRunner, fetch_balance};
use crate::session::{AccountChange, Session};
use crate::state::AppState;
use crate::view::{self, View};

/// Something the user (or the agent, for account changes) asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Connect,
    SetAmount(String),
    Submit(OperationKind),
    RefreshBalance,
    DismissNotice,
    AccountsChanged(Vec<Address>),
}

/// Result of a finished [`Job`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    SilentAccounts(Result<Vec<Address>, AtmError>),
    InteractiveAccounts(Result<Vec<Address>, AtmError>),
    Balance {
        generation: u64,
        result: Result<U256, AtmError>,
    },
    TxResolved {
        tx: Transaction,
        result: Result<BalanceRefreshSignal, AtmError>,
    },
}

/// An effect bound to the handles it needs. Owns everything it touches, so
/// the state stays free for rendering while the job is suspended.
pub struct Job {
    task: Task,
}

enum Task {
    Silent(SigningAgentHandle),
    Interactive(SigningAgentHandle),
    Balance {
        generation: u64,
        contract: Option<ContractHandle>,
    },
    Submit {
        tx: Transaction,
        contract: Option<ContractHandle>,
    },
}

impl Job {
    pub async fn run(self) -> Outcome {
        match self.task {
            Task::Silent(agent) => {
                let result = match agent.agent() {
                    Some(agent) => agent.request_silent().await.map_err(AtmError::from),
                    None => Err(AtmError::AgentUnavailable),
                };
                Outcome::SilentAccounts(result)
            }
            Task::Interactive(agent) => {
                let result = match agent.agent() {
                    Some(agent) => agent.request_interactive().await.map_err(AtmError::from),
                    None => Err(AtmError::AgentUnavailable),
                };
                Outcome::InteractiveAccounts(result)
            }
            Task::Balance { generation, contract } => {
                let result = match contract {
                    Some(contract) => fetch_balance(&contract).await,
                    None => Err(AtmError::precondition("balance read without a bound contract")),
                };
                Outcome::Balance { generation, result }
            }
            Task::Submit { tx, contract } => {
                let result = match contract {
                    Some(contract) => {
                        TransactionRunner::new(&contract)
                            .submit(tx.op, tx.amount.as_deref())
                            .await
                    }
                    None => Err(AtmError::precondition("submission without a bound contract")),
                };
                Outcome::TxResolved { tx, result }
            }
        }
    }
}

/// Owns the UI state and turns intents and job outcomes into new state plus
/// follow-up effects.
pub struct App {
    state: AppState,
    deployment: ContractDeployment,
    clock: fn() -> u128,
}

impl App {
    pub fn new(agent: SigningAgentHandle, deployment: ContractDeployment) -> Self {
        Self {
            state: AppState::new(Session::detect(agent)),
            deployment,
            clock: epoch_ms,
        }
    }

    /// Replaces the wall clock used to stamp transactions.
    pub fn with_clock(mut self, clock: fn() -> u128) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> View {
        view::project(&self.state)
    }

    /// Effects to run once at startup.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.state.session.agent().is_present() {
            vec![Effect::RestoreSession]
        } else {
            info!("no signing agent detected");
            Vec::new()
        }
    }

    pub fn handle(&mut self, intent: Intent) -> Vec<Effect> {
        self.transition(|app| app.reduce_intent(intent))
    }

    pub fn apply(&mut self, outcome: Outcome) -> Vec<Effect> {
        self.transition(|app| app.reduce_outcome(outcome))
    }

    pub fn job(&self, effect: Effect) -> Job {
        let task = match effect {
            Effect::RestoreSession => Task::Silent(self.state.session.agent().clone()),
            Effect::RequestAccounts => Task::Interactive(self.state.session.agent().clone()),
            Effect::FetchBalance => Task::Balance {
                generation: self.state.balance_generation,
                contract: self.state.contract.clone(),
            },
            Effect::Submit(tx) => Task::Submit {
                tx,
                contract: self.state.contract.clone(),
            },
        };
        Job { task }
    }

    /// Runs `effects` and everything they trigger, one job at a time.
    pub async fn settle(&mut self, effects: Vec<Effect>) {
        self.settle_with(effects, |_| {}).await;
    }

    /// Like [`App::settle`], calling `observe` after every applied outcome.
    pub async fn settle_with(&mut self, effects: Vec<Effect>, mut observe: impl FnMut(&View)) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let outcome = self.job(effect).run().await;
            queue.extend(self.apply(outcome));
            observe(&self.view());
        }
    }

    fn transition(&mut self, reduce: impl FnOnce(&mut Self) -> Vec<Effect>) -> Vec<Effect> {
        let before = Triggers::of(&self.state);
        let mut scheduled = reduce(self);
        scheduled.extend(effects::derive(before, Triggers::of(&self.state)));
        for effect in &scheduled {
            if *effect == Effect::FetchBalance {
                self.state.fetching_balance = Some(self.state.balance_generation);
            }
        }
        scheduled
    }

    fn reduce_intent(&mut self, intent: Intent) -> Vec<Effect> {
        // Typing and agent-driven account changes leave the notice up.
        if !matches!(intent, Intent::SetAmount(_) | Intent::AccountsChanged(_)) {
            self.state.notice = None;
        }
        match intent {
            Intent::Connect => self.connect(),
            Intent::SetAmount(amount) => {
                self.state.pending_amount = amount;
                Vec::new()
            }
            Intent::Submit(op) => self.submit(op),
            Intent::RefreshBalance => {
                if self.state.contract.is_some() {
                    self.state.mark_balance_stale();
                }
                Vec::new()
            }
            Intent::DismissNotice => Vec::new(),
            Intent::AccountsChanged(accounts) => {
                match self.state.session.accounts_changed(&accounts) {
                    AccountChange::Unchanged => {}
                    AccountChange::Deauthenticated => {
                        self.state.contract = None;
                        self.state.reset_balance();
                    }
                    AccountChange::Authenticated(_) | AccountChange::Switched { .. } => {
                        self.rebind();
                    }
                }
                Vec::new()
            }
        }
    }

    fn connect(&mut self) -> Vec<Effect> {
        let session = &self.state.session;
        if !session.agent().is_present() {
            self.state.notice = Some(AtmError::AgentUnavailable);
            return Vec::new();
        }
        if session.is_authenticated() || self.state.connecting {
            debug!("connect ignored: already connected or connecting");
            return Vec::new();
        }
        self.state.connecting = true;
        vec![Effect::RequestAccounts]
    }

    fn submit(&mut self, op: OperationKind) -> Vec<Effect> {
        if let Some(in_flight) = &self.state.in_flight {
            debug!(%op, pending = %in_flight.op, "submission ignored while a transaction is in flight");
            return Vec::new();
        }
        let Some(contract) = &self.state.contract else {
            return self.violation("operation requested without a bound contract");
        };
        if !contract.operations().contains(op) {
            return self.violation(format!("{op} is not offered by the bound contract"));
        }

        let tx = Transaction {
            op,
            amount: op.takes_amount().then(|| self.state.pending_amount.clone()),
            submitted_at_epoch_ms: (self.clock)(),
        };
        info!(%op, amount = ?tx.amount, "submitting transaction");
        self.state.in_flight = Some(tx.clone());
        vec![Effect::Submit(tx)]
    }

    fn violation(&mut self, message: impl Into<String>) -> Vec<Effect> {
        let err = AtmError::precondition(message);
        error!("{err}");
        self.state.notice = Some(err);
        Vec::new()
    }

    fn reduce_outcome(&mut self, outcome: Outcome) -> Vec<Effect> {
        match outcome {
            Outcome::SilentAccounts(Ok(accounts)) => self.authorize(&accounts),
            Outcome::SilentAccounts(Err(err)) => {
                warn!("silent account query failed: {err}");
                self.state.session.record_query(&[]);
            }
            Outcome::InteractiveAccounts(result) => {
                self.state.connecting = false;
                match result {
                    Ok(accounts) if accounts.is_empty() => {
                        warn!("signing agent returned no accounts");
                        self.state.session.record_query(&[]);
                    }
                    Ok(accounts) => self.authorize(&accounts),
                    Err(err) => {
                        warn!("account request failed: {err}");
                        self.state.session.record_rejection();
                        self.state.notice = Some(err);
                    }
                }
            }
            Outcome::Balance { generation, result } => self.balance_read(generation, result),
            Outcome::TxResolved { tx, result } => {
                self.state.in_flight = None;
                match result {
                    Ok(signal) => {
                        debug!(op = %tx.op, hash = %signal.hash, "balance refresh due");
                        self.state.mark_balance_stale();
                    }
                    Err(err) => {
                        if err.is_fatal() {
                            error!(op = %tx.op, "{err}");
                        } else {
                            warn!(op = %tx.op, "{err}");
                        }
                        self.state.notice = Some(err);
                    }
                }
            }
        }
        Vec::new()
    }

    fn authorize(&mut self, accounts: &[Address]) {
        if self.state.session.record_query(accounts).is_some() {
            self.rebind();
        }
    }

    fn rebind(&mut self) {
        self.state.reset_balance();
        match bind(&self.state.session, &self.deployment) {
            Ok(contract) => {
                debug!(?contract, "contract bound");
                self.state.contract = Some(contract);
            }
            Err(err) => {
                error!("{err}");
                self.state.contract = None;
                self.state.notice = Some(err);
            }
        }
    }

    fn balance_read(&mut self, generation: u64, result: Result<U256, AtmError>) {
        if generation != self.state.balance_generation {
            debug!(generation, current = self.state.balance_generation, "discarding outdated balance read");
            return;
        }
        self.state.fetching_balance = None;
        match result {
            Ok(value) => {
                self.state.balance.value = Some(value);
                self.state.balance.stale = false;
                self.state.balance.failed = false;
            }
            Err(err) => {
                warn!("{err}");
                self.state.balance.failed = true;
            }
        }
    }
}

fn epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
