//! Wallet session and transaction lifecycle.
//!
//! [`App`] owns the whole UI state. Front ends feed it [`Intent`]s, run the
//! [`Effect`]s it hands back (each turned into a [`Job`]) and feed the
//! resulting [`Outcome`]s back in. Rendering reads [`App::view`], which is a
//! pure projection of the state.

pub mod app;
pub mod binding;
pub mod config;
pub mod effects;
pub mod error;
pub mod runner;
pub mod session;
pub mod state;
pub mod view;

pub use app::{App, Intent, Job, Outcome};
pub use binding::bind;
pub use config::AtmConfig;
pub use effects::Effect;
pub use error::{AtmError, TxError};
pub use runner::{BalanceRefreshSignal, TransactionRunner, fetch_balance, normalize_amount};
pub use session::{AccountChange, Session, SessionStatus};
pub use state::{AppState, BalanceView};
pub use view::{Action, Notice, Screen, View, project};

#[cfg(test)]
pub(crate) mod testing;
