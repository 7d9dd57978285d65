//! Pure projection of [`AppState`] into what the front end shows.

use atm_api_types::{Address, OperationKind, format_display_amount};

use crate::session::SessionStatus;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub screen: Screen,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub fatal: bool,
}

/// Mutually exclusive screens, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    InstallPrompt,
    Connect {
        connecting: bool,
    },
    Loading {
        account: Address,
    },
    Ready {
        account: Address,
        balance: String,
        amount: String,
        actions: Vec<Action>,
        busy: Option<OperationKind>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub op: OperationKind,
    pub label: String,
    pub enabled: bool,
}

pub fn project(state: &AppState) -> View {
    let notice = state.notice.as_ref().map(|err| Notice {
        message: err.to_string(),
        fatal: err.is_fatal(),
    });
    View {
        screen: screen(state),
        notice,
    }
}

fn screen(state: &AppState) -> Screen {
    let account = match state.session.status() {
        SessionStatus::NoAgent => return Screen::InstallPrompt,
        SessionStatus::AgentDetected | SessionStatus::Unauthenticated => {
            return Screen::Connect {
                connecting: state.connecting,
            };
        }
        SessionStatus::Authenticated => match state.session.account() {
            Some(account) => account,
            None => return Screen::Connect { connecting: false },
        },
    };

    let (Some(contract), Some(balance)) = (&state.contract, state.balance.value) else {
        return Screen::Loading { account };
    };

    let busy = state.in_flight.as_ref().map(|tx| tx.op);
    let actions = contract
        .operations()
        .operations()
        .iter()
        .map(|op| Action {
            op: *op,
            label: op.label(&state.pending_amount),
            enabled: busy.is_none(),
        })
        .collect();

    Screen::Ready {
        account,
        balance: format_display_amount(balance),
        amount: state.pending_amount.clone(),
        actions,
        busy,
    }
}
