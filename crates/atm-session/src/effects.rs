//! Side effects derived from state changes.
//!
//! An effect is scheduled only on the transition where its precondition
//! becomes true, so re-rendering never re-triggers it.

use atm_api_types::Transaction;

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the agent for already-authorized accounts.
    RestoreSession,
    /// Prompt the user for account access.
    RequestAccounts,
    FetchBalance,
    Submit(Transaction),
}

/// Preconditions of state-driven effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Triggers {
    pub needs_balance: bool,
}

impl Triggers {
    pub fn of(state: &AppState) -> Self {
        let balance = &state.balance;
        let needs_balance = state.session.is_authenticated()
            && state.contract.is_some()
            && state.in_flight.is_none()
            && state.fetching_balance != Some(state.balance_generation)
            && !balance.failed
            && (balance.value.is_none() || balance.stale);
        Self { needs_balance }
    }
}

pub fn derive(before: Triggers, after: Triggers) -> Vec<Effect> {
    let mut effects = Vec::new();
    if after.needs_balance && !before.needs_balance {
        effects.push(Effect::FetchBalance);
    }
    effects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rising_edges_schedule_work() {
        let idle = Triggers::default();
        let wanting = Triggers { needs_balance: true };
        assert_eq!(derive(idle, wanting), vec![Effect::FetchBalance]);
        assert!(derive(wanting, wanting).is_empty());
        assert!(derive(wanting, idle).is_empty());
        assert!(derive(idle, idle).is_empty());
    }

    #[test]
    fn unauthenticated_state_needs_nothing() {
        assert_eq!(Triggers::of(&AppState::default()), Triggers::default());
    }
}
