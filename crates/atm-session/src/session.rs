//! Session state machine.
//!
//! `NoAgent → AgentDetected → Unauthenticated → Authenticated`. The account,
//! once granted, is kept until the agent reports an account change.

use atm_agent::SigningAgentHandle;
use atm_api_types::Address;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NoAgent,
    AgentDetected,
    Unauthenticated,
    Authenticated,
}

/// What an `accountsChanged` notification did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountChange {
    Unchanged,
    Authenticated(Address),
    Switched { from: Address, to: Address },
    Deauthenticated,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    agent: SigningAgentHandle,
    account: Option<Address>,
    queried: bool,
}

impl Session {
    pub fn detect(agent: SigningAgentHandle) -> Self {
        Self {
            agent,
            account: None,
            queried: false,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match (&self.agent, self.account, self.queried) {
            (SigningAgentHandle::Absent, _, _) => SessionStatus::NoAgent,
            (_, Some(_), _) => SessionStatus::Authenticated,
            (_, None, true) => SessionStatus::Unauthenticated,
            (_, None, false) => SessionStatus::AgentDetected,
        }
    }

    pub fn agent(&self) -> &SigningAgentHandle {
        &self.agent
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.is_some()
    }

    /// Applies the answer of a silent or interactive account query. Returns
    /// the account if this answer authenticated the session.
    pub fn record_query(&mut self, accounts: &[Address]) -> Option<Address> {
        if !self.agent.is_present() {
            warn!("ignoring account list without a signing agent");
            return None;
        }
        self.queried = true;
        if self.account.is_some() {
            return None;
        }
        let first = *accounts.first()?;
        info!(account = %first, "account connected");
        self.account = Some(first);
        Some(first)
    }

    /// The user declined the authorization prompt.
    pub fn record_rejection(&mut self) {
        self.queried = true;
    }

    pub fn accounts_changed(&mut self, accounts: &[Address]) -> AccountChange {
        if !self.agent.is_present() {
            return AccountChange::Unchanged;
        }
        self.queried = true;
        match (self.account, accounts.first().copied()) {
            (None, None) => AccountChange::Unchanged,
            (None, Some(to)) => {
                info!(account = %to, "account connected by agent");
                self.account = Some(to);
                AccountChange::Authenticated(to)
            }
            (Some(from), None) => {
                info!(account = %from, "account disconnected by agent");
                self.account = None;
                AccountChange::Deauthenticated
            }
            (Some(from), Some(to)) if from == to => AccountChange::Unchanged,
            (Some(from), Some(to)) => {
                info!(%from, %to, "active account switched");
                self.account = Some(to);
                AccountChange::Switched { from, to }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ALICE, BOB, agent_handle};
    use atm_agent::StaticAgent;

    #[test]
    fn status_follows_the_state_machine() {
        assert_eq!(Session::default().status(), SessionStatus::NoAgent);

        let mut session = Session::detect(agent_handle(StaticAgent::new(vec![ALICE])));
        assert_eq!(session.status(), SessionStatus::AgentDetected);

        assert_eq!(session.record_query(&[]), None);
        assert_eq!(session.status(), SessionStatus::Unauthenticated);

        assert_eq!(session.record_query(&[ALICE, BOB]), Some(ALICE));
        assert_eq!(session.status(), SessionStatus::Authenticated);
        assert_eq!(session.account(), Some(ALICE));
    }

    #[test]
    fn rejection_leaves_session_unauthenticated() {
        let mut session = Session::detect(agent_handle(StaticAgent::new(vec![ALICE])));
        session.record_rejection();
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert_eq!(session.account(), None);
    }

    #[test]
    fn later_queries_do_not_replace_the_account() {
        let mut session = Session::detect(agent_handle(StaticAgent::new(vec![ALICE])));
        session.record_query(&[ALICE]);
        assert_eq!(session.record_query(&[BOB]), None);
        assert_eq!(session.record_query(&[]), None);
        assert_eq!(session.account(), Some(ALICE));
    }

    #[test]
    fn accounts_without_agent_are_ignored() {
        let mut session = Session::default();
        assert_eq!(session.record_query(&[ALICE]), None);
        assert_eq!(session.accounts_changed(&[ALICE]), AccountChange::Unchanged);
        assert_eq!(session.status(), SessionStatus::NoAgent);
    }

    #[test]
    fn agent_account_changes_are_tracked() {
        let mut session = Session::detect(agent_handle(StaticAgent::new(vec![ALICE])));
        assert_eq!(session.accounts_changed(&[ALICE]), AccountChange::Authenticated(ALICE));
        assert_eq!(session.accounts_changed(&[ALICE]), AccountChange::Unchanged);
        assert_eq!(
            session.accounts_changed(&[BOB]),
            AccountChange::Switched { from: ALICE, to: BOB }
        );
        assert_eq!(session.accounts_changed(&[]), AccountChange::Deauthenticated);
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
    }
}
