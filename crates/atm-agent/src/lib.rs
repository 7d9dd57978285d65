//! Signing agent boundary.
//!
//! A signing agent is the external program holding the user's keys (a
//! browser extension, or a node with unlocked accounts). This crate only
//! models the capability; transports live in `atm-chain-rpc` and the
//! browser front end.

use async_trait::async_trait;
use atm_api_types::Address;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("the user rejected the request")]
    UserRejected,
    #[error("signing agent transport failed: {0}")]
    Transport(String),
}

/// Account queries offered by a signing agent. Both calls may round-trip to
/// another process and cannot be cancelled once issued.
#[async_trait(?Send)]
pub trait SigningAgent {
    /// Human-readable agent name used in logs.
    fn name(&self) -> &str;

    /// Accounts the user already authorized, without prompting. Empty if none.
    async fn request_silent(&self) -> Result<Vec<Address>, AgentError>;

    /// Prompts the user to authorize accounts.
    async fn request_interactive(&self) -> Result<Vec<Address>, AgentError>;
}

/// Result of agent detection.
#[derive(Clone, Default)]
pub enum SigningAgentHandle {
    #[default]
    Absent,
    Present(Rc<dyn SigningAgent>),
}

impl SigningAgentHandle {
    pub fn detect(found: Option<Rc<dyn SigningAgent>>) -> Self {
        match found {
            Some(agent) => Self::Present(agent),
            None => Self::Absent,
        }
    }

    pub fn agent(&self) -> Option<Rc<dyn SigningAgent>> {
        match self {
            Self::Absent => None,
            Self::Present(agent) => Some(Rc::clone(agent)),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl fmt::Debug for SigningAgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Present(agent) => f.debug_tuple("Present").field(&agent.name()).finish(),
        }
    }
}

/// In-memory agent with a fixed set of accounts.
///
/// The interactive request either grants `accounts` (remembering the grant
/// for later silent queries) or, when configured to, fails as if the user
/// declined the prompt.
#[derive(Debug, Default)]
pub struct StaticAgent {
    accounts: Vec<Address>,
    authorized: RefCell<Vec<Address>>,
    reject_prompts: Cell<bool>,
    silent_calls: Cell<usize>,
    interactive_calls: Cell<usize>,
}

impl StaticAgent {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            accounts,
            ..Self::default()
        }
    }

    /// Agent whose accounts are already authorized.
    pub fn pre_authorized(accounts: Vec<Address>) -> Self {
        let agent = Self::new(accounts.clone());
        agent.authorized.replace(accounts);
        agent
    }

    pub fn reject_prompts(&self, reject: bool) {
        self.reject_prompts.set(reject);
    }

    pub fn silent_calls(&self) -> usize {
        self.silent_calls.get()
    }

    pub fn interactive_calls(&self) -> usize {
        self.interactive_calls.get()
    }
}

#[async_trait(?Send)]
impl SigningAgent for StaticAgent {
    fn name(&self) -> &str {
        "static"
    }

    async fn request_silent(&self) -> Result<Vec<Address>, AgentError> {
        self.silent_calls.set(self.silent_calls.get() + 1);
        Ok(self.authorized.borrow().clone())
    }

    async fn request_interactive(&self) -> Result<Vec<Address>, AgentError> {
        self.interactive_calls.set(self.interactive_calls.get() + 1);
        if self.reject_prompts.get() {
            return Err(AgentError::UserRejected);
        }
        self.authorized.replace(self.accounts.clone());
        Ok(self.accounts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_api_types::address;

    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");

    #[test]
    fn detection_wraps_the_optional_agent() {
        assert!(!SigningAgentHandle::detect(None).is_present());
        let agent: Rc<dyn SigningAgent> = Rc::new(StaticAgent::new(vec![ALICE]));
        let handle = SigningAgentHandle::detect(Some(agent));
        assert!(handle.is_present());
        assert_eq!(format!("{handle:?}"), "Present(\"static\")");
    }

    #[tokio::test]
    async fn silent_query_sees_only_granted_accounts() {
        let agent = StaticAgent::new(vec![ALICE]);
        assert!(agent.request_silent().await.unwrap().is_empty());
        assert_eq!(agent.request_interactive().await.unwrap(), vec![ALICE]);
        assert_eq!(agent.request_silent().await.unwrap(), vec![ALICE]);
        assert_eq!(agent.silent_calls(), 2);
        assert_eq!(agent.interactive_calls(), 1);
    }

    #[tokio::test]
    async fn rejected_prompt_grants_nothing() {
        let agent = StaticAgent::new(vec![ALICE]);
        agent.reject_prompts(true);
        assert_eq!(agent.request_interactive().await, Err(AgentError::UserRejected));
        assert!(agent.request_silent().await.unwrap().is_empty());
    }
}
