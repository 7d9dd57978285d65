use atm_agent::AgentError;
use atm_chain_client::ChainError;

/// Failures the view layer may observe. Raw transport errors are converted
/// into one of these before they leave the session/runner boundary.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AtmError {
    #[error("a signing agent such as MetaMask is required to connect")]
    AgentUnavailable,
    #[error("request rejected in the signing agent")]
    UserRejected,
    #[error("transaction failed: {0}")]
    TxReverted(String),
    #[error("could not read the balance: {0}")]
    BalanceFetchFailed(String),
    #[error("internal error: {0}")]
    PreconditionViolated(String),
}

/// Error type of [`crate::TransactionRunner::submit`].
pub type TxError = AtmError;

impl AtmError {
    /// Programming errors; everything else is a notice the user can act on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PreconditionViolated(_))
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolated(message.into())
    }
}

impl From<AgentError> for AtmError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::UserRejected => Self::UserRejected,
            AgentError::Transport(_) => Self::AgentUnavailable,
        }
    }
}

impl From<ChainError> for AtmError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Rejected => Self::UserRejected,
            ChainError::Reverted { reason } => Self::TxReverted(reason),
            // The call never took effect; to the user that is a failed transaction.
            ChainError::Transport(reason) => Self::TxReverted(reason),
            ChainError::Interface(reason) => Self::PreconditionViolated(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_errors_collapse_into_the_taxonomy() {
        assert_eq!(AtmError::from(ChainError::Rejected), AtmError::UserRejected);
        assert_eq!(
            AtmError::from(ChainError::Reverted { reason: "Insufficient balance".into() }),
            AtmError::TxReverted("Insufficient balance".into())
        );
        assert!(AtmError::from(ChainError::Interface("bad abi".into())).is_fatal());
        assert!(!AtmError::UserRejected.is_fatal());
    }

    #[test]
    fn agent_errors_collapse_into_the_taxonomy() {
        assert_eq!(AtmError::from(AgentError::UserRejected), AtmError::UserRejected);
        assert_eq!(
            AtmError::from(AgentError::Transport("connection refused".into())),
            AtmError::AgentUnavailable
        );
    }
}
