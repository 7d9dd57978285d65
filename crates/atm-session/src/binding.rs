use atm_chain_client::{ContractDeployment, ContractHandle};

use crate::error::AtmError;
use crate::session::Session;

/// Binds the deployment to the session's account. No network access.
pub fn bind(session: &Session, deployment: &ContractDeployment) -> Result<ContractHandle, AtmError> {
    let Some(signer) = session.account() else {
        return Err(AtmError::precondition(
            "contract binding requires an authenticated session",
        ));
    };
    Ok(ContractHandle::new(deployment.clone(), signer))
}
