use anyhow::{Context, Result};
use atm_api_types::{Address, DEFAULT_CONTRACT_ADDRESS, OperationSet};
use atm_chain_client::ContractInterface;
use std::path::PathBuf;
use std::time::Duration;

pub const PROVIDER_URL: &str = "ATM_PROVIDER_URL";
pub const CONTRACT_ADDRESS: &str = "ATM_CONTRACT_ADDRESS";
pub const OPERATION_SET: &str = "ATM_OPERATION_SET";
pub const ABI_PATH: &str = "ATM_ABI_PATH";
pub const CONFIRMATION_POLL_MS: &str = "ATM_CONFIRMATION_POLL_MS";

const DEFAULT_POLL_MS: u64 = 1_000;

/// Deployment settings. Read once at startup; nothing here changes while
/// the app runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtmConfig {
    /// JSON-RPC endpoint acting as signing agent. `None` means no agent.
    pub provider_url: Option<String>,
    pub contract_address: Address,
    pub operations: OperationSet,
    /// Hardhat artifact or ABI JSON; the built-in interface is used when unset.
    pub abi_path: Option<PathBuf>,
    pub poll_interval: Duration,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            provider_url: None,
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            operations: OperationSet::AmountBased,
            abi_path: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
        }
    }
}

impl AtmConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let contract_address = match get(CONTRACT_ADDRESS) {
            Some(raw) => raw
                .parse::<Address>()
                .with_context(|| format!("{CONTRACT_ADDRESS} is not an address: {raw}"))?,
            None => defaults.contract_address,
        };

        let operations = match get(OPERATION_SET) {
            Some(raw) => raw.parse::<OperationSet>()?,
            None => defaults.operations,
        };

        let poll_interval = match get(CONFIRMATION_POLL_MS) {
            Some(raw) => Duration::from_millis(
                raw.parse::<u64>()
                    .with_context(|| format!("{CONFIRMATION_POLL_MS} must be milliseconds: {raw}"))?,
            ),
            None => defaults.poll_interval,
        };

        Ok(Self {
            provider_url: get(PROVIDER_URL).map(|url| url.trim_end_matches('/').to_owned()),
            contract_address,
            operations,
            abi_path: get(ABI_PATH).map(PathBuf::from),
            poll_interval,
        })
    }

    /// Loads and validates the contract interface for the configured set.
    pub fn interface(&self) -> Result<ContractInterface> {
        let Some(path) = &self.abi_path else {
            return Ok(ContractInterface::builtin(self.operations)?);
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading contract ABI from {}", path.display()))?;
        ContractInterface::from_json(&json, self.operations)
            .with_context(|| format!("contract ABI in {}", path.display()))
    }
}
