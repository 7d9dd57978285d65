use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi};
use async_trait::async_trait;
use atm_api_types::{Address, B256, BALANCE_FUNCTION, OperationKind, OperationSet, U256};
use serde::Deserialize;
use std::fmt;
use std::rc::Rc;

pub use alloy_primitives::Bytes;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("the user declined to sign the transaction")]
    Rejected,
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },
    #[error("chain transport failed: {0}")]
    Transport(String),
    #[error("contract interface: {0}")]
    Interface(String),
}

/// Token returned by a state-changing call, used to wait for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: B256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: B256,
    pub block_number: Option<u64>,
}

/// Access to the chain the contract lives on.
///
/// Calls are issued on behalf of `from`; the backend (or the signing agent
/// behind it) is responsible for obtaining the signature.
#[async_trait(?Send)]
pub trait ContractBackend {
    async fn send_transaction(&self, from: Address, to: Address, data: Bytes) -> Result<PendingTx, ChainError>;

    /// Resolves once the transaction is mined. A mined-but-failed
    /// transaction is reported as [`ChainError::Reverted`].
    async fn wait_for_confirmation(&self, pending: &PendingTx) -> Result<TxReceipt, ChainError>;

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;
}

/// Backend for builds without a provider. Every call fails with
/// [`ChainError::Transport`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Disconnected;

#[async_trait(?Send)]
impl ContractBackend for Disconnected {
    async fn send_transaction(&self, _from: Address, _to: Address, _data: Bytes) -> Result<PendingTx, ChainError> {
        Err(ChainError::Transport("no provider".to_owned()))
    }

    async fn wait_for_confirmation(&self, _pending: &PendingTx) -> Result<TxReceipt, ChainError> {
        Err(ChainError::Transport("no provider".to_owned()))
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
        Err(ChainError::Transport("no provider".to_owned()))
    }
}

const AMOUNT_BASED_ABI: &str = r#"[
  {"type":"function","name":"deposit","inputs":[{"name":"_amount","type":"uint256"}],"outputs":[],"stateMutability":"payable"},
  {"type":"function","name":"withdraw","inputs":[{"name":"_withdrawAmount","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"getBalance","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}
]"#;

const FIXED_STEP_ABI: &str = r#"[
  {"type":"function","name":"doubleValue","inputs":[],"outputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"halveValue","inputs":[],"outputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"incrementValue","inputs":[{"name":"_amount","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"decrementValue","inputs":[{"name":"_amount","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"tryToSetValueToZero","inputs":[],"outputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"getBalance","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}
]"#;

#[derive(Deserialize)]
#[serde(untagged)]
enum AbiSource {
    Artifact { abi: JsonAbi },
    Bare(JsonAbi),
}

/// A contract call: function name plus `uint256` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub function: &'static str,
    pub args: Vec<U256>,
}

impl ContractCall {
    pub fn new(function: &'static str, args: Vec<U256>) -> Self {
        Self { function, args }
    }
}

/// Number of `uint256` arguments the contract function behind `op` takes.
pub fn operation_arity(op: OperationKind) -> usize {
    match op {
        OperationKind::Deposit
        | OperationKind::Withdraw
        | OperationKind::ClearBalance
        | OperationKind::IncrementValue
        | OperationKind::DecrementValue => 1,
        OperationKind::DoubleValue | OperationKind::HalveValue | OperationKind::TryToSetValueToZero => 0,
    }
}

/// ABI of the bound contract, checked against one operation set.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractInterface {
    abi: JsonAbi,
    operations: OperationSet,
}

impl ContractInterface {
    /// Interface shipped with this build for the given operation set.
    pub fn builtin(operations: OperationSet) -> Result<Self, ChainError> {
        let json = match operations {
            OperationSet::AmountBased => AMOUNT_BASED_ABI,
            OperationSet::FixedStep => FIXED_STEP_ABI,
        };
        Self::from_json(json, operations)
    }

    /// Accepts a Hardhat/Foundry artifact (`{"abi": [...]}`) or a bare ABI array.
    pub fn from_json(json: &str, operations: OperationSet) -> Result<Self, ChainError> {
        let abi = match serde_json::from_str::<AbiSource>(json) {
            Ok(AbiSource::Artifact { abi }) | Ok(AbiSource::Bare(abi)) => abi,
            Err(err) => return Err(ChainError::Interface(format!("unreadable ABI: {err}"))),
        };
        let interface = Self { abi, operations };
        interface.validate()?;
        Ok(interface)
    }

    pub fn operations(&self) -> OperationSet {
        self.operations
    }

    fn validate(&self) -> Result<(), ChainError> {
        for op in self.operations.operations() {
            self.function(op.function_name(), operation_arity(*op))?;
        }
        let getter = self.function(BALANCE_FUNCTION, 0)?;
        if getter.outputs.is_empty() {
            return Err(ChainError::Interface(format!("{BALANCE_FUNCTION}() returns nothing")));
        }
        Ok(())
    }

    fn function(&self, name: &str, arity: usize) -> Result<&Function, ChainError> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arity))
            .ok_or_else(|| {
                ChainError::Interface(format!(
                    "{} contract must expose {name} with {arity} argument(s)",
                    self.operations
                ))
            })
    }

    pub fn encode(&self, call: &ContractCall) -> Result<Bytes, ChainError> {
        let function = self.function(call.function, call.args.len())?;
        let values: Vec<DynSolValue> = call.args.iter().map(|arg| DynSolValue::Uint(*arg, 256)).collect();
        function
            .abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(|err| ChainError::Interface(format!("encode {}: {err}", call.function)))
    }

    pub fn encode_balance_query(&self) -> Result<Bytes, ChainError> {
        self.encode(&ContractCall::new(BALANCE_FUNCTION, Vec::new()))
    }

    pub fn decode_balance(&self, data: &[u8]) -> Result<U256, ChainError> {
        let function = self.function(BALANCE_FUNCTION, 0)?;
        let values = function
            .abi_decode_output(data)
            .map_err(|err| ChainError::Interface(format!("decode {BALANCE_FUNCTION}: {err}")))?;
        values
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(value, _)| value)
            .ok_or_else(|| ChainError::Interface(format!("{BALANCE_FUNCTION} did not return a uint")))
    }
}

/// The single contract this build talks to.
#[derive(Clone)]
pub struct ContractDeployment {
    pub address: Address,
    pub interface: Rc<ContractInterface>,
    pub backend: Rc<dyn ContractBackend>,
}

impl fmt::Debug for ContractDeployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractDeployment")
            .field("address", &self.address)
            .field("operations", &self.interface.operations())
            .finish_non_exhaustive()
    }
}

/// Deployment bound to a signer. Immutable once built.
#[derive(Clone)]
pub struct ContractHandle {
    deployment: ContractDeployment,
    signer: Address,
}

impl ContractHandle {
    pub fn new(deployment: ContractDeployment, signer: Address) -> Self {
        Self { deployment, signer }
    }

    pub fn address(&self) -> Address {
        self.deployment.address
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn operations(&self) -> OperationSet {
        self.deployment.interface.operations()
    }

    pub fn interface(&self) -> &ContractInterface {
        &self.deployment.interface
    }

    /// Same address, interface and signer.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.deployment.address == other.deployment.address
            && self.signer == other.signer
            && (Rc::ptr_eq(&self.deployment.interface, &other.deployment.interface)
                || self.deployment.interface == other.deployment.interface)
    }

    pub async fn send(&self, call: &ContractCall) -> Result<PendingTx, ChainError> {
        let data = self.deployment.interface.encode(call)?;
        self.deployment
            .backend
            .send_transaction(self.signer, self.deployment.address, data)
            .await
    }

    pub async fn wait(&self, pending: &PendingTx) -> Result<TxReceipt, ChainError> {
        self.deployment.backend.wait_for_confirmation(pending).await
    }

    pub async fn balance(&self) -> Result<U256, ChainError> {
        let data = self.deployment.interface.encode_balance_query()?;
        let output = self.deployment.backend.call(self.deployment.address, data).await?;
        self.deployment.interface.decode_balance(&output)
    }
}

impl fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.deployment.address)
            .field("signer", &self.signer)
            .field("operations", &self.operations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_api_types::{DEFAULT_CONTRACT_ADDRESS, address};
    use std::cell::RefCell;

    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");

    #[derive(Default)]
    struct EchoBackend {
        sent: RefCell<Vec<Bytes>>,
    }

    #[async_trait(?Send)]
    impl ContractBackend for EchoBackend {
        async fn send_transaction(&self, _from: Address, _to: Address, data: Bytes) -> Result<PendingTx, ChainError> {
            self.sent.borrow_mut().push(data);
            Ok(PendingTx { hash: B256::repeat_byte(1) })
        }

        async fn wait_for_confirmation(&self, pending: &PendingTx) -> Result<TxReceipt, ChainError> {
            Ok(TxReceipt { hash: pending.hash, block_number: Some(1) })
        }

        async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
            Ok(Bytes::from(U256::from(42u64).to_be_bytes::<32>().to_vec()))
        }
    }

    fn deployment(backend: Rc<EchoBackend>) -> ContractDeployment {
        ContractDeployment {
            address: DEFAULT_CONTRACT_ADDRESS,
            interface: Rc::new(ContractInterface::builtin(OperationSet::AmountBased).unwrap()),
            backend,
        }
    }

    #[tokio::test]
    async fn disconnected_backend_fails_every_call() {
        let err = Disconnected.call(DEFAULT_CONTRACT_ADDRESS, Bytes::new()).await.unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)));
        let err = Disconnected
            .send_transaction(ALICE, DEFAULT_CONTRACT_ADDRESS, Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Transport(_)));
    }

    #[test]
    fn builtin_interfaces_validate() {
        ContractInterface::builtin(OperationSet::AmountBased).unwrap();
        ContractInterface::builtin(OperationSet::FixedStep).unwrap();
    }

    #[test]
    fn artifact_missing_an_operation_is_refused() {
        let err = ContractInterface::from_json(AMOUNT_BASED_ABI, OperationSet::FixedStep).unwrap_err();
        assert!(matches!(err, ChainError::Interface(msg) if msg.contains("fixed-step contract must expose incrementValue")));
    }

    #[test]
    fn hardhat_artifacts_are_accepted() {
        let artifact = format!(r#"{{"contractName":"Assessment","abi":{AMOUNT_BASED_ABI}}}"#);
        let interface = ContractInterface::from_json(&artifact, OperationSet::AmountBased).unwrap();
        assert_eq!(interface.operations(), OperationSet::AmountBased);
    }

    #[test]
    fn calls_are_encoded_with_selector() {
        let interface = ContractInterface::builtin(OperationSet::AmountBased).unwrap();
        let data = interface
            .encode(&ContractCall::new("deposit", vec![U256::from(5u64)]))
            .unwrap();
        // deposit(uint256)
        assert_eq!(&data[..4], &[0xb6, 0xb5, 0x5f, 0x25]);
        assert_eq!(data.len(), 36);
        assert_eq!(data[35], 5);
    }

    #[tokio::test]
    async fn handle_reads_balance_through_backend() {
        let backend = Rc::new(EchoBackend::default());
        let handle = ContractHandle::new(deployment(backend.clone()), ALICE);
        assert_eq!(handle.balance().await.unwrap(), U256::from(42u64));

        let pending = handle
            .send(&ContractCall::new("withdraw", vec![U256::from(1u64)]))
            .await
            .unwrap();
        assert_eq!(handle.wait(&pending).await.unwrap().block_number, Some(1));
        assert_eq!(backend.sent.borrow().len(), 1);
    }

    #[test]
    fn handles_on_the_same_signer_are_equivalent() {
        let backend = Rc::new(EchoBackend::default());
        let first = ContractHandle::new(deployment(backend.clone()), ALICE);
        let second = ContractHandle::new(deployment(backend), ALICE);
        assert!(first.is_equivalent(&second));
    }
}
