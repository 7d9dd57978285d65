//! Test doubles shared by the unit tests of this crate.

use alloy_primitives::{Bytes, keccak256};
use async_trait::async_trait;
use atm_agent::{SigningAgent, SigningAgentHandle, StaticAgent};
use atm_api_types::{Address, B256, DEFAULT_CONTRACT_ADDRESS, OperationSet, U256, address};
use atm_chain_client::{ChainError, ContractBackend, ContractDeployment, ContractInterface, PendingTx, TxReceipt};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
pub const BOB: Address = address!("0000000000000000000000000000000000000b0b");

pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18u64))
}

pub fn agent_handle(agent: StaticAgent) -> SigningAgentHandle {
    shared_agent(agent).1
}

pub fn shared_agent(agent: StaticAgent) -> (Rc<StaticAgent>, SigningAgentHandle) {
    let agent = Rc::new(agent);
    let dyn_agent: Rc<dyn SigningAgent> = agent.clone();
    (agent, SigningAgentHandle::Present(dyn_agent))
}

const SIGNATURES: &[&str] = &[
    "deposit(uint256)",
    "withdraw(uint256)",
    "doubleValue()",
    "halveValue()",
    "incrementValue(uint256)",
    "decrementValue(uint256)",
    "tryToSetValueToZero()",
];

/// One decoded state-changing call: function name and optional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCall {
    pub function: String,
    pub arg: Option<U256>,
}

/// In-memory stand-in for the deployed contract. Calls take effect when
/// their confirmation is awaited, like a real block inclusion.
pub struct FakeChain {
    operations: OperationSet,
    value: Cell<U256>,
    sent: RefCell<Vec<SentCall>>,
    pending: RefCell<Vec<(B256, SentCall)>>,
    reads: Cell<usize>,
    reject_signing: Cell<bool>,
    fail_reads: Cell<bool>,
}

impl FakeChain {
    pub fn new(operations: OperationSet) -> Rc<Self> {
        Rc::new(Self {
            operations,
            value: Cell::new(U256::ZERO),
            sent: RefCell::default(),
            pending: RefCell::default(),
            reads: Cell::new(0),
            reject_signing: Cell::new(false),
            fail_reads: Cell::new(false),
        })
    }

    pub fn deployment(self: &Rc<Self>) -> ContractDeployment {
        let backend: Rc<dyn ContractBackend> = self.clone();
        ContractDeployment {
            address: DEFAULT_CONTRACT_ADDRESS,
            interface: Rc::new(ContractInterface::builtin(self.operations).unwrap()),
            backend,
        }
    }

    pub fn set_value(&self, value: U256) {
        self.value.set(value);
    }

    pub fn value(&self) -> U256 {
        self.value.get()
    }

    pub fn sent(&self) -> Vec<SentCall> {
        self.sent.borrow().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn reject_signing(&self, reject: bool) {
        self.reject_signing.set(reject);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    fn decode(data: &[u8]) -> SentCall {
        let signature = SIGNATURES
            .iter()
            .find(|sig| keccak256(sig.as_bytes())[..4] == data[..4])
            .expect("unknown selector");
        let function = signature.split('(').next().unwrap_or_default().to_owned();
        let arg = (data.len() >= 36).then(|| U256::from_be_slice(&data[4..36]));
        SentCall { function, arg }
    }

    fn execute(&self, call: &SentCall) -> Result<(), ChainError> {
        let value = self.value.get();
        let arg = call.arg.unwrap_or_default();
        let revert = |reason: &str| ChainError::Reverted { reason: reason.to_owned() };
        let next = match call.function.as_str() {
            "deposit" | "incrementValue" => value + arg,
            "withdraw" | "decrementValue" => value.checked_sub(arg).ok_or_else(|| revert("Insufficient balance"))?,
            "doubleValue" => value * U256::from(2u64),
            "halveValue" => value / U256::from(2u64),
            "tryToSetValueToZero" if value.is_zero() => value,
            "tryToSetValueToZero" => return Err(revert("Value is not zero")),
            other => return Err(revert(&format!("no such function {other}"))),
        };
        self.value.set(next);
        Ok(())
    }
}

#[async_trait(?Send)]
impl ContractBackend for FakeChain {
    async fn send_transaction(&self, _from: Address, to: Address, data: Bytes) -> Result<PendingTx, ChainError> {
        assert_eq!(to, DEFAULT_CONTRACT_ADDRESS);
        if self.reject_signing.get() {
            return Err(ChainError::Rejected);
        }
        let call = Self::decode(&data);
        self.sent.borrow_mut().push(call.clone());
        let hash = B256::with_last_byte(self.sent.borrow().len() as u8);
        self.pending.borrow_mut().push((hash, call));
        Ok(PendingTx { hash })
    }

    async fn wait_for_confirmation(&self, pending: &PendingTx) -> Result<TxReceipt, ChainError> {
        let call = {
            let mut queue = self.pending.borrow_mut();
            let index = queue
                .iter()
                .position(|(hash, _)| *hash == pending.hash)
                .ok_or_else(|| ChainError::Transport("unknown transaction".to_owned()))?;
            queue.remove(index).1
        };
        self.execute(&call)?;
        Ok(TxReceipt {
            hash: pending.hash,
            block_number: Some(self.sent.borrow().len() as u64),
        })
    }

    async fn call(&self, to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
        assert_eq!(to, DEFAULT_CONTRACT_ADDRESS);
        if self.fail_reads.get() {
            return Err(ChainError::Transport("connection refused".to_owned()));
        }
        self.reads.set(self.reads.get() + 1);
        Ok(Bytes::from(self.value.get().to_be_bytes::<32>().to_vec()))
    }
}
