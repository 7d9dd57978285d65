use alloy_primitives::utils::{format_ether, parse_units};
use std::fmt;
use std::str::FromStr;

pub use alloy_primitives::{Address, B256, U256, address};

/// Deployment address of the ATM contract on a fresh local Hardhat node.
pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

/// Unit the user types amounts in. On-chain values are wei (10^18 per ether).
pub const DISPLAY_UNIT: &str = "ether";

/// Read-only getter every supported contract exposes.
pub const BALANCE_FUNCTION: &str = "getBalance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationSet {
    AmountBased,
    FixedStep,
}

impl OperationSet {
    pub fn operations(self) -> &'static [OperationKind] {
        match self {
            Self::AmountBased => &[
                OperationKind::Deposit,
                OperationKind::Withdraw,
                OperationKind::ClearBalance,
            ],
            Self::FixedStep => &[
                OperationKind::IncrementValue,
                OperationKind::DecrementValue,
                OperationKind::DoubleValue,
                OperationKind::HalveValue,
                OperationKind::TryToSetValueToZero,
            ],
        }
    }

    pub fn contains(self, op: OperationKind) -> bool {
        op.set() == self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AmountBased => "amount-based",
            Self::FixedStep => "fixed-step",
        }
    }
}

impl fmt::Display for OperationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown operation set '{0}' (expected amount-based or fixed-step)")]
pub struct UnknownOperationSet(pub String);

impl FromStr for OperationSet {
    type Err = UnknownOperationSet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amount-based" | "amount" | "a" => Ok(Self::AmountBased),
            "fixed-step" | "fixed" | "b" => Ok(Self::FixedStep),
            other => Err(UnknownOperationSet(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Deposit,
    Withdraw,
    /// Withdraws the whole current balance.
    ClearBalance,
    DoubleValue,
    HalveValue,
    IncrementValue,
    DecrementValue,
    TryToSetValueToZero,
}

impl OperationKind {
    pub fn set(self) -> OperationSet {
        match self {
            Self::Deposit | Self::Withdraw | Self::ClearBalance => OperationSet::AmountBased,
            Self::DoubleValue
            | Self::HalveValue
            | Self::IncrementValue
            | Self::DecrementValue
            | Self::TryToSetValueToZero => OperationSet::FixedStep,
        }
    }

    /// Name of the contract function this operation is sent to.
    pub fn function_name(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw | Self::ClearBalance => "withdraw",
            Self::DoubleValue => "doubleValue",
            Self::HalveValue => "halveValue",
            Self::IncrementValue => "incrementValue",
            Self::DecrementValue => "decrementValue",
            Self::TryToSetValueToZero => "tryToSetValueToZero",
        }
    }

    /// Whether the user-entered amount is passed to the contract.
    pub fn takes_amount(self) -> bool {
        matches!(
            self,
            Self::Deposit | Self::Withdraw | Self::IncrementValue | Self::DecrementValue
        )
    }

    pub fn command(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::ClearBalance => "clear",
            Self::DoubleValue => "double",
            Self::HalveValue => "halve",
            Self::IncrementValue => "increment",
            Self::DecrementValue => "decrement",
            Self::TryToSetValueToZero => "zero",
        }
    }

    pub fn from_command(command: &str) -> Option<Self> {
        [
            Self::Deposit,
            Self::Withdraw,
            Self::ClearBalance,
            Self::DoubleValue,
            Self::HalveValue,
            Self::IncrementValue,
            Self::DecrementValue,
            Self::TryToSetValueToZero,
        ]
        .into_iter()
        .find(|op| op.command() == command)
    }

    /// Button caption, e.g. `Deposit 1.5 ETH`.
    pub fn label(self, amount: &str) -> String {
        match self {
            Self::Deposit => format!("Deposit {amount} ETH"),
            Self::Withdraw => format!("Withdraw {amount} ETH"),
            Self::ClearBalance => "Clear Balance".to_owned(),
            Self::DoubleValue => "Double Value".to_owned(),
            Self::HalveValue => "Halve Value".to_owned(),
            Self::IncrementValue => format!("Increment {amount} ETH"),
            Self::DecrementValue => format!("Decrement {amount} ETH"),
            Self::TryToSetValueToZero => "Set Value to Zero".to_owned(),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// A user-triggered state-changing call. `amount` is the raw text from the
/// amount field; it is normalized only when the transaction is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub op: OperationKind,
    pub amount: Option<String>,
    pub submitted_at_epoch_ms: u128,
}

/// Result of reading the amount field as ether.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountInput {
    Valid(U256),
    Negative,
    Malformed(String),
}

pub fn parse_display_amount(raw: &str) -> AmountInput {
    let trimmed = raw.trim();
    if trimmed.starts_with('-') {
        return AmountInput::Negative;
    }
    match parse_units(trimmed, DISPLAY_UNIT) {
        Ok(units) if units.is_negative() => AmountInput::Negative,
        Ok(units) => AmountInput::Valid(units.get_absolute()),
        Err(err) => AmountInput::Malformed(err.to_string()),
    }
}

/// Formats wei as ether the way `ethers.utils.formatEther` does: trailing
/// zeros dropped, at least one fractional digit kept.
pub fn format_display_amount(value: U256) -> String {
    let formatted = format_ether(value);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => format!("{formatted}.0"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn amounts_are_parsed_in_ether() {
        assert_eq!(parse_display_amount("1"), AmountInput::Valid(U256::from(ONE_ETHER)));
        assert_eq!(
            parse_display_amount(" 0.5 "),
            AmountInput::Valid(U256::from(ONE_ETHER / 2))
        );
    }

    #[test]
    fn negative_and_garbage_amounts_are_flagged() {
        assert_eq!(parse_display_amount("-5"), AmountInput::Negative);
        assert_eq!(parse_display_amount("-0.1"), AmountInput::Negative);
        assert!(matches!(parse_display_amount("abc"), AmountInput::Malformed(_)));
    }

    #[test]
    fn balances_format_like_format_ether() {
        assert_eq!(format_display_amount(U256::ZERO), "0.0");
        assert_eq!(format_display_amount(U256::from(ONE_ETHER)), "1.0");
        assert_eq!(format_display_amount(U256::from(ONE_ETHER * 3 / 2)), "1.5");
    }

    #[test]
    fn operation_sets_never_mix() {
        for set in [OperationSet::AmountBased, OperationSet::FixedStep] {
            for op in set.operations() {
                assert_eq!(op.set(), set);
            }
        }
        assert!(!OperationSet::FixedStep.contains(OperationKind::Deposit));
        assert_eq!("fixed-step".parse::<OperationSet>(), Ok(OperationSet::FixedStep));
        assert!("both".parse::<OperationSet>().is_err());
    }

    #[test]
    fn clear_balance_is_a_withdraw() {
        assert_eq!(OperationKind::ClearBalance.function_name(), "withdraw");
        assert!(!OperationKind::ClearBalance.takes_amount());
        assert_eq!(OperationKind::from_command("zero"), Some(OperationKind::TryToSetValueToZero));
        assert_eq!(OperationKind::IncrementValue.label("2"), "Increment 2 ETH");
    }
}
