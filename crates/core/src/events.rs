//! Events emitted by engine operations for outside observers.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Event emitted by a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LendingEvent {
    AllowedTokenSet {
        token: Address,
        price_feed: Address,
    },
    Deposit {
        user: Address,
        token: Address,
        amount: U256,
    },
    Withdraw {
        user: Address,
        token: Address,
        amount: U256,
    },
    Borrow {
        user: Address,
        token: Address,
        amount: U256,
    },
    Repay {
        user: Address,
        token: Address,
        amount: U256,
    },
    Liquidate {
        liquidator: Address,
        borrower: Address,
        debt_token: Address,
        collateral_token: Address,
        repaid_amount: U256,
        seized_amount: U256,
    },
}

impl LendingEvent {
    /// Event name as it appears in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AllowedTokenSet { .. } => "AllowedTokenSet",
            Self::Deposit { .. } => "Deposit",
            Self::Withdraw { .. } => "Withdraw",
            Self::Borrow { .. } => "Borrow",
            Self::Repay { .. } => "Repay",
            Self::Liquidate { .. } => "Liquidate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = LendingEvent::Deposit {
            user: Address::repeat_byte(0xA1),
            token: Address::repeat_byte(0x01),
            amount: U256::from(10u64),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "Deposit");
        assert_eq!(event.name(), "Deposit");
        assert!(json.get("amount").is_some());
    }
}
