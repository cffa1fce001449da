//! What a call did, and what the ledger must move because of it.

use serde::{Deserialize, Serialize};

use crate::ledger::{Payout, Pull};
use crate::state::StateDelta;
use crate::types::{Address, Amount, AssetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Buy,
    Sell,
    AddLiquidity,
    RemoveLiquidity,
    WithdrawRoyalties,
    TransferShares,
}

/// Per-id outcome. Which fields are meaningful depends on the operation:
/// trades fill `tokens`/`currency`/`royalty`, liquidity ops fill `shares`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementLine {
    pub id: AssetId,
    pub tokens: Amount,
    /// Currency charged (buy, add) or paid out (sell, remove) for this id.
    pub currency: Amount,
    pub shares: Amount,
    pub royalty: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyCredit {
    pub recipient: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub operation: Operation,
    /// Party the call acted for (depositor or direct caller).
    pub party: Address,
    /// Resolved destination of the call's proceeds.
    pub recipient: Address,
    pub lines: Vec<SettlementLine>,
    /// Currency total charged or paid, after royalties and extra fees.
    pub total_currency: Amount,
    pub royalties: Vec<RoyaltyCredit>,
    pub pulls: Vec<Pull>,
    pub payouts: Vec<Payout>,
}

impl Settlement {
    pub fn new(operation: Operation, party: Address, recipient: Address) -> Self {
        Self {
            operation,
            party,
            recipient,
            lines: Vec::new(),
            total_currency: 0,
            royalties: Vec::new(),
            pulls: Vec::new(),
            payouts: Vec::new(),
        }
    }

    pub fn line(&self, id: AssetId) -> Option<&SettlementLine> {
        self.lines.iter().find(|l| l.id == id)
    }
}

/// A handler's complete output: state to write, then assets to move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub delta: StateDelta,
    pub settlement: Settlement,
}
