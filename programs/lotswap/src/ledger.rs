//! The external asset ledger the engine settles against.
//!
//! The engine never moves assets itself. Handlers finish every state write
//! first, then hand the ledger a list of pulls (assets the engine collects
//! from a party) and payouts (assets it sends). If the ledger rejects any of
//! them the engine restores its own records and the whole call fails.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, AssetClass, AssetId};

/// Assets the engine sends to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: Address,
    pub asset: AssetClass,
    pub ids: Vec<AssetId>,
    pub amounts: Vec<Amount>,
}

/// Assets the engine collects from `from` (allowance-based transfer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pull {
    pub from: Address,
    pub asset: AssetClass,
    pub ids: Vec<AssetId>,
    pub amounts: Vec<Amount>,
}

impl Payout {
    pub fn currency(recipient: Address, currency_id: AssetId, amount: Amount) -> Self {
        Self { recipient, asset: AssetClass::Currency, ids: vec![currency_id], amounts: vec![amount] }
    }

    pub fn lots(recipient: Address, ids: Vec<AssetId>, amounts: Vec<Amount>) -> Self {
        Self { recipient, asset: AssetClass::Lots, ids, amounts }
    }
}

impl Pull {
    pub fn currency(from: Address, currency_id: AssetId, amount: Amount) -> Self {
        Self { from, asset: AssetClass::Currency, ids: vec![currency_id], amounts: vec![amount] }
    }

    pub fn lots(from: Address, ids: Vec<AssetId>, amounts: Vec<Amount>) -> Self {
        Self { from, asset: AssetClass::Lots, ids, amounts }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("transfer from {0} failed: insufficient balance or allowance")]
    PullFailed(Address),
    #[error("transfer to {0} was rejected")]
    PayoutRejected(Address),
}

/// Outbound/inbound movement primitive supplied by whoever holds the assets.
///
/// `begin_settlement` is called before the first movement of a call and
/// `abort_settlement` if any movement of that call fails; a ledger that
/// applied earlier movements must undo them there.
pub trait AssetLedger {
    fn pull(&mut self, pull: &Pull) -> Result<(), LedgerError>;
    fn pay(&mut self, payout: &Payout) -> Result<(), LedgerError>;

    fn begin_settlement(&mut self) {}
    fn abort_settlement(&mut self) {}
}

impl<L: AssetLedger + ?Sized> AssetLedger for &mut L {
    fn pull(&mut self, pull: &Pull) -> Result<(), LedgerError> {
        (**self).pull(pull)
    }

    fn pay(&mut self, payout: &Payout) -> Result<(), LedgerError> {
        (**self).pay(payout)
    }

    fn begin_settlement(&mut self) {
        (**self).begin_settlement()
    }

    fn abort_settlement(&mut self) {
        (**self).abort_settlement()
    }
}

// ─── RecordingLedger ───────────────────────────────────────────────────────

/// In-memory ledger that records every movement.
///
/// Parties can be marked so pulls from them (or payouts to them) fail, which
/// is how tests and the CLI simulator exercise rollback.
#[derive(Debug, Clone, Default)]
pub struct RecordingLedger {
    pulls: Vec<Pull>,
    payouts: Vec<Payout>,
    failing_pulls: Vec<Address>,
    rejecting_payouts: Vec<Address>,
    /// (pulls, payouts) lengths when the current settlement began
    mark: (usize, usize),
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later pull from `party` fails.
    pub fn fail_pulls_from(mut self, party: Address) -> Self {
        self.failing_pulls.push(party);
        self
    }

    /// Every later payout to `party` is rejected.
    pub fn reject_payouts_to(mut self, party: Address) -> Self {
        self.rejecting_payouts.push(party);
        self
    }

    pub fn pulls(&self) -> &[Pull] {
        &self.pulls
    }

    pub fn payouts(&self) -> &[Payout] {
        &self.payouts
    }

    /// Sum of currency paid to `recipient` so far; `None` if it overflows.
    pub fn currency_paid_to(&self, recipient: &Address) -> Option<Amount> {
        self.payouts
            .iter()
            .filter(|p| p.asset == AssetClass::Currency && p.recipient == *recipient)
            .flat_map(|p| p.amounts.iter())
            .try_fold(0, |acc: Amount, &a| acc.checked_add(a))
    }

    pub fn clear(&mut self) {
        self.pulls.clear();
        self.payouts.clear();
        self.mark = (0, 0);
    }
}

impl AssetLedger for RecordingLedger {
    fn pull(&mut self, pull: &Pull) -> Result<(), LedgerError> {
        if self.failing_pulls.contains(&pull.from) {
            return Err(LedgerError::PullFailed(pull.from));
        }
        self.pulls.push(pull.clone());
        Ok(())
    }

    fn pay(&mut self, payout: &Payout) -> Result<(), LedgerError> {
        if self.rejecting_payouts.contains(&payout.recipient) {
            return Err(LedgerError::PayoutRejected(payout.recipient));
        }
        self.payouts.push(payout.clone());
        Ok(())
    }

    fn begin_settlement(&mut self) {
        self.mark = (self.pulls.len(), self.payouts.len());
    }

    fn abort_settlement(&mut self) {
        self.pulls.truncate(self.mark.0);
        self.payouts.truncate(self.mark.1);
    }
}
