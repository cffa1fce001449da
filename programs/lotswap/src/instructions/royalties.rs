use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    config::ExchangeConfig,
    error::{ExchangeError, Result},
    ledger::Payout,
    settlement::{Operation, Plan, RoyaltyCredit, Settlement},
    state::{ExchangeState, StateDelta},
    types::{Address, Amount},
};

// ─── Accrual ───────────────────────────────────────────────────────────────
// Credits gathered across a batch. Several ids may pay the same recipient;
// they collapse into one write per recipient.
#[derive(Debug, Default)]
pub struct RoyaltyCredits {
    owed: BTreeMap<Address, Amount>,
}

impl RoyaltyCredits {
    pub fn credit(&mut self, recipient: Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.owed.entry(recipient).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(ExchangeError::MathOverflow)?;
        Ok(())
    }

    /// New accrued balances on top of `state`, plus the per-recipient credits.
    pub fn finish(self, state: &ExchangeState) -> Result<(Vec<(Address, Amount)>, Vec<RoyaltyCredit>)> {
        let mut writes = Vec::with_capacity(self.owed.len());
        let mut credits = Vec::with_capacity(self.owed.len());
        for (recipient, amount) in self.owed {
            let accrued = state
                .royalties_of(&recipient)
                .checked_add(amount)
                .ok_or(ExchangeError::MathOverflow)?;
            writes.push((recipient, accrued));
            credits.push(RoyaltyCredit { recipient, amount });
        }
        Ok((writes, credits))
    }
}

// ─── Handler ───────────────────────────────────────────────────────────────
/// Send everything accrued for `recipient` to `recipient` and zero it.
/// Anyone may trigger this; with nothing accrued it is a no-op.
pub fn withdraw(
    state: &ExchangeState,
    config: &ExchangeConfig,
    caller: Address,
    recipient: Address,
) -> Result<Plan> {
    let accrued = state.royalties_of(&recipient);
    let mut settlement = Settlement::new(Operation::WithdrawRoyalties, caller, recipient);

    if accrued == 0 {
        debug!(%recipient, "No royalties to withdraw");
        return Ok(Plan { delta: StateDelta::default(), settlement });
    }

    settlement.total_currency = accrued;
    settlement.payouts.push(Payout::currency(recipient, config.currency_id, accrued));

    debug!(%recipient, amount = accrued, "Royalties withdrawal planned");
    Ok(Plan {
        delta: StateDelta { royalties: vec![(recipient, 0)], ..StateDelta::default() },
        settlement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_for_one_recipient_collapse() {
        let a = Address::from_low_u64(1);
        let b = Address::from_low_u64(2);
        let mut credits = RoyaltyCredits::default();
        credits.credit(a, 3).unwrap();
        credits.credit(b, 0).unwrap();
        credits.credit(a, 4).unwrap();

        let (writes, per_recipient) = credits.finish(&ExchangeState::default()).unwrap();
        assert_eq!(writes, vec![(a, 7)]);
        assert_eq!(per_recipient, vec![RoyaltyCredit { recipient: a, amount: 7 }]);
    }

    #[test]
    fn withdrawing_nothing_is_a_no_op() {
        let r = Address::from_low_u64(9);
        let plan = withdraw(&ExchangeState::default(), &ExchangeConfig::default(), r, r).unwrap();
        assert!(plan.delta.is_empty());
        assert!(plan.settlement.payouts.is_empty());
    }
}
