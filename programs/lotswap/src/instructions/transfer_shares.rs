use crate::{
    error::{ExchangeError, Result},
    settlement::{Operation, Plan, Settlement, SettlementLine},
    state::{ExchangeState, StateDelta},
    types::{Address, Amount, AssetId},
};

use super::batch::validate_batch;

/// Move liquidity shares from `from` to `to`, all ids or none.
pub fn handler(
    state: &ExchangeState,
    from: Address,
    to: Address,
    ids: &[AssetId],
    amounts: &[Amount],
) -> Result<Plan> {
    if to.is_zero() {
        return Err(ExchangeError::InvalidRecipient);
    }
    validate_batch(ids, &[amounts])?;

    let mut settlement = Settlement::new(Operation::TransferShares, from, to);
    let mut shares = Vec::new();

    for (&id, &amount) in ids.iter().zip(amounts) {
        let held = state.shares_of(&from, id);
        if held < amount {
            return Err(ExchangeError::InsufficientShares { id, held, requested: amount });
        }
        settlement.lines.push(SettlementLine { id, shares: amount, ..SettlementLine::default() });

        if from == to || amount == 0 {
            continue;
        }
        let received = state
            .shares_of(&to, id)
            .checked_add(amount)
            .ok_or(ExchangeError::MathOverflow)?;
        shares.push((from, id, held - amount));
        shares.push((to, id, received));
    }

    Ok(Plan {
        delta: StateDelta { shares, ..StateDelta::default() },
        settlement,
    })
}
