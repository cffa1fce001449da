use tracing::debug;

use crate::{
    config::ExchangeConfig,
    error::{ExchangeError, Result},
    ledger::{Payout, Pull},
    payload::{BuyTokens, SellTokens},
    settlement::{Operation, Plan, Settlement, SettlementLine},
    state::{ExchangeState, StateDelta},
    types::{Address, Amount, AssetId, Timestamp},
};

use super::batch::{ensure_same_len, validate_batch};
use super::fee_math::{compute_buy, compute_sell};
use super::guard::{check_deadline, resolve_recipient};
use super::royalties::RoyaltyCredits;

/// How a buyer's currency reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Funding {
    /// Currency was deposited up front; the unspent part is refunded.
    Escrow { deposited: Amount },
    /// Exactly the cost is pulled from the buyer after pricing.
    Pull,
}

// ─── Sell ──────────────────────────────────────────────────────────────────
/// Sell lots the seller already delivered, for currency.
///
/// Ids are priced one after another against their own pre-call reserves.
/// Per id:
///   1. pre_royalty = sell_price(amount, token_reserve, currency_reserve)
///   2. royalty     = pre_royalty · royalty_fee / 1000  → accrued to recipient
///   3. proceeds    = pre_royalty − royalty             → seller
/// Extra fees then come out of the summed proceeds before the minimum check.
pub fn sell(
    state: &ExchangeState,
    config: &ExchangeConfig,
    seller: Address,
    ids: &[AssetId],
    amounts_in: &[Amount],
    order: &SellTokens,
    now: Timestamp,
) -> Result<Plan> {
    check_deadline(order.deadline, now)?;
    validate_batch(ids, &[amounts_in])?;
    ensure_same_len(&order.extra_fee_recipients, &order.extra_fee_amounts)?;

    let recipient = resolve_recipient(order.recipient, seller);
    let fee_multiplier = config.fee_multiplier();

    let mut settlement = Settlement::new(Operation::Sell, seller, recipient);
    let mut pools = Vec::with_capacity(ids.len());
    let mut credits = RoyaltyCredits::default();
    let mut total_proceeds: Amount = 0;

    for (&id, &amount_in) in ids.iter().zip(amounts_in) {
        if amount_in == 0 {
            return Err(ExchangeError::NullTokensSold);
        }
        let mut pool = state.pool(id);
        if !pool.is_initialized() {
            return Err(ExchangeError::EmptyReserve { id });
        }

        let royalty = config.royalty_for(id);
        let amounts = compute_sell(amount_in, &pool, fee_multiplier, royalty.map_or(0, |r| r.fee))?;

        pool.token_reserve = pool
            .token_reserve
            .checked_add(amount_in)
            .ok_or(ExchangeError::MathOverflow)?;
        pool.currency_reserve = pool
            .currency_reserve
            .checked_sub(amounts.pre_royalty)
            .ok_or(ExchangeError::MathOverflow)?;
        if let Some(info) = royalty {
            credits.credit(info.recipient, amounts.royalty)?;
        }
        total_proceeds = total_proceeds
            .checked_add(amounts.proceeds)
            .ok_or(ExchangeError::MathOverflow)?;

        debug!(id, amount_in, proceeds = amounts.proceeds, royalty = amounts.royalty, "Sell");
        settlement.lines.push(SettlementLine {
            id,
            tokens: amount_in,
            currency: amounts.proceeds,
            royalty: amounts.royalty,
            ..SettlementLine::default()
        });
        pools.push((id, pool));
    }

    let mut extra_fees: Amount = 0;
    for (fee_recipient, &fee) in order.extra_fee_recipients.iter().zip(&order.extra_fee_amounts) {
        if fee > 0 && fee_recipient.is_zero() {
            return Err(ExchangeError::InvalidRecipient);
        }
        extra_fees = extra_fees.checked_add(fee).ok_or(ExchangeError::MathOverflow)?;
    }
    let net = total_proceeds
        .checked_sub(extra_fees)
        .ok_or(ExchangeError::ExtraFeesExceedProceeds { fees: extra_fees, proceeds: total_proceeds })?;

    if net < order.min_currency {
        return Err(ExchangeError::InsufficientCurrencyAmount { amount: net, min: order.min_currency });
    }

    let (royalties, credited) = credits.finish(state)?;
    settlement.total_currency = net;
    settlement.royalties = credited;
    if net > 0 {
        settlement.payouts.push(Payout::currency(recipient, config.currency_id, net));
    }
    for (fee_recipient, &fee) in order.extra_fee_recipients.iter().zip(&order.extra_fee_amounts) {
        if fee > 0 {
            settlement.payouts.push(Payout::currency(*fee_recipient, config.currency_id, fee));
        }
    }

    Ok(Plan {
        delta: StateDelta { pools, royalties, ..StateDelta::default() },
        settlement,
    })
}

// ─── Buy ───────────────────────────────────────────────────────────────────
/// Buy lots for currency.
///
/// Per id:
///   1. pre_royalty = buy_price(amount, currency_reserve, token_reserve)
///   2. royalty     = pre_royalty · royalty_fee / 1000  → accrued to recipient
///   3. cost        = pre_royalty + royalty             ← buyer
/// The summed cost must not exceed the buyer's maximum (capped by the
/// deposit when funded by escrow).
pub fn buy(
    state: &ExchangeState,
    config: &ExchangeConfig,
    buyer: Address,
    order: &BuyTokens,
    funding: Funding,
    now: Timestamp,
) -> Result<Plan> {
    check_deadline(order.deadline, now)?;
    validate_batch(&order.ids, &[order.amounts.as_slice()])?;

    let recipient = resolve_recipient(order.recipient, buyer);
    let fee_multiplier = config.fee_multiplier();

    let mut settlement = Settlement::new(Operation::Buy, buyer, recipient);
    let mut pools = Vec::with_capacity(order.ids.len());
    let mut credits = RoyaltyCredits::default();
    let mut total_cost: Amount = 0;

    for (&id, &amount_out) in order.ids.iter().zip(&order.amounts) {
        if amount_out == 0 {
            return Err(ExchangeError::NullTokensBought);
        }
        let mut pool = state.pool(id);
        if !pool.is_initialized() {
            return Err(ExchangeError::EmptyReserve { id });
        }

        let royalty = config.royalty_for(id);
        let amounts = compute_buy(amount_out, &pool, fee_multiplier, royalty.map_or(0, |r| r.fee))?;

        // amount_out < token_reserve, checked by buy_price
        pool.token_reserve -= amount_out;
        pool.currency_reserve = pool
            .currency_reserve
            .checked_add(amounts.pre_royalty)
            .ok_or(ExchangeError::MathOverflow)?;
        if let Some(info) = royalty {
            credits.credit(info.recipient, amounts.royalty)?;
        }
        total_cost = total_cost.checked_add(amounts.cost).ok_or(ExchangeError::MathOverflow)?;

        debug!(id, amount_out, cost = amounts.cost, royalty = amounts.royalty, "Buy");
        settlement.lines.push(SettlementLine {
            id,
            tokens: amount_out,
            currency: amounts.cost,
            royalty: amounts.royalty,
            ..SettlementLine::default()
        });
        pools.push((id, pool));
    }

    let max = match funding {
        Funding::Escrow { deposited } => deposited.min(order.max_currency),
        Funding::Pull => order.max_currency,
    };
    if total_cost > max {
        return Err(ExchangeError::MaxCurrencyExceeded { cost: total_cost, max });
    }

    let (royalties, credited) = credits.finish(state)?;
    settlement.total_currency = total_cost;
    settlement.royalties = credited;

    match funding {
        Funding::Pull if total_cost > 0 => {
            settlement.pulls.push(Pull::currency(buyer, config.currency_id, total_cost));
        }
        _ => {}
    }
    if !order.ids.is_empty() {
        settlement
            .payouts
            .push(Payout::lots(recipient, order.ids.clone(), order.amounts.clone()));
    }
    if let Funding::Escrow { deposited } = funding {
        let refund = deposited - total_cost;
        if refund > 0 {
            settlement.payouts.push(Payout::currency(recipient, config.currency_id, refund));
        }
    }

    Ok(Plan {
        delta: StateDelta { pools, royalties, ..StateDelta::default() },
        settlement,
    })
}
