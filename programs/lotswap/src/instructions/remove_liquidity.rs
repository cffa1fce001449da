use tracing::debug;

use crate::{
    config::ExchangeConfig,
    error::{ExchangeError, Result},
    ledger::Payout,
    settlement::{Operation, Plan, Settlement, SettlementLine},
    state::{ExchangeState, Pool, StateDelta},
    types::{Address, Amount, AssetId, Timestamp},
};

use super::batch::validate_batch;
use super::fee_math::mul_div_floor;
use super::guard::check_deadline;

/// What burning `shares` of `pool` pays out: `(currency, tokens)`, both
/// rounded down.
pub fn quote_withdrawal(pool: &Pool, shares: Amount) -> Result<(Amount, Amount)> {
    let currency = mul_div_floor(shares, pool.currency_reserve, pool.total_shares)?;
    let tokens = mul_div_floor(shares, pool.token_reserve, pool.total_shares)?;
    Ok((currency, tokens))
}

/// Burn liquidity shares and withdraw the proportional reserves.
#[allow(clippy::too_many_arguments)]
pub fn handler(
    state: &ExchangeState,
    config: &ExchangeConfig,
    provider: Address,
    ids: &[AssetId],
    shares_in: &[Amount],
    min_currency: &[Amount],
    min_tokens: &[Amount],
    deadline: Timestamp,
    now: Timestamp,
) -> Result<Plan> {
    check_deadline(deadline, now)?;
    validate_batch(ids, &[shares_in, min_currency, min_tokens])?;

    let mut settlement = Settlement::new(Operation::RemoveLiquidity, provider, provider);
    let mut pools = Vec::with_capacity(ids.len());
    let mut positions = Vec::with_capacity(ids.len());
    let mut tokens_out = Vec::with_capacity(ids.len());
    let mut total_currency: Amount = 0;

    for (i, &id) in ids.iter().enumerate() {
        let shares = shares_in[i];
        if shares == 0 {
            return Err(ExchangeError::NullSharesAmount);
        }
        let mut pool = state.pool(id);
        if pool.total_shares == 0 {
            return Err(ExchangeError::NullTotalLiquidity { id });
        }
        let held = state.shares_of(&provider, id);
        if held < shares {
            return Err(ExchangeError::InsufficientShares { id, held, requested: shares });
        }

        let (currency, tokens) = quote_withdrawal(&pool, shares)?;
        if currency < min_currency[i] {
            return Err(ExchangeError::InsufficientCurrencyAmount { amount: currency, min: min_currency[i] });
        }
        if tokens < min_tokens[i] {
            return Err(ExchangeError::InsufficientTokens { id, amount: tokens, min: min_tokens[i] });
        }

        // Outputs are floor(shares/total · reserve) with shares <= total,
        // so none of these can underflow.
        pool.currency_reserve -= currency;
        pool.token_reserve -= tokens;
        pool.total_shares -= shares;
        total_currency = total_currency.checked_add(currency).ok_or(ExchangeError::MathOverflow)?;

        debug!(id, shares, currency, tokens, "Liquidity removed");
        settlement.lines.push(SettlementLine {
            id,
            tokens,
            currency,
            shares,
            ..SettlementLine::default()
        });
        pools.push((id, pool));
        positions.push((provider, id, held - shares));
        tokens_out.push(tokens);
    }

    settlement.total_currency = total_currency;
    if !ids.is_empty() {
        settlement.payouts.push(Payout::lots(provider, ids.to_vec(), tokens_out));
    }
    if total_currency > 0 {
        settlement.payouts.push(Payout::currency(provider, config.currency_id, total_currency));
    }

    Ok(Plan {
        delta: StateDelta { pools, shares: positions, ..StateDelta::default() },
        settlement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::provide_liquidity;

    fn provided(tokens: Amount, currency: Amount) -> (ExchangeState, Address) {
        let provider = Address::from_low_u64(1);
        let mut state = ExchangeState::default();
        let plan = provide_liquidity::handler(
            &state,
            &ExchangeConfig::default(),
            provider,
            &[7],
            &[tokens],
            &[currency],
            10,
            0,
            true,
        )
        .unwrap();
        state.apply(plan.delta);
        (state, provider)
    }

    #[test]
    fn full_withdrawal_empties_the_pool() {
        let (state, provider) = provided(10, 1_000);
        let plan = handler(&state, &ExchangeConfig::default(), provider, &[7], &[1_000], &[0], &[0], 10, 0).unwrap();

        assert_eq!(plan.delta.pools, vec![(7, Pool::default())]);
        assert_eq!(plan.delta.shares, vec![(provider, 7, 0)]);
        assert_eq!(
            plan.settlement.payouts,
            vec![Payout::lots(provider, vec![7], vec![10]), Payout::currency(provider, 0, 1_000)]
        );
    }

    #[test]
    fn partial_withdrawal_rounds_down() {
        let (state, provider) = provided(3, 1_000);
        let plan = handler(&state, &ExchangeConfig::default(), provider, &[7], &[500], &[0], &[0], 10, 0).unwrap();
        let line = plan.settlement.line(7).unwrap();
        assert_eq!((line.currency, line.tokens), (500, 1));
    }

    #[test]
    fn guards_fire_in_order() {
        let (state, provider) = provided(10, 1_000);
        let config = ExchangeConfig::default();

        assert_eq!(
            handler(&state, &config, provider, &[7], &[0], &[0], &[0], 10, 0).unwrap_err(),
            ExchangeError::NullSharesAmount
        );
        assert_eq!(
            handler(&state, &config, provider, &[8], &[1], &[0], &[0], 10, 0).unwrap_err(),
            ExchangeError::NullTotalLiquidity { id: 8 }
        );
        assert_eq!(
            handler(&state, &config, provider, &[7], &[1_001], &[0], &[0], 10, 0).unwrap_err(),
            ExchangeError::InsufficientShares { id: 7, held: 1_000, requested: 1_001 }
        );
        assert_eq!(
            handler(&state, &config, provider, &[7], &[100], &[101], &[0], 10, 0).unwrap_err(),
            ExchangeError::InsufficientCurrencyAmount { amount: 100, min: 101 }
        );
        assert_eq!(
            handler(&state, &config, provider, &[7], &[100], &[0], &[2], 10, 0).unwrap_err(),
            ExchangeError::InsufficientTokens { id: 7, amount: 1, min: 2 }
        );
    }
}
