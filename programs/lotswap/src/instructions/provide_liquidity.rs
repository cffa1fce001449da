use tracing::debug;

use crate::{
    config::ExchangeConfig,
    error::{ExchangeError, Result},
    ledger::Pull,
    settlement::{Operation, Plan, Settlement, SettlementLine},
    state::{ExchangeState, Pool, StateDelta},
    types::{Address, Amount, AssetId, Timestamp},
};

use super::batch::validate_batch;
use super::fee_math::{mul_div_ceil, mul_div_floor};
use super::guard::check_deadline;

/// Currency owed and shares minted for one id of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityQuote {
    pub currency_required: Amount,
    pub shares_minted: Amount,
}

// ─── Share math ────────────────────────────────────────────────────────────
/// First deposit: the provider's `max_currency` sets the price and shares
/// are minted 1:1 with it. Later deposits pay ceil and receive floor so
/// the existing providers are never diluted.
pub fn quote_deposit(pool: &Pool, tokens_in: Amount, max_currency: Amount) -> Result<LiquidityQuote> {
    if pool.total_shares == 0 {
        return Ok(LiquidityQuote { currency_required: max_currency, shares_minted: max_currency });
    }
    let currency_required = mul_div_ceil(tokens_in, pool.currency_reserve, pool.token_reserve)?;
    let shares_minted = mul_div_floor(tokens_in, pool.total_shares, pool.token_reserve)?;
    Ok(LiquidityQuote { currency_required, shares_minted })
}

// ─── Handler ──────────────────────────────────────────────────────────────
/// Add liquidity to each id's pool and credit the minted shares to
/// `provider`.
///
/// `tokens_escrowed` is set when the lots already arrived with the call;
/// otherwise they are pulled along with the currency.
#[allow(clippy::too_many_arguments)]
pub fn handler(
    state: &ExchangeState,
    config: &ExchangeConfig,
    provider: Address,
    ids: &[AssetId],
    tokens_in: &[Amount],
    max_currency: &[Amount],
    deadline: Timestamp,
    now: Timestamp,
    tokens_escrowed: bool,
) -> Result<Plan> {
    check_deadline(deadline, now)?;
    validate_batch(ids, &[tokens_in, max_currency])?;

    let mut settlement = Settlement::new(Operation::AddLiquidity, provider, provider);
    let mut pools = Vec::with_capacity(ids.len());
    let mut shares = Vec::with_capacity(ids.len());
    let mut total_currency: Amount = 0;

    for ((&id, &tokens), &max) in ids.iter().zip(tokens_in).zip(max_currency) {
        if tokens == 0 {
            return Err(ExchangeError::NullTokensAmount);
        }
        if max == 0 {
            return Err(ExchangeError::NullMaxCurrency);
        }

        let mut pool = state.pool(id);
        let quote = quote_deposit(&pool, tokens, max)?;
        if quote.currency_required > max {
            return Err(ExchangeError::MaxCurrencyAmountExceeded {
                id,
                required: quote.currency_required,
                max,
            });
        }
        if quote.shares_minted == 0 {
            return Err(ExchangeError::ZeroSharesMinted { id });
        }

        pool.token_reserve = pool.token_reserve.checked_add(tokens).ok_or(ExchangeError::MathOverflow)?;
        pool.currency_reserve = pool
            .currency_reserve
            .checked_add(quote.currency_required)
            .ok_or(ExchangeError::MathOverflow)?;
        pool.total_shares = pool
            .total_shares
            .checked_add(quote.shares_minted)
            .ok_or(ExchangeError::MathOverflow)?;

        let held = state
            .shares_of(&provider, id)
            .checked_add(quote.shares_minted)
            .ok_or(ExchangeError::MathOverflow)?;
        total_currency = total_currency
            .checked_add(quote.currency_required)
            .ok_or(ExchangeError::MathOverflow)?;

        debug!(
            id,
            tokens,
            currency = quote.currency_required,
            shares = quote.shares_minted,
            "Liquidity provided"
        );
        settlement.lines.push(SettlementLine {
            id,
            tokens,
            currency: quote.currency_required,
            shares: quote.shares_minted,
            ..SettlementLine::default()
        });
        pools.push((id, pool));
        shares.push((provider, id, held));
    }

    settlement.total_currency = total_currency;
    if !tokens_escrowed && !ids.is_empty() {
        settlement.pulls.push(Pull::lots(provider, ids.to_vec(), tokens_in.to_vec()));
    }
    if total_currency > 0 {
        settlement.pulls.push(Pull::currency(provider, config.currency_id, total_currency));
    }

    Ok(Plan {
        delta: StateDelta { pools, shares, ..StateDelta::default() },
        settlement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(id: AssetId, tokens: Amount, currency: Amount) -> (ExchangeState, Address) {
        let provider = Address::from_low_u64(1);
        let mut state = ExchangeState::default();
        let plan = handler(
            &state,
            &ExchangeConfig::default(),
            provider,
            &[id],
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
    fn bootstrap_mints_one_share_per_currency_unit() {
        let (state, provider) = seeded(0, 2, 1_000_000_001);
        let pool = state.pool(0);
        assert_eq!(pool.token_reserve, 2);
        assert_eq!(pool.currency_reserve, 1_000_000_001);
        assert_eq!(pool.total_shares, 1_000_000_001);
        assert_eq!(state.shares_of(&provider, 0), 1_000_000_001);
    }

    #[test]
    fn second_deposit_rounds_currency_up_and_shares_down() {
        let (state, _) = seeded(0, 2, 1_000_000_001);
        let other = Address::from_low_u64(2);
        let plan = handler(
            &state,
            &ExchangeConfig::default(),
            other,
            &[0],
            &[1],
            &[u128::MAX],
            10,
            0,
            true,
        )
        .unwrap();

        let line = plan.settlement.line(0).unwrap();
        assert_eq!(line.currency, 500_000_001);
        assert_eq!(line.shares, 500_000_000);
        assert_eq!(plan.delta.pools[0].1.currency_reserve, 1_500_000_002);
        assert_eq!(plan.delta.pools[0].1.total_shares, 1_500_000_001);
    }

    #[test]
    fn currency_above_max_is_rejected() {
        let (state, _) = seeded(0, 2, 1_000);
        let err = handler(&state, &ExchangeConfig::default(), Address::from_low_u64(2), &[0], &[1], &[499], 10, 0, true)
            .unwrap_err();
        assert_eq!(err, ExchangeError::MaxCurrencyAmountExceeded { id: 0, required: 500, max: 499 });
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let state = ExchangeState::default();
        let config = ExchangeConfig::default();
        let p = Address::from_low_u64(1);
        assert_eq!(
            handler(&state, &config, p, &[0], &[0], &[1], 10, 0, true).unwrap_err(),
            ExchangeError::NullTokensAmount
        );
        assert_eq!(
            handler(&state, &config, p, &[0], &[1], &[0], 10, 0, true).unwrap_err(),
            ExchangeError::NullMaxCurrency
        );
    }

    #[test]
    fn pulls_lots_only_when_not_escrowed() {
        let state = ExchangeState::default();
        let config = ExchangeConfig::default();
        let p = Address::from_low_u64(1);
        let escrowed = handler(&state, &config, p, &[3], &[5], &[50], 10, 0, true).unwrap();
        assert_eq!(escrowed.settlement.pulls, vec![Pull::currency(p, 0, 50)]);

        let pulled = handler(&state, &config, p, &[3], &[5], &[50], 10, 0, false).unwrap();
        assert_eq!(
            pulled.settlement.pulls,
            vec![Pull::lots(p, vec![3], vec![5]), Pull::currency(p, 0, 50)]
        );
    }
}
