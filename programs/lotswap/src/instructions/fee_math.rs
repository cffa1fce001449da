use primitive_types::U256;

use crate::{constants::FEE_DENOMINATOR, error::ExchangeError, error::Result, state::Pool, types::Amount};

/// Sale output for one id: what the pool pays, how it splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellAmounts {
    /// Constant-product output before royalty; leaves the currency reserve.
    pub pre_royalty: Amount,
    /// Credited to the royalty recipient.
    pub royalty: Amount,
    /// Paid to the seller: `pre_royalty - royalty`.
    pub proceeds: Amount,
}

/// Purchase cost for one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyAmounts {
    /// Constant-product input before royalty; enters the currency reserve.
    pub pre_royalty: Amount,
    /// Credited to the royalty recipient.
    pub royalty: Amount,
    /// Charged to the buyer: `pre_royalty + royalty`.
    pub cost: Amount,
}

/// Output of selling `amount_in` against `(reserve_in, reserve_out)`.
///
/// `out = floor(amount_in·fee · reserve_out / (reserve_in·1000 + amount_in·fee))`
///
/// Rounds DOWN: the seller never receives a fractional unit in its favour.
/// Intermediates are 256-bit; only a result that does not fit `Amount` overflows.
pub fn sell_price(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_multiplier: u128,
) -> Result<Amount> {
    let amount_with_fee = wide_mul(&[amount_in, fee_multiplier])?;
    let numerator = amount_with_fee
        .checked_mul(U256::from(reserve_out))
        .ok_or(ExchangeError::MathOverflow)?;
    let denominator = wide_mul(&[reserve_in, FEE_DENOMINATOR])?
        .checked_add(amount_with_fee)
        .ok_or(ExchangeError::MathOverflow)?;
    if denominator.is_zero() {
        return Err(ExchangeError::MathOverflow);
    }
    narrow(numerator / denominator)
}

/// Input required to buy `amount_out` out of `reserve_out`.
///
/// `in = ceil(amount_out · reserve_in · 1000 / ((reserve_out - amount_out) · fee))`
///
/// Rounds UP: the buyer never pays a fractional unit less than owed.
/// Buying the whole reserve (or more) is refused before the division.
pub fn buy_price(
    amount_out: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_multiplier: u128,
) -> Result<Amount> {
    if amount_out >= reserve_out {
        return Err(ExchangeError::PoolWouldBeExhausted { amount_out, reserve: reserve_out });
    }
    let numerator = wide_mul(&[reserve_in, amount_out, FEE_DENOMINATOR])?;
    let denominator = wide_mul(&[reserve_out - amount_out, fee_multiplier])?;
    narrow(div_ceil(numerator, denominator)?)
}

/// `floor(price · fee / 1000)`
pub fn royalty_amount(price: Amount, royalty_fee: u16) -> Result<Amount> {
    mul_div_floor(price, u128::from(royalty_fee), FEE_DENOMINATOR)
}

/// Sell `amount_in` lots into `pool`, then split off the royalty.
pub fn compute_sell(
    amount_in: Amount,
    pool: &Pool,
    fee_multiplier: u128,
    royalty_fee: u16,
) -> Result<SellAmounts> {
    let pre_royalty = sell_price(amount_in, pool.token_reserve, pool.currency_reserve, fee_multiplier)?;
    let royalty = royalty_amount(pre_royalty, royalty_fee)?;
    Ok(SellAmounts { pre_royalty, royalty, proceeds: pre_royalty - royalty })
}

/// Buy `amount_out` lots from `pool`, then add the royalty on top.
pub fn compute_buy(
    amount_out: Amount,
    pool: &Pool,
    fee_multiplier: u128,
    royalty_fee: u16,
) -> Result<BuyAmounts> {
    let pre_royalty = buy_price(amount_out, pool.currency_reserve, pool.token_reserve, fee_multiplier)?;
    let royalty = royalty_amount(pre_royalty, royalty_fee)?;
    let cost = pre_royalty.checked_add(royalty).ok_or(ExchangeError::MathOverflow)?;
    Ok(BuyAmounts { pre_royalty, royalty, cost })
}

/// `floor(a · b / d)`, exact for any `a · b` below 2^256.
pub fn mul_div_floor(a: Amount, b: Amount, d: Amount) -> Result<Amount> {
    if d == 0 {
        return Err(ExchangeError::MathOverflow);
    }
    narrow(U256::from(a) * U256::from(b) / U256::from(d))
}

/// `ceil(a · b / d)`
pub fn mul_div_ceil(a: Amount, b: Amount, d: Amount) -> Result<Amount> {
    narrow(div_ceil(U256::from(a) * U256::from(b), U256::from(d))?)
}

fn wide_mul(factors: &[u128]) -> Result<U256> {
    factors.iter().try_fold(U256::one(), |acc, &f| {
        acc.checked_mul(U256::from(f)).ok_or(ExchangeError::MathOverflow)
    })
}

fn div_ceil(n: U256, d: U256) -> Result<U256> {
    if d.is_zero() {
        return Err(ExchangeError::MathOverflow);
    }
    let q = n / d;
    Ok(if (n % d).is_zero() { q } else { q + U256::one() })
}

/// Back to `Amount`; fails only when the final value needs more than 128 bits.
fn narrow(v: U256) -> Result<Amount> {
    u128::try_from(v).map_err(|_| ExchangeError::MathOverflow)
}
