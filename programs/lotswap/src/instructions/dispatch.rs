use serde::{Deserialize, Serialize};

use crate::{
    config::ExchangeConfig,
    error::{ExchangeError, Result},
    payload::Instruction,
    settlement::Plan,
    state::ExchangeState,
    types::{Address, Amount, AssetClass, AssetId, Timestamp},
};

use super::{provide_liquidity, remove_liquidity, swap};

/// Who is calling, and when. Passed explicitly into every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

/// Assets delivered to the engine together with an instruction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub from: Address,
    pub asset: AssetClass,
    pub ids: Vec<AssetId>,
    pub amounts: Vec<Amount>,
}

impl Deposit {
    pub fn lots(from: Address, ids: Vec<AssetId>, amounts: Vec<Amount>) -> Self {
        Self { from, asset: AssetClass::Lots, ids, amounts }
    }

    pub fn currency(from: Address, currency_id: AssetId, amount: Amount) -> Self {
        Self { from, asset: AssetClass::Currency, ids: vec![currency_id], amounts: vec![amount] }
    }

    pub fn shares(from: Address, ids: Vec<AssetId>, amounts: Vec<Amount>) -> Self {
        Self { from, asset: AssetClass::Shares, ids, amounts }
    }
}

fn expect_asset(deposit: &Deposit, expected: AssetClass) -> Result<()> {
    if deposit.asset == expected {
        Ok(())
    } else {
        Err(ExchangeError::UnexpectedAsset { expected, found: deposit.asset })
    }
}

/// Route a decoded instruction to its handler.
///
/// The deposit must be of the asset class the instruction consumes; the
/// depositor is the party the call acts for.
pub fn dispatch(
    state: &ExchangeState,
    config: &ExchangeConfig,
    now: Timestamp,
    deposit: &Deposit,
    instruction: &Instruction,
) -> Result<Plan> {
    match instruction {
        Instruction::Sell(order) => {
            expect_asset(deposit, AssetClass::Lots)?;
            swap::sell(state, config, deposit.from, &deposit.ids, &deposit.amounts, order, now)
        }
        Instruction::Buy(order) => {
            expect_asset(deposit, AssetClass::Currency)?;
            let deposited = match (deposit.ids.as_slice(), deposit.amounts.as_slice()) {
                ([id], [amount]) if *id == config.currency_id => *amount,
                ([_], [_]) => {
                    return Err(ExchangeError::UnexpectedAsset {
                        expected: AssetClass::Currency,
                        found: AssetClass::Lots,
                    })
                }
                _ => return Err(ExchangeError::InvalidArrayLength),
            };
            swap::buy(state, config, deposit.from, order, swap::Funding::Escrow { deposited }, now)
        }
        Instruction::AddLiquidity(args) => {
            expect_asset(deposit, AssetClass::Lots)?;
            provide_liquidity::handler(
                state,
                config,
                deposit.from,
                &deposit.ids,
                &deposit.amounts,
                &args.max_currency,
                args.deadline,
                now,
                true,
            )
        }
        Instruction::RemoveLiquidity(args) => {
            expect_asset(deposit, AssetClass::Shares)?;
            remove_liquidity::handler(
                state,
                config,
                deposit.from,
                &deposit.ids,
                &deposit.amounts,
                &args.min_currency,
                &args.min_tokens,
                args.deadline,
                now,
            )
        }
    }
}
