//! The engine instance: configuration, pool state and the ledger it settles
//! through.
//!
//! Every state-changing call runs in three steps:
//!   1. a handler plans the call against the current state (pure),
//!   2. the planned writes are applied,
//!   3. the planned asset movements are handed to the ledger.
//! If step 3 fails, step 2 is reverted and the error is returned, so a call
//! either fully happens or leaves no trace.

use tracing::{info, warn};

use crate::{
    config::{ExchangeConfig, RoyaltyInfo},
    error::{ExchangeError, Result},
    instructions::{
        batch::ensure_same_len,
        dispatch,
        fee_math::{self, compute_buy, compute_sell},
        provide_liquidity, remove_liquidity, royalties, swap, transfer_shares, CallContext, Deposit,
        Funding,
    },
    ledger::{AssetLedger, LedgerError},
    payload::{BuyTokens, Instruction},
    settlement::{Plan, Settlement},
    state::{ExchangeState, Pool},
    types::{Address, Amount, AssetId, Timestamp},
};

#[derive(Debug)]
pub struct Exchange<L> {
    config: ExchangeConfig,
    state: ExchangeState,
    ledger: L,
}

impl<L: AssetLedger> Exchange<L> {
    pub fn new(config: ExchangeConfig, ledger: L) -> Result<Self> {
        Self::with_state(config, ExchangeState::default(), ledger)
    }

    /// Resume from a saved state snapshot.
    pub fn with_state(config: ExchangeConfig, state: ExchangeState, ledger: L) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, state, ledger })
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn into_parts(self) -> (ExchangeConfig, ExchangeState, L) {
        (self.config, self.state, self.ledger)
    }

    // ─── Inbound deposits ──────────────────────────────────────────────────

    /// Entry point for a batched deposit carrying an encoded instruction.
    pub fn on_batch_received(
        &mut self,
        ctx: &CallContext,
        deposit: &Deposit,
        payload: &[u8],
    ) -> Result<Settlement> {
        let instruction = Instruction::decode(payload)?;
        self.execute(ctx, deposit, &instruction)
    }

    /// Execute an already-decoded instruction against `deposit`.
    pub fn execute(
        &mut self,
        ctx: &CallContext,
        deposit: &Deposit,
        instruction: &Instruction,
    ) -> Result<Settlement> {
        let plan = dispatch(&self.state, &self.config, ctx.now, deposit, instruction)?;
        self.commit(plan)
    }

    // ─── Direct calls ──────────────────────────────────────────────────────

    /// Buy lots, pulling exactly the cost from the caller.
    #[allow(clippy::too_many_arguments)]
    pub fn buy_tokens(
        &mut self,
        ctx: &CallContext,
        ids: &[AssetId],
        amounts: &[Amount],
        max_currency: Amount,
        deadline: Timestamp,
        recipient: Address,
    ) -> Result<Settlement> {
        let order = BuyTokens {
            recipient,
            ids: ids.to_vec(),
            amounts: amounts.to_vec(),
            max_currency,
            deadline,
        };
        let plan = swap::buy(&self.state, &self.config, ctx.caller, &order, Funding::Pull, ctx.now)?;
        self.commit(plan)
    }

    /// Add liquidity, pulling both the lots and the required currency.
    pub fn add_liquidity(
        &mut self,
        ctx: &CallContext,
        ids: &[AssetId],
        tokens: &[Amount],
        max_currency: &[Amount],
        deadline: Timestamp,
    ) -> Result<Settlement> {
        let plan = provide_liquidity::handler(
            &self.state,
            &self.config,
            ctx.caller,
            ids,
            tokens,
            max_currency,
            deadline,
            ctx.now,
            false,
        )?;
        self.commit(plan)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity(
        &mut self,
        ctx: &CallContext,
        ids: &[AssetId],
        shares: &[Amount],
        min_currency: &[Amount],
        min_tokens: &[Amount],
        deadline: Timestamp,
    ) -> Result<Settlement> {
        let plan = remove_liquidity::handler(
            &self.state,
            &self.config,
            ctx.caller,
            ids,
            shares,
            min_currency,
            min_tokens,
            deadline,
            ctx.now,
        )?;
        self.commit(plan)
    }

    /// Pay out everything accrued to `recipient`. Callable by anyone.
    pub fn withdraw_royalties(&mut self, ctx: &CallContext, recipient: Address) -> Result<Settlement> {
        let plan = royalties::withdraw(&self.state, &self.config, ctx.caller, recipient)?;
        self.commit(plan)
    }

    pub fn transfer_shares(
        &mut self,
        ctx: &CallContext,
        to: Address,
        ids: &[AssetId],
        amounts: &[Amount],
    ) -> Result<Settlement> {
        let plan = transfer_shares::handler(&self.state, ctx.caller, to, ids, amounts)?;
        self.commit(plan)
    }

    /// Replace the royalty applied to ids without an override.
    pub fn set_royalty_info(&mut self, fee: u16, recipient: Address) -> Result<()> {
        let mut config = self.config.clone();
        config.royalty = Some(RoyaltyInfo { fee, recipient });
        config.validate()?;
        self.config = config;
        info!(fee, %recipient, "Royalty info updated");
        Ok(())
    }

    // ─── Commit ────────────────────────────────────────────────────────────

    fn commit(&mut self, plan: Plan) -> Result<Settlement> {
        let Plan { delta, settlement } = plan;
        let journal = self.state.apply(delta);

        self.ledger.begin_settlement();
        if let Err(e) = settle(&mut self.ledger, &settlement) {
            self.state.revert(journal);
            self.ledger.abort_settlement();
            warn!(
                operation = ?settlement.operation,
                party = %settlement.party,
                error = %e,
                "Settlement failed, state rolled back"
            );
            return Err(ExchangeError::Ledger(e));
        }

        info!(
            operation = ?settlement.operation,
            party = %settlement.party,
            recipient = %settlement.recipient,
            ids = settlement.lines.len(),
            currency = settlement.total_currency,
            "Batch settled"
        );
        Ok(settlement)
    }

    // ─── Getters ───────────────────────────────────────────────────────────

    pub fn token_address(&self) -> Address {
        self.config.token
    }

    /// Currency identity and its id within a multi-asset ledger.
    pub fn currency_info(&self) -> (Address, AssetId) {
        (self.config.currency, self.config.currency_id)
    }

    pub fn lp_fee(&self) -> u16 {
        self.config.lp_fee
    }

    pub fn fee_multiplier(&self) -> u128 {
        self.config.fee_multiplier()
    }

    /// Royalty charged on trades of `id`, if any.
    pub fn royalty_info(&self, id: AssetId) -> Option<RoyaltyInfo> {
        self.config.royalty_for(id)
    }

    pub fn global_royalty_fee(&self) -> u16 {
        self.config.royalty.map_or(0, |r| r.fee)
    }

    pub fn global_royalty_recipient(&self) -> Address {
        self.config.royalty.map_or(Address::ZERO, |r| r.recipient)
    }

    // ─── Queries ───────────────────────────────────────────────────────────

    pub fn balance_of(&self, owner: &Address, id: AssetId) -> Amount {
        self.state.shares_of(owner, id)
    }

    pub fn balance_of_batch(&self, owners: &[Address], ids: &[AssetId]) -> Result<Vec<Amount>> {
        ensure_same_len(owners, ids)?;
        Ok(owners.iter().zip(ids).map(|(o, &id)| self.state.shares_of(o, id)).collect())
    }

    pub fn pool(&self, id: AssetId) -> Pool {
        self.state.pool(id)
    }

    pub fn token_reserves(&self, ids: &[AssetId]) -> Vec<Amount> {
        ids.iter().map(|&id| self.state.pool(id).token_reserve).collect()
    }

    pub fn currency_reserves(&self, ids: &[AssetId]) -> Vec<Amount> {
        ids.iter().map(|&id| self.state.pool(id).currency_reserve).collect()
    }

    pub fn total_supplies(&self, ids: &[AssetId]) -> Vec<Amount> {
        ids.iter().map(|&id| self.state.pool(id).total_shares).collect()
    }

    pub fn royalties(&self, recipient: &Address) -> Amount {
        self.state.royalties_of(recipient)
    }

    /// Currency needed to buy `amounts[i]` of each `ids[i]`, royalty included.
    pub fn price_currency_to_token(&self, ids: &[AssetId], amounts: &[Amount]) -> Result<Vec<Amount>> {
        ensure_same_len(ids, amounts)?;
        ids.iter()
            .zip(amounts)
            .map(|(&id, &amount)| {
                let pool = self.live_pool(id)?;
                compute_buy(amount, &pool, self.fee_multiplier(), self.royalty_fee(id)).map(|q| q.cost)
            })
            .collect()
    }

    /// Currency received for selling `amounts[i]` of each `ids[i]`, net of
    /// royalty.
    pub fn price_token_to_currency(&self, ids: &[AssetId], amounts: &[Amount]) -> Result<Vec<Amount>> {
        ensure_same_len(ids, amounts)?;
        ids.iter()
            .zip(amounts)
            .map(|(&id, &amount)| {
                let pool = self.live_pool(id)?;
                compute_sell(amount, &pool, self.fee_multiplier(), self.royalty_fee(id)).map(|q| q.proceeds)
            })
            .collect()
    }

    /// [`fee_math::buy_price`] at this instance's fee.
    pub fn buy_price(&self, amount_out: Amount, reserve_in: Amount, reserve_out: Amount) -> Result<Amount> {
        fee_math::buy_price(amount_out, reserve_in, reserve_out, self.fee_multiplier())
    }

    /// [`fee_math::sell_price`] at this instance's fee.
    pub fn sell_price(&self, amount_in: Amount, reserve_in: Amount, reserve_out: Amount) -> Result<Amount> {
        fee_math::sell_price(amount_in, reserve_in, reserve_out, self.fee_multiplier())
    }

    fn live_pool(&self, id: AssetId) -> Result<Pool> {
        let pool = self.state.pool(id);
        if pool.is_initialized() {
            Ok(pool)
        } else {
            Err(ExchangeError::EmptyReserve { id })
        }
    }

    fn royalty_fee(&self, id: AssetId) -> u16 {
        self.config.royalty_for(id).map_or(0, |r| r.fee)
    }
}

// Pulls first so nothing leaves before everything owed has arrived.
fn settle<L: AssetLedger>(ledger: &mut L, settlement: &Settlement) -> std::result::Result<(), LedgerError> {
    for pull in &settlement.pulls {
        ledger.pull(pull)?;
    }
    for payout in &settlement.payouts {
        ledger.pay(payout)?;
    }
    Ok(())
}
