//! lotswap: constant-product AMM engine for id-keyed lots against one
//! shared currency. Each id has its own pool; liquidity providers hold
//! per-id shares.
//!
//! Operations:
//!   buy_tokens            buy lots with currency (escrowed deposit or pull)
//!   sell_tokens           sell deposited lots for currency
//!   add_liquidity         pair lots with currency, mint shares
//!   remove_liquidity      burn shares, withdraw proportional reserves
//!   withdraw_royalties    pay out royalties accrued to a recipient
//!   transfer_shares       move liquidity shares between owners
//!
//! Deposits arrive through [`Exchange::on_batch_received`] with an encoded
//! [`Instruction`]; asset movements leave through an [`AssetLedger`].
pub mod config;
pub mod constants;
pub mod error;
pub mod exchange;
pub mod instructions;
pub mod ledger;
pub mod payload;
pub mod settlement;
pub mod state;
pub mod types;

pub use config::{ExchangeConfig, RoyaltyInfo};
pub use error::{ErrorKind, ExchangeError, Result};
pub use exchange::Exchange;
pub use instructions::{buy_price, sell_price, CallContext, Deposit, Funding};
pub use ledger::{AssetLedger, LedgerError, Payout, Pull, RecordingLedger};
pub use payload::{AddLiquidity, BuyTokens, Instruction, RemoveLiquidity, SellTokens};
pub use settlement::{Operation, Plan, RoyaltyCredit, Settlement, SettlementLine};
pub use state::{ExchangeState, Pool, StateDelta};
pub use types::{Address, AddressParseError, Amount, AssetClass, AssetId, Timestamp};
