//! Engine error type.

use crate::ledger::LedgerError;
use crate::types::{Amount, AssetClass, AssetId, Timestamp};

/// Every way a call can fail. Any error aborts the whole batch; nothing is
/// partially applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Parallel arrays must have the same length")]
    InvalidArrayLength,

    #[error("Ids must be strictly increasing (unsorted or duplicate id)")]
    UnsortedOrDuplicateIds,

    #[error("Deadline {deadline} exceeded (now {now})")]
    DeadlineExceeded { deadline: Timestamp, now: Timestamp },

    #[error("Token amount sold must be greater than zero")]
    NullTokensSold,

    #[error("Token amount bought must be greater than zero")]
    NullTokensBought,

    #[error("Token amount deposited must be greater than zero")]
    NullTokensAmount,

    #[error("Max currency must be greater than zero")]
    NullMaxCurrency,

    #[error("Share amount must be greater than zero")]
    NullSharesAmount,

    #[error("Recipient must not be the zero address")]
    InvalidRecipient,

    // ── Economic ─────────────────────────────────────────────────────────────
    #[error("Currency amount {amount} below minimum {min}")]
    InsufficientCurrencyAmount { amount: Amount, min: Amount },

    #[error("Token amount {amount} for id {id} below minimum {min}")]
    InsufficientTokens { id: AssetId, amount: Amount, min: Amount },

    #[error("Total cost {cost} exceeds max currency {max}")]
    MaxCurrencyExceeded { cost: Amount, max: Amount },

    #[error("Currency required {required} for id {id} exceeds max currency {max}")]
    MaxCurrencyAmountExceeded { id: AssetId, required: Amount, max: Amount },

    #[error("Buying {amount_out} would exhaust a reserve of {reserve}")]
    PoolWouldBeExhausted { amount_out: Amount, reserve: Amount },

    #[error("Extra fees {fees} exceed sale proceeds {proceeds}")]
    ExtraFeesExceedProceeds { fees: Amount, proceeds: Amount },

    #[error("Deposit for id {id} is too small to mint any shares")]
    ZeroSharesMinted { id: AssetId },

    // ── State ────────────────────────────────────────────────────────────────
    #[error("Pool {id} has no liquidity to remove")]
    NullTotalLiquidity { id: AssetId },

    #[error("Pool {id} has no liquidity, seed it with add_liquidity first")]
    EmptyReserve { id: AssetId },

    #[error("Holder has {held} shares of id {id}; {requested} requested")]
    InsufficientShares { id: AssetId, held: Amount, requested: Amount },

    // ── Configuration ────────────────────────────────────────────────────────
    #[error("LP fee must be below 1000 per mille (got {0})")]
    InvalidFeeRate(u16),

    #[error("Royalty fee must be at most 1000 per mille (got {0})")]
    InvalidRoyaltyFee(u16),

    // ── Arithmetic ───────────────────────────────────────────────────────────
    #[error("Integer overflow in pricing / liquidity math")]
    MathOverflow,

    // ── Payload ──────────────────────────────────────────────────────────────
    #[error("Unknown instruction selector 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),

    #[error("Malformed instruction payload: {0}")]
    MalformedPayload(String),

    #[error("Instruction expects a {expected} deposit, got {found}")]
    UnexpectedAsset { expected: AssetClass, found: AssetClass },

    // ── Ledger ───────────────────────────────────────────────────────────────
    #[error("Asset ledger rejected the settlement: {0}")]
    Ledger(#[from] LedgerError),
}

/// Coarse error classes: what the caller can do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed batch or expired call; fix the request.
    Validation,
    /// Slippage bound or reserve limit hit; re-quote and retry.
    Economic,
    /// The targeted pool or position is not in a usable state.
    State,
    Configuration,
    Arithmetic,
    Payload,
    Ledger,
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        use ExchangeError::*;
        match self {
            InvalidArrayLength
            | UnsortedOrDuplicateIds
            | DeadlineExceeded { .. }
            | NullTokensSold
            | NullTokensBought
            | NullTokensAmount
            | NullMaxCurrency
            | NullSharesAmount
            | InvalidRecipient => ErrorKind::Validation,
            InsufficientCurrencyAmount { .. }
            | InsufficientTokens { .. }
            | MaxCurrencyExceeded { .. }
            | MaxCurrencyAmountExceeded { .. }
            | PoolWouldBeExhausted { .. }
            | ExtraFeesExceedProceeds { .. }
            | ZeroSharesMinted { .. } => ErrorKind::Economic,
            NullTotalLiquidity { .. } | EmptyReserve { .. } | InsufficientShares { .. } => {
                ErrorKind::State
            }
            InvalidFeeRate(_) | InvalidRoyaltyFee(_) => ErrorKind::Configuration,
            MathOverflow => ErrorKind::Arithmetic,
            UnknownSelector(_) | MalformedPayload(_) | UnexpectedAsset { .. } => ErrorKind::Payload,
            Ledger(_) => ErrorKind::Ledger,
        }
    }
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, ExchangeError>;
