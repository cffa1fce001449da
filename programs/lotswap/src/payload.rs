//! Instruction codec.
//!
//! A payload is a 4-byte selector followed by the bincode body of the
//! instruction's arguments:
//!
//! ```text
//! selector = sha256("lotswap:{name}")[..4]
//! payload  = selector || bincode(args)      (fixed-width integers)
//! ```
//!
//! Names: `buy_tokens`, `sell_tokens`, `add_liquidity`, `remove_liquidity`.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    constants::{MAX_PAYLOAD_LEN, SELECTOR_LEN, SELECTOR_NAMESPACE},
    error::{ExchangeError, Result},
    types::{Address, Amount, AssetId, Timestamp},
};

// ─── Instruction arguments ─────────────────────────────────────────────────

/// Buy `amounts[i]` of each `ids[i]`. With an escrow deposit the deposited
/// currency caps `max_currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyTokens {
    #[serde(default)]
    pub recipient: Address,
    pub ids: Vec<AssetId>,
    pub amounts: Vec<Amount>,
    pub max_currency: Amount,
    pub deadline: Timestamp,
}

/// Sell the deposited lots. Ids and amounts come from the deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellTokens {
    #[serde(default)]
    pub recipient: Address,
    pub min_currency: Amount,
    pub deadline: Timestamp,
    #[serde(default)]
    pub extra_fee_recipients: Vec<Address>,
    #[serde(default)]
    pub extra_fee_amounts: Vec<Amount>,
}

/// Pair the deposited lots with currency. `max_currency[i]` lines up with
/// the deposit's ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidity {
    pub max_currency: Vec<Amount>,
    pub deadline: Timestamp,
}

/// Burn the deposited shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidity {
    pub min_currency: Vec<Amount>,
    pub min_tokens: Vec<Amount>,
    pub deadline: Timestamp,
}

/// A decoded payload. Constructed once per call and consumed by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    Buy(BuyTokens),
    Sell(SellTokens),
    AddLiquidity(AddLiquidity),
    RemoveLiquidity(RemoveLiquidity),
}

// ─── Selectors ─────────────────────────────────────────────────────────────

pub fn selector(name: &str) -> [u8; SELECTOR_LEN] {
    let digest = Sha256::digest(format!("{SELECTOR_NAMESPACE}:{name}").as_bytes());
    let mut out = [0u8; SELECTOR_LEN];
    out.copy_from_slice(&digest[..SELECTOR_LEN]);
    out
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Buy(_) => "buy_tokens",
            Instruction::Sell(_) => "sell_tokens",
            Instruction::AddLiquidity(_) => "add_liquidity",
            Instruction::RemoveLiquidity(_) => "remove_liquidity",
        }
    }

    pub fn selector(&self) -> [u8; SELECTOR_LEN] {
        selector(self.name())
    }

    pub fn deadline(&self) -> Timestamp {
        match self {
            Instruction::Buy(i) => i.deadline,
            Instruction::Sell(i) => i.deadline,
            Instruction::AddLiquidity(i) => i.deadline,
            Instruction::RemoveLiquidity(i) => i.deadline,
        }
    }

    // ─── Codec ─────────────────────────────────────────────────────────────

    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = match self {
            Instruction::Buy(args) => codec().serialize(args),
            Instruction::Sell(args) => codec().serialize(args),
            Instruction::AddLiquidity(args) => codec().serialize(args),
            Instruction::RemoveLiquidity(args) => codec().serialize(args),
        }
        .map_err(|e| ExchangeError::MalformedPayload(e.to_string()))?;

        let mut data = self.selector().to_vec();
        data.extend_from_slice(&body);
        Ok(data)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < SELECTOR_LEN {
            return Err(ExchangeError::MalformedPayload(format!(
                "payload is {} bytes, shorter than a selector",
                payload.len()
            )));
        }
        let (head, body) = payload.split_at(SELECTOR_LEN);
        let mut sel = [0u8; SELECTOR_LEN];
        sel.copy_from_slice(head);

        if sel == selector("buy_tokens") {
            decode_body(body).map(Instruction::Buy)
        } else if sel == selector("sell_tokens") {
            decode_body(body).map(Instruction::Sell)
        } else if sel == selector("add_liquidity") {
            decode_body(body).map(Instruction::AddLiquidity)
        } else if sel == selector("remove_liquidity") {
            decode_body(body).map(Instruction::RemoveLiquidity)
        } else {
            Err(ExchangeError::UnknownSelector(sel))
        }
    }
}

// Fixed-width integers, bounded allocation, trailing bytes rejected.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_PAYLOAD_LEN)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    codec()
        .deserialize(body)
        .map_err(|e| ExchangeError::MalformedPayload(e.to_string()))
}
