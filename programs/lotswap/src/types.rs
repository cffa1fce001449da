//! Identity and amount primitives shared by every module.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Lot identifier inside the multi-asset token space.
pub type AssetId = u64;

/// Token, currency and share amounts.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

// ─── Address ──────────────────────────────────────────────────────────────────

/// 32-byte account identity.
///
/// Renders as `0x`-prefixed hex. [`Address::ZERO`] is the "unset" sentinel a
/// caller passes to mean "send to me".
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    /// Address whose low eight bytes hold `n` (big-endian). Handy for fixtures.
    pub fn from_low_u64(n: u64) -> Self {
        let mut b = [0u8; 32];
        b[24..].copy_from_slice(&n.to_be_bytes());
        Self(b)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid hex in address: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("address is {0} bytes; at most 32 allowed")]
    TooLong(usize),
}

/// Accepts `0x`-prefixed or bare hex of up to 32 bytes; shorter input is
/// left-padded with zeros so `0x01` parses.
impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let digits = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let raw = hex::decode(digits)?;
        if raw.len() > 32 {
            return Err(AddressParseError::TooLong(raw.len()));
        }
        let mut b = [0u8; 32];
        b[32 - raw.len()..].copy_from_slice(&raw);
        Ok(Self(b))
    }
}

// Hex string for JSON/TOML, raw bytes for the binary wire format.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Address)
        }
    }
}

// ─── Asset classes ────────────────────────────────────────────────────────────

/// Which asset a batched movement is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// The id-keyed lots traded by the pools.
    Lots,
    /// The shared currency every pool prices against.
    Currency,
    /// Liquidity shares issued by this engine.
    Shares,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            AssetClass::Lots => "lots",
            AssetClass::Currency => "currency",
            AssetClass::Shares => "shares",
        })
    }
}
