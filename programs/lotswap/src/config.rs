//! Per-instance fee and royalty configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{FEE_DENOMINATOR, LP_FEE_DEFAULT, MAX_ROYALTY_FEE};
use crate::error::{ExchangeError, Result};
use crate::types::{Address, AssetId};

/// Royalty rate (per mille of the pre-royalty price) and who accrues it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyInfo {
    pub fee: u16,
    pub recipient: Address,
}

/// Identity and fee parameters of one exchange instance.
///
/// A registry uses the identity getters to keep one instance per
/// `(token, currency, lp_fee)` triple; the engine itself never looks them up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Multi-asset contract holding the lots.
    pub token: Address,
    /// Currency contract.
    pub currency: Address,
    /// Currency id inside `currency` (0 when the currency is fungible-only).
    #[serde(default)]
    pub currency_id: AssetId,
    /// LP fee in per mille; fee multiplier is `1000 - lp_fee`.
    #[serde(default = "default_lp_fee")]
    pub lp_fee: u16,
    /// Royalty applied to every id without an override.
    #[serde(default)]
    pub royalty: Option<RoyaltyInfo>,
    /// Per-id royalty published by the token itself; wins over `royalty`.
    #[serde(default, with = "override_list")]
    pub royalty_overrides: BTreeMap<AssetId, RoyaltyInfo>,
}

fn default_lp_fee() -> u16 {
    LP_FEE_DEFAULT
}

// TOML only allows string keys, so overrides travel as a list of
// `{ id, fee, recipient }` entries.
mod override_list {
    use super::RoyaltyInfo;
    use crate::types::{Address, AssetId};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        id: AssetId,
        fee: u16,
        recipient: Address,
    }

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<AssetId, RoyaltyInfo>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<Entry> = map
            .iter()
            .map(|(id, info)| Entry { id: *id, fee: info.fee, recipient: info.recipient })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<AssetId, RoyaltyInfo>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|e| (e.id, RoyaltyInfo { fee: e.fee, recipient: e.recipient }))
            .collect())
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            token: Address::ZERO,
            currency: Address::ZERO,
            currency_id: 0,
            lp_fee: LP_FEE_DEFAULT,
            royalty: None,
            royalty_overrides: BTreeMap::new(),
        }
    }
}

impl ExchangeConfig {
    pub fn new(token: Address, currency: Address, lp_fee: u16) -> Self {
        Self { token, currency, lp_fee, ..Self::default() }
    }

    pub fn with_royalty(mut self, fee: u16, recipient: Address) -> Self {
        self.royalty = Some(RoyaltyInfo { fee, recipient });
        self
    }

    pub fn with_royalty_override(mut self, id: AssetId, fee: u16, recipient: Address) -> Self {
        self.royalty_overrides.insert(id, RoyaltyInfo { fee, recipient });
        self
    }

    pub fn validate(&self) -> Result<()> {
        if u128::from(self.lp_fee) >= FEE_DENOMINATOR {
            return Err(ExchangeError::InvalidFeeRate(self.lp_fee));
        }
        for info in self.royalty.iter().chain(self.royalty_overrides.values()) {
            if info.fee > MAX_ROYALTY_FEE {
                return Err(ExchangeError::InvalidRoyaltyFee(info.fee));
            }
            if info.fee > 0 && info.recipient.is_zero() {
                return Err(ExchangeError::InvalidRecipient);
            }
        }
        Ok(())
    }

    /// Numerator applied to the traded amount: `1000 - lp_fee`.
    pub fn fee_multiplier(&self) -> u128 {
        FEE_DENOMINATOR - u128::from(self.lp_fee)
    }

    /// Royalty that applies to `id`, if any is non-zero.
    pub fn royalty_for(&self, id: AssetId) -> Option<RoyaltyInfo> {
        self.royalty_overrides
            .get(&id)
            .or(self.royalty.as_ref())
            .copied()
            .filter(|info| info.fee > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_multiplier_is_995() {
        assert_eq!(ExchangeConfig::default().fee_multiplier(), 995);
    }

    #[test]
    fn override_wins_over_global_royalty() {
        let global = Address::from_low_u64(1);
        let special = Address::from_low_u64(666);
        let cfg = ExchangeConfig::default()
            .with_royalty(20, global)
            .with_royalty_override(666, 100, special);
        assert_eq!(cfg.royalty_for(1).map(|r| r.recipient), Some(global));
        assert_eq!(cfg.royalty_for(666), Some(RoyaltyInfo { fee: 100, recipient: special }));
    }

    #[test]
    fn rejects_out_of_range_fees() {
        let cfg = ExchangeConfig { lp_fee: 1000, ..ExchangeConfig::default() };
        assert_eq!(cfg.validate(), Err(ExchangeError::InvalidFeeRate(1000)));

        let cfg = ExchangeConfig::default().with_royalty(1001, Address::from_low_u64(1));
        assert_eq!(cfg.validate(), Err(ExchangeError::InvalidRoyaltyFee(1001)));

        let cfg = ExchangeConfig::default().with_royalty(10, Address::ZERO);
        assert_eq!(cfg.validate(), Err(ExchangeError::InvalidRecipient));
    }
}
