use crate::error::{ExchangeError, Result};
use crate::types::{Amount, AssetId};

/// Check a batch: every amount column is as long as `ids`, and `ids` is
/// strictly increasing.
///
/// Strict ordering proves uniqueness without a set and fixes the order in
/// which ids are processed.
pub fn validate_batch(ids: &[AssetId], columns: &[&[Amount]]) -> Result<()> {
    if columns.iter().any(|c| c.len() != ids.len()) {
        return Err(ExchangeError::InvalidArrayLength);
    }
    validate_ids(ids)
}

pub fn validate_ids(ids: &[AssetId]) -> Result<()> {
    if ids.windows(2).all(|w| w[0] < w[1]) {
        Ok(())
    } else {
        Err(ExchangeError::UnsortedOrDuplicateIds)
    }
}

/// Two parallel arrays of any element types must line up.
pub fn ensure_same_len<A, B>(a: &[A], b: &[B]) -> Result<()> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(ExchangeError::InvalidArrayLength)
    }
}
