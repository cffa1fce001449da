use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Address, Amount, AssetId};

// ─── Pool ──────────────────────────────────────────────────────────────────
// Reserve pair and share supply for one lot id.
// Created lazily by the first deposit; never removed, even when the last
// shares are burned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub token_reserve: Amount,
    pub currency_reserve: Amount,
    /// Total liquidity shares outstanding
    pub total_shares: Amount,
}

impl Pool {
    /// `total_shares > 0` implies both reserves are non-zero.
    pub fn is_initialized(&self) -> bool {
        self.total_shares > 0
    }
}

// ─── ExchangeState ─────────────────────────────────────────────────────────
// Everything the engine owns: pools, per-owner shares, accrued royalties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeState {
    #[serde(default)]
    pools: BTreeMap<AssetId, Pool>,
    /// owner -> id -> shares
    #[serde(default)]
    positions: BTreeMap<Address, BTreeMap<AssetId, Amount>>,
    /// recipient -> claimable currency
    #[serde(default)]
    royalties: BTreeMap<Address, Amount>,
}

impl ExchangeState {
    /// Current record for `id`; an unseen id reads as an empty pool.
    pub fn pool(&self, id: AssetId) -> Pool {
        self.pools.get(&id).copied().unwrap_or_default()
    }

    pub fn pools(&self) -> impl Iterator<Item = (AssetId, &Pool)> {
        self.pools.iter().map(|(id, p)| (*id, p))
    }

    pub fn shares_of(&self, owner: &Address, id: AssetId) -> Amount {
        self.positions
            .get(owner)
            .and_then(|held| held.get(&id))
            .copied()
            .unwrap_or(0)
    }

    /// All non-zero positions held by `owner`.
    pub fn positions_of(&self, owner: &Address) -> impl Iterator<Item = (AssetId, Amount)> + '_ {
        self.positions
            .get(owner)
            .into_iter()
            .flat_map(|held| held.iter().map(|(id, s)| (*id, *s)))
    }

    pub fn royalties_of(&self, recipient: &Address) -> Amount {
        self.royalties.get(recipient).copied().unwrap_or(0)
    }

    fn set_shares(&mut self, owner: Address, id: AssetId, shares: Amount) -> Amount {
        let held = self.positions.entry(owner).or_default();
        let prev = if shares == 0 {
            held.remove(&id)
        } else {
            held.insert(id, shares)
        };
        if held.is_empty() {
            self.positions.remove(&owner);
        }
        prev.unwrap_or(0)
    }

    fn set_royalty(&mut self, recipient: Address, accrued: Amount) -> Amount {
        let prev = if accrued == 0 {
            self.royalties.remove(&recipient)
        } else {
            self.royalties.insert(recipient, accrued)
        };
        prev.unwrap_or(0)
    }

    /// Write every value in `delta`, returning what it overwrote.
    pub(crate) fn apply(&mut self, delta: StateDelta) -> Journal {
        let mut journal = Journal::default();
        for (id, pool) in delta.pools {
            let prev = self.pools.insert(id, pool);
            journal.pools.push((id, prev));
        }
        for (owner, id, shares) in delta.shares {
            let prev = self.set_shares(owner, id, shares);
            journal.shares.push((owner, id, prev));
        }
        for (recipient, accrued) in delta.royalties {
            let prev = self.set_royalty(recipient, accrued);
            journal.royalties.push((recipient, prev));
        }
        journal
    }

    /// Undo an [`apply`](Self::apply), newest write first.
    pub(crate) fn revert(&mut self, journal: Journal) {
        for (recipient, prev) in journal.royalties.into_iter().rev() {
            self.set_royalty(recipient, prev);
        }
        for (owner, id, prev) in journal.shares.into_iter().rev() {
            self.set_shares(owner, id, prev);
        }
        for (id, prev) in journal.pools.into_iter().rev() {
            match prev {
                Some(pool) => self.pools.insert(id, pool),
                None => self.pools.remove(&id),
            };
        }
    }
}

// ─── StateDelta ────────────────────────────────────────────────────────────
// New absolute values computed by a handler from the pre-call snapshot.
// Each key appears at most once, so the order of writes never matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    pub pools: Vec<(AssetId, Pool)>,
    pub shares: Vec<(Address, AssetId, Amount)>,
    pub royalties: Vec<(Address, Amount)>,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty() && self.shares.is_empty() && self.royalties.is_empty()
    }
}

/// Pre-call values of every record an [`ExchangeState::apply`] touched.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pools: Vec<(AssetId, Option<Pool>)>,
    shares: Vec<(Address, AssetId, Amount)>,
    royalties: Vec<(Address, Amount)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_restores_every_touched_record() {
        let alice = Address::from_low_u64(1);
        let bob = Address::from_low_u64(2);

        let mut state = ExchangeState::default();
        state.apply(StateDelta {
            pools: vec![(1, Pool { token_reserve: 10, currency_reserve: 100, total_shares: 100 })],
            shares: vec![(alice, 1, 100)],
            royalties: vec![(bob, 7)],
        });
        let before = state.clone();

        let journal = state.apply(StateDelta {
            pools: vec![
                (1, Pool { token_reserve: 11, currency_reserve: 91, total_shares: 100 }),
                (2, Pool { token_reserve: 5, currency_reserve: 50, total_shares: 50 }),
            ],
            shares: vec![(alice, 1, 0), (bob, 2, 50)],
            royalties: vec![(bob, 0), (alice, 3)],
        });
        assert_eq!(state.shares_of(&alice, 1), 0);
        assert_eq!(state.royalties_of(&bob), 0);
        assert_eq!(state.pool(2).total_shares, 50);

        state.revert(journal);
        assert_eq!(state, before);
    }

    #[test]
    fn unseen_pool_reads_uninitialized() {
        let state = ExchangeState::default();
        assert!(!state.pool(42).is_initialized());
        assert_eq!(state.pool(42), Pool::default());
    }
}
