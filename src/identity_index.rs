//! IdentityIndex: hash index from allocation address to log sequence number.

use core::hash::BuildHasher;
use hashbrown::HashTable;
use std::collections::hash_map::RandomState;

#[derive(Copy, Clone, Debug)]
struct IndexSlot {
    addr: usize,
    seq: u64,
}

/// Membership index keyed by allocation address. The index knows nothing
/// about element liveness; callers confirm candidate slots through a
/// predicate over the slot's sequence number, so a stale slot left behind
/// by a reclaimed element (or an address reused by a newer allocation)
/// never produces a false match.
pub(crate) struct IdentityIndex<S = RandomState> {
    hasher: S,
    table: HashTable<IndexSlot>,
}

impl<S: BuildHasher> IdentityIndex<S> {
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            table: HashTable::new(),
        }
    }

    fn make_hash(&self, addr: usize) -> u64 {
        self.hasher.hash_one(addr)
    }

    /// Sequence number registered for `addr` and accepted by `matches`.
    pub(crate) fn find(&self, addr: usize, mut matches: impl FnMut(u64) -> bool) -> Option<u64> {
        let hash = self.make_hash(addr);
        self.table
            .find(hash, |slot| slot.addr == addr && matches(slot.seq))
            .map(|slot| slot.seq)
    }

    pub(crate) fn insert(&mut self, addr: usize, seq: u64) {
        let hash = self.make_hash(addr);
        let hasher = &self.hasher;
        let _ = self
            .table
            .insert_unique(hash, IndexSlot { addr, seq }, |slot| {
                hasher.hash_one(slot.addr)
            });
    }

    /// Remove the slot for exactly this (addr, seq) pair. Returns whether
    /// a slot was present.
    pub(crate) fn remove(&mut self, addr: usize, seq: u64) -> bool {
        let hash = self.make_hash(addr);
        match self
            .table
            .find_entry(hash, |slot| slot.addr == addr && slot.seq == seq)
        {
            Ok(entry) => {
                let _ = entry.remove();
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.table.clear();
    }

    /// Raw slot count, stale slots included. Debug bookkeeping only.
    #[cfg(test)]
    pub(crate) fn raw_len(&self) -> usize {
        self.table.len()
    }
}
