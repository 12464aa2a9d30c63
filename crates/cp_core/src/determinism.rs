//! Determinism utilities: stable ordering for tie-breaks.
//!
//! This module is **I/O-free**. Every place the engine has to choose between
//! equally ranked stores or warehouses resolves it through the helpers here,
//! so the choice never depends on hash or insertion order.

use core::cmp::Ordering;

use alloc::vec::Vec;

use crate::entities::OrderedMap;
use crate::ids::{StoreId, WarehouseId};

/// Provide a **total**, stable order for values that must sort canonically.
pub trait StableOrd {
    fn stable_cmp(&self, other: &Self) -> Ordering;
}

impl StableOrd for StoreId {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl StableOrd for WarehouseId {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// Entry positions of `map`, visited in ascending stable key order.
pub fn indices_by_key<K: StableOrd, V>(map: &OrderedMap<K, V>) -> Vec<usize> {
    let entries = map.entries();
    let mut ix: Vec<usize> = (0..entries.len()).collect();
    ix.sort_by(|&a, &b| entries[a].0.stable_cmp(&entries[b].0));
    ix
}

/// For each entry position, its rank in ascending stable key order
/// (rank 0 = smallest key). Inverse permutation of `indices_by_key`.
pub fn ranks_by_key<K: StableOrd, V>(map: &OrderedMap<K, V>) -> Vec<usize> {
    let order = indices_by_key(map);
    let mut ranks = alloc::vec![0usize; order.len()];
    for (rank, &pos) in order.iter().enumerate() {
        ranks[pos] = rank;
    }
    ranks
}
