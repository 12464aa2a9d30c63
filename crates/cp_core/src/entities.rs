//! Domain containers shared by every layer.
//!
//! `OrderedMap` keeps caller order (outputs echo it) while refusing duplicate
//! keys. Lookups are linear; the engine only ever iterates these maps and
//! derives any sorted view through `determinism`.

use alloc::collections::BTreeSet;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;

use crate::errors::CoreError;
use crate::ids::{StoreId, WarehouseId};

/// Insertion-ordered map with unique keys, backed by a `Vec<(K, V)>`.
#[derive(Clone, PartialEq, Eq)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
}

/// Store id → need in items (may be zero or negative).
pub type NeedMap = OrderedMap<StoreId, i64>;
/// Warehouse id → available casepacks (negative values are clamped by the distributor).
pub type SupplyMap = OrderedMap<WarehouseId, i64>;
/// Store id → casepacks allocated.
pub type Allocation = OrderedMap<StoreId, u64>;
/// Warehouse id → casepacks drawn.
pub type Distribution = OrderedMap<WarehouseId, u64>;

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, v)| (k, v))).finish()
    }
}

impl<K, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&K, &V)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> + '_ {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn entries(&self) -> &[(K, V)] {
        &self.entries
    }

    /// Build a map whose values follow the same key order as `self`.
    pub fn map_values<W>(&self, mut f: impl FnMut(&K, &V) -> W) -> OrderedMap<K, W>
    where
        K: Clone,
    {
        OrderedMap {
            entries: self.entries.iter().map(|(k, v)| (k.clone(), f(k, v))).collect(),
        }
    }

    /// Pair each key (in order) with `values[i]`. Caller guarantees equal length.
    pub fn zip_values<W>(&self, values: Vec<W>) -> OrderedMap<K, W>
    where
        K: Clone,
    {
        debug_assert_eq!(values.len(), self.entries.len());
        OrderedMap {
            entries: self.entries.iter().map(|(k, _)| k.clone()).zip(values).collect(),
        }
    }
}

impl<K: Ord + Clone + fmt::Display, V> OrderedMap<K, V> {
    /// Build from `(key, value)` pairs, keeping order and rejecting duplicate keys.
    pub fn try_from_entries<I: IntoIterator<Item = (K, V)>>(it: I) -> Result<Self, CoreError> {
        let entries: Vec<(K, V)> = it.into_iter().collect();
        let mut seen: BTreeSet<&K> = BTreeSet::new();
        for (k, _) in &entries {
            if !seen.insert(k) {
                return Err(CoreError::DuplicateKey(k.to_string()));
            }
        }
        drop(seen);
        Ok(Self { entries })
    }

    /// Append a pair; O(n) duplicate check.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), CoreError> {
        if self.entries.iter().any(|(k, _)| *k == key) {
            return Err(CoreError::DuplicateKey(key.to_string()));
        }
        self.entries.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Size ratios of one casepack definition. Items per casepack is their sum
/// (computed and checked by `cp_algo::bundle`).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Bundle {
    ratios: Vec<i64>,
}

impl Bundle {
    pub fn new(ratios: Vec<i64>) -> Self {
        Self { ratios }
    }

    pub fn ratios(&self) -> &[i64] {
        &self.ratios
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}

impl From<Vec<i64>> for Bundle {
    fn from(ratios: Vec<i64>) -> Self {
        Self::new(ratios)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    //! Object-shaped (de)serialization that keeps document order.

    use super::OrderedMap;
    use alloc::vec::Vec;
    use core::fmt;
    use core::marker::PhantomData;
    use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
    use serde::ser::{Serialize, Serializer};

    impl<K: Serialize, V: Serialize> Serialize for OrderedMap<K, V> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
        }
    }

    struct OrderedMapVisitor<K, V>(PhantomData<(K, V)>);

    impl<'de, K, V> Visitor<'de> for OrderedMapVisitor<K, V>
    where
        K: Deserialize<'de> + Ord + Clone + fmt::Display,
        V: Deserialize<'de>,
    {
        type Value = OrderedMap<K, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object with unique keys")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut entries: Vec<(K, V)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((k, v)) = access.next_entry::<K, V>()? {
                entries.push((k, v));
            }
            OrderedMap::try_from_entries(entries).map_err(de::Error::custom)
        }
    }

    impl<'de, K, V> Deserialize<'de> for OrderedMap<K, V>
    where
        K: Deserialize<'de> + Ord + Clone + fmt::Display,
        V: Deserialize<'de>,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec;

    fn sid(s: &str) -> StoreId {
        s.parse().unwrap()
    }

    #[test]
    fn keeps_insertion_order() {
        let m: NeedMap =
            OrderedMap::try_from_entries(vec![(sid("zeta"), 1), (sid("alpha"), -2), (sid("mid"), 0)])
                .unwrap();
        let keys: Vec<&str> = m.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(m.get(&sid("alpha")), Some(&-2));
        assert_eq!(m.get(&sid("nope")), None);
    }

    #[test]
    fn rejects_duplicates() {
        let err = OrderedMap::try_from_entries(vec![(sid("a"), 1), (sid("b"), 2), (sid("a"), 3)])
            .unwrap_err();
        assert_eq!(err, CoreError::DuplicateKey(String::from("a")));

        let mut m: NeedMap = OrderedMap::new();
        m.insert(sid("a"), 1).unwrap();
        assert!(m.insert(sid("a"), 5).is_err());
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn zip_and_map_follow_key_order() {
        let m: NeedMap = OrderedMap::try_from_entries(vec![(sid("b"), 10), (sid("a"), 20)]).unwrap();
        let doubled = m.map_values(|_, v| (*v * 2) as u64);
        assert_eq!(doubled.entries(), &[(sid("b"), 20u64), (sid("a"), 40u64)]);
        let z = m.zip_values(vec![7u64, 8u64]);
        assert_eq!(z.values().copied().collect::<Vec<_>>(), vec![7, 8]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_keeps_document_order_and_rejects_duplicate_keys() {
        let m: OrderedMap<String, i64> =
            serde_json::from_str(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        let keys: Vec<&str> = m.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(serde_json::to_string(&m).unwrap(), r#"{"z":1,"a":2,"m":3}"#);

        let dup = serde_json::from_str::<OrderedMap<String, i64>>(r#"{"a":1,"a":2}"#);
        assert!(dup.unwrap_err().to_string().contains("duplicate key: a"));
    }
}
