//! Reactive Map
//!
//! An `IndexMap` wrapped in an [`Observable`]. Key-value pairs keep their
//! insertion order in snapshots; equality between map values ignores it.
//!
//! `insert` broadcasts on every call: the overwritten value is not
//! compared against the new one. Removal of an absent key and clearing an
//! empty map broadcast zero times.

use std::fmt;
use std::hash::Hash;

use indexmap::{Equivalent, IndexMap};

use crate::equality::DeepEq;
use crate::error::ObservableError;
use crate::reactive::{Observable, Subscription};

/// A reactive map with stable insertion order.
///
/// Cloning shares the underlying observable.
pub struct RxMap<K, V> {
    inner: Observable<IndexMap<K, V>>,
}

impl<K, V> RxMap<K, V>
where
    K: DeepEq + Clone + Send + Sync + Eq + Hash + 'static,
    V: DeepEq + Clone + Send + Sync + 'static,
{
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            inner: Observable::new(IndexMap::new()),
        }
    }

    /// Create a map holding `entries`.
    pub fn from_map(entries: IndexMap<K, V>) -> Self {
        Self {
            inner: Observable::new(entries),
        }
    }

    /// Number of entries. Tracked.
    pub fn len(&self) -> usize {
        self.inner.with(|entries| entries.len())
    }

    /// Whether the map has no entries. Tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.with(|entries| entries.is_empty())
    }

    /// Clone of the value under `key`. Tracked.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.with(|entries| entries.get(key).cloned())
    }

    /// Whether `key` is present. Tracked.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.with(|entries| entries.contains_key(key))
    }

    /// Snapshot of the keys in insertion order. Tracked.
    pub fn keys(&self) -> Vec<K> {
        self.inner.with(|entries| entries.keys().cloned().collect())
    }

    /// Snapshot of the values in insertion order. Tracked.
    pub fn values(&self) -> Vec<V> {
        self.inner
            .with(|entries| entries.values().cloned().collect())
    }

    /// Snapshot of the whole map. Tracked.
    pub fn to_map(&self) -> IndexMap<K, V> {
        self.inner.get()
    }

    /// Insert or overwrite an entry, returning the previous value.
    ///
    /// Broadcasts on every call; the overwritten value is never compared.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.mutate(|entries| (entries.insert(key, value), true))
    }

    /// Remove an entry, preserving the order of the rest. Returns the
    /// removed value; broadcasts only when something was removed.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.mutate(|entries| {
            let removed = entries.shift_remove(key);
            let changed = removed.is_some();
            (removed, changed)
        })
    }

    /// Remove every entry. Broadcasts unless already empty.
    pub fn clear(&self) {
        self.inner.mutate(|entries| {
            let changed = !entries.is_empty();
            entries.clear();
            ((), changed)
        });
    }

    /// Re-broadcast the current contents.
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    /// Subscribe to map broadcasts.
    pub fn listen(
        &self,
        on_data: impl Fn(&IndexMap<K, V>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listen(on_data)
    }

    /// The underlying observable.
    pub fn observable(&self) -> &Observable<IndexMap<K, V>> {
        &self.inner
    }

    /// Close the underlying observable.
    pub fn close(&self) -> Result<(), ObservableError> {
        self.inner.close()
    }
}

impl<K, V> Default for RxMap<K, V>
where
    K: DeepEq + Clone + Send + Sync + Eq + Hash + 'static,
    V: DeepEq + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> From<IndexMap<K, V>> for RxMap<K, V>
where
    K: DeepEq + Clone + Send + Sync + Eq + Hash + 'static,
    V: DeepEq + Clone + Send + Sync + 'static,
{
    fn from(entries: IndexMap<K, V>) -> Self {
        Self::from_map(entries)
    }
}

impl<K, V> FromIterator<(K, V)> for RxMap<K, V>
where
    K: DeepEq + Clone + Send + Sync + Eq + Hash + 'static,
    V: DeepEq + Clone + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<K, V> Clone for RxMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RxMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RxMap").field("inner", &self.inner).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
