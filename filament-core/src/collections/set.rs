//! Reactive Set
//!
//! An `IndexSet` wrapped in an [`Observable`]. Insertion order is preserved
//! for snapshots and iteration, but equality between set values ignores it:
//! replacing the whole value with the same elements in a different order is
//! not a change.
//!
//! As with the other adapters, effective mutations broadcast exactly once
//! and no-op mutations (inserting a present element, removing an absent
//! one) broadcast zero times.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexSet;

use crate::equality::DeepEq;
use crate::error::ObservableError;
use crate::reactive::{Observable, Subscription};

/// A reactive set with stable insertion order.
///
/// Cloning shares the underlying observable.
pub struct RxSet<T> {
    inner: Observable<IndexSet<T>>,
}

impl<T> RxSet<T>
where
    T: DeepEq + Clone + Send + Sync + Eq + Hash + 'static,
{
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            inner: Observable::new(IndexSet::new()),
        }
    }

    /// Create a set holding `values`.
    pub fn from_set(values: IndexSet<T>) -> Self {
        Self {
            inner: Observable::new(values),
        }
    }

    /// Number of elements. Tracked.
    pub fn len(&self) -> usize {
        self.inner.with(|values| values.len())
    }

    /// Whether the set has no elements. Tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.with(|values| values.is_empty())
    }

    /// Whether `value` is present. Tracked.
    pub fn contains(&self, value: &T) -> bool {
        self.inner.with(|values| values.contains(value))
    }

    /// Snapshot of the whole set. Tracked.
    pub fn to_set(&self) -> IndexSet<T> {
        self.inner.get()
    }

    /// Snapshot of the elements in insertion order. Tracked.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.with(|values| values.iter().cloned().collect())
    }

    /// Insert an element. Returns whether it was absent; broadcasts only
    /// then.
    pub fn insert(&self, value: T) -> bool {
        self.inner.mutate(|values| {
            let inserted = values.insert(value);
            (inserted, inserted)
        })
    }

    /// Insert every element of `values`. Returns how many were absent;
    /// broadcasts once when that count is nonzero.
    pub fn insert_all(&self, values: impl IntoIterator<Item = T>) -> usize {
        self.inner.mutate(|set| {
            let mut added = 0;
            for value in values {
                if set.insert(value) {
                    added += 1;
                }
            }
            (added, added > 0)
        })
    }

    /// Remove an element, preserving the order of the rest. Returns whether
    /// it was present; broadcasts only then.
    pub fn remove(&self, value: &T) -> bool {
        self.inner.mutate(|values| {
            let removed = values.shift_remove(value);
            (removed, removed)
        })
    }

    /// Remove every element. Broadcasts unless already empty.
    pub fn clear(&self) {
        self.inner.mutate(|values| {
            let changed = !values.is_empty();
            values.clear();
            ((), changed)
        });
    }

    /// Re-broadcast the current contents.
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    /// Subscribe to set broadcasts.
    pub fn listen(
        &self,
        on_data: impl Fn(&IndexSet<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.listen(on_data)
    }

    /// The underlying observable.
    pub fn observable(&self) -> &Observable<IndexSet<T>> {
        &self.inner
    }

    /// Close the underlying observable.
    pub fn close(&self) -> Result<(), ObservableError> {
        self.inner.close()
    }
}

impl<T> Default for RxSet<T>
where
    T: DeepEq + Clone + Send + Sync + Eq + Hash + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<IndexSet<T>> for RxSet<T>
where
    T: DeepEq + Clone + Send + Sync + Eq + Hash + 'static,
{
    fn from(values: IndexSet<T>) -> Self {
        Self::from_set(values)
    }
}

impl<T> FromIterator<T> for RxSet<T>
where
    T: DeepEq + Clone + Send + Sync + Eq + Hash + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_set(iter.into_iter().collect())
    }
}

impl<T> Clone for RxSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RxSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RxSet").field("inner", &self.inner).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn counting(set: &RxSet<i32>) -> Arc<AtomicI32> {
        let broadcasts = Arc::new(AtomicI32::new(0));
        let broadcasts_clone = broadcasts.clone();
        set.listen(move |_| {
            broadcasts_clone.fetch_add(1, Ordering::SeqCst);
        });
        broadcasts
    }

    #[test]
    fn insert_deduplicates() {
        let set = RxSet::new();
        assert!(set.insert(1));
        assert!(set.insert(2));
        assert!(!set.insert(1));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&1));
        assert!(!set.contains(&3));
    }

    #[test]
    fn duplicate_insert_broadcasts_zero_times() {
        let set = RxSet::new();
        set.insert(1);
        let broadcasts = counting(&set);

        assert!(!set.insert(1));
        assert_eq!(broadcasts.load(Ordering::SeqCst), 0);

        assert!(set.insert(2));
        assert_eq!(broadcasts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_missing_broadcasts_zero_times() {
        let set = RxSet::new();
        set.insert(1);
        let broadcasts = counting(&set);

        assert!(!set.remove(&9));
        assert_eq!(broadcasts.load(Ordering::SeqCst), 0);

        assert!(set.remove(&1));
        assert_eq!(broadcasts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_preserves_insertion_order() {
        let set: RxSet<i32> = [1, 2, 3].into_iter().collect();
        set.remove(&2);
        assert_eq!(set.to_vec(), vec![1, 3]);
    }

    #[test]
    fn insert_all_broadcasts_once_for_the_batch() {
        let set = RxSet::new();
        set.insert(1);
        let broadcasts = counting(&set);

        assert_eq!(set.insert_all([1, 2, 3]), 2);
        assert_eq!(broadcasts.load(Ordering::SeqCst), 1);

        assert_eq!(set.insert_all([2, 3]), 0);
        assert_eq!(broadcasts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_on_empty_broadcasts_zero_times() {
        let set: RxSet<i32> = RxSet::new();
        let broadcasts = counting(&set);

        set.clear();
        assert_eq!(broadcasts.load(Ordering::SeqCst), 0);

        set.insert(1);
        set.clear();
        assert!(set.is_empty());
        assert_eq!(broadcasts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn whole_value_replacement_ignores_order() {
        let set: RxSet<i32> = [1, 2, 3].into_iter().collect();
        let broadcasts = counting(&set);

        // Same elements, different insertion order: not a change.
        let reordered: IndexSet<i32> = [3, 2, 1].into_iter().collect();
        assert!(!set.observable().set(reordered));
        assert_eq!(broadcasts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn close_passes_through() {
        let set: RxSet<i32> = RxSet::new();
        assert!(set.close().is_ok());
        assert_eq!(set.close(), Err(ObservableError::AlreadyClosed));
    }
}
