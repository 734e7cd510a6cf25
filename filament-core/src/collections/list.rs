//! Reactive List
//!
//! A `Vec` wrapped in an [`Observable`], with mutating methods that
//! broadcast the whole collection after every effective change. Mutations
//! bypass the equality gate: the collection changed in place, so the
//! broadcast is unconditional. A call that verifiably changed nothing
//! (removing a missing index, clearing an empty list) broadcasts zero times.

use std::fmt;

use crate::equality::DeepEq;
use crate::error::ObservableError;
use crate::reactive::{Observable, Subscription};

/// A reactive list. Order-sensitive, like the `Vec` it wraps.
///
/// Cloning shares the underlying observable.
pub struct RxList<T> {
    inner: Observable<Vec<T>>,
}

impl<T> RxList<T>
where
    T: DeepEq + Clone + Send + Sync + 'static,
{
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            inner: Observable::new(Vec::new()),
        }
    }

    /// Create a list holding `values`.
    pub fn from_vec(values: Vec<T>) -> Self {
        Self {
            inner: Observable::new(values),
        }
    }

    /// Number of elements. Tracked.
    pub fn len(&self) -> usize {
        self.inner.with(|values| values.len())
    }

    /// Whether the list has no elements. Tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.with(|values| values.is_empty())
    }

    /// Clone of the element at `index`. Tracked.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.with(|values| values.get(index).cloned())
    }

    /// Whether any element deep-equals `value`. Tracked.
    pub fn contains(&self, value: &T) -> bool {
        self.inner
            .with(|values| values.iter().any(|element| element.deep_eq(value)))
    }

    /// Index of the first element deep-equal to `value`. Tracked.
    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.inner
            .with(|values| values.iter().position(|element| element.deep_eq(value)))
    }

    /// Snapshot of the whole list. Tracked.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.get()
    }

    /// Append an element. Broadcasts.
    pub fn push(&self, value: T) {
        self.inner.mutate(|values| {
            values.push(value);
            ((), true)
        });
    }

    /// Remove and return the last element. Broadcasts unless empty.
    pub fn pop(&self) -> Option<T> {
        self.inner.mutate(|values| {
            let removed = values.pop();
            let changed = removed.is_some();
            (removed, changed)
        })
    }

    /// Insert an element at `index`, shifting later elements. Broadcasts.
    ///
    /// Panics when `index > len`, like `Vec::insert`.
    pub fn insert(&self, index: usize, value: T) {
        self.inner.mutate(|values| {
            values.insert(index, value);
            ((), true)
        });
    }

    /// Remove and return the element at `index`, preserving the order of
    /// the rest. Broadcasts unless the index is out of bounds.
    pub fn remove(&self, index: usize) -> Option<T> {
        self.inner.mutate(|values| {
            if index < values.len() {
                (Some(values.remove(index)), true)
            } else {
                (None, false)
            }
        })
    }

    /// Replace the element at `index`, returning the old one. Broadcasts on
    /// every in-bounds call, equal replacement or not.
    pub fn replace(&self, index: usize, value: T) -> Option<T> {
        self.inner.mutate(|values| match values.get_mut(index) {
            Some(slot) => (Some(std::mem::replace(slot, value)), true),
            None => (None, false),
        })
    }

    /// Keep only the elements `predicate` accepts. Broadcasts when any
    /// element was dropped.
    pub fn retain(&self, predicate: impl FnMut(&T) -> bool) {
        self.inner.mutate(|values| {
            let before = values.len();
            values.retain(predicate);
            ((), values.len() != before)
        });
    }

    /// Remove every element. Broadcasts unless already empty.
    pub fn clear(&self) {
        self.inner.mutate(|values| {
            let changed = !values.is_empty();
            values.clear();
            ((), changed)
        });
    }

    /// Sort the list. Broadcasts unless it was already sorted.
    pub fn sort(&self)
    where
        T: Ord,
    {
        self.inner.mutate(|values| {
            let sorted = values.windows(2).all(|pair| pair[0] <= pair[1]);
            if !sorted {
                values.sort();
            }
            ((), !sorted)
        });
    }

    /// Re-broadcast the current contents.
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    /// Subscribe to list broadcasts.
    pub fn listen(&self, on_data: impl Fn(&Vec<T>) + Send + Sync + 'static) -> Subscription {
        self.inner.listen(on_data)
    }

    /// The underlying observable.
    pub fn observable(&self) -> &Observable<Vec<T>> {
        &self.inner
    }

    /// Close the underlying observable.
    pub fn close(&self) -> Result<(), ObservableError> {
        self.inner.close()
    }
}

impl<T> Default for RxList<T>
where
    T: DeepEq + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for RxList<T>
where
    T: DeepEq + Clone + Send + Sync + 'static,
{
    fn from(values: Vec<T>) -> Self {
        Self::from_vec(values)
    }
}

impl<T> FromIterator<T> for RxList<T>
where
    T: DeepEq + Clone + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> Clone for RxList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RxList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RxList").field("inner", &self.inner).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
