//! Deep Equality Engine
//!
//! Structural equality and hashing over arbitrarily nested containers. The
//! reactive core consults this engine for every "did the value actually
//! change" decision, so the rules here determine which writes broadcast and
//! which are silent no-ops.
//!
//! # Dispatch Policy
//!
//! Dispatch is capability-based through [`DeepEq`] impls rather than through
//! a type hierarchy:
//!
//! - Set-like containers compare as unordered multisets with matching
//!   cardinalities.
//! - Map-like containers compare key/value pairs ignoring order, recursing
//!   through the engine for both keys and values.
//! - Ordered sequences (vectors, slices, arrays, deques) compare index-wise.
//! - Everything else falls back to primitive equality.
//!
//! Arbitrary user types opt in with [`impl_deep_eq!`], which forwards to
//! their `PartialEq`/`Hash` impls.
//!
//! # Hashing
//!
//! Element hashes are combined order-sensitively for sequences and
//! order-insensitively (pure wrapping sum) for sets and maps, then run
//! through a fixed avalanche finishing step so small input changes produce
//! well-distributed outputs. The law `deep_eq(a, b)` implies
//! `deep_hash(a) == deep_hash(b)` holds for every impl in this module.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

/// Structural equality and hashing.
///
/// Implementations must keep `deep_eq` and `deep_hash` consistent: values
/// that compare equal must hash equally.
pub trait DeepEq {
    /// Compare two values structurally.
    fn deep_eq(&self, other: &Self) -> bool;

    /// Hash a value consistently with [`DeepEq::deep_eq`].
    fn deep_hash(&self) -> u64;
}

/// Compare two values through the engine.
pub fn deep_eq<T: DeepEq + ?Sized>(a: &T, b: &T) -> bool {
    a.deep_eq(b)
}

/// Hash a value through the engine.
pub fn deep_hash<T: DeepEq + ?Sized>(value: &T) -> u64 {
    value.deep_hash()
}

/// Hash combination primitives.
///
/// The combining steps follow the Jenkins one-at-a-time construction; every
/// aggregate hash in the engine ends with [`finish`].
pub mod hash {
    /// Fold one element hash into an order-sensitive accumulator.
    pub fn combine(hash: u64, value: u64) -> u64 {
        let mut hash = hash.wrapping_add(value);
        hash = hash.wrapping_add(hash << 10);
        hash ^ (hash >> 6)
    }

    /// Avalanche a combined hash so nearby inputs spread apart.
    pub fn finish(hash: u64) -> u64 {
        let mut hash = hash.wrapping_add(hash << 3);
        hash ^= hash >> 11;
        hash.wrapping_add(hash << 15)
    }

    /// Order-sensitive hash of a sequence of element hashes.
    pub fn ordered<I: IntoIterator<Item = u64>>(values: I) -> u64 {
        finish(values.into_iter().fold(0, combine))
    }

    /// Order-insensitive hash of a collection of element hashes.
    ///
    /// A wrapping sum is commutative, so any iteration order produces the
    /// same result.
    pub fn unordered<I: IntoIterator<Item = u64>>(values: I) -> u64 {
        finish(values.into_iter().fold(0u64, u64::wrapping_add))
    }
}

/// Index-wise, order-sensitive comparison of two sequences.
pub fn sequence_eq<'a, T, L, R>(left: L, right: R) -> bool
where
    T: DeepEq + 'a,
    L: IntoIterator<Item = &'a T>,
    R: IntoIterator<Item = &'a T>,
{
    let mut left = left.into_iter();
    let mut right = right.into_iter();
    loop {
        match (left.next(), right.next()) {
            (Some(a), Some(b)) => {
                if !a.deep_eq(b) {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Unordered multiset comparison.
///
/// Builds a count-multiset of the right side keyed by element hash, then
/// decrements while scanning the left side; mismatched multiplicity fails on
/// underflow or leftover. Hash-colliding elements share a bucket and are
/// disambiguated with `deep_eq`.
pub fn unordered_eq<'a, T, L, R>(left: L, right: R) -> bool
where
    T: DeepEq + 'a,
    L: IntoIterator<Item = &'a T>,
    R: IntoIterator<Item = &'a T>,
{
    let mut buckets: HashMap<u64, SmallVec<[(&'a T, usize); 1]>> = HashMap::new();
    let mut pending = 0usize;

    for item in right {
        let bucket = buckets.entry(item.deep_hash()).or_default();
        let mut counted = false;
        for entry in bucket.iter_mut() {
            if entry.0.deep_eq(item) {
                entry.1 += 1;
                counted = true;
                break;
            }
        }
        if !counted {
            bucket.push((item, 1));
        }
        pending += 1;
    }

    for item in left {
        let bucket = match buckets.get_mut(&item.deep_hash()) {
            Some(bucket) => bucket,
            None => return false,
        };
        let mut matched = false;
        for entry in bucket.iter_mut() {
            if entry.1 > 0 && entry.0.deep_eq(item) {
                entry.1 -= 1;
                matched = true;
                break;
            }
        }
        if !matched {
            return false;
        }
        pending -= 1;
    }

    pending == 0
}

/// Pairwise key/value comparison ignoring order.
///
/// Same multiset mechanics as [`unordered_eq`], keyed by key hash; a matched
/// key must also carry an equal value.
pub fn map_eq<'a, K, V, L, R>(left: L, right: R) -> bool
where
    K: DeepEq + 'a,
    V: DeepEq + 'a,
    L: IntoIterator<Item = (&'a K, &'a V)>,
    R: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut buckets: HashMap<u64, SmallVec<[((&'a K, &'a V), usize); 1]>> = HashMap::new();
    let mut pending = 0usize;

    for (key, value) in right {
        let bucket = buckets.entry(key.deep_hash()).or_default();
        let mut counted = false;
        for entry in bucket.iter_mut() {
            if (entry.0).0.deep_eq(key) && (entry.0).1.deep_eq(value) {
                entry.1 += 1;
                counted = true;
                break;
            }
        }
        if !counted {
            bucket.push(((key, value), 1));
        }
        pending += 1;
    }

    for (key, value) in left {
        let bucket = match buckets.get_mut(&key.deep_hash()) {
            Some(bucket) => bucket,
            None => return false,
        };
        let mut matched = false;
        for entry in bucket.iter_mut() {
            if entry.1 > 0 && (entry.0).0.deep_eq(key) && (entry.0).1.deep_eq(value) {
                entry.1 -= 1;
                matched = true;
                break;
            }
        }
        if !matched {
            return false;
        }
        pending -= 1;
    }

    pending == 0
}

/// Forward [`DeepEq`] to a type's `PartialEq` and `Hash` impls.
///
/// For leaf types with no container structure of their own. Takes one or
/// more non-generic type names.
#[macro_export]
macro_rules! impl_deep_eq {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::equality::DeepEq for $ty {
                fn deep_eq(&self, other: &Self) -> bool {
                    self == other
                }

                fn deep_hash(&self) -> u64 {
                    use ::std::hash::{Hash, Hasher};
                    let mut hasher = ::std::collections::hash_map::DefaultHasher::new();
                    self.hash(&mut hasher);
                    $crate::equality::hash::finish(hasher.finish())
                }
            }
        )+
    };
}

// ----------------------------------------------------------------------------
// Leaf impls
// ----------------------------------------------------------------------------

macro_rules! impl_deep_eq_unsigned {
    ($($ty:ty),+) => {
        $(
            impl DeepEq for $ty {
                fn deep_eq(&self, other: &Self) -> bool {
                    self == other
                }

                fn deep_hash(&self) -> u64 {
                    hash::finish(*self as u64)
                }
            }
        )+
    };
}

macro_rules! impl_deep_eq_signed {
    ($($ty:ty),+) => {
        $(
            impl DeepEq for $ty {
                fn deep_eq(&self, other: &Self) -> bool {
                    self == other
                }

                fn deep_hash(&self) -> u64 {
                    hash::finish(*self as i64 as u64)
                }
            }
        )+
    };
}

impl_deep_eq_unsigned!(u8, u16, u32, u64, usize, bool, char);
impl_deep_eq_signed!(i8, i16, i32, i64, isize);

impl DeepEq for u128 {
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn deep_hash(&self) -> u64 {
        hash::finish(hash::combine(*self as u64, (*self >> 64) as u64))
    }
}

impl DeepEq for i128 {
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn deep_hash(&self) -> u64 {
        let bits = *self as u128;
        hash::finish(hash::combine(bits as u64, (bits >> 64) as u64))
    }
}

macro_rules! impl_deep_eq_float {
    ($($ty:ty),+) => {
        $(
            impl DeepEq for $ty {
                fn deep_eq(&self, other: &Self) -> bool {
                    // IEEE equality, plus bit-identical NaNs compare equal.
                    self == other || self.to_bits() == other.to_bits()
                }

                fn deep_hash(&self) -> u64 {
                    // Normalize -0.0 so the two zero encodings hash alike.
                    let normalized = if *self == 0.0 { 0.0 } else { *self };
                    hash::finish(normalized.to_bits() as u64)
                }
            }
        )+
    };
}

impl_deep_eq_float!(f32, f64);

impl DeepEq for () {
    fn deep_eq(&self, _other: &Self) -> bool {
        true
    }

    fn deep_hash(&self) -> u64 {
        hash::finish(0)
    }
}

impl DeepEq for str {
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn deep_hash(&self) -> u64 {
        hash::ordered(self.as_bytes().iter().map(|b| *b as u64))
    }
}

impl DeepEq for String {
    fn deep_eq(&self, other: &Self) -> bool {
        self.as_str().deep_eq(other.as_str())
    }

    fn deep_hash(&self) -> u64 {
        self.as_str().deep_hash()
    }
}

// ----------------------------------------------------------------------------
// Wrapper impls
// ----------------------------------------------------------------------------

impl<T: DeepEq + ?Sized> DeepEq for &T {
    fn deep_eq(&self, other: &Self) -> bool {
        (**self).deep_eq(other)
    }

    fn deep_hash(&self) -> u64 {
        (**self).deep_hash()
    }
}

impl<T: DeepEq + ?Sized> DeepEq for Box<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        (**self).deep_eq(other)
    }

    fn deep_hash(&self) -> u64 {
        (**self).deep_hash()
    }
}

impl<T: DeepEq + ?Sized> DeepEq for Arc<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        (**self).deep_eq(other)
    }

    fn deep_hash(&self) -> u64 {
        (**self).deep_hash()
    }
}

impl<T: DeepEq + ?Sized> DeepEq for Rc<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        (**self).deep_eq(other)
    }

    fn deep_hash(&self) -> u64 {
        (**self).deep_hash()
    }
}

impl<T: DeepEq> DeepEq for Option<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.deep_eq(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn deep_hash(&self) -> u64 {
        match self {
            Some(value) => hash::finish(hash::combine(1, value.deep_hash())),
            None => hash::finish(0),
        }
    }
}

macro_rules! impl_deep_eq_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: DeepEq),+> DeepEq for ($($name,)+) {
            fn deep_eq(&self, other: &Self) -> bool {
                $(self.$idx.deep_eq(&other.$idx))&&+
            }

            fn deep_hash(&self) -> u64 {
                let mut combined = 0u64;
                $(combined = hash::combine(combined, self.$idx.deep_hash());)+
                hash::finish(combined)
            }
        }
    };
}

impl_deep_eq_tuple!(A: 0);
impl_deep_eq_tuple!(A: 0, B: 1);
impl_deep_eq_tuple!(A: 0, B: 1, C: 2);
impl_deep_eq_tuple!(A: 0, B: 1, C: 2, D: 3);

// ----------------------------------------------------------------------------
// Sequence impls
// ----------------------------------------------------------------------------

impl<T: DeepEq> DeepEq for [T] {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && sequence_eq(self, other)
    }

    fn deep_hash(&self) -> u64 {
        hash::ordered(self.iter().map(DeepEq::deep_hash))
    }
}

impl<T: DeepEq, const N: usize> DeepEq for [T; N] {
    fn deep_eq(&self, other: &Self) -> bool {
        sequence_eq(self, other)
    }

    fn deep_hash(&self) -> u64 {
        hash::ordered(self.iter().map(DeepEq::deep_hash))
    }
}

impl<T: DeepEq> DeepEq for Vec<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.as_slice().deep_eq(other.as_slice())
    }

    fn deep_hash(&self) -> u64 {
        self.as_slice().deep_hash()
    }
}

impl<T: DeepEq> DeepEq for VecDeque<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && sequence_eq(self, other)
    }

    fn deep_hash(&self) -> u64 {
        hash::ordered(self.iter().map(DeepEq::deep_hash))
    }
}

// ----------------------------------------------------------------------------
// Set impls
// ----------------------------------------------------------------------------

impl<T: DeepEq, S> DeepEq for HashSet<T, S> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && unordered_eq(self, other)
    }

    fn deep_hash(&self) -> u64 {
        hash::unordered(self.iter().map(DeepEq::deep_hash))
    }
}

impl<T: DeepEq> DeepEq for BTreeSet<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && unordered_eq(self, other)
    }

    fn deep_hash(&self) -> u64 {
        hash::unordered(self.iter().map(DeepEq::deep_hash))
    }
}

impl<T: DeepEq, S> DeepEq for IndexSet<T, S> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && unordered_eq(self, other)
    }

    fn deep_hash(&self) -> u64 {
        hash::unordered(self.iter().map(DeepEq::deep_hash))
    }
}

// ----------------------------------------------------------------------------
// Map impls
// ----------------------------------------------------------------------------

/// Per-entry contribution to a map hash; the weights keep key and value
/// hashes from canceling across entries.
fn map_entry_hash<K: DeepEq, V: DeepEq>(key: &K, value: &V) -> u64 {
    key.deep_hash()
        .wrapping_mul(3)
        .wrapping_add(value.deep_hash().wrapping_mul(7))
}

impl<K: DeepEq, V: DeepEq, S> DeepEq for HashMap<K, V, S> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && map_eq(self, other)
    }

    fn deep_hash(&self) -> u64 {
        hash::unordered(self.iter().map(|(k, v)| map_entry_hash(k, v)))
    }
}

impl<K: DeepEq, V: DeepEq> DeepEq for BTreeMap<K, V> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && map_eq(self, other)
    }

    fn deep_hash(&self) -> u64 {
        hash::unordered(self.iter().map(|(k, v)| map_entry_hash(k, v)))
    }
}

impl<K: DeepEq, V: DeepEq, S> DeepEq for IndexMap<K, V, S> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && map_eq(self, other)
    }

    fn deep_hash(&self) -> u64 {
        hash::unordered(self.iter().map(|(k, v)| map_entry_hash(k, v)))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
