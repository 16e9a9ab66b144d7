//! Pluggable equality for cached computations.

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
};

/// Equality + hash supplied by a node's owner, not the default comparer.
///
/// A comparer must match its node's actual sensitivity. Falling back to
/// reference equality on a freshly-allocated collection silently disables
/// caching for the node and all its descendants; treating non-equivalent
/// values as equal silently produces stale output. Both are correctness
/// bugs, not just performance bugs.
pub trait Comparer<T>: Send + Sync {
    fn equal(&self, a: &T, b: &T) -> bool;

    fn hash_value(&self, value: &T) -> u64;
}

/// Structural value equality via `PartialEq`/`Hash`.
pub struct ValueComparer<T>(PhantomData<fn(T)>);

impl<T> ValueComparer<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ValueComparer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq + Hash + Send + Sync> Comparer<T> for ValueComparer<T> {
    fn equal(&self, a: &T, b: &T) -> bool {
        a == b
    }

    fn hash_value(&self, value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }
}

/// Allocation-identity equality over shared values.
///
/// Appropriate only when an unchanged upstream node is guaranteed to hand
/// back the same allocation, which is exactly what [`Slot`](crate::Slot)
/// cutoff provides.
pub struct RefComparer<T>(PhantomData<fn(T)>);

impl<T> RefComparer<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for RefComparer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> Comparer<Arc<T>> for RefComparer<T> {
    fn equal(&self, a: &Arc<T>, b: &Arc<T>) -> bool {
        Arc::ptr_eq(a, b)
    }

    fn hash_value(&self, value: &Arc<T>) -> u64 {
        Arc::as_ptr(value) as u64
    }
}

/// A comparer built from closures, for node-specific sensitivity.
pub struct FnComparer<T, E, H>
where
    E: Fn(&T, &T) -> bool,
    H: Fn(&T) -> u64,
{
    equal: E,
    hash: H,
    _marker: PhantomData<fn(T)>,
}

impl<T, E, H> FnComparer<T, E, H>
where
    E: Fn(&T, &T) -> bool,
    H: Fn(&T) -> u64,
{
    pub fn new(equal: E, hash: H) -> Self {
        Self {
            equal,
            hash,
            _marker: PhantomData,
        }
    }
}

impl<T, E, H> Comparer<T> for FnComparer<T, E, H>
where
    E: Fn(&T, &T) -> bool + Send + Sync,
    H: Fn(&T) -> u64 + Send + Sync,
{
    fn equal(&self, a: &T, b: &T) -> bool {
        (self.equal)(a, b)
    }

    fn hash_value(&self, value: &T) -> u64 {
        (self.hash)(value)
    }
}
