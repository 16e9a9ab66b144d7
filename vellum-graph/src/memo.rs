//! Keyed slots for per-file computations.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use crate::{Cancelled, Comparer, Revision, Slot};

/// A map of [`Slot`]s sharing one comparer, keyed by file (or any other
/// per-item key).
///
/// Keys that disappear from the input set are pruned each cycle so deleted
/// files do not pin stale cached output.
pub struct MemoMap<K, T> {
    slots: HashMap<K, Slot<T>>,
    comparer: Arc<dyn Comparer<T>>,
}

impl<K: Eq + Hash + Clone, T> MemoMap<K, T> {
    pub fn new(comparer: Arc<dyn Comparer<T>>) -> Self {
        Self {
            slots: HashMap::new(),
            comparer,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&Arc<T>> {
        self.slots.get(key).and_then(Slot::get)
    }

    /// The revision the keyed value last changed at, or [`Revision::ZERO`]
    /// for a key never computed.
    pub fn changed_at(&self, key: &K) -> Revision {
        self.slots
            .get(key)
            .map(Slot::changed_at)
            .unwrap_or(Revision::ZERO)
    }

    /// Whether the keyed slot would reuse its cached value; see
    /// [`Slot::is_fresh`].
    pub fn is_fresh(&self, key: &K, inputs_changed_at: Revision) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.is_fresh(inputs_changed_at))
    }

    /// Bring one keyed slot up to date; see [`Slot::ensure`].
    pub fn ensure(
        &mut self,
        key: &K,
        inputs_changed_at: Revision,
        revision: Revision,
        compute: impl FnOnce() -> Result<T, Cancelled>,
    ) -> Result<Arc<T>, Cancelled> {
        self.slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(Arc::clone(&self.comparer)))
            .ensure(inputs_changed_at, revision, compute)
    }

    /// Drop slots for keys absent from the current cycle.
    pub fn prune(&mut self, live: impl Fn(&K) -> bool) {
        self.slots.retain(|key, _| live(key));
    }
}

impl<K, T> std::fmt::Debug for MemoMap<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoMap").field("len", &self.slots.len()).finish()
    }
}
