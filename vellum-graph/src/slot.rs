//! A single cached computation.

use std::sync::Arc;

use crate::{Cancelled, Comparer, Revision};

/// One cached computation node.
///
/// A slot remembers the value it last produced, the revision that value last
/// *changed* at, and the revision the slot was last *verified* at. On each
/// cycle [`ensure`](Slot::ensure) recomputes only when some input changed
/// after the last verification; when recomputation yields a value the
/// comparer judges equal to the cached one, the cached allocation is kept
/// and `changed_at` does not move, so dependents short-circuit too.
pub struct Slot<T> {
    value: Option<Arc<T>>,
    changed_at: Revision,
    verified_at: Revision,
    comparer: Arc<dyn Comparer<T>>,
}

impl<T> Slot<T> {
    pub fn new(comparer: Arc<dyn Comparer<T>>) -> Self {
        Self {
            value: None,
            changed_at: Revision::ZERO,
            verified_at: Revision::ZERO,
            comparer,
        }
    }

    /// The cached value, if any cycle has produced one.
    pub fn get(&self) -> Option<&Arc<T>> {
        self.value.as_ref()
    }

    /// The revision the value last changed at.
    pub fn changed_at(&self) -> Revision {
        self.changed_at
    }

    /// Whether [`ensure`](Slot::ensure) would reuse the cached value without
    /// calling `compute`. Lets a driver batch the stale computations of many
    /// slots before applying them.
    pub fn is_fresh(&self, inputs_changed_at: Revision) -> bool {
        self.value.is_some() && inputs_changed_at <= self.verified_at
    }

    /// Bring the slot up to date for `revision`.
    ///
    /// `inputs_changed_at` is the latest `changed_at` of every declared
    /// input. If the cached value was verified at or after that point it is
    /// reused as-is; otherwise `compute` runs. A computation that returns
    /// [`Cancelled`] leaves the slot untouched.
    pub fn ensure(
        &mut self,
        inputs_changed_at: Revision,
        revision: Revision,
        compute: impl FnOnce() -> Result<T, Cancelled>,
    ) -> Result<Arc<T>, Cancelled> {
        if let Some(value) = &self.value
            && inputs_changed_at <= self.verified_at
        {
            let value = Arc::clone(value);
            self.verified_at = revision;
            return Ok(value);
        }

        let new = compute()?;
        self.verified_at = revision;

        match &self.value {
            Some(old) if self.comparer.equal(old, &new) => {
                // Cutoff: keep the old allocation and its changed_at.
                Ok(Arc::clone(old))
            }
            _ => {
                let new = Arc::new(new);
                self.value = Some(Arc::clone(&new));
                self.changed_at = revision;
                Ok(new)
            }
        }
    }
}

impl<T> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("has_value", &self.value.is_some())
            .field("changed_at", &self.changed_at)
            .field("verified_at", &self.verified_at)
            .finish()
    }
}
