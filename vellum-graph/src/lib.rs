//! Incremental computation primitives for the Vellum template compiler.
//!
//! A build cycle re-derives everything from the current inputs, but most
//! inputs do not change between cycles. This crate provides the caching
//! machinery that makes re-derivation cheap:
//!
//! - [`Revision`]: a monotonically increasing cycle counter;
//! - [`Comparer`]: pluggable equality deciding whether a freshly computed
//!   value counts as "changed" for downstream consumers;
//! - [`Slot`]: one cached computation, holding a value, the revision it
//!   last changed at, and the revision it was last verified at;
//! - [`MemoMap`]: keyed slots for per-file computations, with stale-key
//!   pruning;
//! - [`CancellationToken`]: cooperative cancellation; a cancelled
//!   computation never populates a slot.
//!
//! The cutoff rule is the heart of it: when a slot recomputes but its
//! comparer judges the new value equal to the cached one, the cached value
//! (and its `changed_at` revision) is kept, so every downstream slot that
//! keys off that revision also short-circuits.

mod cancel;
mod comparer;
mod memo;
mod revision;
mod slot;

pub use cancel::{Cancelled, CancellationToken};
pub use comparer::{Comparer, FnComparer, RefComparer, ValueComparer};
pub use memo::MemoMap;
pub use revision::Revision;
pub use slot::Slot;
