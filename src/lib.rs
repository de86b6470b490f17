//! rc-weakset: a single-threaded, insertion-ordered set that holds its
//! elements weakly. An element stays observable only while some `Rc`
//! outside the set still owns it; once the last external strong reference
//! drops, the element disappears from the set without explicit removal.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: build WeakSet in safe, verifiable layers so each piece can be
//!   reasoned about independently.
//! - Layers:
//!   - IdentityIndex<S>: hash index from allocation address to the log
//!     sequence number of the element's entry; answers membership in O(1)
//!     average without any bounds on the element type.
//!   - InsertionLog<T>: insertion-ordered record of {weak handle, token}
//!     entries keyed by a monotonically increasing sequence number; the
//!     sole source of truth for iteration order and size.
//!   - ReclaimRegistry<T>: per-entry reclamation subscriptions keyed by
//!     opaque generational tokens; `sweep` unlinks entries whose handles
//!     no longer resolve, outside of any traversal.
//!   - WeakSet<T, S>: public API that composes the three behind a
//!     `RefCell` and drives the lazy-pruning iteration protocol.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by construction (`Rc`, `RefCell`).
//! - Identity semantics: elements compare by `Rc::ptr_eq` only; no
//!   `Eq`/`Hash`/`Ord` bounds on `T`.
//! - A reclaimed element is never yielded, counted, or reported present by
//!   any operation, whether or not `sweep` ever runs.
//! - Iteration order among surviving elements equals insertion order and
//!   is unaffected by removals of other elements.
//! - Sequence numbers are never reused, so traversal cursors survive
//!   arbitrary mutation between steps.
//!
//! Why this split?
//! - Localize invariants: the index never inspects liveness on its own (it
//!   probes through a caller-supplied closure), the log never hashes, and
//!   the registry never touches the other two except through `sweep`'s
//!   callback.
//! - An entry, its index slot, and its registration are created together
//!   by `insert` and destroyed together by exactly one of remove, clear,
//!   lazy prune, or sweep; the losing paths observe nothing to do.
//!
//! Cleanup policy
//! - Lazy pruning during traversal is the only correctness-bearing
//!   cleanup: a stale entry encountered by any traversal (including `len`)
//!   is permanently unlinked before the traversal continues.
//! - `sweep` is best-effort memory hygiene for workloads that mutate a lot
//!   but iterate rarely. Rust has no ambient finalization hook, so the
//!   between-operations notifier becomes an explicit call; timing gets
//!   coarser, guarantees do not.
//!
//! Notes and non-goals
//! - Only `Rc<T>` values can be inserted, so the "not weakly
//!   referenceable" error of similar containers in other runtimes is
//!   unrepresentable here; the crate has no error surface.
//! - `insert` returns `bool` in the `std::collections::HashSet` convention
//!   rather than chaining.
//! - Re-inserting an element whose prior entry is not yet pruned always
//!   mints a fresh handle, token, and sequence number; the element moves
//!   to the back of the iteration order.
//! - No `Clone` for the set; each instance exclusively owns its index,
//!   log, and registry.

mod identity_index;
mod insertion_log;
mod reclaim;
mod weak_set;
mod weak_set_proptest;

// Public surface
pub use weak_set::{Entries, Iter, WeakSet};
