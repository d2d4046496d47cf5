//! Concurrent set implementations.
//!
//! # Organization
//!
//! - [`hash`] - Striped hash set over a resizable bucket table
//! - [`sorted`] - Sorted linked-list sets (optimistic and lock-free)
//! - `internal` - Shared primitives: sentinel keys, marked links, spin locks

pub mod hash;
pub(crate) mod internal;
pub mod sorted;

pub use hash::{StripedHashSet, StripedSetOptions};
pub use sorted::{LockFreeLinkedSet, OptimisticLinkedSet};

pub use internal::{AtomicMarkedLink, ConcurrentSet, Key, MarkedLink, SpinLock, SpinLockGuard};
