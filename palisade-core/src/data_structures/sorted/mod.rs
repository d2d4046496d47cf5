//! Linked-list sets ordered by key.
//!
//! Both lists keep their nodes in a `NodeArena`, so removed nodes stay
//! readable until the set itself is dropped:
//!
//! - `OptimisticLinkedSet`: unlocked search, per-node spin locks, validation
//! - `LockFreeLinkedSet`: Harris mark-bit protocol, no locks

pub mod lock_free_linked_set;
pub mod optimistic_linked_set;

pub use lock_free_linked_set::LockFreeLinkedSet;
pub use optimistic_linked_set::OptimisticLinkedSet;
