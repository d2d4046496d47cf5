//! Concurrent sets over three concurrency-control strategies.
//!
//! Every set implements [`ConcurrentSet`]:
//!
//! - [`StripedHashSet`] - a fixed number of stripe locks over a resizable hash table
//! - [`OptimisticLinkedSet`] - sorted list, unlocked search, lock and validate to mutate
//! - [`LockFreeLinkedSet`] - sorted list, Harris mark-bit deletion
//!
//! The linked sets allocate nodes from a `palisade_arena::NodeArena` and
//! never free them individually; dropping the set drops the whole arena.
//!
//! ```
//! use palisade_core::{ConcurrentSet, LockFreeLinkedSet};
//!
//! let set = LockFreeLinkedSet::new();
//! assert!(set.insert(3));
//! assert!(!set.insert(3));
//! assert!(set.contains(&3));
//! assert!(set.remove(&3));
//! assert!(set.is_empty());
//! ```

pub mod common_tests;
pub mod data_structures;
pub mod error;

pub use data_structures::{
    ConcurrentSet, Key, LockFreeLinkedSet, OptimisticLinkedSet, StripedHashSet, StripedSetOptions,
};
pub use error::{ConfigError, InvariantError, SetError};
pub use palisade_arena::{ArenaError, ArenaOptions};
