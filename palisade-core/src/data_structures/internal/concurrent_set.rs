use crate::error::{InvariantError, SetError};

/// Membership contract shared by every set in this crate.
///
/// All methods take `&self` and are safe to call from any number of threads.
/// The striped, optimistic and lock-free sets differ only in how they
/// serialize conflicting updates:
///
/// ```text
/// ConcurrentSet<T>
///     │
///     ├── StripedHashSet<T, S>     (stripe locks over a resizable hash table)
///     ├── OptimisticLinkedSet<T>   (unlocked traversal, lock + validate)
///     └── LockFreeLinkedSet<T>     (mark-bit CAS, no locks)
/// ```
///
pub trait ConcurrentSet<T> {
    /// Insert `key`, reporting allocator exhaustion as an error.
    ///
    /// Returns `Ok(true)` if `key` was absent and is now present, `Ok(false)`
    /// if it was already present. On error the set is unchanged.
    ///
    fn try_insert(&self, key: T) -> Result<bool, SetError>;

    /// Insert a value into the set.
    ///
    /// Returns `true` if the value was inserted, `false` if it already exists.
    ///
    /// # Panics
    /// If the node allocator is exhausted.
    ///
    fn insert(&self, key: T) -> bool {
        match self.try_insert(key) {
            Ok(inserted) => inserted,
            Err(err) => panic!("insert failed: {err}"),
        }
    }

    /// Remove a value from the set.
    ///
    /// Returns `true` if the value was present and is now absent.
    ///
    fn remove(&self, key: &T) -> bool;

    fn contains(&self, key: &T) -> bool;

    /// Number of elements, read from the set's counter.
    ///
    /// Not synchronized with concurrent mutators; exact once they have all
    /// completed.
    ///
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Audit the structure while no other thread can touch it.
    ///
    /// Returns the number of live elements found, which must equal `size()`.
    ///
    fn check_invariants(&mut self) -> Result<usize, InvariantError>;
}
