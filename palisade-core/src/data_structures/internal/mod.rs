//! Shared building blocks of the sets.
//!
//! The set implementations depend on these; the public items are re-exported
//! from `data_structures`.

pub mod concurrent_set;
pub mod key;
pub mod marked_link;
pub mod spin_lock;

pub use concurrent_set::ConcurrentSet;
pub use key::Key;
pub use marked_link::{AtomicMarkedLink, MarkedLink};
pub use spin_lock::{SpinLock, SpinLockGuard};
