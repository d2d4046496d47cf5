use thiserror::Error;

/// Errors reported by the node arena.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// Every slot up to the configured capacity has been handed out.
    #[error("node arena exhausted after {capacity} allocations")]
    Exhausted { capacity: usize },

    /// The requested capacity is zero or does not fit the `NodeId` index space.
    #[error("invalid arena capacity {capacity} (must be between 1 and {max})")]
    InvalidCapacity { capacity: usize, max: usize },
}
