//! Error types for the palisade sets.

use palisade_arena::ArenaError;
use thiserror::Error;

/// Failure of a set operation or constructor.
///
/// Contention and duplicate/absent elements are never errors; they are
/// retried internally or reported through the boolean results.
///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetError {
    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Rejected `StripedSetOptions`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("stripe count must be at least 1")]
    ZeroStripes,

    #[error("initial bucket count must be at least 1")]
    ZeroBuckets,

    #[error("growth factor must be at least 2, got {0}")]
    GrowthFactorTooSmall(usize),

    #[error("max load factor must be positive and finite, got {0}")]
    InvalidLoadFactor(f64),
}

/// Structural defect found by `ConcurrentSet::check_invariants`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("list is not strictly ascending at position {position}")]
    Unsorted { position: usize },

    #[error("list does not run from the -inf sentinel to the +inf sentinel")]
    BrokenChain,

    #[error("logically removed node still reachable at position {position}")]
    RemovedNodeReachable { position: usize },

    #[error("element stored in bucket {bucket} belongs to bucket {expected}")]
    MisplacedElement { bucket: usize, expected: usize },

    #[error("duplicate element in bucket {bucket}")]
    Duplicate { bucket: usize },

    #[error("counted {counted} live elements but the size counter reads {recorded}")]
    CountMismatch { counted: usize, recorded: usize },
}
