//! Node arena for the palisade collections.
//!
//! This crate provides `NodeArena`, an append-only allocator that hands out
//! stable `NodeId` handles. Slots are never relocated and never freed while
//! the arena is alive; dropping the arena releases every node at once.
//!
//! # Usage
//!
//! ```
//! use palisade_arena::NodeArena;
//!
//! let arena: NodeArena<u64> = NodeArena::new();
//! let id = arena.alloc(42).unwrap();
//!
//! // Safety: `id` was returned by this arena on this thread.
//! assert_eq!(unsafe { *arena.get(id) }, 42);
//! ```

pub mod arena_options;
pub mod error;
pub mod node_arena;

pub use arena_options::ArenaOptions;
pub use error::ArenaError;
pub use node_arena::{NodeArena, NodeId};
