use crate::ArenaError;
use crate::node_arena::NodeId;

/// Options used to create a `NodeArena`.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaOptions {
    capacity: usize,
}

impl ArenaOptions {
    pub fn new() -> Self {
        ArenaOptions {
            capacity: NodeId::MAX_COUNT,
        }
    }

    /// Limits the number of nodes the arena will ever hand out.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.capacity == 0 || self.capacity > NodeId::MAX_COUNT {
            return Err(ArenaError::InvalidCapacity {
                capacity: self.capacity,
                max: NodeId::MAX_COUNT,
            });
        }
        Ok(())
    }
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self::new()
    }
}
