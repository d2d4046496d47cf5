use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;
use palisade_arena::{ArenaOptions, NodeArena, NodeId};

use crate::data_structures::internal::{ConcurrentSet, Key, SpinLock};
use crate::error::{InvariantError, SetError};

///
/// Sorted singly linked list with optimistic fine-grained locking.
///
// =============================================================================
// OPTIMISTIC PROTOCOL
// =============================================================================
//
// List Structure (sorted ascending, bounded by two sentinels):
// ┌──────┐    ┌──────┐    ┌──────┐    ┌──────┐
// │ -inf │───►│  10  │───►│  20  │───►│ +inf │───► NIL
// └──────┘    └──────┘    └──────┘    └──────┘
//
// 1. locate: walk WITHOUT locks to the edge (pred, curr) with
//    pred.key < x <= curr.key.
// 2. lock: insert locks pred; remove locks pred then curr. Keys strictly
//    increase along any edge, so every thread takes node locks in ascending
//    key order and two-lock holders cannot form a cycle.
// 3. validate: pred.next == curr and neither node is removed. Between the
//    unlocked walk and the locks anything may have changed; a stale edge is
//    never mutated, the whole operation restarts instead.
//
// Remove sets `removed` BEFORE splicing, so a concurrent validate on an edge
// ending or starting at the victim fails. The victim keeps its next pointer,
// which lets unlocked walkers standing on it continue into the live list.
//
// Nodes are arena-owned and never freed while the set is alive, so walkers
// never read reclaimed memory.
//
// INVARIANTS:
// 1. Keys strictly ascend from -inf to +inf along live links
// 2. Sentinels are never removed
// 3. `removed` is only ever set, under both locks of the removing edge
//
pub struct OptimisticLinkedSet<T> {
    arena: NodeArena<OptimisticNode<T>>,
    head: NodeId,
    size: CachePadded<AtomicUsize>,
}

struct OptimisticNode<T> {
    key: Key<T>,
    next: AtomicU32,
    lock: SpinLock,
    removed: AtomicBool,
}

impl<T> OptimisticNode<T> {
    fn new(key: Key<T>, next: NodeId) -> Self {
        OptimisticNode {
            key,
            next: AtomicU32::new(next.into_raw()),
            lock: SpinLock::new(),
            removed: AtomicBool::new(false),
        }
    }

    /// Load next pointer (Acquire ordering)
    #[inline]
    fn next(&self) -> NodeId {
        NodeId::from_raw(self.next.load(Ordering::Acquire))
    }

    /// Store next pointer (Release ordering)
    #[inline]
    fn set_next(&self, next: NodeId) {
        self.next.store(next.into_raw(), Ordering::Release)
    }

    #[inline]
    fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

/// Adjacent (pred, curr) pair bracketing a key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Edge {
    pred: NodeId,
    curr: NodeId,
}

impl<T: Ord> OptimisticLinkedSet<T> {
    pub fn new() -> Self {
        Self::with_options(ArenaOptions::default())
            .expect("default arena always holds the sentinels")
    }

    /// Create a set whose node arena is limited by `options`.
    ///
    /// The two sentinels take two slots of the arena's capacity.
    ///
    pub fn with_options(options: ArenaOptions) -> Result<Self, SetError> {
        let arena = NodeArena::with_options(options)?;
        let tail = arena.alloc(OptimisticNode::new(Key::PosInfinity, NodeId::NIL))?;
        let head = arena.alloc(OptimisticNode::new(Key::NegInfinity, tail))?;

        Ok(OptimisticLinkedSet {
            arena,
            head,
            size: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    #[inline]
    fn node(&self, id: NodeId) -> &OptimisticNode<T> {
        // Safety: every id reachable from `head` was returned by `self.arena`
        // and published through a Release store that the walker Acquire-loaded.
        unsafe { self.arena.get(id) }
    }

    // Searching for the edge without locking any nodes.
    //
    fn locate(&self, key: &T) -> Edge {
        let mut pred = self.head;
        let mut curr = self.node(pred).next();

        while self.node(curr).key.cmp_value(key).is_lt() {
            pred = curr;
            curr = self.node(curr).next();
        }

        Edge { pred, curr }
    }

    // Must be called with the edge's locks held.
    //
    fn validate(&self, edge: Edge) -> bool {
        let pred = self.node(edge.pred);
        let curr = self.node(edge.curr);

        !pred.is_removed() && !curr.is_removed() && pred.next() == edge.curr
    }
}

impl<T: Ord> ConcurrentSet<T> for OptimisticLinkedSet<T> {
    fn try_insert(&self, key: T) -> Result<bool, SetError> {
        loop {
            let edge = self.locate(&key);
            let pred = self.node(edge.pred);
            let _pred_guard = pred.lock.lock();

            if !self.validate(edge) {
                tracing::trace!(?edge, "insert validation failed, retrying");
                continue;
            }

            if self.node(edge.curr).key.is_value(&key) {
                return Ok(false);
            }

            // Allocation happens under the lock on a validated edge, so an
            // exhausted arena leaves the list untouched.
            let inserted = self
                .arena
                .alloc(OptimisticNode::new(Key::Value(key), edge.curr))?;
            pred.set_next(inserted);
            self.size.fetch_add(1, Ordering::Relaxed);

            return Ok(true);
        }
    }

    fn remove(&self, key: &T) -> bool {
        loop {
            let edge = self.locate(key);
            let pred = self.node(edge.pred);
            let curr = self.node(edge.curr);
            let _pred_guard = pred.lock.lock();
            let _curr_guard = curr.lock.lock();

            if !self.validate(edge) {
                tracing::trace!(?edge, "remove validation failed, retrying");
                continue;
            }

            if !curr.key.is_value(key) {
                return false;
            }

            curr.removed.store(true, Ordering::Release);
            pred.set_next(curr.next());
            self.size.fetch_sub(1, Ordering::Relaxed);

            return true;
        }
    }

    fn contains(&self, key: &T) -> bool {
        let edge = self.locate(key);
        let curr = self.node(edge.curr);

        curr.key.is_value(key) && !curr.is_removed()
    }

    fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    fn check_invariants(&mut self) -> Result<usize, InvariantError> {
        let head = self.node(self.head);
        if head.key != Key::NegInfinity {
            return Err(InvariantError::BrokenChain);
        }

        // A well-formed chain visits each node at most once.
        let max_steps = self.arena.allocated();
        let mut pred = head;
        let mut curr_id = head.next();
        let mut counted = 0;

        for position in 0..max_steps {
            if curr_id.is_nil() {
                return Err(InvariantError::BrokenChain);
            }

            let curr = self.node(curr_id);
            if curr.key <= pred.key {
                return Err(InvariantError::Unsorted { position });
            }
            if curr.is_removed() {
                return Err(InvariantError::RemovedNodeReachable { position });
            }

            match curr.key {
                Key::PosInfinity => {
                    if !curr.next().is_nil() {
                        return Err(InvariantError::BrokenChain);
                    }
                    let recorded = self.size();
                    return if counted == recorded {
                        Ok(counted)
                    } else {
                        Err(InvariantError::CountMismatch { counted, recorded })
                    };
                }
                _ => counted += 1,
            }

            pred = curr;
            curr_id = curr.next();
        }

        Err(InvariantError::BrokenChain)
    }
}

impl<T: Ord> Default for OptimisticLinkedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for OptimisticLinkedSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisticLinkedSet")
            .field("size", &self.size.load(Ordering::Relaxed))
            .field("arena", &self.arena)
            .finish()
    }
}
