use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::{Backoff, CachePadded};
use palisade_arena::{ArenaOptions, NodeArena, NodeId};

use crate::data_structures::internal::{AtomicMarkedLink, ConcurrentSet, Key, MarkedLink};
use crate::error::{InvariantError, SetError};

///
/// Lock-free sorted list based on Harris's paper 'A Pragmatic Implementation of Non-Blocking Linked-Lists'.
///
// =============================================================================
// REMOVE OPERATION (Two-Phase Delete)
// =============================================================================
//
// The mark bit on node.next means the NODE ITSELF is logically deleted.
//
// Phase 1: LOGICAL DELETE (mark curr.next)
// Phase 2: PHYSICAL UNLINK (CAS pred.next from curr to succ), best effort
//
// Before:  pred ──────► curr ──────► succ
//
// Step 1 - Mark curr:
//          pred ──────► curr ──╳───► succ
//                              │
//                           (marked)
//
// Step 2 - Unlink:
//          pred ─────────────────────► succ
//                       curr ──╳───► succ  (unreachable, stays in the arena)
//
// Only the thread whose marking CAS succeeds is the remover; it alone
// decrements the size counter. If the unlink CAS fails (pred changed or pred
// was itself marked) the node is left for the next locate() to snip out.
//
// =============================================================================
// LOCATE
// =============================================================================
//
// locate(x) finds left (last unmarked node with key < x) and right (first
// unmarked node with key >= x). Everything between them is a run of marked
// nodes, removed with one CAS of left.next from (left_next, unmarked) to
// (right, unmarked). A failed CAS means the neighbourhood changed; restart
// from head.
//
//   left ──► m1(╳) ──► m2(╳) ──► right      =>      left ──────────────► right
//
// INVARIANTS:
// 1. Keys strictly ascend from -inf to +inf along links reachable from head
// 2. A mark is never cleared and marked links are never swung
// 3. Sentinels are never marked
// 4. Nodes are never freed while the set is alive (arena-owned), so there is
//    no ABA on node handles
//
pub struct LockFreeLinkedSet<T> {
    arena: NodeArena<LockFreeNode<T>>,
    head: NodeId,
    size: CachePadded<AtomicUsize>,
}

struct LockFreeNode<T> {
    key: Key<T>,
    next: AtomicMarkedLink,
}

impl<T> LockFreeNode<T> {
    fn new(key: Key<T>, next: NodeId) -> Self {
        LockFreeNode {
            key,
            next: AtomicMarkedLink::new(next),
        }
    }
}

/// Adjacent unmarked (pred, curr) pair bracketing a key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Edge {
    pred: NodeId,
    curr: NodeId,
}

impl<T: Ord> LockFreeLinkedSet<T> {
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
        let tail = arena.alloc(LockFreeNode::new(Key::PosInfinity, NodeId::NIL))?;
        let head = arena.alloc(LockFreeNode::new(Key::NegInfinity, tail))?;

        Ok(LockFreeLinkedSet {
            arena,
            head,
            size: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    #[inline]
    fn node(&self, id: NodeId) -> &LockFreeNode<T> {
        // Safety: every id reachable from `head` was returned by `self.arena`
        // and published by a Release store or AcqRel CAS that the walker
        // observed with an Acquire load.
        unsafe { self.arena.get(id) }
    }

    fn locate(&self, key: &T) -> Edge {
        let backoff = Backoff::new();

        loop {
            let mut left = self.head;
            let mut left_next = NodeId::NIL;

            // Find left and right nodes.
            let mut t = self.head;
            let mut t_next = self.node(t).next.load();
            loop {
                if !t_next.is_marked() {
                    left = t;
                    left_next = t_next.node();
                }
                t = t_next.node();
                let t_node = self.node(t);
                t_next = t_node.next.load();

                if !t_next.is_marked() && !t_node.key.cmp_value(key).is_lt() {
                    break;
                }
            }
            let right = t;

            // Nodes are adjacent.
            if left_next == right {
                if self.node(right).next.is_marked() {
                    continue;
                }
                return Edge {
                    pred: left,
                    curr: right,
                };
            }

            // Snip out the marked run between left and right.
            if self.node(left).next.compare_and_set(
                MarkedLink::unmarked(left_next),
                MarkedLink::unmarked(right),
            ) {
                if self.node(right).next.is_marked() {
                    continue;
                }
                return Edge {
                    pred: left,
                    curr: right,
                };
            }

            tracing::trace!("unlink of marked run failed, restarting traversal");
            backoff.spin();
        }
    }
}

impl<T: Ord> ConcurrentSet<T> for LockFreeLinkedSet<T> {
    fn try_insert(&self, key: T) -> Result<bool, SetError> {
        let mut edge = self.locate(&key);
        if self.node(edge.curr).key.is_value(&key) {
            return Ok(false);
        }

        // Allocate only once the key is known to be absent. If a racer wins
        // before our CAS, the node is abandoned in the arena.
        let inserted = self
            .arena
            .alloc(LockFreeNode::new(Key::Value(key), edge.curr))?;
        let new_node = self.node(inserted);
        let Key::Value(key) = &new_node.key else {
            unreachable!("data nodes always hold a value")
        };

        let backoff = Backoff::new();
        loop {
            if self.node(edge.pred).next.compare_and_set(
                MarkedLink::unmarked(edge.curr),
                MarkedLink::unmarked(inserted),
            ) {
                self.size.fetch_add(1, Ordering::Relaxed);
                return Ok(true);
            }

            backoff.spin();
            edge = self.locate(key);
            if self.node(edge.curr).key.is_value(key) {
                return Ok(false);
            }
            new_node.next.store(edge.curr);
        }
    }

    fn remove(&self, key: &T) -> bool {
        let backoff = Backoff::new();

        loop {
            let edge = self.locate(key);
            let curr = self.node(edge.curr);
            if !curr.key.is_value(key) {
                return false;
            }

            let succ = curr.next.load();
            if succ.is_marked() {
                // A racer marked it first; re-locate to see the outcome.
                backoff.spin();
                continue;
            }

            if !curr.next.compare_and_set(succ, succ.with_mark(true)) {
                backoff.spin();
                continue;
            }

            // This thread is the logical remover.
            self.size.fetch_sub(1, Ordering::Relaxed);

            if !self.node(edge.pred).next.compare_and_set(
                MarkedLink::unmarked(edge.curr),
                MarkedLink::unmarked(succ.node()),
            ) {
                tracing::trace!(?edge, "physical unlink deferred to a later traversal");
            }

            return true;
        }
    }

    // Read-only walk: never helps with unlinking, never restarts.
    //
    fn contains(&self, key: &T) -> bool {
        let mut curr = self.node(self.head).next.node();

        loop {
            let node = self.node(curr);
            let next = node.next.load();

            match node.key.cmp_value(key) {
                std::cmp::Ordering::Less => curr = next.node(),
                std::cmp::Ordering::Equal => return !next.is_marked(),
                std::cmp::Ordering::Greater => return false,
            }
        }
    }

    fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    fn check_invariants(&mut self) -> Result<usize, InvariantError> {
        let head = self.node(self.head);
        if head.key != Key::NegInfinity || head.next.is_marked() {
            return Err(InvariantError::BrokenChain);
        }

        // Marked nodes that were never snipped are still reachable; they keep
        // the order but do not count.
        let max_steps = self.arena.allocated();
        let mut pred = head;
        let mut curr_id = head.next.node();
        let mut counted = 0;

        for position in 0..max_steps {
            if curr_id.is_nil() {
                return Err(InvariantError::BrokenChain);
            }

            let curr = self.node(curr_id);
            let next = curr.next.load();
            if curr.key <= pred.key {
                return Err(InvariantError::Unsorted { position });
            }

            match curr.key {
                Key::PosInfinity => {
                    if next.is_marked() || !next.node().is_nil() {
                        return Err(InvariantError::BrokenChain);
                    }
                    let recorded = self.size();
                    return if counted == recorded {
                        Ok(counted)
                    } else {
                        Err(InvariantError::CountMismatch { counted, recorded })
                    };
                }
                _ if !next.is_marked() => counted += 1,
                _ => {}
            }

            pred = curr;
            curr_id = next.node();
        }

        Err(InvariantError::BrokenChain)
    }
}

impl<T: Ord> Default for LockFreeLinkedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for LockFreeLinkedSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockFreeLinkedSet")
            .field("size", &self.size.load(Ordering::Relaxed))
            .field("arena", &self.arena)
            .finish()
    }
}
