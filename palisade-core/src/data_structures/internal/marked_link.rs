// Marked link: a (node, mark) pair packed into one atomic word.
//
// Bit layout of the 64-bit word:
//   Bit 0:     DELETE_MARK - the node owning this link is logically removed
//   Bits 1-32: NodeId of the successor
//
// Packing the handle next to the mark (instead of stealing pointer bits) keeps
// the pair in a single word, so one compare_exchange updates both atomically.
//
use std::sync::atomic::{AtomicU64, Ordering};

use palisade_arena::NodeId;

const DELETE_MARK: u64 = 0b1;
const NODE_SHIFT: u32 = 1;

/// A snapshot of an `AtomicMarkedLink`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MarkedLink {
    node: NodeId,
    marked: bool,
}

impl MarkedLink {
    // =========================================================================
    // Construction
    // =========================================================================

    #[inline]
    pub fn new(node: NodeId, marked: bool) -> Self {
        MarkedLink { node, marked }
    }

    #[inline]
    pub fn unmarked(node: NodeId) -> Self {
        MarkedLink {
            node,
            marked: false,
        }
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Same successor, with the mark set to `mark`.
    #[inline]
    pub fn with_mark(&self, mark: bool) -> Self {
        MarkedLink {
            node: self.node,
            marked: mark,
        }
    }

    // =========================================================================
    // Packing
    // =========================================================================

    #[inline]
    fn pack(self) -> u64 {
        (u64::from(self.node.into_raw()) << NODE_SHIFT) | u64::from(self.marked)
    }

    #[inline]
    fn unpack(bits: u64) -> Self {
        MarkedLink {
            node: NodeId::from_raw((bits >> NODE_SHIFT) as u32),
            marked: bits & DELETE_MARK != 0,
        }
    }
}

/// An atomically updatable (successor, mark) pair.
///
pub struct AtomicMarkedLink {
    bits: AtomicU64,
}

impl AtomicMarkedLink {
    pub fn new(node: NodeId) -> Self {
        AtomicMarkedLink {
            bits: AtomicU64::new(MarkedLink::unmarked(node).pack()),
        }
    }

    /// Load the pair (Acquire ordering)
    #[inline]
    pub fn load(&self) -> MarkedLink {
        MarkedLink::unpack(self.bits.load(Ordering::Acquire))
    }

    /// Store an unmarked successor (Release ordering)
    #[inline]
    pub fn store(&self, node: NodeId) {
        self.bits
            .store(MarkedLink::unmarked(node).pack(), Ordering::Release)
    }

    /// CAS the whole pair (AcqRel/Acquire ordering)
    ///
    /// Succeeds only when both the successor and the mark equal `expected`.
    #[inline]
    pub fn compare_and_set(&self, expected: MarkedLink, desired: MarkedLink) -> bool {
        self.bits
            .compare_exchange(
                expected.pack(),
                desired.pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.load().is_marked()
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.load().node()
    }
}

impl std::fmt::Debug for AtomicMarkedLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.load().fmt(f)
    }
}
