use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crate::{ArenaError, ArenaOptions};

// Segmented layout
// ================
//
// The arena is a fixed table of lazily allocated segments. Segment `k` holds
// `FIRST_SEGMENT_LEN << k` slots, so the table doubles its capacity with each
// segment and no slot ever moves once written:
//
//   index:   0 ........ 63 | 64 ........ 191 | 192 ........ 447 | ...
//   segment: [     0      ] [       1       ] [        2       ] ...
//
// A slot is claimed with a single fetch_add on `next` (bump allocation) and
// initialized by the claiming thread before its id is returned. Publication
// to other threads happens through whatever atomic the caller stores the id
// into; readers must observe that store with Acquire ordering.
//
const FIRST_SEGMENT_SHIFT: u32 = 6;
const FIRST_SEGMENT_LEN: usize = 1 << FIRST_SEGMENT_SHIFT;
const SEGMENT_COUNT: usize = 27;

type Slot<N> = UnsafeCell<MaybeUninit<N>>;

/// Stable handle to a node allocated from a `NodeArena`.
///
/// Handles are plain indices and fit in 32 bits, which lets callers pack them
/// together with tag bits into a single atomic word.
///
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Reserved handle that never refers to a node ("null").
    pub const NIL: NodeId = NodeId(u32::MAX);

    /// Number of distinct handles that can refer to nodes.
    pub const MAX_COUNT: usize = u32::MAX as usize;

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_nil(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            write!(f, "NodeId(nil)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// Append-only arena of `N` values addressed by `NodeId`.
///
/// - `alloc` is lock-free (one fetch_add plus, at most once per segment, a CAS
///   to install the segment).
/// - Slots are never reused, moved or dropped before the arena itself drops.
/// - Exhaustion is reported as `ArenaError::Exhausted`; the arena stays usable
///   for reads.
///
pub struct NodeArena<N> {
    segments: [AtomicPtr<Slot<N>>; SEGMENT_COUNT],
    next: AtomicUsize,
    capacity: usize,
}

// Safety: values are moved in by `alloc` (Send) and shared by reference with
// every thread that reads through `get` (Sync).
unsafe impl<N: Send> Send for NodeArena<N> {}
unsafe impl<N: Send + Sync> Sync for NodeArena<N> {}

impl<N> NodeArena<N> {
    /// Create an arena spanning the whole `NodeId` index space.
    pub fn new() -> Self {
        Self::with_capacity_unchecked(NodeId::MAX_COUNT)
    }

    pub fn with_options(options: ArenaOptions) -> Result<Self, ArenaError> {
        options.validate()?;
        Ok(Self::with_capacity_unchecked(options.capacity()))
    }

    fn with_capacity_unchecked(capacity: usize) -> Self {
        NodeArena {
            segments: std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
            next: AtomicUsize::new(0),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots handed out so far.
    ///
    /// Slots claimed by allocations still in flight on other threads are
    /// included.
    pub fn allocated(&self) -> usize {
        self.next.load(Ordering::Relaxed).min(self.capacity)
    }

    /// Move `node` into a fresh slot and return its handle.
    ///
    pub fn alloc(&self, node: N) -> Result<NodeId, ArenaError> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        if index >= self.capacity {
            tracing::warn!(capacity = self.capacity, "node arena exhausted");
            return Err(ArenaError::Exhausted {
                capacity: self.capacity,
            });
        }

        let (segment, offset) = Self::locate(index);
        let base = self.segment_or_install(segment);

        // Safety: `index` was claimed exclusively by this call, so no other
        // thread reads or writes this slot until the id is published.
        unsafe {
            let slot = &*base.add(offset);
            (*slot.get()).write(node);
        }

        Ok(NodeId(index as u32))
    }

    /// Get a shared reference to a node.
    ///
    /// # Safety
    /// - `id` must have been returned by `alloc` on this arena
    /// - the calling thread must have observed the publication of `id`
    ///   (an Acquire load of the atomic the allocating thread stored it into,
    ///   or program order on the allocating thread itself)
    ///
    #[inline]
    pub unsafe fn get(&self, id: NodeId) -> &N {
        debug_assert!(!id.is_nil(), "dereferencing the nil node id");
        debug_assert!(id.index() < self.allocated());

        let (segment, offset) = Self::locate(id.index());
        let base = self.segments[segment].load(Ordering::Acquire);
        debug_assert!(!base.is_null());

        // Safety: caller guarantees the slot was initialized and published.
        unsafe { (*(*base.add(offset)).get()).assume_init_ref() }
    }

    // =========================================================================
    // Segment management
    // =========================================================================

    #[inline]
    fn locate(index: usize) -> (usize, usize) {
        let shifted = index + FIRST_SEGMENT_LEN;
        let segment = (usize::BITS - 1 - shifted.leading_zeros() - FIRST_SEGMENT_SHIFT) as usize;
        (segment, shifted - (FIRST_SEGMENT_LEN << segment))
    }

    #[inline]
    fn segment_len(segment: usize) -> usize {
        FIRST_SEGMENT_LEN << segment
    }

    #[inline]
    fn segment_start(segment: usize) -> usize {
        Self::segment_len(segment) - FIRST_SEGMENT_LEN
    }

    fn segment_or_install(&self, segment: usize) -> *mut Slot<N> {
        let current = self.segments[segment].load(Ordering::Acquire);
        if !current.is_null() {
            return current;
        }

        let len = Self::segment_len(segment);
        let fresh = Self::allocate_segment(len);

        match self.segments[segment].compare_exchange(
            ptr::null_mut(),
            fresh,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                tracing::debug!(segment, len, "installed arena segment");
                fresh
            }
            Err(installed) => {
                // Lost the race, another thread installed the segment first.
                unsafe { Self::free_segment(fresh, len) };
                installed
            }
        }
    }

    fn allocate_segment(len: usize) -> *mut Slot<N> {
        let slots: Box<[Slot<N>]> = (0..len)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Box::into_raw(slots) as *mut Slot<N>
    }

    /// # Safety
    /// `base` must come from `allocate_segment(len)` and must not be used afterwards.
    /// Initialized slots are not dropped.
    unsafe fn free_segment(base: *mut Slot<N>, len: usize) {
        unsafe { drop(Box::from_raw(ptr::slice_from_raw_parts_mut(base, len))) };
    }
}

impl<N> Default for NodeArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Drop for NodeArena<N> {
    fn drop(&mut self) {
        // With `&mut self` every alloc has returned, so slots below the bump
        // counter are initialized.
        let initialized = (*self.next.get_mut()).min(self.capacity);

        for (segment, slot_ptr) in self.segments.iter_mut().enumerate() {
            let base = *slot_ptr.get_mut();
            if base.is_null() {
                continue;
            }

            let len = Self::segment_len(segment);
            let live = initialized
                .saturating_sub(Self::segment_start(segment))
                .min(len);

            unsafe {
                for offset in 0..live {
                    let slot = &mut *base.add(offset);
                    slot.get_mut().assume_init_drop();
                }
                Self::free_segment(base, len);
            }
        }
    }
}

impl<N> fmt::Debug for NodeArena<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeArena")
            .field("allocated", &self.allocated())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[rstest]
    #[case(0, (0, 0))]
    #[case(63, (0, 63))]
    #[case(64, (1, 0))]
    #[case(191, (1, 127))]
    #[case(192, (2, 0))]
    #[case(NodeId::MAX_COUNT - 1, (26, NodeId::MAX_COUNT - 1 - ((64 << 26) - 64)))]
    fn locate_maps_index_to_segment(#[case] index: usize, #[case] expected: (usize, usize)) {
        assert_eq!(NodeArena::<u8>::locate(index), expected);
    }

    #[test]
    fn allocations_are_stable_across_segment_growth() {
        let arena: NodeArena<usize> = NodeArena::new();

        let ids: Vec<_> = (0..1000).map(|i| arena.alloc(i).unwrap()).collect();
        let first = unsafe { arena.get(ids[0]) } as *const usize;

        for (i, id) in ids.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(unsafe { *arena.get(*id) }, i);
        }

        // Growing into later segments never moves earlier slots.
        assert_eq!(unsafe { arena.get(ids[0]) } as *const usize, first);
        assert_eq!(arena.allocated(), 1000);
    }

    #[test]
    fn exhaustion_is_reported_and_reads_still_work() {
        let arena: NodeArena<u32> =
            NodeArena::with_options(ArenaOptions::new().with_capacity(3)).unwrap();

        let ids: Vec<_> = (0..3).map(|i| arena.alloc(i).unwrap()).collect();
        assert_eq!(arena.alloc(99), Err(ArenaError::Exhausted { capacity: 3 }));
        assert_eq!(arena.alloc(100), Err(ArenaError::Exhausted { capacity: 3 }));

        assert_eq!(arena.allocated(), 3);
        assert_eq!(unsafe { *arena.get(ids[2]) }, 2);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let result = NodeArena::<u32>::with_options(ArenaOptions::new().with_capacity(0));
        assert!(matches!(result, Err(ArenaError::InvalidCapacity { .. })));
    }

    #[test]
    fn concurrent_allocations_get_distinct_ids() {
        let arena: Arc<NodeArena<(usize, usize)>> = Arc::new(NodeArena::new());
        let num_threads = 8;
        let per_thread = 2000;

        let handles: Vec<_> = (0..num_threads)
            .map(|t| {
                let arena = Arc::clone(&arena);
                thread::spawn(move || {
                    (0..per_thread)
                        .map(|i| (arena.alloc((t, i)).unwrap(), (t, i)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for (id, value) in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {:?}", id);
                assert_eq!(unsafe { *arena.get(id) }, value);
            }
        }

        assert_eq!(seen.len(), num_threads * per_thread);
    }

    #[test]
    fn drop_releases_every_node() {
        struct Tracked(Arc<AtomicUsize>);

        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let dropped = Arc::new(AtomicUsize::new(0));
        {
            let arena = NodeArena::new();
            for _ in 0..300 {
                arena.alloc(Tracked(Arc::clone(&dropped))).unwrap();
            }
            assert_eq!(dropped.load(Ordering::Relaxed), 0);
        }

        assert_eq!(dropped.load(Ordering::Relaxed), 300);
    }
}
