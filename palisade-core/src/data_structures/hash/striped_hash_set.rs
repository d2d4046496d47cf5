use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;

use crate::data_structures::hash::StripedSetOptions;
use crate::data_structures::internal::ConcurrentSet;
use crate::error::{InvariantError, SetError};

/// Buckets owned by one stripe, indexed by `bucket / stripe_count`.
type StripeBuckets<T> = Vec<Vec<T>>;

///
/// Hash set with a fixed number of stripe locks over a resizable bucket table.
///
// =============================================================================
// STRIPE LAYOUT
// =============================================================================
//
// The table is split between the stripes instead of being shared, so a stripe
// lock owns its buckets outright:
//
//   bucket b  ──►  stripe b % S, local slot b / S
//
//   S = 4, 8 buckets:
//     stripe 0: [b0, b4]
//     stripe 1: [b1, b5]
//     stripe 2: [b2, b6]
//     stripe 3: [b3, b7]
//
// The initial bucket count is rounded up to a multiple of S and growth is
// integral, so the bucket count stays a multiple of S. `hash % S` then names
// the stripe whatever the current bucket count is, and an operation can take
// its stripe lock before reading the table size.
//
// RESIZE:
// 1. A successful insert reads the load factor under its stripe lock, drops
//    the lock, and only then calls resize (no stripe is held while waiting).
// 2. resize locks stripe 0 and re-checks the load factor against the table it
//    now sees. Another thread may have grown it already.
// 3. The remaining stripes are locked in ascending index order. Every path
//    that holds more than one stripe goes through here, so there is no cycle.
// 4. Every element is rehashed into fresh per-stripe tables of
//    `bucket_count * growth_factor` buckets, which replace the old ones.
//
pub struct StripedHashSet<T, S = RandomState> {
    stripes: Box<[CachePadded<Mutex<StripeBuckets<T>>>]>,
    bucket_count: AtomicUsize,
    size: CachePadded<AtomicUsize>,
    growth_factor: usize,
    max_load_factor: f64,
    hasher: S,
}

impl<T: Hash + Eq> StripedHashSet<T, RandomState> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn with_options(options: StripedSetOptions) -> Result<Self, SetError> {
        Self::with_options_and_hasher(options, RandomState::new())
    }
}

impl<T: Hash + Eq, S: BuildHasher> StripedHashSet<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_options_and_hasher(StripedSetOptions::default(), hasher)
            .expect("default striped set options are valid")
    }

    pub fn with_options_and_hasher(options: StripedSetOptions, hasher: S) -> Result<Self, SetError> {
        options.validate()?;

        let stripe_count = options.stripe_count();
        let bucket_count = options.initial_bucket_count().div_ceil(stripe_count) * stripe_count;
        let stripes = (0..stripe_count)
            .map(|_| CachePadded::new(Mutex::new(empty_buckets(bucket_count / stripe_count))))
            .collect();

        Ok(StripedHashSet {
            stripes,
            bucket_count: AtomicUsize::new(bucket_count),
            size: CachePadded::new(AtomicUsize::new(0)),
            growth_factor: options.growth_factor(),
            max_load_factor: options.max_load_factor(),
            hasher,
        })
    }

    /// Current number of buckets. Grows by `growth_factor`, never shrinks.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count.load(Ordering::Acquire)
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.size() as f64 / self.bucket_count() as f64
    }

    #[inline]
    fn hash(&self, key: &T) -> usize {
        self.hasher.hash_one(key) as usize
    }

    #[inline]
    fn stripe(&self, hash: usize) -> &Mutex<StripeBuckets<T>> {
        &self.stripes[hash % self.stripes.len()]
    }

    // Slot of `hash` inside its stripe, given the stripe's current table.
    #[inline]
    fn local_index(&self, hash: usize, local_len: usize) -> usize {
        let stripe_count = self.stripes.len();
        (hash % (local_len * stripe_count)) / stripe_count
    }

    #[inline]
    fn exceeds_load(&self, size: usize, bucket_count: usize) -> bool {
        size as f64 / bucket_count as f64 > self.max_load_factor
    }

    /// Grow the table if it is still overloaded once stripe 0 is held.
    ///
    /// Blocks every other operation on the set for the duration of the
    /// rehash.
    ///
    fn resize(&self) {
        let stripe_count = self.stripes.len();
        let mut guards = Vec::with_capacity(stripe_count);
        guards.push(self.stripes[0].lock());

        let bucket_count = guards[0].len() * stripe_count;
        let size = self.size();
        if !self.exceeds_load(size, bucket_count) {
            tracing::trace!(bucket_count, size, "resize already done by another thread");
            return;
        }

        guards.extend(self.stripes[1..].iter().map(|stripe| stripe.lock()));

        let new_bucket_count = bucket_count * self.growth_factor;
        let mut fresh: Vec<StripeBuckets<T>> = (0..stripe_count)
            .map(|_| empty_buckets(new_bucket_count / stripe_count))
            .collect();

        for guard in guards.iter_mut() {
            for bucket in guard.drain(..) {
                for key in bucket {
                    let hash = self.hash(&key);
                    let local = (hash % new_bucket_count) / stripe_count;
                    fresh[hash % stripe_count][local].push(key);
                }
            }
        }

        for (guard, buckets) in guards.iter_mut().zip(fresh) {
            **guard = buckets;
        }
        self.bucket_count.store(new_bucket_count, Ordering::Release);

        tracing::debug!(
            old_bucket_count = bucket_count,
            new_bucket_count,
            size,
            "striped set resized"
        );
    }
}

fn empty_buckets<T>(count: usize) -> StripeBuckets<T> {
    (0..count).map(|_| Vec::new()).collect()
}

impl<T: Hash + Eq, S: BuildHasher> ConcurrentSet<T> for StripedHashSet<T, S> {
    fn try_insert(&self, key: T) -> Result<bool, SetError> {
        let hash = self.hash(&key);

        let needs_resize = {
            let mut buckets = self.stripe(hash).lock();
            let local = self.local_index(hash, buckets.len());
            let bucket = &mut buckets[local];
            if bucket.contains(&key) {
                return Ok(false);
            }
            bucket.insert(0, key);

            let size = self.size.fetch_add(1, Ordering::Relaxed) + 1;
            self.exceeds_load(size, buckets.len() * self.stripes.len())
        };

        if needs_resize {
            self.resize();
        }

        Ok(true)
    }

    fn remove(&self, key: &T) -> bool {
        let hash = self.hash(key);
        let mut buckets = self.stripe(hash).lock();
        let local = self.local_index(hash, buckets.len());
        let bucket = &mut buckets[local];

        match bucket.iter().position(|existing| existing == key) {
            Some(position) => {
                bucket.remove(position);
                self.size.fetch_sub(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn contains(&self, key: &T) -> bool {
        let hash = self.hash(key);
        let buckets = self.stripe(hash).lock();
        let local = self.local_index(hash, buckets.len());

        buckets[local].contains(key)
    }

    fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    fn check_invariants(&mut self) -> Result<usize, InvariantError> {
        let stripe_count = self.stripes.len();
        let bucket_count = *self.bucket_count.get_mut();
        let mut counted = 0;

        for (stripe_index, stripe) in self.stripes.iter_mut().enumerate() {
            for (local, bucket) in stripe.get_mut().iter().enumerate() {
                let bucket_index = local * stripe_count + stripe_index;

                for (position, key) in bucket.iter().enumerate() {
                    let expected = self.hasher.hash_one(key) as usize % bucket_count;
                    if expected != bucket_index {
                        return Err(InvariantError::MisplacedElement {
                            bucket: bucket_index,
                            expected,
                        });
                    }
                    if bucket[..position].contains(key) {
                        return Err(InvariantError::Duplicate {
                            bucket: bucket_index,
                        });
                    }
                }

                counted += bucket.len();
            }
        }

        let recorded = self.size();
        if counted != recorded {
            return Err(InvariantError::CountMismatch { counted, recorded });
        }
        Ok(counted)
    }
}

impl<T: Hash + Eq, S: BuildHasher + Default> Default for StripedHashSet<T, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> std::fmt::Debug for StripedHashSet<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripedHashSet")
            .field("size", &self.size.load(Ordering::Relaxed))
            .field("bucket_count", &self.bucket_count.load(Ordering::Relaxed))
            .field("stripe_count", &self.stripes.len())
            .finish()
    }
}
