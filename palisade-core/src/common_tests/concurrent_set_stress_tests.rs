//! Common stress tests for ConcurrentSet implementations.
//!
//! These tests verify concurrent correctness under high contention.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use crate::data_structures::ConcurrentSet;

/// Keys nobody modifies must stay visible while neighbours churn
pub fn test_contains_during_modifications<C>()
where
    C: ConcurrentSet<i32> + Default + Send + Sync + 'static,
{
    let set = Arc::new(C::default());
    let stop_flag = Arc::new(AtomicBool::new(false));
    let misses = Arc::new(AtomicUsize::new(0));

    // Even numbers are stable, odd numbers churn
    for i in 0..1000 {
        set.insert(i * 2);
    }

    let mut handles = vec![];

    for t in 0..4 {
        let set = Arc::clone(&set);
        let stop = Arc::clone(&stop_flag);
        handles.push(thread::spawn(move || {
            let mut i = 0;
            while !stop.load(Ordering::Relaxed) {
                let key = ((t * 250 + i) % 1000) * 2 + 1;
                if i % 2 == 0 {
                    set.insert(key);
                } else {
                    set.remove(&key);
                }
                i += 1;
            }
        }));
    }

    for _ in 0..4 {
        let set = Arc::clone(&set);
        let stop = Arc::clone(&stop_flag);
        let misses = Arc::clone(&misses);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                for i in 0..1000 {
                    if !set.contains(&(i * 2)) {
                        misses.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }));
    }

    thread::sleep(Duration::from_millis(200));
    stop_flag.store(true, Ordering::Relaxed);

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(misses.load(Ordering::Relaxed), 0, "stable keys went missing");
    for i in 0..1000 {
        assert!(set.contains(&(i * 2)));
    }
}

/// A completed insert happens-before a contains that starts after it
pub fn test_memory_ordering<C>()
where
    C: ConcurrentSet<i32> + Default + Send + Sync + 'static,
{
    let set = Arc::new(C::default());
    let published = Arc::new(AtomicUsize::new(0));
    let count = 2000;

    let writer = {
        let set = Arc::clone(&set);
        let published = Arc::clone(&published);
        thread::spawn(move || {
            for i in 0..count {
                assert!(set.insert(i));
                published.store(i as usize + 1, Ordering::Release);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let set = Arc::clone(&set);
            let published = Arc::clone(&published);
            thread::spawn(move || {
                loop {
                    let seen = published.load(Ordering::Acquire);
                    for i in 0..seen {
                        assert!(set.contains(&(i as i32)), "published key {} not visible", i);
                    }
                    if seen == count as usize {
                        break;
                    }
                    thread::yield_now();
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

/// Many threads remove the same value repeatedly while one re-inserts it
pub fn test_concurrent_remove_same_value<C>()
where
    C: ConcurrentSet<i32> + Default + Send + Sync + 'static,
{
    let set = Arc::new(C::default());
    let inserted = Arc::new(AtomicUsize::new(0));
    let removed = Arc::new(AtomicUsize::new(0));
    let num_removers = 8;
    let iterations = 10_000;
    let barrier = Arc::new(Barrier::new(num_removers + 1));

    let mut handles = vec![];

    {
        let set = Arc::clone(&set);
        let inserted = Arc::clone(&inserted);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..iterations {
                if set.insert(7) {
                    inserted.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for _ in 0..num_removers {
        let set = Arc::clone(&set);
        let removed = Arc::clone(&removed);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..iterations {
                if set.remove(&7) {
                    removed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // Every successful remove is matched by an earlier successful insert
    let inserted = inserted.load(Ordering::Relaxed);
    let removed = removed.load(Ordering::Relaxed);
    let present = usize::from(set.contains(&7));
    assert_eq!(inserted, removed + present);
    assert_eq!(set.size(), present);
}

/// Insert and remove the same key from every thread as fast as possible
pub fn test_extreme_contention_single_key<C>()
where
    C: ConcurrentSet<i32> + Default + Send + Sync + 'static,
{
    let set = Arc::new(C::default());
    let num_threads = 16;
    let duration = Duration::from_millis(200);

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                let start = Instant::now();
                let mut inserts = 0usize;
                let mut removes = 0usize;
                while start.elapsed() < duration {
                    if set.insert(0) {
                        inserts += 1;
                    }
                    if set.remove(&0) {
                        removes += 1;
                    }
                }
                (inserts, removes)
            })
        })
        .collect();

    let mut total_inserts = 0;
    let mut total_removes = 0;
    for handle in handles {
        let (inserts, removes) = handle.join().unwrap();
        total_inserts += inserts;
        total_removes += removes;
    }

    let present = usize::from(set.contains(&0));
    assert_eq!(total_inserts, total_removes + present);
    assert_eq!(set.size(), present);
}

/// Threads own disjoint key ranges, so each thread's final view is exact
pub fn test_disjoint_ranges_progress<C>()
where
    C: ConcurrentSet<i32> + Default + Send + Sync + 'static,
{
    let set = Arc::new(C::default());
    let num_threads = 8;
    let per_thread = 500;

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                let base = thread_id * per_thread;
                for round in 0..3 {
                    for i in 0..per_thread {
                        assert!(set.insert(base + i), "round {} insert {}", round, base + i);
                    }
                    for i in (0..per_thread).step_by(2) {
                        assert!(set.remove(&(base + i)));
                    }
                    for i in 0..per_thread {
                        assert_eq!(set.contains(&(base + i)), i % 2 == 1);
                    }
                    for i in (1..per_thread).step_by(2) {
                        assert!(set.remove(&(base + i)));
                    }
                }
                for i in 0..per_thread {
                    set.insert(base + i);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut set = Arc::try_unwrap(set).unwrap_or_else(|_| panic!("set still shared"));
    let expected = (num_threads * per_thread) as usize;
    assert_eq!(set.check_invariants(), Ok(expected));
}
