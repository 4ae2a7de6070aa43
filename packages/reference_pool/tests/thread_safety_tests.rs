//! Thread safety integration tests for `reference_pool`.
//!
//! These tests race acquire and release of the same types from several threads and verify that
//! the per-type statistics remain consistent afterwards.

#![expect(
    missing_docs,
    reason = "This is a test file, documentation is not required."
)]

use std::sync::{Arc, Barrier};
use std::thread;

use reference_pool::{Reference, ReferencePool};
use testing::with_watchdog;

const THREAD_COUNT: usize = 4;
const ITERATIONS_PER_THREAD: usize = 1_000;

#[derive(Debug, Default)]
struct Projectile {
    owner: usize,
    hits: Vec<u32>,
}

impl Reference for Projectile {
    fn clear(&mut self) {
        self.owner = 0;
        self.hits.clear();
    }
}

#[test]
fn concurrent_acquire_release_keeps_counters_consistent() {
    with_watchdog(|| {
        let pool = ReferencePool::builder().strict_check(true).build();
        let barrier = Arc::new(Barrier::new(THREAD_COUNT));

        let threads: Vec<_> = (0..THREAD_COUNT)
            .map(|thread_index| {
                let pool = pool.clone();
                let barrier = Arc::clone(&barrier);

                thread::spawn(move || {
                    barrier.wait();

                    for iteration in 0..ITERATIONS_PER_THREAD {
                        let mut projectile = pool.acquire::<Projectile>().unwrap();

                        // Every instance handed out must have been cleared.
                        assert_eq!(projectile.owner, 0);
                        assert!(projectile.hits.is_empty());

                        projectile.owner = thread_index.wrapping_add(1);
                        projectile.hits.push(u32::try_from(iteration).unwrap());

                        pool.release(projectile).unwrap();
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }

        let info = pool.snapshot()[0];
        let total = THREAD_COUNT * ITERATIONS_PER_THREAD;

        assert_eq!(info.using_count(), 0);
        assert_eq!(info.acquire_count(), total);
        assert_eq!(info.release_count(), total);

        // Never more instances than threads were in flight at the same time.
        assert!(info.unused_count() <= THREAD_COUNT);
        assert_eq!(info.add_count(), info.unused_count());
    });
}

#[test]
fn instance_acquired_on_one_thread_can_be_released_on_another() {
    with_watchdog(|| {
        let pool = ReferencePool::builder().strict_check(true).build();

        let mut projectile = pool.acquire::<Projectile>().unwrap();
        projectile.owner = 5;

        let releasing_pool = pool.clone();
        thread::spawn(move || releasing_pool.release(projectile).unwrap())
            .join()
            .unwrap();

        let info = pool.snapshot()[0];
        assert_eq!(info.using_count(), 0);
        assert_eq!(info.unused_count(), 1);
    });
}
