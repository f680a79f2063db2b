// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The administrative lock.

Every administrative operation (level changes, sink and publisher registration, lifecycle
transitions) runs under one process-wide lock.  It is re-entrant: an administrative call made
while another is in progress on the same thread (a backend's initialization logging an error,
a publisher that derives a logger) proceeds instead of deadlocking.

Log calls never take this lock.
*/

use std::marker::PhantomData;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

const UNOWNED: usize = 0;

thread_local! {
    static THREAD_TOKEN: u8 = const { 0 };
}

/// A non-zero value unique to the calling thread among live threads.
fn thread_token() -> usize {
    THREAD_TOKEN.with(|token| token as *const u8 as usize)
}

#[derive(Debug, Default)]
pub(crate) struct ReentrantLock {
    owner: AtomicUsize,
    // only touched by the owning thread
    depth: AtomicUsize,
}

impl ReentrantLock {
    pub(crate) const fn new() -> Self {
        Self {
            owner: AtomicUsize::new(UNOWNED),
            depth: AtomicUsize::new(0),
        }
    }

    pub(crate) fn lock(&self) -> AdminGuard<'_> {
        let me = thread_token();
        // Only this thread can have stored `me`, so a relaxed load is enough to see it.
        if self.owner.load(Relaxed) != me {
            while self
                .owner
                .compare_exchange_weak(UNOWNED, me, Acquire, Relaxed)
                .is_err()
            {
                std::thread::yield_now();
            }
        }
        self.depth.fetch_add(1, Relaxed);
        AdminGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Whether the calling thread currently holds the lock.
    pub(crate) fn held_by_current_thread(&self) -> bool {
        self.owner.load(Relaxed) == thread_token()
    }
}

/// Releases one level of the [ReentrantLock] on drop.
#[must_use]
pub(crate) struct AdminGuard<'a> {
    lock: &'a ReentrantLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for AdminGuard<'_> {
    fn drop(&mut self) {
        if self.lock.depth.fetch_sub(1, Relaxed) == 1 {
            self.lock.owner.store(UNOWNED, Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn same_thread_reenters() {
        let lock = ReentrantLock::new();
        let outer = lock.lock();
        let inner = lock.lock();
        assert!(lock.held_by_current_thread());
        drop(inner);
        assert!(lock.held_by_current_thread());
        drop(outer);
        assert!(!lock.held_by_current_thread());
    }

    #[test]
    fn excludes_other_threads() {
        let lock = Arc::new(ReentrantLock::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let _guard = lock.lock();
                        let _nested = lock.lock();
                        // non-atomic read-modify-write, only correct under mutual exclusion
                        let v = counter.load(Relaxed);
                        std::hint::spin_loop();
                        counter.store(v + 1, Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Relaxed), 800);
    }
}
