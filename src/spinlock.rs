// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Reader/writer spin lock for state read on every log call.

Readers only increment a counter, so concurrent log calls never block each other and never
allocate.  Writers (administrative calls) wait for readers to drain and hold the lock only for
the table or list mutation itself.  A waiting writer holds off new readers, so a steady stream
of log calls cannot starve it; a thread that already holds a read lock may still nest another
read.  Closures passed to either side must be short and must not take the same lock again for
writing.
*/

use std::cell::{Cell, UnsafeCell};
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

const UNLOCKED: u32 = 0;
//the top bit marks a writer, the next one a waiting writer, the rest count readers
const WRITER: u32 = 1 << 31;
const WRITER_WAITING: u32 = 1 << 30;
const READERS: u32 = WRITER_WAITING - 1;

thread_local! {
    //read locks this thread currently holds, on any RwSpinlock
    static READ_DEPTH: Cell<u32> = const { Cell::new(0) };
}

pub(crate) struct RwSpinlock<T> {
    data: UnsafeCell<T>,
    state: AtomicU32,
}

unsafe impl<T: Send> Send for RwSpinlock<T> {}
unsafe impl<T: Send + Sync> Sync for RwSpinlock<T> {}

impl<T> RwSpinlock<T> {
    pub(crate) const fn new(data: T) -> Self {
        RwSpinlock {
            data: UnsafeCell::new(data),
            state: AtomicU32::new(UNLOCKED),
        }
    }

    fn lock_write(&self) {
        loop {
            let state = self.state.load(Relaxed);
            if state & (WRITER | READERS) == 0 {
                // taking the lock also clears the waiting bit
                if self
                    .state
                    .compare_exchange_weak(state, WRITER, Acquire, Relaxed)
                    .is_ok()
                {
                    return;
                }
            } else if state & WRITER_WAITING == 0 {
                self.state.fetch_or(WRITER_WAITING, Relaxed);
            }
            std::hint::spin_loop();
        }
    }

    fn lock_read(&self) {
        // a nested reader must not wait behind a writer that waits for it
        let nested = READ_DEPTH.with(|depth| depth.get() > 0);
        while self
            .state
            .fetch_update(Acquire, Relaxed, |v| {
                let blocked = v & WRITER != 0 || (v & WRITER_WAITING != 0 && !nested);
                if !blocked && v & READERS < READERS {
                    Some(v + 1)
                } else {
                    None
                }
            })
            .is_err()
        {
            std::hint::spin_loop();
        }
        READ_DEPTH.with(|depth| depth.set(depth.get() + 1));
    }

    /// Exclusive access.  Releases on unwind too.
    pub(crate) fn write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.lock_write();
        let _release = OnDrop(|| self.state.store(UNLOCKED, Release));
        // SAFETY: the writer bit excludes every reader and every other writer.
        unsafe { f(&mut *self.data.get()) }
    }

    /// Shared access.  Any number of readers may hold the lock at once.
    pub(crate) fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.lock_read();
        let _release = OnDrop(|| {
            READ_DEPTH.with(|depth| depth.set(depth.get() - 1));
            self.state.fetch_sub(1, Release);
        });
        // SAFETY: a reader count is held, so no writer can be active.
        unsafe { f(&*self.data.get()) }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RwSpinlock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.read(|data| f.debug_tuple("RwSpinlock").field(data).finish())
    }
}

impl<T: Default> Default for RwSpinlock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Runs its closure on drop, so a panicking reader or writer still releases.
struct OnDrop<F: FnMut()>(F);

impl<F: FnMut()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        (self.0)()
    }
}
