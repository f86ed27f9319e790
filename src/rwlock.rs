//! A writer-preferring many-reader / single-writer lock.
//!
//! `parking_lot::RwLock` is a task-fair lock, not a writer-preferring
//! one — a long run of readers can still starve a waiting writer, which
//! is exactly what this component exists to prevent (rebuilding the
//! index must not wait forever behind a steady stream of searches).
//! So instead of reaching for `parking_lot::RwLock` directly, this is
//! built from its `Mutex`/`Condvar` primitives — the same "cheap
//! uncontended CAS, no OS futex on the fast path" properties
//! `parking_lot` is chosen for elsewhere in this crate — with the state
//! machine hand-rolled on top to get the exact preference policy this
//! lock needs to provide.
//!
//! Both [`RwLock::read`] and [`RwLock::write`] hand out RAII guards —
//! there is no API that returns a raw, droppable-by-forgetting token.

use parking_lot::{Condvar, Mutex};

struct State {
    readers: u32,
    writer_active: bool,
    writers_waiting: u32,
}

/// Writer-preferring reader/writer lock around a `T`.
pub struct RwLock<T> {
    state: Mutex<State>,
    readers_released: Condvar,
    writer_released: Condvar,
    data: std::cell::UnsafeCell<T>,
}

// SAFETY: access to `data` is only ever granted through guards that hold
// the appropriate share of `state`, which serializes all mutation.
unsafe impl<T: Send> Send for RwLock<T> {}
unsafe impl<T: Send> Sync for RwLock<T> {}

impl<T> RwLock<T> {
    /// Wraps `value` in a fresh, uncontended lock.
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(State {
                readers: 0,
                writer_active: false,
                writers_waiting: 0,
            }),
            readers_released: Condvar::new(),
            writer_released: Condvar::new(),
            data: std::cell::UnsafeCell::new(value),
        }
    }

    /// Acquires the lock for shared (read) access.
    ///
    /// Blocks while a writer holds the lock *or* a writer is waiting —
    /// the writer-preference guarantee. Returns a guard that releases
    /// on drop.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut state = self.state.lock();
        while state.writer_active || state.writers_waiting > 0 {
            self.writer_released.wait(&mut state);
        }
        state.readers += 1;
        ReadGuard { lock: self }
    }

    /// Acquires the lock for exclusive (write) access.
    ///
    /// Blocks until no readers and no other writer are active, then
    /// enters alone. Registers as "waiting" immediately so that any
    /// reader arriving after this call blocks behind it.
    pub fn write(&self) -> WriteGuard<'_, T> {
        let mut state = self.state.lock();
        state.writers_waiting += 1;
        while state.readers > 0 || state.writer_active {
            self.readers_released.wait(&mut state);
        }
        state.writers_waiting -= 1;
        state.writer_active = true;
        WriteGuard { lock: self }
    }
}

/// RAII guard granting shared access. Releasing (on drop) wakes a
/// waiting writer once the last reader departs.
pub struct ReadGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> std::ops::Deref for ReadGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: holding a ReadGuard means `state.readers > 0`, which
        // excludes any WriteGuard from existing concurrently.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.lock.state.lock();
        state.readers -= 1;
        if state.readers == 0 {
            self.lock.readers_released.notify_one();
        }
    }
}

/// RAII guard granting exclusive access. Releasing (on drop) wakes every
/// waiting reader and writer so the next in line — per the lock's
/// internal state — can proceed.
pub struct WriteGuard<'a, T> {
    lock: &'a RwLock<T>,
}

impl<T> std::ops::Deref for WriteGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: holding a WriteGuard means `state.writer_active` and
        // no reader can observe `data` concurrently.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> std::ops::DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: see Deref above; exclusivity additionally grants &mut.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.lock.state.lock();
        state.writer_active = false;
        // Wake both: a waiting writer re-checks `writers_waiting` via
        // `writer_released`-gated readers falling back asleep if one
        // beats it to the mutex, and a waiting writer is woken through
        // `readers_released` since that is what its `write()` loop polls.
        self.lock.readers_released.notify_one();
        self.lock.writer_released.notify_all();
    }
}
