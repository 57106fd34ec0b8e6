//! Reader/writer lock with owner-checked write release.
//!
//! [`ReadWriteLock`] is the raw primitive: any number of readers, or exactly
//! one writer, never both. The writer's [`ThreadId`] is recorded so a release
//! from any other thread fails with [`LockError::NotOwner`].
//!
//! [`RwCell`] puts a value behind the lock and hands out RAII guards. Guards
//! are `!Send`, so the thread that acquired a guard is always the one that
//! releases it.
//!
//! There is no fairness: a steady stream of readers can starve a waiting
//! writer.

use super::error::LockError;
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    writer: Option<ThreadId>,
}

/// Multiple readers xor one writer.
#[derive(Debug, Default)]
pub struct ReadWriteLock {
    state: Mutex<LockState>,
    changed: Condvar,
}

impl ReadWriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    // The state mutex only guards two integers and is never held across user
    // code, so a poisoned lock still holds consistent state.
    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block while a writer is active, then register a reader.
    pub fn acquire_read(&self) {
        let mut state = self.state();
        while state.writer.is_some() {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.readers += 1;
    }

    /// Unregister a reader, waking waiters once the last reader leaves.
    pub fn release_read(&self) -> Result<(), LockError> {
        let mut state = self.state();
        if state.readers == 0 {
            return Err(LockError::NotLocked("read"));
        }
        state.readers -= 1;
        if state.readers == 0 {
            self.changed.notify_all();
        }
        Ok(())
    }

    /// Block while any reader or writer is active, then take ownership.
    pub fn acquire_write(&self) {
        let mut state = self.state();
        while state.writer.is_some() || state.readers > 0 {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.writer = Some(thread::current().id());
    }

    /// Release the write lock. Only the owning thread may do this.
    pub fn release_write(&self) -> Result<(), LockError> {
        let caller = thread::current().id();
        let mut state = self.state();
        match state.writer {
            None => Err(LockError::NotLocked("write")),
            Some(owner) if owner != caller => Err(LockError::NotOwner { owner, caller }),
            Some(_) => {
                state.writer = None;
                self.changed.notify_all();
                Ok(())
            }
        }
    }

    /// Number of active readers (diagnostics only, may be stale).
    pub fn readers(&self) -> usize {
        self.state().readers
    }

    /// Whether a writer currently holds the lock (diagnostics only).
    pub fn is_write_locked(&self) -> bool {
        self.state().writer.is_some()
    }
}

/// A value guarded by a [`ReadWriteLock`].
pub struct RwCell<T> {
    lock: ReadWriteLock,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is mediated by `lock`. Shared references only
// exist while the read lock is held and the unique reference only while the
// write lock is held; the two states are mutually exclusive.
unsafe impl<T: Send + Sync> Sync for RwCell<T> {}

impl<T> RwCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            lock: ReadWriteLock::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquire shared access.
    pub fn read(&self) -> ReadGuard<'_, T> {
        self.lock.acquire_read();
        ReadGuard {
            cell: self,
            _not_send: PhantomData,
        }
    }

    /// Acquire exclusive access.
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.lock.acquire_write();
        WriteGuard {
            cell: self,
            _not_send: PhantomData,
        }
    }

    /// The underlying lock, for diagnostics.
    pub fn raw(&self) -> &ReadWriteLock {
        &self.lock
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for RwCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Shared access to the contents of an [`RwCell`].
pub struct ReadGuard<'a, T> {
    cell: &'a RwCell<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the read lock is held for the guard's lifetime.
        unsafe { &*self.cell.value.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.cell.lock.release_read() {
            tracing::error!(%err, "read guard release failed");
        }
    }
}

/// Exclusive access to the contents of an [`RwCell`].
pub struct WriteGuard<'a, T> {
    cell: &'a RwCell<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the write lock is held for the guard's lifetime.
        unsafe { &*self.cell.value.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the write lock is held for the guard's lifetime and the
        // guard is borrowed mutably.
        unsafe { &mut *self.cell.value.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.cell.lock.release_write() {
            tracing::error!(%err, "write guard release failed");
        }
    }
}
