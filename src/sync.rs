//! Poison-tolerant lock helpers.
//!
//! Workers share one table and run caller-supplied callbacks (formatters,
//! row functions, adjustment steps, predicates) while holding its locks. A
//! panic in one of those must cost the panicking call only, so every lock in
//! the crate is taken through these helpers, which keep the guard of a
//! poisoned lock instead of propagating the poison.
//!
//! Adjustment steps run on a copy of the row, so a panic there leaves the row
//! as it was. A panic while rendering leaves the new field values stored and
//! the screen one frame behind until the next render.
//!
//! | Lock                 | Kind      | Helper                 |
//! |----------------------|-----------|------------------------|
//! | table-wide           | `Mutex`   | [`lock_recover_debug`] |
//! | per-row update       | `Mutex`   | [`lock_recover_debug`] |
//! | row data, row list   | `RwLock`  | [`read_recover`] / [`write_recover`] |
//! | summary overrides    | `RwLock`  | [`read_recover`] / [`write_recover`] |
//! | output sink          | `Mutex`   | [`lock_recover`]       |

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lock a mutex, recovering from poison if necessary.
///
/// # Example
///
/// ```rust
/// use std::sync::Mutex;
/// use live_table::sync::lock_recover;
///
/// let mutex = Mutex::new(42);
/// let guard = lock_recover(&mutex);
/// assert_eq!(*guard, 42);
/// ```
#[inline]
pub fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lock a mutex, logging a warning naming `context` when poison is recovered.
#[inline]
pub fn lock_recover_debug<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| {
        log::warn!("mutex poison recovered at: {context}");
        e.into_inner()
    })
}

/// Acquire a read lock on an `RwLock`, recovering from poison if necessary.
#[inline]
pub fn read_recover<T>(rwlock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquire a write lock on an `RwLock`, recovering from poison if necessary.
#[inline]
pub fn write_recover<T>(rwlock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(PoisonError::into_inner)
}
