//! Rows: the unit of work a table tracks.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use crate::sync::{lock_recover_debug, read_recover, write_recover};
use crate::value::{Fields, Value};

/// A snapshot of one row.
///
/// Rows handed out by a table are disconnected copies: mutating one never
/// changes what the table renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    fields: BTreeMap<String, Value>,
    active: bool,
    started: Instant,
    finished: Option<Instant>,
    shift: usize,
}

impl Row {
    pub(crate) fn new(fields: Fields, started: Instant) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            active: true,
            started,
            finished: None,
            shift: 0,
        }
    }

    /// Field value, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a field. Used by adjustment steps; the id field is restored by the
    /// table afterwards.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn started(&self) -> Instant {
        self.started
    }

    #[must_use]
    pub fn finished(&self) -> Option<Instant> {
        self.finished
    }

    /// Lines between this row and the resting cursor as of the last full
    /// render.
    #[must_use]
    pub fn shift(&self) -> usize {
        self.shift
    }

    /// Time from start until finish, or until now for active rows.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.finished
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started)
    }

    pub(crate) fn merge(&mut self, fields: Fields) {
        self.fields.extend(fields);
    }

    pub(crate) fn deactivate(&mut self, at: Instant) {
        self.active = false;
        self.finished = Some(at);
    }
}

/// Engine-side storage for one row.
///
/// `update_lock` serializes updates of this row for the whole
/// mutate-then-render sequence. `data` is only ever held for a copy or a
/// merge, so a full render can read every row without waiting on a worker
/// that is mid-update. `revision` counts writes to `data`.
pub(crate) struct RowSlot {
    pub(crate) key: String,
    update_lock: Mutex<()>,
    data: RwLock<Row>,
    shift: AtomicUsize,
    revision: AtomicU64,
}

impl RowSlot {
    pub(crate) fn new(key: String, row: Row) -> Self {
        Self {
            key,
            update_lock: Mutex::new(()),
            data: RwLock::new(row),
            shift: AtomicUsize::new(0),
            revision: AtomicU64::new(0),
        }
    }

    pub(crate) fn lock_updates(&self) -> MutexGuard<'_, ()> {
        lock_recover_debug(&self.update_lock, "row update")
    }

    pub(crate) fn snapshot(&self) -> Row {
        let mut row = read_recover(&self.data).clone();
        row.shift = self.shift();
        row
    }

    pub(crate) fn with_data_mut<R>(&self, f: impl FnOnce(&mut Row) -> R) -> R {
        let mut data = write_recover(&self.data);
        let result = f(&mut data);
        self.revision.fetch_add(1, Ordering::AcqRel);
        result
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub(crate) fn with_data<R>(&self, f: impl FnOnce(&Row) -> R) -> R {
        f(&read_recover(&self.data))
    }

    pub(crate) fn shift(&self) -> usize {
        self.shift.load(Ordering::Acquire)
    }

    pub(crate) fn set_shift(&self, shift: usize) {
        self.shift.store(shift, Ordering::Release);
    }
}
