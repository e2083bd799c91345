//! The live table: configuration, row set, mutations and accessors.
//!
//! # Locking
//!
//! Two tiers, acquired in this order only:
//!
//! 1. a per-row update lock, held for one `update` call (merge and render);
//! 2. the table-wide lock, held for `append`, `reset`, `refresh` and every
//!    full-table render, including one escalated from a row update.
//!
//! Row data, the row list and the output sink sit behind short-lived leaf
//! locks that are never held while waiting on another lock, so a full render
//! can read every row while other workers are mid-update.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use live_table::{ColumnSpec, Fields, Table, functions};
//!
//! let table = Arc::new(
//!     Table::new()
//!         .column(ColumnSpec::new("file").id())?
//!         .separator(" ")
//!         .column(ColumnSpec::new("progress").func_named("percent").format_named("bar"))?
//!         .inactive_when(functions::flag("done")),
//! );
//!
//! table.append(Fields::new().with("file", "a.iso").with("total", 100))?;
//! table.update(Fields::new().with("file", "a.iso").with("current", 40))?;
//! # Ok::<(), live_table::TableError>(())
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use crate::column::{ColumnModel, ColumnSpec};
use crate::error::{Result, TableError};
use crate::functions::Predicate;
use crate::output::{OutputSink, terminal_width};
use crate::render::in_full_render;
use crate::row::{Row, RowSlot};
use crate::sync::{lock_recover, lock_recover_debug, read_recover, write_recover};
use crate::value::{Fields, Value};

/// Reverse video, the default summary line prefix.
pub const REVERSE_VIDEO: &str = "\x1b[7m";

/// Terminal width query signature.
pub type WidthFn = dyn Fn() -> usize + Send + Sync;

/// Display options.
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Print a summary line below the rows.
    pub show_summary: bool,
    /// Printed before the summary line's content.
    pub summary_prefix: String,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            show_summary: false,
            summary_prefix: REVERSE_VIDEO.to_string(),
        }
    }
}

/// State guarded by the table-wide lock.
#[derive(Debug)]
pub(crate) struct TableState {
    /// Terminal lines already claimed below the table's first line.
    pub(crate) reserved_lines: usize,
}

/// Rows in display order plus an index by id key.
#[derive(Default)]
pub(crate) struct RowSet {
    pub(crate) order: Vec<Arc<RowSlot>>,
    index: HashMap<String, Arc<RowSlot>>,
}

impl RowSet {
    fn insert(&mut self, slot: Arc<RowSlot>) {
        self.index.insert(slot.key.clone(), Arc::clone(&slot));
        self.order.push(slot);
    }

    fn get(&self, key: &str) -> Option<&Arc<RowSlot>> {
        self.index.get(key)
    }

    pub(crate) fn contains(&self, slot: &Arc<RowSlot>) -> bool {
        self.index
            .get(&slot.key)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

/// A status table redrawn in place as workers report progress.
///
/// Configure it with the consuming builder methods (or the `declare_*`
/// methods), then share it (usually behind an [`Arc`]) with the workers that
/// call [`append`](Table::append) and [`update`](Table::update).
pub struct Table {
    pub(crate) columns: ColumnModel,
    pub(crate) options: TableOptions,
    predicate: Predicate,
    width_fn: Arc<WidthFn>,
    pub(crate) state: Mutex<TableState>,
    pub(crate) started: RwLock<Instant>,
    pub(crate) rows: RwLock<RowSet>,
    pub(crate) output: Mutex<OutputSink>,
    pub(crate) summary_values: RwLock<HashMap<String, Value>>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// An unconfigured table drawing to standard output.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(TableOptions::default())
    }

    #[must_use]
    pub fn with_options(options: TableOptions) -> Self {
        Self {
            columns: ColumnModel::new(),
            options,
            predicate: Predicate::never(),
            width_fn: Arc::new(terminal_width),
            state: Mutex::new(TableState { reserved_lines: 0 }),
            started: RwLock::new(Instant::now()),
            rows: RwLock::new(RowSet::default()),
            output: Mutex::new(OutputSink::stdout()),
            summary_values: RwLock::new(HashMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Declare a data column. See [`ColumnModel::declare_column`].
    pub fn declare_column(&mut self, spec: ColumnSpec) -> Result<()> {
        self.columns.declare_column(spec)
    }

    /// Declare a literal separator printed between data columns.
    pub fn declare_separator(&mut self, text: impl Into<String>) {
        self.columns.declare_separator(text);
    }

    /// Builder form of [`declare_column`](Table::declare_column).
    pub fn column(mut self, spec: ColumnSpec) -> Result<Self> {
        self.declare_column(spec)?;
        Ok(self)
    }

    /// Builder form of [`declare_separator`](Table::declare_separator).
    #[must_use]
    pub fn separator(mut self, text: impl Into<String>) -> Self {
        self.declare_separator(text);
        self
    }

    #[must_use]
    pub fn output(self, sink: OutputSink) -> Self {
        *lock_recover(&self.output) = sink;
        self
    }

    /// Replace the terminal width query.
    #[must_use]
    pub fn terminal_width<F>(mut self, f: F) -> Self
    where
        F: Fn() -> usize + Send + Sync + 'static,
    {
        self.width_fn = Arc::new(f);
        self
    }

    /// Predicate deciding, on every update, whether a row becomes inactive.
    #[must_use]
    pub fn inactive_when(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    #[must_use]
    pub fn show_summary(mut self, show: bool) -> Self {
        self.options.show_summary = show;
        self
    }

    #[must_use]
    pub fn summary_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.summary_prefix = prefix.into();
        self
    }

    /// True once an id column has been declared.
    #[must_use]
    pub fn configured(&self) -> bool {
        self.columns.configured()
    }

    /// True when configured and drawing to an interactive sink.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.configured() && lock_recover(&self.output).is_interactive()
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.configured() {
            return Err(TableError::not_ready("no id column declared"));
        }
        if !lock_recover(&self.output).is_interactive() {
            return Err(TableError::not_ready("output is not an interactive terminal"));
        }
        Ok(())
    }

    /// Id column name, id value and index key for `fields`.
    fn identify(&self, fields: &Fields) -> Result<(String, Value, String)> {
        let id_name = self
            .columns
            .id_column()
            .map(|c| c.name().to_string())
            .ok_or_else(|| TableError::not_ready("no id column declared"))?;
        let value = fields
            .get(&id_name)
            .cloned()
            .ok_or_else(|| TableError::invalid(format!("missing id field '{id_name}'")))?;
        let key = value
            .id_key()
            .ok_or_else(|| TableError::invalid(format!("id field '{id_name}' is empty")))?;
        Ok((id_name, value, key))
    }

    pub(crate) fn width_budget(&self) -> usize {
        (self.width_fn)().max(1)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Add a row and redraw the whole table.
    pub fn append(&self, fields: Fields) -> Result<Row> {
        self.append_with(fields, |_| {})
    }

    /// Add a row, letting `adjust` amend it before it is inserted.
    pub fn append_with<F>(&self, fields: Fields, adjust: F) -> Result<Row>
    where
        F: FnOnce(&mut Row),
    {
        self.ensure_ready()?;
        if in_full_render() {
            return Err(TableError::not_ready("append called while the table is rendering"));
        }
        let (id_name, id_value, key) = self.identify(&fields)?;

        let mut state = lock_recover_debug(&self.state, "table append");
        if read_recover(&self.rows).get(&key).is_some() {
            return Err(TableError::invalid(format!("row '{key}' already exists")));
        }

        let mut row = Row::new(fields, Instant::now());
        adjust(&mut row);
        row.set(id_name, id_value);

        let slot = Arc::new(RowSlot::new(key, row));
        write_recover(&self.rows).insert(Arc::clone(&slot));
        log::debug!("appended row '{}'", slot.key);

        self.render_full_locked(&mut state)?;
        Ok(slot.snapshot())
    }

    /// Merge `fields` into an existing row and redraw it.
    pub fn update(&self, fields: Fields) -> Result<Row> {
        self.update_with(fields, |_| {})
    }

    /// Merge `fields` into an existing row, letting `adjust` amend the result.
    ///
    /// Redraws only this row unless the row just became inactive or outgrew
    /// its columns, in which case the whole table is redrawn.
    pub fn update_with<F>(&self, fields: Fields, adjust: F) -> Result<Row>
    where
        F: FnOnce(&mut Row),
    {
        self.ensure_ready()?;
        let (id_name, id_value, key) = self.identify(&fields)?;
        let slot = read_recover(&self.rows)
            .get(&key)
            .cloned()
            .ok_or_else(|| TableError::invalid(format!("no row with id '{key}'")))?;

        let _updating = slot.lock_updates();

        // Callbacks run on a copy so they never hold the row's data lock.
        let mut row = slot.with_data(Row::clone);
        let was_active = row.is_active();
        row.merge(fields);
        adjust(&mut row);
        row.set(id_name, id_value);
        let deactivated = was_active && self.predicate.test(&row);
        if deactivated {
            row.deactivate(Instant::now());
        }
        slot.with_data_mut(|data| *data = row);

        if deactivated {
            log::debug!("row '{key}' finished");
            if !in_full_render() {
                let mut state = lock_recover_debug(&self.state, "row deactivation");
                self.render_full_locked(&mut state)?;
            }
        } else {
            self.render_row(&slot)?;
        }
        Ok(slot.snapshot())
    }

    /// Drop every row and restart the table clock. Columns are kept.
    pub fn reset(&self) {
        let mut state = lock_recover_debug(&self.state, "table reset");
        write_recover(&self.rows).clear();
        *write_recover(&self.started) = Instant::now();
        state.reserved_lines = 0;
        self.columns.reset_widths();
        log::debug!("table reset");
    }

    /// Redraw the whole table, e.g. to tick elapsed-time columns.
    pub fn refresh(&self) -> Result<()> {
        self.ensure_ready()?;
        if in_full_render() {
            return Ok(());
        }
        let mut state = lock_recover_debug(&self.state, "table refresh");
        self.render_full_locked(&mut state)
    }

    /// Pin the summary cell of `column` to `value`.
    pub fn set_summary_value(&self, column: impl Into<String>, value: impl Into<Value>) {
        write_recover(&self.summary_values).insert(column.into(), value.into());
    }

    pub fn clear_summary_value(&self, column: &str) {
        write_recover(&self.summary_values).remove(column);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    fn slot(&self, id: impl Into<Value>) -> Option<Arc<RowSlot>> {
        self.columns.id_column()?;
        let key = id.into().id_key()?;
        read_recover(&self.rows).get(&key).cloned()
    }

    /// Snapshots of every row, in display order as of the last full render
    /// (new rows last until then).
    #[must_use]
    pub fn rows(&self) -> Vec<Row> {
        read_recover(&self.rows)
            .order
            .iter()
            .map(|slot| slot.snapshot())
            .collect()
    }

    /// Snapshot of the row with this id.
    #[must_use]
    pub fn row(&self, id: impl Into<Value>) -> Option<Row> {
        self.slot(id).map(|slot| slot.snapshot())
    }

    #[must_use]
    pub fn active(&self, id: impl Into<Value>) -> Option<bool> {
        self.slot(id).map(|slot| slot.with_data(Row::is_active))
    }

    #[must_use]
    pub fn started(&self, id: impl Into<Value>) -> Option<Instant> {
        self.slot(id).map(|slot| slot.with_data(Row::started))
    }

    /// When the row finished; `None` for unknown or still active rows.
    #[must_use]
    pub fn finished(&self, id: impl Into<Value>) -> Option<Instant> {
        self.slot(id).and_then(|slot| slot.with_data(Row::finished))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        read_recover(&self.rows).order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// When the table started, or was last reset.
    #[must_use]
    pub fn table_started(&self) -> Instant {
        *read_recover(&self.started)
    }

    #[must_use]
    pub fn id_column(&self) -> Option<&str> {
        self.columns.id_column().map(|c| c.name())
    }

    /// Declared data column names, in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.data_columns().map(|c| c.name()).collect()
    }

    /// Width a data column is currently padded to.
    #[must_use]
    pub fn established_width(&self, column: &str) -> Option<usize> {
        self.columns.get(column).map(|c| c.established_width())
    }

    #[must_use]
    pub fn summary_value(&self, column: &str) -> Option<Value> {
        read_recover(&self.summary_values).get(column).cloned()
    }

    #[must_use]
    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    #[must_use]
    pub fn options(&self) -> &TableOptions {
        &self.options
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("columns", &self.columns)
            .field("options", &self.options)
            .field("rows", &self.len())
            .finish_non_exhaustive()
    }
}
