//! Column declarations and the validated column model.
//!
//! Columns are declared through [`ColumnSpec`] while the table is still being
//! configured. Declaration resolves every named reference (formatter, row
//! function, aggregate, alignment) up front, so an unknown name fails at the
//! call that introduced it and rendering only ever sees resolved variants.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cells::{Align, width};
use crate::error::{Result, TableError};
use crate::format::Formatter;
use crate::functions::{Aggregate, RowFunc, SummaryContext};
use crate::row::Row;
use crate::value::{Cell, Value};

/// Either a built-in looked up by name at declaration time, or a value given
/// directly.
#[derive(Debug, Clone)]
pub enum Reference<T> {
    Named(String),
    Given(T),
}

impl<T> Reference<T> {
    fn resolve(self, kind: &str, lookup: impl FnOnce(&str) -> Option<T>) -> Result<T> {
        match self {
            Self::Given(value) => Ok(value),
            Self::Named(name) => lookup(&name)
                .ok_or_else(|| TableError::invalid(format!("unknown {kind} '{name}'"))),
        }
    }
}

/// Declaration of one data column.
///
/// ```rust
/// use live_table::{Align, ColumnSpec};
///
/// let spec = ColumnSpec::new("size")
///     .format_named("bytes")
///     .align(Align::Right)
///     .summary_named("sum");
/// ```
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    name: String,
    is_id: bool,
    func: Option<Reference<RowFunc>>,
    format: Option<Reference<Formatter>>,
    width: Option<usize>,
    align: Reference<Align>,
    summary: Option<Reference<Aggregate>>,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_id: false,
            func: None,
            format: None,
            width: None,
            align: Reference::Given(Align::Left),
            summary: None,
        }
    }

    /// Mark this column as the table's id column.
    #[must_use]
    pub fn id(mut self) -> Self {
        self.is_id = true;
        self
    }

    /// Compute the cell from the whole row instead of reading `name`.
    #[must_use]
    pub fn func<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) -> Cell + Send + Sync + 'static,
    {
        self.func = Some(Reference::Given(RowFunc::custom(f)));
        self
    }

    /// Use a built-in row function (`elapsed`, `percent`, `speed`).
    #[must_use]
    pub fn func_named(mut self, name: impl Into<String>) -> Self {
        self.func = Some(Reference::Named(name.into()));
        self
    }

    #[must_use]
    pub fn format<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.format = Some(Reference::Given(Formatter::custom(f)));
        self
    }

    /// Use a built-in formatter (`duration`, `percent`, `bar`, `bytes`, `float`).
    #[must_use]
    pub fn format_named(mut self, name: impl Into<String>) -> Self {
        self.format = Some(Reference::Named(name.into()));
        self
    }

    #[must_use]
    pub fn formatter(mut self, formatter: Formatter) -> Self {
        self.format = Some(Reference::Given(formatter));
        self
    }

    /// Fix the column to exactly `cells` wide; longer values get an ellipsis.
    #[must_use]
    pub fn width(mut self, cells: usize) -> Self {
        self.width = Some(cells);
        self
    }

    #[must_use]
    pub fn align(mut self, align: Align) -> Self {
        self.align = Reference::Given(align);
        self
    }

    /// Alignment by name: `left`, `right` or `center`.
    #[must_use]
    pub fn align_named(mut self, name: impl Into<String>) -> Self {
        self.align = Reference::Named(name.into());
        self
    }

    #[must_use]
    pub fn summary(mut self, aggregate: Aggregate) -> Self {
        self.summary = Some(Reference::Given(aggregate));
        self
    }

    #[must_use]
    pub fn summary_fn<F>(self, f: F) -> Self
    where
        F: Fn(&SummaryContext<'_>) -> Cell + Send + Sync + 'static,
    {
        self.summary(Aggregate::custom(f))
    }

    /// Use a built-in aggregate (`sum`, `avg`, `min`, `max`, `count`,
    /// `active`, `elapsed`).
    #[must_use]
    pub fn summary_named(mut self, name: impl Into<String>) -> Self {
        self.summary = Some(Reference::Named(name.into()));
        self
    }
}

/// A validated data column.
#[derive(Debug)]
pub struct DataColumn {
    name: String,
    is_id: bool,
    func: Option<RowFunc>,
    format: Formatter,
    width: Option<usize>,
    align: Align,
    summary: Option<Aggregate>,
    established: AtomicUsize,
}

impl DataColumn {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_id(&self) -> bool {
        self.is_id
    }

    /// Configured fixed width, if any.
    #[must_use]
    pub fn fixed_width(&self) -> Option<usize> {
        self.width
    }

    #[must_use]
    pub fn alignment(&self) -> Align {
        self.align
    }

    /// Width all lines are padded to, as of the last full render.
    #[must_use]
    pub fn established_width(&self) -> usize {
        self.established.load(Ordering::Acquire)
    }

    pub(crate) fn set_established_width(&self, cells: usize) {
        self.established.store(cells, Ordering::Release);
    }

    pub(crate) fn summary(&self) -> Option<&Aggregate> {
        self.summary.as_ref()
    }

    pub(crate) fn formatter(&self) -> &Formatter {
        &self.format
    }

    /// The row's cell for this column: computed by `func`, else read by name.
    pub(crate) fn raw_cell(&self, row: &Row) -> Cell {
        match &self.func {
            Some(func) => func.apply(row),
            None => Cell::Value(row.get(&self.name).cloned().unwrap_or_default()),
        }
    }
}

/// One entry of the column layout.
#[derive(Debug)]
pub enum ColumnDef {
    /// Decorative text printed verbatim between data columns.
    Separator(String),
    Data(DataColumn),
}

impl ColumnDef {
    #[must_use]
    pub fn as_data(&self) -> Option<&DataColumn> {
        match self {
            Self::Data(column) => Some(column),
            Self::Separator(_) => None,
        }
    }

    /// Separator text width, or the data column's established width.
    #[must_use]
    pub fn layout_width(&self) -> usize {
        match self {
            Self::Separator(text) => width(text),
            Self::Data(column) => column.established_width(),
        }
    }
}

/// Ordered, validated column layout.
#[derive(Debug, Default)]
pub struct ColumnModel {
    defs: Vec<ColumnDef>,
    id: Option<usize>,
}

impl ColumnModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `spec` and append it. Nothing is changed when validation fails.
    pub fn declare_column(&mut self, spec: ColumnSpec) -> Result<()> {
        let ColumnSpec {
            name,
            is_id,
            func,
            format,
            width,
            align,
            summary,
        } = spec;

        if name.is_empty() {
            return Err(TableError::invalid("column name must not be empty"));
        }
        if self.get(&name).is_some() {
            return Err(TableError::invalid(format!("column '{name}' already declared")));
        }
        if is_id && let Some(existing) = self.id_column() {
            return Err(TableError::invalid(format!(
                "column '{name}' cannot be the id column, '{}' already is",
                existing.name()
            )));
        }
        if width == Some(0) {
            return Err(TableError::invalid(format!(
                "column '{name}' fixed width must be at least 1"
            )));
        }

        let func = func
            .map(|f| f.resolve("row function", RowFunc::named))
            .transpose()?;
        let format = format
            .map(|f| f.resolve("formatter", Formatter::named))
            .transpose()?
            .unwrap_or_default();
        let summary = summary
            .map(|s| s.resolve("aggregate", Aggregate::named))
            .transpose()?;
        let align = align.resolve("alignment", |s| s.parse().ok())?;

        if is_id {
            self.id = Some(self.defs.len());
        }
        self.defs.push(ColumnDef::Data(DataColumn {
            name,
            is_id,
            func,
            format,
            width,
            align,
            summary,
            established: AtomicUsize::new(0),
        }));
        Ok(())
    }

    pub fn declare_separator(&mut self, text: impl Into<String>) {
        self.defs.push(ColumnDef::Separator(text.into()));
    }

    /// True once an id column exists.
    #[must_use]
    pub fn configured(&self) -> bool {
        self.id.is_some() && !self.defs.is_empty()
    }

    #[must_use]
    pub fn id_column(&self) -> Option<&DataColumn> {
        self.id.and_then(|idx| self.defs.get(idx)).and_then(ColumnDef::as_data)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataColumn> {
        self.data_columns().find(|c| c.name() == name)
    }

    #[must_use]
    pub fn defs(&self) -> &[ColumnDef] {
        &self.defs
    }

    pub fn data_columns(&self) -> impl Iterator<Item = &DataColumn> {
        self.defs.iter().filter_map(ColumnDef::as_data)
    }

    pub(crate) fn reset_widths(&self) {
        for column in self.data_columns() {
            column.set_established_width(0);
        }
    }
}
