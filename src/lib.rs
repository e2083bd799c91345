//! # live_table
//!
//! A live, multi-row status table for the terminal.
//!
//! Each row tracks one unit of concurrent work (a download, a build step, a
//! test shard). Workers append and update rows from any thread; the table
//! redraws only the affected line in place, and falls back to a full redraw
//! when a row finishes or a cell outgrows its column.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use live_table::prelude::*;
//!
//! let table = Table::new()
//!     .column(ColumnSpec::new("job").id())?
//!     .separator("  ")
//!     .column(ColumnSpec::new("elapsed").func_named("elapsed").format_named("duration"))?
//!     .separator("  ")
//!     .column(ColumnSpec::new("status"))?
//!     .inactive_when(flag("done"));
//!
//! table.append(Fields::new().with("job", "build").with("status", "compiling"))?;
//! table.update(Fields::new().with("job", "build").with("status", "ok").with("done", true))?;
//! # Ok::<(), TableError>(())
//! ```
//!
//! ## Core Concepts
//!
//! - **Table**: the shared row set and its renderer
//! - **ColumnSpec**: declares a column (id, computed value, formatter, width, summary)
//! - **Row**: a disconnected snapshot of one unit of work
//! - **Cell**: a column's value for a row, or a tail that ends the line
//! - **cells**: display-width arithmetic over text with ANSI escapes

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cells;
pub mod column;
pub mod error;
pub mod format;
pub mod functions;
pub mod output;
mod render;
pub mod row;
pub mod sync;
pub mod table;
pub mod value;

/// Re-exports for convenient usage
pub mod prelude {
    pub use crate::cells::Align;
    pub use crate::column::{ColumnModel, ColumnSpec, Reference};
    pub use crate::error::{Result, TableError};
    pub use crate::format::Formatter;
    pub use crate::functions::{Aggregate, Predicate, RowFunc, SummaryContext, flag};
    pub use crate::output::OutputSink;
    pub use crate::row::Row;
    pub use crate::table::{Table, TableOptions};
    pub use crate::value::{Cell, Fields, Value};
}

// Re-export key types at crate root
pub use cells::Align;
pub use column::ColumnSpec;
pub use error::{Result, TableError};
pub use format::Formatter;
pub use functions::{Aggregate, Predicate, RowFunc, SummaryContext};
pub use output::OutputSink;
pub use row::Row;
pub use table::{Table, TableOptions};
pub use value::{Cell, Fields, Value};
