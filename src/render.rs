//! Rendering: prerendered lines, full-table redraws and single-row redraws.
//!
//! The cursor rests on the line just below the table. Every row knows its
//! `shift`, the number of lines between that resting line and the row, so a
//! single row can be repainted with "up `shift`, paint, down `shift`".
//!
//! A full render sorts the rows (active first, then by start time), assigns
//! shifts, prerenders every line, widens each data column to its widest cell
//! and repaints the table top to bottom. A single-row render reuses the
//! established widths; when a cell no longer fits, it escalates to a full
//! render instead.

use std::cell::Cell as FlagCell;
use std::io;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::cells::{align, ellipsis, truncate, width};
use crate::column::{ColumnDef, DataColumn};
use crate::error::Result;
use crate::functions::SummaryContext;
use crate::output::Frame;
use crate::row::{Row, RowSlot};
use crate::sync::{lock_recover, lock_recover_debug, read_recover, write_recover};
use crate::table::{Table, TableState};
use crate::value::{Cell, Value};

thread_local! {
    static FULL_RENDER_ACTIVE: FlagCell<bool> = const { FlagCell::new(false) };
}

/// True while this thread is inside a full render.
pub(crate) fn in_full_render() -> bool {
    FULL_RENDER_ACTIVE.with(FlagCell::get)
}

/// Marks the current thread as rendering until dropped.
struct FullRenderGuard {
    outer: bool,
}

impl FullRenderGuard {
    fn enter() -> Self {
        Self {
            outer: FULL_RENDER_ACTIVE.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for FullRenderGuard {
    fn drop(&mut self) {
        FULL_RENDER_ACTIVE.with(|flag| flag.set(self.outer));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Widths are being (re)established; every cell fits.
    Full,
    /// Widths are fixed; a cell that outgrows its column aborts the pass.
    Incremental,
}

/// One prerendered piece of a line.
#[derive(Debug)]
enum Piece {
    Literal(String),
    /// Formatted cell text of the data column at this layout index.
    Data { def: usize, text: String },
    /// Printed verbatim; nothing follows it on the line.
    Tail(String),
}

/// A line whose cells are formatted but not yet padded.
#[derive(Debug, Default)]
pub(crate) struct Line {
    pieces: SmallVec<[Piece; 8]>,
}

impl Line {
    fn data_width(&self, def: usize) -> Option<usize> {
        self.pieces.iter().find_map(|piece| match piece {
            Piece::Data { def: d, text } if *d == def => Some(width(text)),
            _ => None,
        })
    }
}

/// Newlines and tabs would break the line accounting.
fn single_line(text: String) -> String {
    if text.contains(['\n', '\r', '\t']) {
        text.replace(['\n', '\r', '\t'], " ")
    } else {
        text
    }
}

fn fit(text: &str, max: usize) -> String {
    ellipsis(text, max).unwrap_or_else(|_| truncate(text, max))
}

impl Table {
    /// Format every cell of one line; `None` when an incremental pass finds
    /// a cell wider than its column.
    fn prerender<F>(&self, mut cell_for: F, pass: Pass) -> Option<Line>
    where
        F: FnMut(&DataColumn) -> Cell,
    {
        let mut line = Line::default();
        for (def, entry) in self.columns.defs().iter().enumerate() {
            let column = match entry {
                ColumnDef::Separator(text) => {
                    line.pieces.push(Piece::Literal(text.clone()));
                    continue;
                }
                ColumnDef::Data(column) => column,
            };
            let value = match cell_for(column) {
                Cell::Tail(text) => {
                    line.pieces.push(Piece::Tail(single_line(text)));
                    break;
                }
                Cell::Value(value) => value,
            };
            let mut text = single_line(column.formatter().apply(&value));
            if let Some(fixed) = column.fixed_width() {
                text = align(&fit(&text, fixed), fixed, column.alignment());
            }
            if pass == Pass::Incremental && width(&text) > column.established_width() {
                return None;
            }
            line.pieces.push(Piece::Data { def, text });
        }
        Some(line)
    }

    fn prerender_row(&self, row: &Row, pass: Pass) -> Option<Line> {
        self.prerender(|column| column.raw_cell(row), pass)
    }

    fn prerender_summary(&self, rows: &[Row], pass: Pass) -> Option<Line> {
        let overrides = read_recover(&self.summary_values).clone();
        let table_started = *read_recover(&self.started);
        self.prerender(
            |column| {
                if let Some(value) = overrides.get(column.name()) {
                    return Cell::Value(value.clone());
                }
                let Some(aggregate) = column.summary() else {
                    return Cell::empty();
                };
                let values: Vec<Value> = rows
                    .iter()
                    .map(|row| match column.raw_cell(row) {
                        Cell::Value(value) => value,
                        Cell::Tail(_) => Value::Empty,
                    })
                    .collect();
                aggregate.apply(&SummaryContext {
                    values: &values,
                    rows,
                    table_started,
                })
            },
            pass,
        )
    }

    /// Pad every data cell to its column's established width.
    fn assemble(&self, line: &Line) -> String {
        let defs = self.columns.defs();
        let mut out = String::new();
        for piece in &line.pieces {
            match piece {
                Piece::Literal(text) | Piece::Tail(text) => out.push_str(text),
                Piece::Data { def, text } => match defs.get(*def).and_then(ColumnDef::as_data) {
                    Some(column) => {
                        out.push_str(&align(text, column.established_width(), column.alignment()));
                    }
                    None => out.push_str(text),
                },
            }
        }
        out
    }

    /// `\r`, reset, clear to end of line, content, clear to end of line.
    fn paint_line(
        &self,
        frame: &mut Frame,
        line: &Line,
        summary: bool,
        budget: usize,
    ) -> io::Result<()> {
        let content = self.assemble(line);
        frame.carriage_return();
        frame.reset_style()?;
        frame.clear_line_end()?;
        if summary {
            let prefix = &self.options.summary_prefix;
            let budget = budget.saturating_sub(width(prefix)).max(1);
            frame.text(prefix);
            frame.text(&fit(&content, budget));
        } else {
            frame.text(&fit(&content, budget));
        }
        frame.reset_style()?;
        frame.clear_line_end()
    }

    /// Redraw the whole table. The caller holds the table-wide lock.
    pub(crate) fn render_full_locked(&self, state: &mut TableState) -> Result<()> {
        let _rendering = FullRenderGuard::enter();

        let entries: Vec<(Arc<RowSlot>, u64, Row)> = {
            let mut rows = write_recover(&self.rows);
            let mut entries: Vec<_> = rows
                .order
                .iter()
                .map(|slot| (Arc::clone(slot), slot.revision(), slot.snapshot()))
                .collect();
            entries.sort_by_key(|(_, _, row)| (!row.is_active(), row.started()));
            rows.order = entries.iter().map(|(slot, ..)| Arc::clone(slot)).collect();
            entries
        };

        let show_summary = self.options.show_summary;
        let total = entries.len() + usize::from(show_summary);
        let mut slots = Vec::with_capacity(entries.len());
        let mut snapshots = Vec::with_capacity(entries.len());
        for (slot, revision, row) in entries {
            slots.push((slot, revision));
            snapshots.push(row);
        }
        let mut lines: Vec<Line> = snapshots
            .iter()
            .map(|row| self.prerender_row(row, Pass::Full).unwrap_or_default())
            .collect();
        if show_summary {
            lines.push(
                self.prerender_summary(&snapshots, Pass::Full)
                    .unwrap_or_default(),
            );
        }

        for (def, entry) in self.columns.defs().iter().enumerate() {
            if let ColumnDef::Data(column) = entry {
                let widest = lines
                    .iter()
                    .filter_map(|line| line.data_width(def))
                    .max()
                    .unwrap_or(0);
                column.set_established_width(widest);
            }
        }

        let budget = self.width_budget();
        let mut frame = Frame::new();
        for _ in state.reserved_lines..total {
            frame.newline();
        }
        frame.cursor_up(total)?;
        for (index, line) in lines.iter().enumerate() {
            let summary = show_summary && index + 1 == lines.len();
            self.paint_line(&mut frame, line, summary, budget)?;
            frame.newline();
        }
        frame.clear_below()?;

        // Shifts are read under the output lock; publish them with the frame.
        {
            let mut output = lock_recover(&self.output);
            for (index, (slot, _)) in slots.iter().enumerate() {
                slot.set_shift(total - index);
            }
            state.reserved_lines = state.reserved_lines.max(total);
            output.write_frame(&frame)?;
        }

        // Rows written since their snapshot were painted stale.
        for (slot, revision) in &slots {
            if slot.revision() != *revision {
                self.render_row(slot)?;
            }
        }
        log::debug!("full render: {} rows, {total} lines", snapshots.len());
        Ok(())
    }

    /// Redraw one row (and the summary line) in place, escalating to a full
    /// render when a cell no longer fits its column.
    pub(crate) fn render_row(&self, slot: &Arc<RowSlot>) -> Result<()> {
        let (row, rows) = {
            let rows = read_recover(&self.rows);
            if !rows.contains(slot) {
                // Dropped by a concurrent reset.
                return Ok(());
            }
            let all: Vec<Row> = if self.options.show_summary {
                rows.order.iter().map(|s| s.snapshot()).collect()
            } else {
                Vec::new()
            };
            (slot.snapshot(), all)
        };

        let Some(line) = self.prerender_row(&row, Pass::Incremental) else {
            return self.escalate(slot);
        };
        let summary = if self.options.show_summary {
            match self.prerender_summary(&rows, Pass::Incremental) {
                Some(summary) => Some(summary),
                None => return self.escalate(slot),
            }
        } else {
            None
        };

        let budget = self.width_budget();
        let mut output = lock_recover(&self.output);
        let mut frame = Frame::new();
        let shift = slot.shift();
        if shift > 0 {
            frame.cursor_up(shift)?;
            self.paint_line(&mut frame, &line, false, budget)?;
            frame.cursor_down(shift)?;
            frame.carriage_return();
        }
        if let Some(summary) = &summary {
            frame.cursor_up(1)?;
            self.paint_line(&mut frame, summary, true, budget)?;
            frame.cursor_down(1)?;
            frame.carriage_return();
        }
        if !frame.is_empty() {
            output.write_frame(&frame)?;
        }
        log::trace!("row '{}' redrawn at shift {shift}", slot.key);
        Ok(())
    }

    fn escalate(&self, slot: &RowSlot) -> Result<()> {
        if in_full_render() {
            log::trace!("row '{}' outgrew its columns during a full render", slot.key);
            return Ok(());
        }
        log::debug!("row '{}' outgrew its columns, redrawing table", slot.key);
        let mut state = lock_recover_debug(&self.state, "render escalation");
        self.render_full_locked(&mut state)
    }
}
