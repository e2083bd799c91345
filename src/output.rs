//! Output sink, terminal queries and the cursor-control primitives.
//!
//! The table only ever moves the cursor relatively: up, down, carriage
//! return. It never addresses absolute screen positions and never switches to
//! the alternate screen, so whatever was printed above the table stays put.

use std::fmt;
use std::io::{self, IsTerminal, Write};

use crossterm::cursor::{MoveDown, MoveUp};
use crossterm::queue;
use crossterm::style::{Attribute, SetAttribute};
use crossterm::terminal::{Clear, ClearType};

/// Default width when the terminal size cannot be determined.
pub const FALLBACK_WIDTH: usize = 80;

/// Current terminal width in cells, or [`FALLBACK_WIDTH`].
#[must_use]
pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .ok()
        .map(|(w, _)| usize::from(w))
        .filter(|w| *w > 0)
        .unwrap_or(FALLBACK_WIDTH)
}

/// Check if TERM is set to "dumb".
#[must_use]
pub fn is_dumb_terminal() -> bool {
    std::env::var("TERM").ok().is_some_and(|term| {
        let term = term.to_lowercase();
        term == "dumb" || term == "unknown"
    })
}

fn force_color_forces_terminal(force_color: Option<&str>) -> bool {
    let Some(force_color) = force_color else {
        return false;
    };
    let force_color = force_color.trim();
    // Treat empty / "0" as "unset" (no override).
    !force_color.is_empty() && force_color != "0"
}

fn interactive(is_tty: bool) -> bool {
    if force_color_forces_terminal(std::env::var("FORCE_COLOR").ok().as_deref()) {
        return true;
    }
    is_tty && !is_dumb_terminal()
}

/// Where a table draws itself.
///
/// A sink is usable only when it is interactive: redrawing in place makes no
/// sense on a pipe or a file.
pub struct OutputSink {
    writer: Box<dyn Write + Send>,
    interactive: bool,
}

impl OutputSink {
    /// Standard output, interactive when it is a capable terminal.
    #[must_use]
    pub fn stdout() -> Self {
        let is_tty = io::stdout().is_terminal();
        Self {
            writer: Box::new(io::stdout()),
            interactive: interactive(is_tty),
        }
    }

    /// Standard error, interactive when it is a capable terminal.
    #[must_use]
    pub fn stderr() -> Self {
        let is_tty = io::stderr().is_terminal();
        Self {
            writer: Box::new(io::stderr()),
            interactive: interactive(is_tty),
        }
    }

    /// Any writer. Not interactive unless forced (or `FORCE_COLOR` is set).
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
            interactive: interactive(false),
        }
    }

    /// Override terminal detection.
    #[must_use]
    pub fn force_terminal(mut self, force: bool) -> Self {
        self.interactive = force;
        self
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Write one complete frame and flush it.
    pub(crate) fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.writer.write_all(&frame.buf)?;
        self.writer.flush()
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink")
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// A buffered batch of text and control sequences written to the sink in a
/// single call, so concurrent renders never interleave mid-frame.
#[derive(Debug, Default)]
pub(crate) struct Frame {
    buf: Vec<u8>,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// `CSI n A`. A zero count emits nothing; terminals read `CSI 0 A` as one.
    pub(crate) fn cursor_up(&mut self, n: usize) -> io::Result<()> {
        if n > 0 {
            queue!(self.buf, MoveUp(clamp_u16(n)))?;
        }
        Ok(())
    }

    pub(crate) fn cursor_down(&mut self, n: usize) -> io::Result<()> {
        if n > 0 {
            queue!(self.buf, MoveDown(clamp_u16(n)))?;
        }
        Ok(())
    }

    pub(crate) fn carriage_return(&mut self) {
        self.buf.push(b'\r');
    }

    pub(crate) fn reset_style(&mut self) -> io::Result<()> {
        queue!(self.buf, SetAttribute(Attribute::Reset))
    }

    pub(crate) fn clear_line_end(&mut self) -> io::Result<()> {
        queue!(self.buf, Clear(ClearType::UntilNewLine))
    }

    pub(crate) fn clear_below(&mut self) -> io::Result<()> {
        queue!(self.buf, Clear(ClearType::FromCursorDown))
    }

    pub(crate) fn text(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
    }

    pub(crate) fn newline(&mut self) {
        self.buf.push(b'\n');
    }

    #[cfg(test)]
    pub(crate) fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }
}
