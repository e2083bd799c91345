//! Common test utilities and logging infrastructure
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::{SharedBuffer, init_test_logging};
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG=debug` - Enable debug logging in tests
//! - `RUST_LOG=live_table::render=trace` - Trace every single-row redraw
//! - `TEST_LOG_JSON=1` - Output JSON format for CI parsing
//!
//! Note: Not all test utilities are used in every test module.

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex, Once};

use live_table::{ColumnSpec, OutputSink, Table};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize test logging. Idempotent.
///
/// The crate logs through the `log` facade; the subscriber's log bridge
/// forwards those records here.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("live_table=debug,test=info"));
        let registry = tracing_subscriber::registry().with(filter);

        // Frames are full of escape codes; keep the log itself plain.
        let result = if std::env::var_os("TEST_LOG_JSON").is_some() {
            registry.with(fmt::layer().json().with_test_writer()).try_init()
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_test_writer()
                        .with_ansi(false)
                        .with_thread_names(true)
                        .compact(),
                )
                .try_init()
        };
        result.ok();
    });
}

/// Log test context information.
pub fn log_test_context(test_name: &str, description: &str) {
    tracing::info!(test = test_name, "{description}");
}

/// A cloneable in-memory writer standing in for a terminal.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }

    /// Contents so far, leaving the buffer empty.
    pub fn take(&self) -> String {
        let mut buf = self.0.lock().unwrap();
        let text = String::from_utf8_lossy(&buf).to_string();
        buf.clear();
        text
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// A sink over this buffer that reports itself as a terminal.
    pub fn sink(&self) -> OutputSink {
        OutputSink::new(self.clone()).force_terminal(true)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// `id | status` table drawing into `buffer` at a fixed width.
pub fn status_table(buffer: &SharedBuffer, width: usize) -> Table {
    Table::new()
        .column(ColumnSpec::new("id").id())
        .unwrap()
        .separator(" | ")
        .column(ColumnSpec::new("status"))
        .unwrap()
        .output(buffer.sink())
        .terminal_width(move || width)
}

/// Visible text of a frame: escape sequences and carriage returns removed.
pub fn visible(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for c in chars.by_ref() {
                        if c.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_visible_strips_controls() {
        assert_eq!(visible("\x1b[2A\r\x1b[0m\x1b[Kab\x1b[K\n"), "ab\n");
    }
}
