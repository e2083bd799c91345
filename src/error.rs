//! Error type shared by configuration, mutation and rendering.

use std::fmt;
use std::io;

/// Error returned by table configuration and mutation calls.
///
/// A failed call never leaves the table half-updated: arguments are validated
/// before any state is touched.
#[derive(Debug)]
pub enum TableError {
    /// Malformed configuration or row data (duplicate column, second id
    /// column, unknown formatter name, missing or duplicate row id, ...).
    InvalidArgument(String),
    /// The table has no id column yet, or its output sink is not an
    /// interactive terminal.
    NotReady(String),
    /// Writing to the output sink failed.
    Io(io::Error),
}

impl TableError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// True for [`TableError::InvalidArgument`].
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// True for [`TableError::NotReady`].
    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::NotReady(msg) => write!(f, "table not ready: {msg}"),
            Self::Io(err) => write!(f, "output error: {err}"),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TableError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TableError>;
