//! Error types for the bazelify-remap crate.

use std::backtrace::Backtrace;
use std::fmt;

/// Error type for remap generation.
#[derive(Debug)]
pub struct RemapError {
    kind: RemapErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
enum RemapErrorKind {
    /// The same header was declared as a remap more than once.
    DuplicateHeader(String),
}

impl RemapError {
    /// Creates an error for a header declared twice.
    pub(crate) fn duplicate_header(header: impl Into<String>) -> Self {
        Self {
            kind: RemapErrorKind::DuplicateHeader(header.into()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Returns true if this error is due to a duplicate remap header.
    pub fn is_duplicate_header(&self) -> bool {
        matches!(self.kind, RemapErrorKind::DuplicateHeader(_))
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for RemapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RemapErrorKind::DuplicateHeader(header) => {
                write!(f, "duplicate remap for header file {header:?}")
            }
        }
    }
}

impl std::error::Error for RemapError {}
