//! Error types for the bazelify-gen crate.

use std::backtrace::Backtrace;
use std::fmt;

use bazelify_config::ConfigError;
use bazelify_graph::GraphError;
use bazelify_label::{Label, LabelError};

/// Error type for the build-file generation pipeline.
///
/// Uses the canonical struct pattern with backtrace capture and `is_xxx()`
/// classification methods.
#[derive(Debug)]
pub struct GenError {
    kind: GenErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
enum GenErrorKind {
    /// A supplied path is not absolute or the SDK is outside the workspace.
    PathInvariant(String),
    /// Configuration loading failed.
    Config(ConfigError),
    /// A label failed to construct or parse.
    Label(LabelError),
    /// A graph operation failed.
    Graph(GraphError),
    /// A group node ended up with fewer than two headers.
    GroupTooSmall { label: String, hdr_count: usize },
    /// Includes could not be resolved; a hint was produced.
    Unresolved(String),
    /// Groups remain unnamed; a hint was produced.
    UnnamedGroups(String),
    /// I/O failure reading sources or writing outputs.
    Io(std::io::Error),
}

impl GenError {
    /// Creates an error for an invalid workspace/SDK path pair.
    pub(crate) fn path_invariant(msg: impl Into<String>) -> Self {
        Self {
            kind: GenErrorKind::PathInvariant(msg.into()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates an error for a group with too few headers.
    pub(crate) fn group_too_small(label: &Label, hdr_count: usize) -> Self {
        Self {
            kind: GenErrorKind::GroupTooSmall {
                label: label.to_string(),
                hdr_count,
            },
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates the user-facing error for unresolved includes.
    pub(crate) fn unresolved(msg: impl Into<String>) -> Self {
        Self {
            kind: GenErrorKind::Unresolved(msg.into()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates the user-facing error for unnamed groups.
    pub(crate) fn unnamed_groups(msg: impl Into<String>) -> Self {
        Self {
            kind: GenErrorKind::UnnamedGroups(msg.into()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Returns true if this error is due to an invalid path pair.
    pub fn is_path_invariant(&self) -> bool {
        matches!(self.kind, GenErrorKind::PathInvariant(_))
    }

    /// Returns true if this error came from configuration loading.
    pub fn is_config(&self) -> bool {
        matches!(self.kind, GenErrorKind::Config(_))
    }

    /// Returns true if this error came from a graph operation.
    pub fn is_graph(&self) -> bool {
        matches!(self.kind, GenErrorKind::Graph(_))
    }

    /// Returns true if this error is due to an undersized group.
    pub fn is_group_too_small(&self) -> bool {
        matches!(self.kind, GenErrorKind::GroupTooSmall { .. })
    }

    /// Returns true if this error reports unresolved includes.
    pub fn is_unresolved(&self) -> bool {
        matches!(self.kind, GenErrorKind::Unresolved(_))
    }

    /// Returns true if this error reports unnamed groups.
    pub fn is_unnamed_groups(&self) -> bool {
        matches!(self.kind, GenErrorKind::UnnamedGroups(_))
    }

    /// Returns true if this error is due to an I/O failure.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, GenErrorKind::Io(_))
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GenErrorKind::PathInvariant(msg) => write!(f, "{msg}"),
            GenErrorKind::Config(err) => write!(f, "{err}"),
            GenErrorKind::Label(err) => write!(f, "{err}"),
            GenErrorKind::Graph(err) => write!(f, "{err}"),
            GenErrorKind::GroupTooSmall { label, hdr_count } => write!(
                f,
                "group {label:?} has {hdr_count} headers, must be at least 2"
            ),
            GenErrorKind::Unresolved(msg) => write!(f, "{msg}"),
            GenErrorKind::UnnamedGroups(msg) => write!(f, "{msg}"),
            GenErrorKind::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            GenErrorKind::Config(err) => Some(err),
            GenErrorKind::Label(err) => Some(err),
            GenErrorKind::Graph(err) => Some(err),
            GenErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for GenError {
    fn from(err: ConfigError) -> Self {
        Self {
            kind: GenErrorKind::Config(err),
            backtrace: Backtrace::capture(),
        }
    }
}

impl From<LabelError> for GenError {
    fn from(err: LabelError) -> Self {
        Self {
            kind: GenErrorKind::Label(err),
            backtrace: Backtrace::capture(),
        }
    }
}

impl From<GraphError> for GenError {
    fn from(err: GraphError) -> Self {
        Self {
            kind: GenErrorKind::Graph(err),
            backtrace: Backtrace::capture(),
        }
    }
}

impl From<std::io::Error> for GenError {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: GenErrorKind::Io(err),
            backtrace: Backtrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(GenError::path_invariant("bad").is_path_invariant());
        assert!(GenError::unresolved("msg").is_unresolved());
        assert!(GenError::unnamed_groups("msg").is_unnamed_groups());
        let label = Label::from_parts("sdk", "g");
        let err = GenError::group_too_small(&label, 1);
        assert!(err.is_group_too_small());
        assert!(err.to_string().contains("at least 2"));
    }
}
