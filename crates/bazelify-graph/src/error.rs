//! Error types for the bazelify-graph crate.

use std::backtrace::Backtrace;
use std::fmt;

use bazelify_label::Label;

/// Error type for dependency-graph operations.
///
/// Uses the canonical struct pattern with backtrace capture and `is_xxx()`
/// classification methods.
#[derive(Debug)]
pub struct GraphError {
    kind: GraphErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
enum GraphErrorKind {
    /// An operation referenced a label with no node in the graph.
    UnknownNode(String),
    /// A label is already occupied by a live node. Also covers the internal
    /// defect of a cycle witness reaching a pointer node, which must stay a
    /// leaf alias of its group.
    LabelInUse(String),
    /// A second override was registered for the same file name.
    DuplicateOverride { file: String, existing: String },
    /// A cycle witness touched a node kind that cannot absorb.
    UnsupportedCycleMember(String),
    /// A pointer node without exactly one outgoing edge.
    PointerInvariant(String),
    /// I/O failure writing graph visualization output.
    Io(std::io::Error),
}

impl GraphError {
    /// Creates an error for a label with no node.
    pub(crate) fn unknown_node(label: &Label) -> Self {
        Self {
            kind: GraphErrorKind::UnknownNode(label.to_string()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates an error for an occupied label.
    pub(crate) fn label_in_use(label: &Label) -> Self {
        Self {
            kind: GraphErrorKind::LabelInUse(label.to_string()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates an error for a second override on one file name.
    pub(crate) fn duplicate_override(file: &str, existing: &Label) -> Self {
        Self {
            kind: GraphErrorKind::DuplicateOverride {
                file: file.to_string(),
                existing: existing.to_string(),
            },
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates an error for a non-absorbing node kind in a cycle witness.
    pub(crate) fn unsupported_cycle_member(label: &Label) -> Self {
        Self {
            kind: GraphErrorKind::UnsupportedCycleMember(label.to_string()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates an error for a pointer node with a broken edge invariant.
    pub(crate) fn pointer_invariant(label: &Label) -> Self {
        Self {
            kind: GraphErrorKind::PointerInvariant(label.to_string()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Returns true if this error referenced a label with no node.
    pub fn is_unknown_node(&self) -> bool {
        matches!(self.kind, GraphErrorKind::UnknownNode(_))
    }

    /// Returns true if this error is due to an occupied label.
    pub fn is_label_in_use(&self) -> bool {
        matches!(self.kind, GraphErrorKind::LabelInUse(_))
    }

    /// Returns true if this error is due to a duplicate override.
    pub fn is_duplicate_override(&self) -> bool {
        matches!(self.kind, GraphErrorKind::DuplicateOverride { .. })
    }

    /// Returns true if this error is due to an I/O failure.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, GraphErrorKind::Io(_))
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GraphErrorKind::UnknownNode(label) => {
                write!(f, "{label:?} not in graph")
            }
            GraphErrorKind::LabelInUse(label) => {
                write!(f, "{label:?} already part of graph")
            }
            GraphErrorKind::DuplicateOverride { file, existing } => write!(
                f,
                "override for {file:?} already exists ({existing:?})"
            ),
            GraphErrorKind::UnsupportedCycleMember(label) => {
                write!(f, "node {label:?} must be a library or group node")
            }
            GraphErrorKind::PointerInvariant(label) => write!(
                f,
                "pointer node {label:?} must have exactly one outgoing edge"
            ),
            GraphErrorKind::Io(err) => {
                write!(f, "graph output failed: {err}")
            }
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            GraphErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GraphError {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: GraphErrorKind::Io(err),
            backtrace: Backtrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let label = Label::from_parts("sdk", "a");
        assert!(GraphError::unknown_node(&label).is_unknown_node());
        assert!(GraphError::label_in_use(&label).is_label_in_use());
        assert!(
            GraphError::duplicate_override("a.h", &label)
                .is_duplicate_override()
        );
        assert!(GraphError::from(std::io::Error::other("boom")).is_io());
    }

    #[test]
    fn test_display_mentions_label() {
        let label = Label::from_parts("sdk", "a");
        let err = GraphError::label_in_use(&label);
        assert!(err.to_string().contains("//sdk:a"));
        let _ = err.backtrace();
    }
}
