//! Error types for the bazelify-config crate.

use std::backtrace::Backtrace;
use std::fmt;
use std::path::{Path, PathBuf};

use bazelify_label::LabelError;

/// Error type for configuration loading and validation.
///
/// Uses the canonical struct pattern with backtrace capture and `is_xxx()`
/// classification methods.
#[derive(Debug)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
enum ConfigErrorKind {
    /// No configuration file exists at the expected path.
    Missing(PathBuf),
    /// The configuration file exists but could not be read.
    Io(std::io::Error),
    /// The configuration file is not a valid document.
    Malformed(toml::de::Error),
    /// The configuration parsed but violates a semantic rule.
    Semantic(String),
    /// A label in the configuration failed to parse or construct.
    Label(LabelError),
}

impl ConfigError {
    /// Creates an error for a missing configuration file.
    pub(crate) fn missing(path: &Path) -> Self {
        Self {
            kind: ConfigErrorKind::Missing(path.to_path_buf()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates an error for an unparseable configuration file.
    pub(crate) fn malformed(err: toml::de::Error) -> Self {
        Self {
            kind: ConfigErrorKind::Malformed(err),
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates an error for a semantic rule violation.
    pub(crate) fn semantic(msg: impl Into<String>) -> Self {
        Self {
            kind: ConfigErrorKind::Semantic(msg.into()),
            backtrace: Backtrace::capture(),
        }
    }

    /// Returns true if the configuration file was absent.
    pub fn is_missing(&self) -> bool {
        matches!(self.kind, ConfigErrorKind::Missing(_))
    }

    /// Returns true if the configuration file could not be read.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, ConfigErrorKind::Io(_))
    }

    /// Returns true if the configuration file failed to parse.
    pub fn is_malformed(&self) -> bool {
        matches!(self.kind, ConfigErrorKind::Malformed(_))
    }

    /// Returns true if the configuration violated a semantic rule.
    pub fn is_semantic(&self) -> bool {
        matches!(self.kind, ConfigErrorKind::Semantic(_))
    }

    /// Returns true if a configured label was invalid.
    pub fn is_label(&self) -> bool {
        matches!(self.kind, ConfigErrorKind::Label(_))
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConfigErrorKind::Missing(path) => write!(
                f,
                "no configuration found at {}; supply at least an empty file",
                path.display()
            ),
            ConfigErrorKind::Io(err) => {
                write!(f, "could not read configuration: {err}")
            }
            ConfigErrorKind::Malformed(err) => {
                write!(f, "malformed configuration: {err}")
            }
            ConfigErrorKind::Semantic(msg) => {
                write!(f, "invalid configuration: {msg}")
            }
            ConfigErrorKind::Label(err) => {
                write!(f, "invalid label in configuration: {err}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ConfigErrorKind::Io(err) => Some(err),
            ConfigErrorKind::Malformed(err) => Some(err),
            ConfigErrorKind::Label(err) => Some(err),
            ConfigErrorKind::Missing(_) | ConfigErrorKind::Semantic(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: ConfigErrorKind::Io(err),
            backtrace: Backtrace::capture(),
        }
    }
}

impl From<LabelError> for ConfigError {
    fn from(err: LabelError) -> Self {
        Self {
            kind: ConfigErrorKind::Label(err),
            backtrace: Backtrace::capture(),
        }
    }
}
