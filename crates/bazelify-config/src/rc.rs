//! The on-disk `.bazelifyrc` document model.
//!
//! This is the raw serde view of the configuration file, before semantic
//! validation. It is kept alongside the validated [`crate::Config`] because
//! the hint writer clones it, appends proposed entries, and serializes the
//! result back to TOML.
//!
//! Scalar and plain-array fields are declared before the arrays of tables so
//! the struct always serializes to valid TOML.

use serde::{Deserialize, Serialize};

/// Raw contents of a `.bazelifyrc` file. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RcFile {
    /// Shell-style patterns matched against SDK-relative walked paths.
    /// Matching directories are pruned; matching files are skipped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,

    /// Header basenames that resolve to no edge at all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_headers: Vec<String>,

    /// Additional SDK-relative directories searched before global name
    /// lookup when resolving an include token.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_dirs: Vec<String>,

    /// Header basenames that become late-binding remap targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remaps: Vec<String>,

    /// Authoritative resolutions for specific header basenames.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_overrides: Vec<IncludeOverride>,

    /// Declared multi-file library groupings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_sets: Vec<SourceSet>,

    /// Stable names for cycle-collapsed groups, keyed by the extremes of the
    /// group's sorted header set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub named_groups: Vec<NamedGroup>,
}

/// Maps a header basename to the label that resolves it, plus extra include
/// directories propagated to consumers as `-I` flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludeOverride {
    pub include: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_dirs: Vec<String>,
}

/// A user-declared library covering several files that must stay together.
/// `dir` is relative to the SDK root; empty means the SDK root itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSet {
    pub name: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub srcs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hdrs: Vec<String>,
}

/// Assigns a stable name to the group whose sorted header set has
/// `first_hdr` and `last_hdr` as extremes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedGroup {
    pub name: String,
    pub first_hdr: String,
    pub last_hdr: String,
}
