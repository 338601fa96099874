//! Build-rule labels.
//!
//! A [`Label`] is the stable identity of a build rule: a workspace-relative
//! directory plus a local name. Labels have two string forms:
//!
//! - absolute: `//dir:name`, shortened to `//dir` when the last directory
//!   component equals the name, and `//:name` when the directory is empty
//! - relative to another label: `:name` when both share a directory,
//!   otherwise the absolute form
//!
//! File labels (names that keep their extension, like `a.h`) are only ever
//! constructed from paths and rendered; they are never parsed back.

mod error;

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

#[doc(inline)]
pub use crate::error::LabelError;

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^//([\w/]*)(?::(\w+))?$").unwrap());
static RELATIVE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:(\w+)$").unwrap());

/// The identity of a build rule: `(dir, name)` relative to a workspace root.
///
/// Labels are value-equal on the exact `(dir, name)` pair. The derived `Ord`
/// gives the deterministic ordering used by the graph's file index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    /// Slash-separated path relative to the workspace root. Empty means the
    /// workspace root itself.
    dir: String,
    name: String,
}

impl Label {
    /// Creates a label for `name` in the directory `abs_dir`.
    ///
    /// # Errors
    ///
    /// Returns an outside-workspace error when `abs_dir` is not absolute or
    /// not within `workspace_root`.
    pub fn new(
        abs_dir: &Path,
        name: &str,
        workspace_root: &Path,
    ) -> Result<Self, LabelError> {
        if !abs_dir.is_absolute() {
            return Err(LabelError::outside_workspace(abs_dir, workspace_root));
        }
        let rel = abs_dir
            .strip_prefix(workspace_root)
            .map_err(|_| LabelError::outside_workspace(abs_dir, workspace_root))?;
        let dir = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Ok(Self {
            dir,
            name: name.to_string(),
        })
    }

    /// Creates a label directly from a workspace-relative directory and name.
    ///
    /// `dir` must be a normalized slash-separated relative path (or empty).
    pub fn from_parts(dir: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Parses an absolute label of the form `//dir:name` or `//dir`.
    ///
    /// The short form `//dir` names the rule whose name equals the last
    /// directory component.
    ///
    /// # Errors
    ///
    /// Returns a malformed-label error when `s` matches neither form.
    pub fn parse(s: &str) -> Result<Self, LabelError> {
        let caps = LABEL_RE
            .captures(s)
            .ok_or_else(|| LabelError::malformed(s))?;
        let dir = caps.get(1).map_or("", |m| m.as_str());
        let name = match caps.get(2) {
            Some(m) => m.as_str().to_string(),
            None => {
                if dir.is_empty() {
                    return Err(LabelError::malformed(s));
                }
                base(dir).to_string()
            }
        };
        Ok(Self {
            dir: dir.to_string(),
            name,
        })
    }

    /// Parses a label that may be relative (`:name`) to a context label.
    ///
    /// Anything that does not match the relative form is delegated to
    /// [`Label::parse`].
    ///
    /// # Errors
    ///
    /// Returns a malformed-label error when `s` matches neither form.
    pub fn parse_relative(ctx: &Label, s: &str) -> Result<Self, LabelError> {
        match RELATIVE_LABEL_RE.captures(s) {
            Some(caps) => Ok(Self {
                dir: ctx.dir.clone(),
                name: caps[1].to_string(),
            }),
            None => Self::parse(s),
        }
    }

    /// The workspace-relative directory. Empty for the workspace root.
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// The rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders this label relative to another label.
    ///
    /// Labels sharing a directory render as `:name`; everything else renders
    /// in the absolute form.
    pub fn relative_to(&self, other: &Label) -> String {
        if self.dir == other.dir {
            format!(":{}", self.name)
        } else {
            self.to_string()
        }
    }

    /// Renders a file label relative to a directory.
    ///
    /// Files in `dir` render as the bare base name; files elsewhere render as
    /// `//dir/base`.
    pub fn file_relative_to(&self, dir: &str) -> String {
        if self.dir == dir {
            self.name.clone()
        } else if self.dir.is_empty() {
            format!("//{}", self.name)
        } else {
            format!("//{}/{}", self.dir, self.name)
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if base(&self.dir) == self.name {
            write!(f, "//{}", self.dir)
        } else {
            write!(f, "//{}:{}", self.dir, self.name)
        }
    }
}

/// The last component of a slash-separated relative path, or `""`.
fn base(dir: &str) -> &str {
    dir.rsplit('/').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_to_string_nominal() {
        let label = Label::from_parts("something/out/there", "aliens");
        assert_eq!(label.to_string(), "//something/out/there:aliens");
    }

    #[test]
    fn test_to_string_name_matches_dir() {
        let label = Label::from_parts("something/out/there", "there");
        assert_eq!(label.to_string(), "//something/out/there");
    }

    #[test]
    fn test_to_string_no_directory() {
        let label = Label::from_parts("", "aliens");
        assert_eq!(label.to_string(), "//:aliens");
    }

    #[test]
    fn test_relative_to_same_directory() {
        let label = Label::from_parts("something/out/there", "aliens");
        let other = Label::from_parts("something/out/there", "stars");
        assert_eq!(label.relative_to(&other), ":aliens");
    }

    #[test]
    fn test_relative_to_different_directory() {
        let label = Label::from_parts("something/out/there", "aliens");
        let other = Label::from_parts("on/earth", "humans");
        assert_eq!(label.relative_to(&other), "//something/out/there:aliens");
    }

    #[test]
    fn test_relative_to_no_directory() {
        let label = Label::from_parts("", "aliens");
        let other = Label::from_parts("", "humans");
        assert_eq!(label.relative_to(&other), ":aliens");
    }

    #[test]
    fn test_parse_full_form() {
        let label = Label::parse("//a/b:c").unwrap();
        assert_eq!(label, Label::from_parts("a/b", "c"));
    }

    #[test]
    fn test_parse_short_form_takes_name_from_dir() {
        let label = Label::parse("//a/b").unwrap();
        assert_eq!(label, Label::from_parts("a/b", "b"));
    }

    #[test]
    fn test_parse_workspace_root() {
        let label = Label::parse("//:c").unwrap();
        assert_eq!(label, Label::from_parts("", "c"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "//", "c", "//a b:c", "//a:b:c", "INCLUDED BY x"] {
            let err = Label::parse(input).unwrap_err();
            assert!(err.is_malformed(), "{input:?} should be malformed");
        }
    }

    #[test]
    fn test_parse_relative_uses_context_dir() {
        let ctx = Label::from_parts("a/b", "c");
        let label = Label::parse_relative(&ctx, ":d").unwrap();
        assert_eq!(label, Label::from_parts("a/b", "d"));
    }

    #[test]
    fn test_parse_relative_delegates_absolute() {
        let ctx = Label::from_parts("a/b", "c");
        let label = Label::parse_relative(&ctx, "//x:y").unwrap();
        assert_eq!(label, Label::from_parts("x", "y"));
    }

    #[test]
    fn test_new_inside_workspace() {
        let label = Label::new(
            Path::new("/ws/sdk/dir"),
            "thing",
            Path::new("/ws"),
        )
        .unwrap();
        assert_eq!(label, Label::from_parts("sdk/dir", "thing"));
    }

    #[test]
    fn test_new_workspace_root_is_empty_dir() {
        let label =
            Label::new(Path::new("/ws"), "thing", Path::new("/ws")).unwrap();
        assert_eq!(label.dir(), "");
    }

    #[test]
    fn test_new_outside_workspace() {
        let err = Label::new(Path::new("/elsewhere"), "thing", Path::new("/ws"))
            .unwrap_err();
        assert!(err.is_outside_workspace());
    }

    #[test]
    fn test_new_relative_path_rejected() {
        let err =
            Label::new(Path::new("relative"), "thing", Path::new("/ws"))
                .unwrap_err();
        assert!(err.is_outside_workspace());
    }

    #[test]
    fn test_file_relative_to() {
        let hdr = Label::from_parts("sdk/dir", "c.h");
        assert_eq!(hdr.file_relative_to("sdk/dir"), "c.h");
        assert_eq!(hdr.file_relative_to("sdk"), "//sdk/dir/c.h");
        let root_hdr = Label::from_parts("", "a.h");
        assert_eq!(root_hdr.file_relative_to("sdk"), "//a.h");
    }

    /// The short and full forms of a name-matches-dir label parse to the same
    /// label.
    #[test]
    fn test_short_and_full_forms_agree() {
        let short = Label::parse("//a/dir").unwrap();
        let full = Label::parse("//a/dir:dir").unwrap();
        assert_eq!(short, full);
        assert_eq!(short.to_string(), "//a/dir");
        assert_eq!(full.to_string(), "//a/dir");
    }

    /// Strategy for rule-name identifiers.
    fn arb_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,8}"
    }

    /// Strategy for workspace-relative directories, including empty.
    fn arb_dir() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_name(), 0..4).prop_map(|segs| segs.join("/"))
    }

    proptest! {
        /// parse(label.to_string()) round-trips for any rule label.
        #[test]
        fn test_parse_round_trip(dir in arb_dir(), name in arb_name()) {
            let label = Label::from_parts(dir, name);
            let parsed = Label::parse(&label.to_string()).unwrap();
            prop_assert_eq!(parsed, label);
        }

        /// parse_relative(ctx, label.relative_to(ctx)) round-trips.
        #[test]
        fn test_relative_round_trip(
            dir in arb_dir(),
            name in arb_name(),
            ctx_dir in arb_dir(),
            ctx_name in arb_name(),
        ) {
            let label = Label::from_parts(dir, name);
            let ctx = Label::from_parts(ctx_dir, ctx_name);
            let rendered = label.relative_to(&ctx);
            let parsed = Label::parse_relative(&ctx, &rendered).unwrap();
            prop_assert_eq!(parsed, label);
        }
    }
}
