//! Configuration loading and validation.
//!
//! The configuration lives in a TOML document at `<sdk>/.bazelifyrc`. This
//! crate parses it into the raw [`RcFile`] model and validates it into a
//! [`Config`], the typed read-only view consumed by the rest of the pipeline.
//! The raw model is retained on the validated view because the hint writer
//! clones and extends it.
//!
//! Absence of the file is fatal: the user supplies at least an empty file.

mod error;
mod rc;

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use bazelify_label::Label;
use bazelify_remap::Remaps;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use tracing::debug;

#[doc(inline)]
pub use crate::error::ConfigError;
#[doc(inline)]
pub use crate::rc::{IncludeOverride, NamedGroup, RcFile, SourceSet};

/// Name of the configuration file, read from the SDK root.
pub const RC_FILE_NAME: &str = ".bazelifyrc";

/// An authoritative resolution for a header basename.
#[derive(Debug, Clone)]
pub struct OverrideTarget {
    /// The label used in place of any discovered candidate.
    pub label: Label,
    /// Extra include directories propagated to consumers as `-I` flags,
    /// workspace-relative.
    pub include_dirs: Vec<String>,
}

/// A validated source set: one library label covering several files.
#[derive(Debug, Clone)]
pub struct SourceSetFiles {
    pub label: Label,
    pub srcs: Vec<Label>,
    pub hdrs: Vec<Label>,
}

/// Validated view of the user configuration.
#[derive(Debug)]
pub struct Config {
    pub workspace_dir: PathBuf,
    pub sdk_dir: PathBuf,
    /// Workspace-relative slash-separated path of the SDK root. Empty when
    /// the SDK root is the workspace root.
    pub sdk_rel: String,
    pub verbose: bool,
    /// The raw document, kept for hint generation.
    pub rc: RcFile,
    excludes: GlobSet,
    pub ignore_headers: HashSet<String>,
    /// Additional include search roots, absolute.
    pub include_dirs: Vec<PathBuf>,
    /// Header basename -> authoritative target, in declaration order.
    pub include_overrides: IndexMap<String, OverrideTarget>,
    pub source_sets: Vec<SourceSetFiles>,
    source_set_files: HashSet<PathBuf>,
    /// first header -> last header -> group name.
    pub named_groups: HashMap<String, HashMap<String, String>>,
    pub remaps: Remaps,
}

impl Config {
    /// Reads and validates `<sdk>/.bazelifyrc`.
    ///
    /// Both directories must be absolute, with the SDK inside the workspace;
    /// the pipeline driver checks this before calling.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing, unreadable,
    /// malformed, or semantically invalid (duplicate override, remap without
    /// a `.h` extension, source-set file missing on disk or naming a
    /// directory, include dir outside the workspace).
    pub fn load(
        workspace_dir: &Path,
        sdk_dir: &Path,
        verbose: bool,
    ) -> Result<Self, ConfigError> {
        let rc_path = sdk_dir.join(RC_FILE_NAME);
        if !rc_path.exists() {
            return Err(ConfigError::missing(&rc_path));
        }
        let text = std::fs::read_to_string(&rc_path)?;
        let rc: RcFile =
            toml::from_str(&text).map_err(ConfigError::malformed)?;
        debug!(path = %rc_path.display(), ?rc, "loaded configuration");

        let sdk_rel = sdk_dir
            .strip_prefix(workspace_dir)
            .map_err(|_| {
                ConfigError::semantic(format!(
                    "SDK dir {} is not inside workspace {}",
                    sdk_dir.display(),
                    workspace_dir.display()
                ))
            })?
            .to_string_lossy()
            .replace('\\', "/");

        let excludes = build_excludes(&rc.excludes)?;

        let ignore_headers: HashSet<String> =
            rc.ignore_headers.iter().cloned().collect();

        let mut include_dirs = Vec::new();
        for dir in &rc.include_dirs {
            let abs = clean_path(&sdk_dir.join(dir));
            if !abs.starts_with(workspace_dir) {
                return Err(ConfigError::semantic(format!(
                    "include dir {dir:?} resolves outside the workspace"
                )));
            }
            include_dirs.push(abs);
        }

        let mut include_overrides = IndexMap::new();
        for entry in &rc.include_overrides {
            if include_overrides.contains_key(&entry.include) {
                return Err(ConfigError::semantic(format!(
                    "duplicate target override for {:?}",
                    entry.include
                )));
            }
            let label = Label::parse(&entry.label)?;
            include_overrides.insert(
                entry.include.clone(),
                OverrideTarget {
                    label,
                    include_dirs: entry.include_dirs.clone(),
                },
            );
        }

        let (source_sets, source_set_files) =
            validate_source_sets(&rc.source_sets, workspace_dir, sdk_dir)?;

        let mut named_groups: HashMap<String, HashMap<String, String>> =
            HashMap::new();
        for group in &rc.named_groups {
            named_groups
                .entry(group.first_hdr.clone())
                .or_default()
                .insert(group.last_hdr.clone(), group.name.clone());
        }

        for header in &rc.remaps {
            if Path::new(header).extension().and_then(|e| e.to_str())
                != Some("h")
            {
                return Err(ConfigError::semantic(format!(
                    "invalid remap {header:?}: must have .h extension"
                )));
            }
        }
        let remaps = Remaps::new(&rc.remaps, &sdk_rel)
            .map_err(|e| ConfigError::semantic(e.to_string()))?;

        Ok(Self {
            workspace_dir: workspace_dir.to_path_buf(),
            sdk_dir: sdk_dir.to_path_buf(),
            sdk_rel,
            verbose,
            rc,
            excludes,
            ignore_headers,
            include_dirs,
            include_overrides,
            source_sets,
            source_set_files,
            named_groups,
            remaps,
        })
    }

    /// Whether an SDK-relative path matches any exclude pattern.
    pub fn is_excluded(&self, sdk_rel_path: &Path) -> bool {
        self.excludes.is_match(sdk_rel_path)
    }

    /// Whether the file at the given absolute path belongs to a source set.
    pub fn is_source_set_file(&self, abs_path: &Path) -> bool {
        self.source_set_files.contains(abs_path)
    }

    /// The path of the configuration file.
    pub fn rc_path(&self) -> PathBuf {
        self.sdk_dir.join(RC_FILE_NAME)
    }
}

/// Compiles exclude patterns. `*` does not cross directory separators.
fn build_excludes(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                ConfigError::semantic(format!(
                    "invalid exclude pattern {pattern:?}: {e}"
                ))
            })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ConfigError::semantic(format!("invalid excludes: {e}")))
}

/// Validates source sets against the filesystem and builds their labels.
fn validate_source_sets(
    source_sets: &[SourceSet],
    workspace_dir: &Path,
    sdk_dir: &Path,
) -> Result<(Vec<SourceSetFiles>, HashSet<PathBuf>), ConfigError> {
    let mut out = Vec::new();
    let mut claimed = HashSet::new();
    for set in source_sets {
        if set.name.is_empty() {
            return Err(ConfigError::semantic(
                "source set requires a name".to_string(),
            ));
        }
        let set_dir = clean_path(&sdk_dir.join(&set.dir));
        let label = Label::new(&set_dir, &set.name, workspace_dir)?;

        let mut file_labels = |names: &[String]| -> Result<Vec<Label>, ConfigError> {
            let mut labels = Vec::new();
            for name in names {
                let path = set_dir.join(name);
                let meta = std::fs::metadata(&path).map_err(|_| {
                    ConfigError::semantic(format!(
                        "source set {:?}: file {} does not exist",
                        set.name,
                        path.display()
                    ))
                })?;
                if meta.is_dir() {
                    return Err(ConfigError::semantic(format!(
                        "source set {:?}: {} is a directory",
                        set.name,
                        path.display()
                    )));
                }
                labels.push(Label::new(&set_dir, name, workspace_dir)?);
                claimed.insert(path);
            }
            Ok(labels)
        };

        let srcs = file_labels(&set.srcs)?;
        let hdrs = file_labels(&set.hdrs)?;
        out.push(SourceSetFiles { label, srcs, hdrs });
    }
    Ok((out, claimed))
}

/// Lexically normalizes a path: removes `.` components and resolves `..`
/// against the preceding component. No filesystem access.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Creates a workspace with an `sdk/` directory holding the given rc
    /// contents, plus any extra files (paths relative to the SDK root).
    fn fixture(rc: &str, files: &[&str]) -> (TempDir, PathBuf) {
        let workspace = TempDir::new().unwrap();
        let sdk = workspace.path().join("sdk");
        fs::create_dir_all(&sdk).unwrap();
        fs::write(sdk.join(RC_FILE_NAME), rc).unwrap();
        for file in files {
            let path = sdk.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        (workspace, sdk)
    }

    #[test]
    fn test_load_empty_config() {
        let (workspace, sdk) = fixture("", &[]);
        let conf = Config::load(workspace.path(), &sdk, false).unwrap();
        assert_eq!(conf.sdk_rel, "sdk");
        assert!(conf.ignore_headers.is_empty());
        assert!(conf.include_overrides.is_empty());
        assert!(conf.remaps.libraries().is_empty());
    }

    #[test]
    fn test_load_missing_config() {
        let workspace = TempDir::new().unwrap();
        let sdk = workspace.path().join("sdk");
        fs::create_dir_all(&sdk).unwrap();
        let err = Config::load(workspace.path(), &sdk, false).unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn test_load_malformed_config() {
        let (workspace, sdk) = fixture("excludes = \"not an array", &[]);
        let err = Config::load(workspace.path(), &sdk, false).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_include_overrides_parsed() {
        let rc = r#"
[[include_overrides]]
include = "sdk_config.h"
label = "//other:sdk_config"
include_dirs = ["other"]
"#;
        let (workspace, sdk) = fixture(rc, &[]);
        let conf = Config::load(workspace.path(), &sdk, false).unwrap();
        let target = &conf.include_overrides["sdk_config.h"];
        assert_eq!(target.label.to_string(), "//other:sdk_config");
        assert_eq!(target.include_dirs, vec!["other".to_string()]);
    }

    #[test]
    fn test_duplicate_override_rejected() {
        let rc = r#"
[[include_overrides]]
include = "a.h"
label = "//x:a"

[[include_overrides]]
include = "a.h"
label = "//y:a"
"#;
        let (workspace, sdk) = fixture(rc, &[]);
        let err = Config::load(workspace.path(), &sdk, false).unwrap_err();
        assert!(err.is_semantic());
        assert!(err.to_string().contains("duplicate target override"));
    }

    #[test]
    fn test_override_with_bad_label_rejected() {
        let rc = r#"
[[include_overrides]]
include = "a.h"
label = "not a label"
"#;
        let (workspace, sdk) = fixture(rc, &[]);
        let err = Config::load(workspace.path(), &sdk, false).unwrap_err();
        assert!(err.is_label());
    }

    #[test]
    fn test_remap_requires_h_extension() {
        let (workspace, sdk) = fixture("remaps = [\"a.c\"]", &[]);
        let err = Config::load(workspace.path(), &sdk, false).unwrap_err();
        assert!(err.is_semantic());
        assert!(err.to_string().contains(".h extension"));
    }

    #[test]
    fn test_remaps_generated() {
        let (workspace, sdk) = fixture("remaps = [\"a.h\"]", &[]);
        let conf = Config::load(workspace.path(), &sdk, false).unwrap();
        assert_eq!(conf.remaps.label_settings().len(), 1);
        assert_eq!(conf.remaps.label_settings()[0].1.name, "a_remap");
    }

    #[test]
    fn test_include_dir_outside_workspace_rejected() {
        let (workspace, sdk) =
            fixture("include_dirs = [\"../../outside\"]", &[]);
        let err = Config::load(workspace.path(), &sdk, false).unwrap_err();
        assert!(err.is_semantic());
        assert!(err.to_string().contains("outside the workspace"));
    }

    #[test]
    fn test_source_set_files_validated() {
        let rc = r#"
[[source_sets]]
name = "ab"
srcs = ["b.c"]
hdrs = ["a.h", "b.h"]
"#;
        let (workspace, sdk) = fixture(rc, &["a.h", "b.h", "b.c"]);
        let conf = Config::load(workspace.path(), &sdk, false).unwrap();
        assert_eq!(conf.source_sets.len(), 1);
        let set = &conf.source_sets[0];
        assert_eq!(set.label.to_string(), "//sdk:ab");
        assert_eq!(set.srcs.len(), 1);
        assert_eq!(set.hdrs.len(), 2);
        assert!(conf.is_source_set_file(&sdk.join("a.h")));
        assert!(!conf.is_source_set_file(&sdk.join("c.h")));
    }

    #[test]
    fn test_source_set_missing_file_rejected() {
        let rc = r#"
[[source_sets]]
name = "ab"
hdrs = ["a.h"]
"#;
        let (workspace, sdk) = fixture(rc, &[]);
        let err = Config::load(workspace.path(), &sdk, false).unwrap_err();
        assert!(err.is_semantic());
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_source_set_directory_entry_rejected() {
        let rc = r#"
[[source_sets]]
name = "ab"
hdrs = ["subdir"]
"#;
        let (workspace, sdk) = fixture(rc, &["subdir/x.h"]);
        let err = Config::load(workspace.path(), &sdk, false).unwrap_err();
        assert!(err.is_semantic());
        assert!(err.to_string().contains("is a directory"));
    }

    #[test]
    fn test_excludes_match_relative_paths() {
        let (workspace, sdk) =
            fixture("excludes = [\"deprecated\", \"templates/*\"]", &[]);
        let conf = Config::load(workspace.path(), &sdk, false).unwrap();
        assert!(conf.is_excluded(Path::new("deprecated")));
        assert!(conf.is_excluded(Path::new("templates/x.h")));
        assert!(!conf.is_excluded(Path::new("templates/sub/x.h")));
        assert!(!conf.is_excluded(Path::new("src/x.h")));
    }

    #[test]
    fn test_named_groups_indexed_by_extremes() {
        let rc = r#"
[[named_groups]]
name = "abcd"
first_hdr = "a.h"
last_hdr = "d.h"
"#;
        let (workspace, sdk) = fixture(rc, &[]);
        let conf = Config::load(workspace.path(), &sdk, false).unwrap();
        assert_eq!(conf.named_groups["a.h"]["d.h"], "abcd");
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(
            clean_path(Path::new("/ws/sdk/./a/../b")),
            PathBuf::from("/ws/sdk/b")
        );
        assert_eq!(
            clean_path(Path::new("/ws/sdk/../../x")),
            PathBuf::from("/x")
        );
    }
}
