//! Hint-file synthesis for unresolved includes and unnamed groups.
//!
//! A hint is the current configuration, cloned and extended with proposed
//! entries for everything the run could not resolve, serialized next to the
//! real configuration as `<config>.hint`. The returned error tells the user
//! to fold the proposals into the real file and rerun. A fully successful
//! run removes any stale hint.

use std::path::{Path, PathBuf};

use bazelify_config::{Config, IncludeOverride, NamedGroup, RC_FILE_NAME, RcFile};
use tracing::info;

use crate::error::GenError;
use crate::groups::UnnamedGroup;
use crate::walk::UnresolvedDep;

/// The path of the hint file for an SDK root.
pub fn hint_path(sdk_dir: &Path) -> PathBuf {
    sdk_dir.join(format!("{RC_FILE_NAME}.hint"))
}

/// Writes a hint proposing an `include_overrides` entry per unresolved
/// include, and returns the user-facing unresolved-includes error.
pub fn write_unresolved_deps_hint(
    conf: &Config,
    unresolved: &[UnresolvedDep],
) -> GenError {
    let mut rc = conf.rc.clone();
    for dep in unresolved {
        let included_by: Vec<String> =
            dep.included_by.iter().map(ToString::to_string).collect();
        let possible: Vec<String> =
            dep.candidates.iter().map(ToString::to_string).collect();
        rc.include_overrides.push(IncludeOverride {
            include: dep.file_name.clone(),
            label: format!(
                "INCLUDED BY {} PLEASE RESOLVE: {}",
                included_by.join(","),
                possible.join("|")
            ),
            include_dirs: Vec::new(),
        });
    }
    write_hint(conf, &rc, "found unresolved targets.", |msg| {
        GenError::unresolved(msg)
    })
}

/// Writes a hint proposing a `named_groups` entry per unnamed group, and
/// returns the user-facing unnamed-groups error.
pub fn write_unnamed_groups_hint(
    conf: &Config,
    unnamed: &[UnnamedGroup],
) -> GenError {
    let mut rc = conf.rc.clone();
    for group in unnamed {
        rc.named_groups.push(NamedGroup {
            name: group.name.clone(),
            first_hdr: group.first_hdr.clone(),
            last_hdr: group.last_hdr.clone(),
        });
    }
    write_hint(
        conf,
        &rc,
        "found grouped rules that haven't been named.",
        |msg| GenError::unnamed_groups(msg),
    )
}

/// Removes a stale hint file, if one exists.
///
/// # Errors
///
/// Returns the underlying I/O error for anything except a missing file.
pub fn remove_stale_hint(sdk_dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(hint_path(sdk_dir)) {
        Ok(()) => {
            info!("removed stale hint file");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Serializes the extended configuration to the hint file and builds the
/// error that prompts the user to act on it.
fn write_hint(
    conf: &Config,
    rc: &RcFile,
    msg: &str,
    make_error: fn(String) -> GenError,
) -> GenError {
    let text = match toml::to_string_pretty(rc) {
        Ok(text) => text,
        Err(err) => {
            return make_error(format!(
                "{msg}\nFailed to serialize hint: {err}"
            ));
        }
    };
    let rc_path = conf.rc_path();
    let hint = hint_path(&conf.sdk_dir);
    let verbose_text = if conf.verbose {
        format!("\nHint contents:\n{text}")
    } else {
        String::new()
    };
    match std::fs::write(&hint, &text) {
        Ok(()) => make_error(format!(
            "{msg}\nPlease add the resolutions to {} and try again.\nHint written to {}{verbose_text}",
            rc_path.display(),
            hint.display()
        )),
        Err(err) => make_error(format!(
            "{msg}\nFailed to write hint file: {err}{verbose_text}"
        )),
    }
}
