//! Build-rule file descriptors and their textual rendering.
//!
//! A [`BuildFile`] collects the rules destined for one directory and renders
//! them in a stable order so repeated runs produce byte-identical output:
//! load statements sorted by source, the default-visibility directive, an
//! `exports_files` directive when files are exported, then `cc_library` rules
//! sorted by name followed by `label_setting` rules sorted by name.
//!
//! An external formatter is assumed to post-process the emitted files, so the
//! rendering favors stability over pretty-printing.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

/// The file name used for emitted rule files.
pub const BUILD_FILE_NAME: &str = "BUILD";

/// A `load()` statement importing symbols from a .bzl source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Load {
    pub source: String,
    pub symbols: Vec<String>,
}

/// A `cc_library` rule. Empty fields are omitted from the rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    pub srcs: Vec<String>,
    pub hdrs: Vec<String>,
    pub copts: Vec<String>,
    pub deps: Vec<String>,
}

/// A `label_setting` rule: a late-binding label with a default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSetting {
    pub name: String,
    pub build_setting_default: String,
}

/// The rules destined for one directory's build file.
#[derive(Debug)]
pub struct BuildFile {
    path: PathBuf,
    loads: BTreeMap<String, BTreeSet<String>>,
    libraries: Vec<Library>,
    label_settings: Vec<LabelSetting>,
    exported_files: BTreeSet<String>,
}

impl BuildFile {
    /// Creates an empty build file for the given directory.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(BUILD_FILE_NAME),
            loads: BTreeMap::new(),
            libraries: Vec::new(),
            label_settings: Vec::new(),
            exported_files: BTreeSet::new(),
        }
    }

    /// The path this file will be written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds a load statement, merging symbols for an already-loaded source.
    pub fn add_load(&mut self, load: &Load) {
        self.loads
            .entry(load.source.clone())
            .or_default()
            .extend(load.symbols.iter().cloned());
    }

    /// Adds a library rule.
    pub fn add_library(&mut self, library: Library) {
        self.libraries.push(library);
    }

    /// Adds a label-setting rule.
    pub fn add_label_setting(&mut self, setting: LabelSetting) {
        self.label_settings.push(setting);
    }

    /// Marks a file in this directory as exported for cross-directory use.
    pub fn export_file(&mut self, name: impl Into<String>) {
        self.exported_files.insert(name.into());
    }

    /// Renders the file contents.
    pub fn generate(&self) -> String {
        let mut out = String::new();

        for (source, symbols) in &self.loads {
            write!(out, "load({source:?}").unwrap();
            for symbol in symbols {
                write!(out, ", {symbol:?}").unwrap();
            }
            out.push_str(")\n");
        }

        out.push_str("package(default_visibility = [\"//visibility:public\"])\n");

        if !self.exported_files.is_empty() {
            let names: Vec<&str> =
                self.exported_files.iter().map(String::as_str).collect();
            writeln!(out, "exports_files({})", string_list(&names)).unwrap();
        }

        let mut libraries: Vec<&Library> = self.libraries.iter().collect();
        libraries.sort_by(|a, b| a.name.cmp(&b.name));
        for library in libraries {
            out.push_str(&library.generate());
            out.push('\n');
        }

        let mut settings: Vec<&LabelSetting> =
            self.label_settings.iter().collect();
        settings.sort_by(|a, b| a.name.cmp(&b.name));
        for setting in settings {
            out.push_str(&setting.generate());
            out.push('\n');
        }

        out
    }

    /// Writes the rendered contents to disk.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the write fails.
    pub fn write(&self) -> io::Result<()> {
        std::fs::write(&self.path, self.generate())
    }
}

impl Library {
    /// Renders this rule.
    pub fn generate(&self) -> String {
        let mut out = format!("cc_library(name={:?}", self.name);
        for (field, values) in [
            ("srcs", &self.srcs),
            ("hdrs", &self.hdrs),
            ("copts", &self.copts),
            ("deps", &self.deps),
        ] {
            if !values.is_empty() {
                let values: Vec<&str> =
                    values.iter().map(String::as_str).collect();
                write!(out, ", {field} = {}", string_list(&values)).unwrap();
            }
        }
        out.push_str(")\n");
        out
    }
}

impl LabelSetting {
    /// Renders this rule.
    pub fn generate(&self) -> String {
        format!(
            "label_setting(name={:?}, build_setting_default={:?})\n",
            self.name, self.build_setting_default
        )
    }
}

/// Renders a slice of strings as a build-language list literal.
fn string_list(values: &[&str]) -> String {
    let mut out = String::from("[");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write!(out, "{value:?}").unwrap();
    }
    out.push(']');
    out
}
