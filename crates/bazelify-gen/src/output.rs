//! Projection of graph nodes into per-directory build files.
//!
//! Every directory containing at least one library, group, or remap node
//! gets one build file. Library and group nodes become `cc_library` rules
//! with files rendered relative to the rule's directory, deps rendered
//! relative to the rule's label, and `-I` copts collected from dependency
//! include hints. Group files living outside the group's directory are
//! exported from their own directory. Remap nodes become `label_setting`
//! rules. Override nodes emit nothing.

use std::collections::{BTreeMap, BTreeSet};

use bazelify_buildfile::{BuildFile, Library, Load};
use bazelify_config::Config;
use bazelify_graph::{DependencyGraph, Node};
use bazelify_label::Label;
use tracing::info;

use crate::error::GenError;

/// Name of the remap macro file, written to the SDK root.
pub const BZL_FILE_NAME: &str = "remap.bzl";

/// Writes one build file per populated directory, plus the remap macro file
/// when remaps are declared.
///
/// # Errors
///
/// Returns an I/O error when a write fails.
pub fn output_build_files(
    conf: &Config,
    graph: &DependencyGraph,
) -> Result<(), GenError> {
    let mut files: BTreeMap<String, BuildFile> = BTreeMap::new();

    for node in graph.nodes() {
        match node {
            Node::Library(lib) => {
                let library =
                    make_library(&lib.label, &lib.srcs, &lib.hdrs, graph);
                file_for(conf, &mut files, lib.label.dir())
                    .add_library(library);
            }
            Node::Group(group) => {
                let library = make_library(
                    &group.label,
                    &group.srcs,
                    &group.hdrs,
                    graph,
                );
                file_for(conf, &mut files, group.label.dir())
                    .add_library(library);
                // Files absorbed from other directories must be exported
                // there for the group to reference them.
                for file in group.srcs.iter().chain(&group.hdrs) {
                    if file.dir() != group.label.dir() {
                        file_for(conf, &mut files, file.dir())
                            .export_file(file.name());
                    }
                }
            }
            Node::Remap(remap) => {
                let file = file_for(conf, &mut files, remap.label.dir());
                file.add_load(&Load {
                    source: "@bazel_skylib//rules:common_settings.bzl"
                        .to_string(),
                    symbols: vec!["label_setting".to_string()],
                });
                file.add_label_setting(remap.label_setting.clone());
            }
            Node::Override(_) => {}
        }
    }

    for file in files.values_mut() {
        file.add_load(&Load {
            source: "@rules_cc//cc:defs.bzl".to_string(),
            symbols: vec!["cc_library".to_string()],
        });
    }
    for file in files.values() {
        file.write()?;
    }
    info!(files = files.len(), "wrote build files");

    if !conf.remaps.label_settings().is_empty() {
        std::fs::write(
            conf.sdk_dir.join(BZL_FILE_NAME),
            conf.remaps.bzl_contents(),
        )?;
    }

    Ok(())
}

fn file_for<'a>(
    conf: &Config,
    files: &'a mut BTreeMap<String, BuildFile>,
    dir: &str,
) -> &'a mut BuildFile {
    files.entry(dir.to_string()).or_insert_with(|| {
        BuildFile::new(&conf.workspace_dir.join(dir))
    })
}

/// Builds a deterministic library rule for a library or group node.
fn make_library(
    label: &Label,
    srcs: &[Label],
    hdrs: &[Label],
    graph: &DependencyGraph,
) -> Library {
    let mut deps: Vec<String> = graph
        .dependencies(label)
        .iter()
        .map(|dep| dep.label().relative_to(label))
        .collect();
    let mut out_srcs: Vec<String> = srcs
        .iter()
        .map(|src| src.file_relative_to(label.dir()))
        .collect();
    let mut out_hdrs: Vec<String> = hdrs
        .iter()
        .map(|hdr| hdr.file_relative_to(label.dir()))
        .collect();
    let mut copts = includes_as_copts(label, hdrs, graph);

    out_srcs.sort();
    out_hdrs.sort();
    deps.sort();
    copts.sort();

    Library {
        name: label.name().to_string(),
        srcs: out_srcs,
        hdrs: out_hdrs,
        copts,
        deps,
    }
}

/// Collects the `-I` flags a rule needs: every include hint of its library
/// and override dependencies, plus all header directories when the rule's
/// headers span more than one.
fn includes_as_copts(
    label: &Label,
    hdrs: &[Label],
    graph: &DependencyGraph,
) -> Vec<String> {
    let mut includes: BTreeSet<String> = BTreeSet::new();

    for dep in graph.dependencies(label) {
        match dep {
            Node::Library(lib) => {
                includes.extend(lib.includes.iter().cloned());
            }
            Node::Override(target) => {
                includes.extend(target.include_dirs.iter().cloned());
            }
            Node::Group(_) | Node::Remap(_) => {}
        }
    }

    let hdr_dirs: BTreeSet<&str> = hdrs.iter().map(Label::dir).collect();
    if hdr_dirs.len() > 1 {
        includes.extend(hdr_dirs.into_iter().map(|dir| {
            if dir.is_empty() {
                ".".to_string()
            } else {
                dir.to_string()
            }
        }));
    }

    includes.into_iter().map(|inc| format!("-I{inc}")).collect()
}
