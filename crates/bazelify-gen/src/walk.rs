//! Graph population from filesystem contents.
//!
//! The walker pre-seeds source-set nodes, adds one library node per walked
//! header (with its sibling `.c` when present), registers override and remap
//! nodes from configuration, then resolves every include to an edge. Edges
//! are buffered and applied after the node loop completes, so collapses
//! triggered by earlier edges do not disturb the iteration.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use bazelify_config::Config;
use bazelify_graph::{DependencyGraph, Node};
use bazelify_label::Label;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::GenError;
use crate::includes::read_includes;

/// An include that could not be resolved to exactly one target.
#[derive(Debug, Clone)]
pub struct UnresolvedDep {
    /// The include token, as written in the source.
    pub file_name: String,
    /// Labels of the libraries that requested it.
    pub included_by: Vec<Label>,
    /// The candidate labels found for it (possibly none).
    pub candidates: Vec<Label>,
}

/// Populates a dependency graph from the SDK tree and configuration.
pub struct SdkWalker<'a> {
    conf: &'a Config,
}

impl<'a> SdkWalker<'a> {
    pub fn new(conf: &'a Config) -> Self {
        Self { conf }
    }

    /// Runs the full population pipeline and returns the includes that
    /// resolution could not pin to a single target. An empty return means
    /// the graph is complete.
    ///
    /// # Errors
    ///
    /// Returns [`GenError`] on filesystem failures or graph invariant
    /// violations; unresolved includes are data, not errors.
    pub fn populate(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<Vec<UnresolvedDep>, GenError> {
        self.add_source_set_nodes(graph)?;
        self.add_files_as_nodes(graph)?;
        self.add_override_nodes(graph)?;
        self.add_remap_nodes(graph)?;
        self.add_deps_as_edges(graph)
    }

    fn add_source_set_nodes(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<(), GenError> {
        for set in &self.conf.source_sets {
            graph.add_library_node(
                set.label.clone(),
                set.srcs.clone(),
                set.hdrs.clone(),
                vec![".".to_string()],
            )?;
        }
        Ok(())
    }

    /// Walks the SDK tree, removing stale build files and adding one library
    /// node per header that no source set claims.
    fn add_files_as_nodes(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<(), GenError> {
        let conf = self.conf;
        let walker = WalkDir::new(&conf.sdk_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                match entry.path().strip_prefix(&conf.sdk_dir) {
                    Ok(rel) if !rel.as_os_str().is_empty() => {
                        !conf.is_excluded(rel)
                    }
                    _ => true,
                }
            });
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();

            if entry.file_name().to_str()
                == Some(bazelify_buildfile::BUILD_FILE_NAME)
            {
                debug!(path = %path.display(), "removing stale build file");
                std::fs::remove_file(path)?;
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(".h") else {
                continue;
            };
            if conf.is_source_set_file(path) {
                continue;
            }

            let dir = path.parent().unwrap_or(&conf.sdk_dir);
            let label = Label::new(dir, stem, &conf.workspace_dir)?;
            let hdrs = vec![Label::new(dir, name, &conf.workspace_dir)?];
            let src_name = format!("{stem}.c");
            let srcs = if dir.join(&src_name).is_file() {
                vec![Label::new(dir, &src_name, &conf.workspace_dir)?]
            } else {
                Vec::new()
            };
            graph.add_library_node(label, srcs, hdrs, vec![".".to_string()])?;
        }
        Ok(())
    }

    fn add_override_nodes(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<(), GenError> {
        for (name, target) in &self.conf.include_overrides {
            graph.add_override_node(
                name,
                target.label.clone(),
                target.include_dirs.clone(),
            )?;
        }
        Ok(())
    }

    fn add_remap_nodes(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<(), GenError> {
        for (file_name, setting) in self.conf.remaps.label_settings() {
            let label = Label::from_parts(
                self.conf.sdk_rel.clone(),
                setting.name.clone(),
            );
            graph.add_remap_node(label, file_name, setting.clone())?;
        }
        for lib in self.conf.remaps.libraries() {
            let label = Label::from_parts(
                self.conf.sdk_rel.clone(),
                lib.name.clone(),
            );
            graph.add_library_node(label, Vec::new(), Vec::new(), Vec::new())?;
        }
        Ok(())
    }

    /// Resolves every library node's includes to edges. Resolved edges are
    /// buffered and applied once the node loop is done; unresolved includes
    /// are merged per token across requesters.
    fn add_deps_as_edges(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<Vec<UnresolvedDep>, GenError> {
        let libraries: Vec<(Label, Vec<Label>, Vec<Label>)> = graph
            .nodes()
            .filter_map(|node| match node {
                Node::Library(lib) if !lib.is_pointer => Some((
                    lib.label.clone(),
                    lib.srcs.clone(),
                    lib.hdrs.clone(),
                )),
                _ => None,
            })
            .collect();

        let mut all_resolved: Vec<(Label, Label)> = Vec::new();
        let mut all_unresolved: IndexMap<String, UnresolvedDep> =
            IndexMap::new();
        for (label, srcs, hdrs) in &libraries {
            let (resolved, unresolved) =
                self.read_deps_once(graph, label, srcs, hdrs)?;
            all_resolved.extend(resolved);
            for dep in unresolved {
                match all_unresolved.entry(dep.file_name.clone()) {
                    indexmap::map::Entry::Occupied(mut entry) => entry
                        .get_mut()
                        .included_by
                        .extend(dep.included_by),
                    indexmap::map::Entry::Vacant(entry) => {
                        entry.insert(dep);
                    }
                }
            }
        }

        for (src, dst) in all_resolved {
            graph.add_dependency(&src, &dst)?;
        }

        Ok(all_unresolved.into_values().collect())
    }

    /// Resolves the includes of one library node.
    fn read_deps_once(
        &self,
        graph: &DependencyGraph,
        label: &Label,
        srcs: &[Label],
        hdrs: &[Label],
    ) -> Result<(Vec<(Label, Label)>, Vec<UnresolvedDep>), GenError> {
        let conf = self.conf;

        // Union of include tokens across this node's files. An unreadable
        // header is logged and contributes nothing; a missing source sibling
        // stays quiet outside verbose runs.
        let mut tokens: IndexSet<String> = IndexSet::new();
        for file in srcs.iter().chain(hdrs) {
            let path = conf
                .workspace_dir
                .join(file.dir())
                .join(file.name());
            match read_includes(&path) {
                Ok(includes) => tokens.extend(includes),
                Err(err) if file.name().ends_with(".h") => {
                    warn!(path = %path.display(), %err, "cannot read header");
                }
                Err(err) => {
                    debug!(path = %path.display(), %err, "cannot read source");
                }
            }
        }

        let own_files: HashSet<&str> = srcs
            .iter()
            .chain(hdrs)
            .map(|l| l.name())
            .collect();
        tokens.retain(|token| {
            let base = basename(token);
            !conf.ignore_headers.contains(base) && !own_files.contains(base)
        });

        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();

        let mut search_paths: Vec<PathBuf> =
            Vec::with_capacity(conf.include_dirs.len() + 1);
        search_paths.push(conf.workspace_dir.join(label.dir()));
        search_paths.extend(conf.include_dirs.iter().cloned());

        'token: for token in &tokens {
            let base = basename(token);

            // An override binding is authoritative.
            if graph.is_file_overridden(base) {
                if let Some(node) = graph.nodes_with_file(base).first() {
                    let dst = node.label().clone();
                    if dst != *label {
                        resolved.push((label.clone(), dst));
                    }
                    continue;
                }
            }

            // Probe the search paths for a relative include.
            for search in &search_paths {
                let candidate = clean_path(&search.join(token));
                let Ok(meta) = std::fs::metadata(&candidate) else {
                    continue;
                };
                if meta.is_dir() {
                    continue;
                }
                let Some(dir) = candidate.parent() else {
                    continue;
                };
                let stem = base.strip_suffix(".h").unwrap_or(base);
                let dep_label =
                    Label::new(dir, stem, &conf.workspace_dir)?;
                if graph.node(&dep_label).is_none() {
                    continue;
                }
                if dep_label != *label {
                    resolved.push((label.clone(), dep_label));
                }
                continue 'token;
            }

            // Global name lookup: exactly one candidate resolves.
            let nodes = graph.nodes_with_file(base);
            if nodes.len() == 1 {
                let dst = nodes[0].label().clone();
                if dst != *label {
                    resolved.push((label.clone(), dst));
                }
            } else {
                unresolved.push(UnresolvedDep {
                    file_name: token.clone(),
                    included_by: vec![label.clone()],
                    candidates: nodes
                        .iter()
                        .map(|n| n.label().clone())
                        .collect(),
                });
            }
        }

        Ok((resolved, unresolved))
    }
}

/// The final component of a slash-separated include token.
fn basename(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
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
    use super::*;

    #[test]
    fn test_basename() {
        assert_eq!(basename("a.h"), "a.h");
        assert_eq!(basename("dir/c.h"), "c.h");
        assert_eq!(basename("../up/x.h"), "x.h");
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(
            clean_path(Path::new("/sdk/dir/../c.h")),
            PathBuf::from("/sdk/c.h")
        );
        assert_eq!(
            clean_path(Path::new("/sdk/./a.h")),
            PathBuf::from("/sdk/a.h")
        );
    }
}
