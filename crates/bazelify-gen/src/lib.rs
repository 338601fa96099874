//! The build-file generation pipeline.
//!
//! This crate sequences the phases that turn a vendor SDK tree into build
//! files: configuration load, graph population ([`SdkWalker`]), group naming
//! ([`name_groups`]), and emission ([`output_build_files`]). Resolution or
//! naming gaps short-circuit into a hint file and a user-facing error; a
//! fully successful run removes any stale hint.
//!
//! The pipeline is single-threaded and synchronous: each phase completes
//! before the next begins, and the graph is owned by the driver and passed
//! by reference to each collaborator.

mod error;
mod groups;
mod hint;
mod includes;
mod output;
mod stats;
mod walk;

use std::path::PathBuf;

use bazelify_config::Config;
use bazelify_graph::DependencyGraph;
use tracing::{debug, info, warn};

#[doc(inline)]
pub use crate::error::GenError;
#[doc(inline)]
pub use crate::groups::{UnnamedGroup, name_groups};
#[doc(inline)]
pub use crate::hint::{
    hint_path, remove_stale_hint, write_unnamed_groups_hint,
    write_unresolved_deps_hint,
};
#[doc(inline)]
pub use crate::includes::read_includes;
#[doc(inline)]
pub use crate::output::{BZL_FILE_NAME, output_build_files};
#[doc(inline)]
pub use crate::stats::{GraphStats, write_named_group_graphs};
#[doc(inline)]
pub use crate::walk::{SdkWalker, UnresolvedDep};

/// Options for one generation run, parsed once from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// The workspace root. Absolute.
    pub workspace_dir: PathBuf,
    /// The SDK root. Absolute, strictly inside the workspace.
    pub sdk_dir: PathBuf,
    /// Verbose diagnostics (hint contents in error messages).
    pub verbose: bool,
    /// Write the full graph in DOT format here at pipeline exit.
    pub dot_graph_path: Option<PathBuf>,
    /// Write a numbered DOT snapshot here after every edge insertion.
    pub dot_progression_dir: Option<PathBuf>,
    /// Write per-named-group neighborhood subgraphs here on success.
    pub named_group_graphs_dir: Option<PathBuf>,
}

/// Runs the whole pipeline: removes stale build files, generates new ones,
/// and maintains the hint file.
///
/// # Errors
///
/// Returns [`GenError`] on the first fatal failure, or the unresolved /
/// unnamed short-circuit errors after writing a hint file.
pub fn generate_build_files(opts: &Options) -> Result<(), GenError> {
    if !opts.workspace_dir.is_absolute() {
        return Err(GenError::path_invariant(
            "workspace must be an absolute path",
        ));
    }
    if !opts.sdk_dir.is_absolute() {
        return Err(GenError::path_invariant(
            "sdk dir must be an absolute path",
        ));
    }
    if !opts.sdk_dir.starts_with(&opts.workspace_dir) {
        return Err(GenError::path_invariant(format!(
            "sdk dir is not inside the workspace:\nsdk={}\nworkspace={}",
            opts.sdk_dir.display(),
            opts.workspace_dir.display()
        )));
    }

    let conf = Config::load(&opts.workspace_dir, &opts.sdk_dir, opts.verbose)?;
    info!(sdk = %conf.sdk_dir.display(), "generating build files");

    let mut graph = DependencyGraph::new(
        conf.sdk_rel.clone(),
        opts.dot_progression_dir.clone(),
    );
    let result = run_phases(&conf, &mut graph, opts);

    // The full-graph output is written even when a phase short-circuited,
    // so the state that produced a hint can be inspected.
    if let Some(path) = &opts.dot_graph_path {
        info!(path = %path.display(), "saving dependency graph");
        if let Err(err) = graph.write_dot(path) {
            warn!(%err, "failed to write dependency graph");
        }
    }

    result
}

fn run_phases(
    conf: &Config,
    graph: &mut DependencyGraph,
    opts: &Options,
) -> Result<(), GenError> {
    let walker = SdkWalker::new(conf);
    let unresolved = walker.populate(graph)?;
    if !unresolved.is_empty() {
        return Err(write_unresolved_deps_hint(conf, &unresolved));
    }

    let unnamed = name_groups(conf, graph)?;
    if !unnamed.is_empty() {
        return Err(write_unnamed_groups_hint(conf, &unnamed));
    }

    output_build_files(conf, graph)?;
    remove_stale_hint(&conf.sdk_dir)?;

    debug!("{}", GraphStats::snapshot(graph).report());
    if let Some(dir) = &opts.named_group_graphs_dir {
        write_named_group_graphs(conf, graph, dir)?;
    }
    Ok(())
}
