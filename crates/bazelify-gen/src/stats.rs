//! Graph statistics and per-named-group subgraph output.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use bazelify_config::Config;
use bazelify_graph::{DependencyGraph, Node};
use bazelify_label::Label;
use tracing::warn;

use crate::error::GenError;

/// Counts describing the current state of a dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub group_count: usize,
}

impl GraphStats {
    /// Takes a snapshot of the given graph.
    pub fn snapshot(graph: &DependencyGraph) -> Self {
        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            group_count: graph
                .nodes()
                .filter(|n| matches!(n, Node::Group(_)))
                .count(),
        }
    }

    /// A human-readable report of the counts.
    pub fn report(&self) -> String {
        let mut out = String::from("Graph stats:\n");
        writeln!(out, "  Node count: {}", self.node_count).unwrap();
        writeln!(out, "  Edge count: {}", self.edge_count).unwrap();
        writeln!(out, "  Group count: {}", self.group_count).unwrap();
        out
    }
}

/// Writes a DOT neighborhood subgraph for every configured named group that
/// actually exists in the graph, as `<name>.dot` files in `dir`.
///
/// # Errors
///
/// Returns an I/O error when the directory or a file cannot be written.
pub fn write_named_group_graphs(
    conf: &Config,
    graph: &DependencyGraph,
    dir: &Path,
) -> Result<(), GenError> {
    std::fs::create_dir_all(dir)?;
    // Sort for a deterministic write order.
    let mut names: BTreeMap<&str, ()> = BTreeMap::new();
    for by_last in conf.named_groups.values() {
        for name in by_last.values() {
            names.insert(name, ());
        }
    }
    for name in names.keys() {
        let label = Label::from_parts(conf.sdk_rel.clone(), (*name).to_string());
        match graph.subgraph_dot(&label) {
            Ok(dot) => {
                std::fs::write(dir.join(format!("{name}.dot")), dot)?;
            }
            Err(err) => {
                warn!(group = name, %err, "named group has no node this run");
            }
        }
    }
    Ok(())
}
