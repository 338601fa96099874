//! Stable naming for cycle-collapsed group nodes.
//!
//! A group's identity across runs is the pair of extremes of its sorted
//! header set, rendered relative to the group's directory. Configured
//! `named_groups` entries keyed on that pair rename the group; groups with
//! no matching entry are returned so the pipeline can emit a hint.

use bazelify_config::Config;
use bazelify_graph::{DependencyGraph, Node};
use bazelify_label::Label;
use tracing::debug;

use crate::error::GenError;

/// A group node that no `named_groups` entry matched.
#[derive(Debug, Clone)]
pub struct UnnamedGroup {
    /// The group's current synthetic name, usable as a hint placeholder.
    pub name: String,
    pub first_hdr: String,
    pub last_hdr: String,
}

/// Renames every group node with a matching `named_groups` entry and returns
/// the groups that remain unnamed. If any remain, downstream phases must
/// halt and produce a hint.
///
/// # Errors
///
/// Returns a group-too-small error when a group carries fewer than two
/// headers, which indicates an internal defect.
pub fn name_groups(
    conf: &Config,
    graph: &mut DependencyGraph,
) -> Result<Vec<UnnamedGroup>, GenError> {
    let groups: Vec<(Label, Vec<Label>)> = graph
        .nodes()
        .filter_map(|node| match node {
            Node::Group(group) => {
                Some((group.label.clone(), group.hdrs.clone()))
            }
            _ => None,
        })
        .collect();

    let mut unnamed = Vec::new();
    for (label, hdrs) in groups {
        if hdrs.len() < 2 {
            return Err(GenError::group_too_small(&label, hdrs.len()));
        }
        let mut rendered: Vec<String> = hdrs
            .iter()
            .map(|hdr| hdr.file_relative_to(label.dir()))
            .collect();
        rendered.sort();
        let first = &rendered[0];
        let last = &rendered[rendered.len() - 1];

        match conf
            .named_groups
            .get(first)
            .and_then(|by_last| by_last.get(last))
        {
            Some(name) => {
                let after = Label::from_parts(label.dir(), name.clone());
                if after != label {
                    debug!(before = %label, after = %after, "naming group");
                    graph.change_label(&label, &after)?;
                }
            }
            None => unnamed.push(UnnamedGroup {
                name: label.name().to_string(),
                first_hdr: first.clone(),
                last_hdr: last.clone(),
            }),
        }
    }
    Ok(unnamed)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Loads a config for a throwaway workspace with the given rc contents.
    fn config(rc: &str) -> (TempDir, Config) {
        let workspace = TempDir::new().unwrap();
        let sdk = workspace.path().join("sdk");
        fs::create_dir_all(&sdk).unwrap();
        fs::write(sdk.join(bazelify_config::RC_FILE_NAME), rc).unwrap();
        let conf =
            Config::load(workspace.path(), &sdk, false).unwrap();
        (workspace, conf)
    }

    /// Builds a graph holding one collapsed two-header group.
    fn graph_with_group() -> (DependencyGraph, Label) {
        let mut graph = DependencyGraph::new("sdk", None);
        for name in ["a", "b"] {
            graph
                .add_library_node(
                    Label::from_parts("sdk", name),
                    vec![],
                    vec![Label::from_parts("sdk", format!("{name}.h"))],
                    vec![],
                )
                .unwrap();
        }
        let a = Label::from_parts("sdk", "a");
        let b = Label::from_parts("sdk", "b");
        graph.add_dependency(&a, &b).unwrap();
        graph.add_dependency(&b, &a).unwrap();
        (graph, Label::from_parts("sdk", "bazelify_group_1"))
    }

    #[test]
    fn test_matching_entry_renames_group() {
        let (_workspace, conf) = config(
            "[[named_groups]]\n\
             name = \"ab\"\n\
             first_hdr = \"a.h\"\n\
             last_hdr = \"b.h\"\n",
        );
        let (mut graph, group) = graph_with_group();
        let unnamed = name_groups(&conf, &mut graph).unwrap();
        assert!(unnamed.is_empty());
        assert!(graph.node(&group).is_none());
        assert!(graph.node(&Label::from_parts("sdk", "ab")).is_some());
    }

    #[test]
    fn test_unmatched_group_collected_with_extremes() {
        let (_workspace, conf) = config("");
        let (mut graph, group) = graph_with_group();
        let unnamed = name_groups(&conf, &mut graph).unwrap();
        assert_eq!(unnamed.len(), 1);
        assert_eq!(unnamed[0].name, "bazelify_group_1");
        assert_eq!(unnamed[0].first_hdr, "a.h");
        assert_eq!(unnamed[0].last_hdr, "b.h");
        assert!(graph.node(&group).is_some());
    }

    #[test]
    fn test_name_equal_to_current_label_is_kept() {
        let (_workspace, conf) = config(
            "[[named_groups]]\n\
             name = \"bazelify_group_1\"\n\
             first_hdr = \"a.h\"\n\
             last_hdr = \"b.h\"\n",
        );
        let (mut graph, group) = graph_with_group();
        let unnamed = name_groups(&conf, &mut graph).unwrap();
        assert!(unnamed.is_empty());
        assert!(graph.node(&group).is_some());
    }

    #[test]
    fn test_group_with_too_few_headers_is_a_defect() {
        let (_workspace, conf) = config("");
        let mut graph = DependencyGraph::new("sdk", None);
        graph.add_group_node().unwrap();
        let err = name_groups(&conf, &mut graph).unwrap_err();
        assert!(err.is_group_too_small());
    }
}
