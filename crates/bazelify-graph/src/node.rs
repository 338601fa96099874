//! The graph's node taxonomy.
//!
//! Nodes are a tagged union with four variants sharing an identity/label
//! contract. A tagged union is used instead of trait objects so every switch
//! over node kinds is forced to consider each variant; in particular the
//! "override and remap nodes do not absorb" rule is syntactically total.

use std::fmt;

use bazelify_buildfile::LabelSetting;
use bazelify_label::Label;

/// A node in the dependency graph.
#[derive(Debug, Clone)]
pub enum Node {
    /// One emitted library rule.
    Library(LibraryNode),
    /// A merged strongly-connected component.
    Group(GroupNode),
    /// An externally-defined dependency target; emits no rule of its own.
    Override(OverrideNode),
    /// A late-binding label setting chosen at binary assembly time.
    Remap(RemapNode),
}

/// A library rule derived from a header (plus its sibling source, when one
/// exists) or from a declared source set.
#[derive(Debug, Clone)]
pub struct LibraryNode {
    pub label: Label,
    pub srcs: Vec<Label>,
    pub hdrs: Vec<Label>,
    /// Include-directory hints exposed to consumers, workspace-relative.
    pub includes: Vec<String>,
    /// True once this node's contents were absorbed into a group. A pointer
    /// carries no files and has a single outgoing edge to its group.
    pub is_pointer: bool,
}

/// A merged component carrying the files of all absorbed members.
#[derive(Debug, Clone)]
pub struct GroupNode {
    pub label: Label,
    pub srcs: Vec<Label>,
    pub hdrs: Vec<Label>,
}

/// A user-supplied resolution target living outside the SDK.
#[derive(Debug, Clone)]
pub struct OverrideNode {
    pub label: Label,
    /// Include directories injected into consumers, workspace-relative.
    pub include_dirs: Vec<String>,
}

/// A label-setting indirection rule for one remapped header.
#[derive(Debug, Clone)]
pub struct RemapNode {
    pub label: Label,
    pub label_setting: LabelSetting,
}

impl Node {
    /// The node's current label.
    pub fn label(&self) -> &Label {
        match self {
            Node::Library(n) => &n.label,
            Node::Group(n) => &n.label,
            Node::Override(n) => &n.label,
            Node::Remap(n) => &n.label,
        }
    }

    pub(crate) fn set_label(&mut self, label: Label) {
        match self {
            Node::Library(n) => n.label = label,
            Node::Group(n) => n.label = label,
            Node::Override(n) => n.label = label,
            Node::Remap(n) => n.label = label,
        }
    }

    /// The file labels this node carries. Only library and group nodes carry
    /// files; override and remap nodes contribute nothing to the file index.
    pub fn files(&self) -> impl Iterator<Item = &Label> + '_ {
        let (srcs, hdrs): (&[Label], &[Label]) = match self {
            Node::Library(n) => (&n.srcs, &n.hdrs),
            Node::Group(n) => (&n.srcs, &n.hdrs),
            Node::Override(_) | Node::Remap(_) => (&[], &[]),
        };
        srcs.iter().chain(hdrs.iter())
    }

    /// True for a library node that now aliases a group.
    pub fn is_pointer(&self) -> bool {
        matches!(self, Node::Library(n) if n.is_pointer)
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Node::Library(n) if n.is_pointer => "pointer",
            Node::Library(_) => "library",
            Node::Group(_) => "group",
            Node::Override(_) => "override",
            Node::Remap(_) => "remap",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.kind_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hdr(dir: &str, name: &str) -> Label {
        Label::from_parts(dir, name)
    }

    #[test]
    fn test_files_covers_srcs_and_hdrs() {
        let node = Node::Library(LibraryNode {
            label: Label::from_parts("sdk", "a"),
            srcs: vec![hdr("sdk", "a.c")],
            hdrs: vec![hdr("sdk", "a.h")],
            includes: vec![],
            is_pointer: false,
        });
        let names: Vec<&str> = node.files().map(Label::name).collect();
        assert_eq!(names, vec!["a.c", "a.h"]);
    }

    #[test]
    fn test_override_and_remap_carry_no_files() {
        let node = Node::Override(OverrideNode {
            label: Label::from_parts("other", "x"),
            include_dirs: vec!["other".to_string()],
        });
        assert_eq!(node.files().count(), 0);
        assert!(!node.is_pointer());
    }

    #[test]
    fn test_display_names_kind() {
        let node = Node::Group(GroupNode {
            label: Label::from_parts("sdk", "bazelify_group_1"),
            srcs: vec![],
            hdrs: vec![],
        });
        assert_eq!(node.to_string(), "//sdk:bazelify_group_1 (group)");
    }
}
