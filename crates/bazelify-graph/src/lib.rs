//! The dependency graph used to resolve includes and fix cyclic dependencies.
//!
//! Nodes are library / group / override / remap entries ([`Node`]); edges
//! denote "depends on". The graph is acyclic by construction: an edge
//! insertion that would close a cycle is rewritten into a group collapse
//! that absorbs the cycle's members into a single [`GroupNode`], leaving
//! pointer library nodes behind as externally-visible aliases.
//!
//! The graph owns its nodes by value inside a `StableDiGraph`; edges and the
//! two indexes (label to node id, file basename to resolver) reference nodes
//! by id, never by pointer. Collapsing a cycle is id rewrites on edges plus
//! deletion of absorbed nodes.

mod error;
mod node;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use bazelify_buildfile::LabelSetting;
use bazelify_label::Label;
use petgraph::Direction;
use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::DiGraph;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use tracing::debug;

#[doc(inline)]
pub use crate::error::GraphError;
#[doc(inline)]
pub use crate::node::{GroupNode, LibraryNode, Node, OverrideNode, RemapNode};

/// Resolves a file basename to the labels that can satisfy an include of it.
///
/// An override, once set, is authoritative: candidate labels are not
/// consulted. Otherwise the candidates are the live library/group nodes that
/// currently carry a file with that basename.
#[derive(Debug, Default)]
struct LabelResolver {
    override_label: Option<Label>,
    possible: BTreeSet<Label>,
}

impl LabelResolver {
    fn valid_labels(&self) -> Vec<&Label> {
        match &self.override_label {
            Some(label) => vec![label],
            None => self.possible.iter().collect(),
        }
    }

    fn is_empty(&self) -> bool {
        self.override_label.is_none() && self.possible.is_empty()
    }
}

/// Per-edge DOT snapshot output state.
#[derive(Debug)]
struct Progression {
    dir: PathBuf,
    count: u64,
}

/// A directed dependency graph over build-rule nodes.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Workspace-relative directory of the SDK root; anonymous group nodes
    /// are created here.
    sdk_rel: String,
    graph: StableDiGraph<Node, ()>,
    label_to_id: HashMap<String, NodeIndex>,
    file_index: HashMap<String, LabelResolver>,
    group_count: u64,
    progression: Option<Progression>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    ///
    /// `sdk_rel` is the workspace-relative directory of the SDK root. When
    /// `progression_dir` is given, the graph writes a numbered DOT snapshot
    /// after every successful [`DependencyGraph::add_dependency`].
    pub fn new(
        sdk_rel: impl Into<String>,
        progression_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            sdk_rel: sdk_rel.into(),
            graph: StableDiGraph::new(),
            label_to_id: HashMap::new(),
            file_index: HashMap::new(),
            group_count: 0,
            progression: progression_dir
                .map(|dir| Progression { dir, count: 0 }),
        }
    }

    /// The node with the given label, if any.
    pub fn node(&self, label: &Label) -> Option<&Node> {
        self.id(label).map(|id| &self.graph[id])
    }

    /// All live nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_indices().map(|id| &self.graph[id])
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes that can satisfy an include of the file basename `name`:
    /// the override target when one is set, otherwise every candidate.
    pub fn nodes_with_file(&self, name: &str) -> Vec<&Node> {
        let Some(resolver) = self.file_index.get(name) else {
            return Vec::new();
        };
        resolver
            .valid_labels()
            .into_iter()
            .filter_map(|label| self.node(label))
            .collect()
    }

    /// Whether the file basename `name` has an authoritative override.
    pub fn is_file_overridden(&self, name: &str) -> bool {
        self.file_index
            .get(name)
            .is_some_and(|r| r.override_label.is_some())
    }

    /// Adds a node representing one library rule and indexes every basename
    /// in its files as a candidate for its label.
    ///
    /// An override node occupying the label is removed first: override labels
    /// are reserved slots, and the file binding they installed stays intact.
    ///
    /// # Errors
    ///
    /// Returns a label-in-use error when a non-override node already occupies
    /// the label.
    pub fn add_library_node(
        &mut self,
        label: Label,
        srcs: Vec<Label>,
        hdrs: Vec<Label>,
        includes: Vec<String>,
    ) -> Result<(), GraphError> {
        if matches!(self.node(&label), Some(Node::Override(_))) {
            self.delete_node(&label)?;
        }
        if self.label_to_id.contains_key(&label.to_string()) {
            return Err(GraphError::label_in_use(&label));
        }
        let file_names: Vec<String> = srcs
            .iter()
            .chain(&hdrs)
            .map(|l| l.name().to_string())
            .collect();
        self.index_files(&label, &file_names);
        let includes = includes
            .iter()
            .map(|inc| include_dir(label.dir(), inc))
            .collect();
        let id = self.graph.add_node(Node::Library(LibraryNode {
            label: label.clone(),
            srcs,
            hdrs,
            includes,
            is_pointer: false,
        }));
        self.label_to_id.insert(label.to_string(), id);
        Ok(())
    }

    /// Creates an anonymous group node in the SDK root with a fresh synthetic
    /// name, and returns its label. The caller absorbs members into it.
    ///
    /// # Errors
    ///
    /// Returns a label-in-use error when the synthetic label collides with an
    /// existing node.
    pub fn add_group_node(&mut self) -> Result<Label, GraphError> {
        self.group_count += 1;
        let label = Label::from_parts(
            self.sdk_rel.clone(),
            format!("bazelify_group_{}", self.group_count),
        );
        if self.label_to_id.contains_key(&label.to_string()) {
            return Err(GraphError::label_in_use(&label));
        }
        let id = self.graph.add_node(Node::Group(GroupNode {
            label: label.clone(),
            srcs: Vec::new(),
            hdrs: Vec::new(),
        }));
        self.label_to_id.insert(label.to_string(), id);
        Ok(label)
    }

    /// Registers `label` as the authoritative resolution for `file_name`.
    ///
    /// When the label slot is already occupied by a live node, no node is
    /// created (the existing node keeps the slot) but the override binding
    /// still takes effect.
    ///
    /// # Errors
    ///
    /// Returns a duplicate-override error when an override for `file_name`
    /// already exists.
    pub fn add_override_node(
        &mut self,
        file_name: &str,
        label: Label,
        include_dirs: Vec<String>,
    ) -> Result<(), GraphError> {
        let resolver = self.file_index.entry(file_name.to_string()).or_default();
        if let Some(existing) = &resolver.override_label {
            return Err(GraphError::duplicate_override(file_name, existing));
        }
        resolver.override_label = Some(label.clone());
        if self.label_to_id.contains_key(&label.to_string()) {
            return Ok(());
        }
        let id = self.graph.add_node(Node::Override(OverrideNode {
            label: label.clone(),
            include_dirs,
        }));
        self.label_to_id.insert(label.to_string(), id);
        Ok(())
    }

    /// Adds a remap node: the same override binding as
    /// [`DependencyGraph::add_override_node`], with a node of remap variant
    /// carrying the label setting to emit.
    ///
    /// # Errors
    ///
    /// Returns a duplicate-override error when an override for `file_name`
    /// already exists, or a label-in-use error when a non-override node
    /// occupies the label.
    pub fn add_remap_node(
        &mut self,
        label: Label,
        file_name: &str,
        label_setting: LabelSetting,
    ) -> Result<(), GraphError> {
        if matches!(self.node(&label), Some(Node::Override(_))) {
            self.delete_node(&label)?;
        }
        let resolver = self.file_index.entry(file_name.to_string()).or_default();
        if let Some(existing) = &resolver.override_label {
            return Err(GraphError::duplicate_override(file_name, existing));
        }
        resolver.override_label = Some(label.clone());
        if self.label_to_id.contains_key(&label.to_string()) {
            return Err(GraphError::label_in_use(&label));
        }
        let id = self.graph.add_node(Node::Remap(RemapNode {
            label: label.clone(),
            label_setting,
        }));
        self.label_to_id.insert(label.to_string(), id);
        Ok(())
    }

    /// Adds a dependency edge from `src` to `dst`.
    ///
    /// A pointer source is redirected to its group. Self-dependencies and
    /// already-present edges are dropped. An insertion that would close a
    /// cycle is rewritten into a group collapse instead of an edge.
    ///
    /// # Errors
    ///
    /// Returns an unknown-node error when either endpoint is absent, or the
    /// collapse errors described in [`GraphError`].
    pub fn add_dependency(
        &mut self,
        src: &Label,
        dst: &Label,
    ) -> Result<(), GraphError> {
        let src_id =
            self.id(src).ok_or_else(|| GraphError::unknown_node(src))?;
        let dst_id =
            self.id(dst).ok_or_else(|| GraphError::unknown_node(dst))?;
        let src_id = self.shift_if_pointer(src_id)?;
        if src_id == dst_id {
            return Ok(());
        }
        if self.graph.find_edge(src_id, dst_id).is_some() {
            return Ok(());
        }
        let witness = self.back_path_edges(dst_id, src_id);
        if witness.is_empty() {
            self.graph.add_edge(src_id, dst_id, ());
        } else {
            self.merge_cycle(&witness)?;
        }
        self.write_progression()
    }

    /// The outgoing neighbors of the node at `label`, in id order. Empty when
    /// the label has no node.
    pub fn dependencies(&self, label: &Label) -> Vec<&Node> {
        let Some(id) = self.id(label) else {
            return Vec::new();
        };
        let mut targets: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(id, Direction::Outgoing)
            .collect();
        targets.sort();
        targets.into_iter().map(|t| &self.graph[t]).collect()
    }

    /// Renames the node at `before` to `after`, atomically updating the label
    /// index, the file index, and the node's own label.
    ///
    /// # Errors
    ///
    /// Returns an unknown-node error when `before` has no node, or a
    /// label-in-use error when `after` is occupied.
    pub fn change_label(
        &mut self,
        before: &Label,
        after: &Label,
    ) -> Result<(), GraphError> {
        let id = self
            .id(before)
            .ok_or_else(|| GraphError::unknown_node(before))?;
        if self.label_to_id.contains_key(&after.to_string()) {
            return Err(GraphError::label_in_use(after));
        }
        let file_names: Vec<String> = self.graph[id]
            .files()
            .map(|l| l.name().to_string())
            .collect();
        self.deindex_files(before, &file_names);
        self.index_files(after, &file_names);
        self.graph[id].set_label(after.clone());
        self.label_to_id.remove(&before.to_string());
        self.label_to_id.insert(after.to_string(), id);
        Ok(())
    }

    /// Renders the whole graph in DOT format.
    pub fn dot(&self) -> String {
        let rendered = self
            .graph
            .map(|_, node| node.to_string(), |_, _| String::new());
        format!("{}", Dot::with_config(&rendered, &[DotConfig::EdgeNoLabel]))
    }

    /// Writes the whole graph in DOT format to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the write fails.
    pub fn write_dot(&self, path: &std::path::Path) -> Result<(), GraphError> {
        std::fs::write(path, self.dot())?;
        Ok(())
    }

    /// Renders the node at `label` and its direct neighbors in DOT format.
    ///
    /// # Errors
    ///
    /// Returns an unknown-node error when `label` has no node.
    pub fn subgraph_dot(&self, label: &Label) -> Result<String, GraphError> {
        let center = self
            .id(label)
            .ok_or_else(|| GraphError::unknown_node(label))?;
        let mut sub = DiGraph::<String, String>::new();
        let mut ids = HashMap::new();
        let mut sub_id = |sub: &mut DiGraph<String, String>,
                          graph: &StableDiGraph<Node, ()>,
                          id: NodeIndex| {
            *ids.entry(id)
                .or_insert_with(|| sub.add_node(graph[id].to_string()))
        };
        let center_sub = sub_id(&mut sub, &self.graph, center);
        let mut outgoing: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(center, Direction::Outgoing)
            .collect();
        outgoing.sort();
        for target in outgoing {
            let target_sub = sub_id(&mut sub, &self.graph, target);
            sub.add_edge(center_sub, target_sub, String::new());
        }
        let mut incoming: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(center, Direction::Incoming)
            .collect();
        incoming.sort();
        for source in incoming {
            let source_sub = sub_id(&mut sub, &self.graph, source);
            sub.add_edge(source_sub, center_sub, String::new());
        }
        Ok(format!("{}", Dot::with_config(&sub, &[DotConfig::EdgeNoLabel])))
    }

    fn id(&self, label: &Label) -> Option<NodeIndex> {
        self.label_to_id.get(&label.to_string()).copied()
    }

    /// Follows a pointer node to the group it aliases; other nodes pass
    /// through unchanged.
    fn shift_if_pointer(&self, id: NodeIndex) -> Result<NodeIndex, GraphError> {
        if !self.graph[id].is_pointer() {
            return Ok(id);
        }
        let mut targets =
            self.graph.neighbors_directed(id, Direction::Outgoing);
        match (targets.next(), targets.next()) {
            (Some(target), None) => Ok(target),
            _ => Err(GraphError::pointer_invariant(self.graph[id].label())),
        }
    }

    /// Every edge lying on some directed path from `start` to `end`: the
    /// cycle witness for an inserted edge `end -> start`.
    ///
    /// An edge `(u, v)` is on such a path exactly when `u` is reachable from
    /// `start` and `end` is reachable from `v`. The result is empty when no
    /// path exists, and never contains edges of components disjoint from the
    /// cycle.
    fn back_path_edges(
        &self,
        start: NodeIndex,
        end: NodeIndex,
    ) -> Vec<(NodeIndex, NodeIndex)> {
        let forward = self.reachable(start, Direction::Outgoing);
        if !forward.contains(&end) {
            return Vec::new();
        }
        let backward = self.reachable(end, Direction::Incoming);
        let on_path: BTreeSet<NodeIndex> =
            forward.intersection(&backward).copied().collect();
        let mut edges = Vec::new();
        for &u in &on_path {
            let mut targets: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(u, Direction::Outgoing)
                .filter(|t| on_path.contains(t))
                .collect();
            targets.sort();
            for v in targets {
                edges.push((u, v));
            }
        }
        edges
    }

    fn reachable(
        &self,
        from: NodeIndex,
        direction: Direction,
    ) -> BTreeSet<NodeIndex> {
        let mut seen = BTreeSet::from([from]);
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            for next in self.graph.neighbors_directed(id, direction) {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen
    }

    /// Collapses the members of a cycle witness into a single group node.
    ///
    /// Witness edges are removed; the members' files are reindexed under the
    /// group; absorbed group members are deleted with their external incoming
    /// edges rerouted to the surviving group; library members stay behind as
    /// pointers keeping their label and their external incoming edges.
    fn merge_cycle(
        &mut self,
        witness: &[(NodeIndex, NodeIndex)],
    ) -> Result<(), GraphError> {
        let mut members: BTreeSet<NodeIndex> = witness
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect();

        // A pointer must stay a leaf alias of its group; a witness that
        // reaches one indicates the label cannot be re-absorbed.
        for &member in &members {
            match &self.graph[member] {
                Node::Library(lib) if lib.is_pointer => {
                    return Err(GraphError::label_in_use(&lib.label));
                }
                Node::Library(_) | Node::Group(_) => {}
                node @ (Node::Override(_) | Node::Remap(_)) => {
                    return Err(GraphError::unsupported_cycle_member(
                        node.label(),
                    ));
                }
            }
        }

        for &(a, b) in witness {
            if let Some(edge) = self.graph.find_edge(a, b) {
                self.graph.remove_edge(edge);
            }
        }

        // Reuse a group already in the member set (lowest id wins) or create
        // a fresh anonymous one.
        let group_id = match members
            .iter()
            .copied()
            .find(|&m| matches!(self.graph[m], Node::Group(_)))
        {
            Some(id) => id,
            None => {
                let label = self.add_group_node()?;
                self.id(&label)
                    .ok_or_else(|| GraphError::unknown_node(&label))?
            }
        };
        members.remove(&group_id);
        let group_label = self.graph[group_id].label().clone();

        for &member in &members {
            let (member_label, srcs, hdrs, member_is_group) =
                match &self.graph[member] {
                    Node::Library(lib) => (
                        lib.label.clone(),
                        lib.srcs.clone(),
                        lib.hdrs.clone(),
                        false,
                    ),
                    Node::Group(group) => (
                        group.label.clone(),
                        group.srcs.clone(),
                        group.hdrs.clone(),
                        true,
                    ),
                    node => {
                        return Err(GraphError::unsupported_cycle_member(
                            node.label(),
                        ));
                    }
                };

            let file_names: Vec<String> = srcs
                .iter()
                .chain(&hdrs)
                .map(|l| l.name().to_string())
                .collect();
            self.deindex_files(&member_label, &file_names);
            self.index_files(&group_label, &file_names);

            if let Node::Group(group) = &mut self.graph[group_id] {
                group.srcs.extend(srcs);
                group.hdrs.extend(hdrs);
            }

            // Outgoing edges move to the group; edges into the collapsed
            // component disappear.
            let outgoing: Vec<(EdgeIndex, NodeIndex)> = self
                .graph
                .edges_directed(member, Direction::Outgoing)
                .map(|e| (e.id(), e.target()))
                .collect();
            for (edge, target) in outgoing {
                self.graph.remove_edge(edge);
                if target == group_id || members.contains(&target) {
                    continue;
                }
                self.ensure_edge(group_id, target);
            }

            // External incoming edges follow a deleted group member to the
            // surviving group, but stay on a library member: the pointer left
            // behind chains to the group.
            let incoming: Vec<(EdgeIndex, NodeIndex)> = self
                .graph
                .edges_directed(member, Direction::Incoming)
                .map(|e| (e.id(), e.source()))
                .collect();
            for (edge, source) in incoming {
                if source == group_id || members.contains(&source) {
                    self.graph.remove_edge(edge);
                } else if member_is_group {
                    self.graph.remove_edge(edge);
                    self.ensure_edge(source, group_id);
                }
            }
        }

        for &member in &members {
            if matches!(self.graph[member], Node::Group(_)) {
                let label = self.graph[member].label().to_string();
                self.label_to_id.remove(&label);
                self.graph.remove_node(member);
            } else {
                if let Node::Library(lib) = &mut self.graph[member] {
                    lib.is_pointer = true;
                    lib.srcs.clear();
                    lib.hdrs.clear();
                }
                self.ensure_edge(member, group_id);
            }
        }

        debug!(
            group = %group_label,
            members = members.len(),
            "collapsed cycle"
        );
        Ok(())
    }

    fn ensure_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Removes a node, its label mapping, and its file index entries. The
    /// override binding a deleted override node installed stays in place.
    fn delete_node(&mut self, label: &Label) -> Result<(), GraphError> {
        let id = self
            .id(label)
            .ok_or_else(|| GraphError::unknown_node(label))?;
        let file_names: Vec<String> = self.graph[id]
            .files()
            .map(|l| l.name().to_string())
            .collect();
        self.deindex_files(label, &file_names);
        self.graph.remove_node(id);
        self.label_to_id.remove(&label.to_string());
        Ok(())
    }

    fn index_files(&mut self, label: &Label, file_names: &[String]) {
        for name in file_names {
            self.file_index
                .entry(name.clone())
                .or_default()
                .possible
                .insert(label.clone());
        }
    }

    fn deindex_files(&mut self, label: &Label, file_names: &[String]) {
        for name in file_names {
            if let Some(resolver) = self.file_index.get_mut(name) {
                resolver.possible.remove(label);
                if resolver.is_empty() {
                    self.file_index.remove(name);
                }
            }
        }
    }

    fn write_progression(&mut self) -> Result<(), GraphError> {
        if self.progression.is_none() {
            return Ok(());
        }
        let dot = self.dot();
        if let Some(progression) = &mut self.progression {
            std::fs::create_dir_all(&progression.dir)?;
            let path = progression
                .dir
                .join(format!("{:08}.dot", progression.count));
            std::fs::write(path, dot)?;
            progression.count += 1;
        }
        Ok(())
    }
}

/// Joins an include-directory hint onto a label's workspace-relative
/// directory, lexically. The workspace root renders as `.`.
fn include_dir(label_dir: &str, hint: &str) -> String {
    let mut parts: Vec<&str> =
        label_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in hint.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
