//! The assembly reference graph.
//!
//! Assembly references may be circular, so nodes live in one arena and refer to each
//! other by [`NodeId`]. Edges are stored twice, as `references` on the source and
//! `referenced_by` on the target; [`AssemblyGraph::add_reference`] is the only way to
//! create one and always writes both sides.
//!
//! # Key Components
//!
//! - [`AssemblyGraph`] - node arena plus a key index enforcing one node per effective identity
//! - [`AssemblyNode`] - a vertex with its identities, resolution and edges
//! - [`Resolution`] - resolved with metadata, or not found with an optional alternative
//! - [`dfs`] - iterative depth-first traversal used for reachability
//!
//! Nodes are never removed. Once analysis finishes, the graph is only read.

mod node;
mod nodeid;
mod traversal;

pub use node::{AssemblyNode, Resolution};
pub use nodeid::NodeId;
pub use traversal::{dfs, DfsIterator};

use std::{collections::BTreeMap, sync::Arc};

use crate::{classify::AssemblySource, identity::AssemblyIdentity, loader::AssemblyMetadata};

/// Node arena keyed by effective identity.
#[derive(Debug, Clone, Default)]
pub struct AssemblyGraph {
    nodes: Vec<AssemblyNode>,
    index: BTreeMap<String, NodeId>,
}

impl AssemblyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node for `effective`, inserting it if needed.
    ///
    /// An existing node keeps the declared identity it was created with.
    pub fn get_or_insert(
        &mut self,
        identity: AssemblyIdentity,
        effective: AssemblyIdentity,
    ) -> NodeId {
        let key = effective.key();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(AssemblyNode::new(id, identity, effective));
        self.index.insert(key, id);
        id
    }

    /// Adds the edge `from -> to` on both endpoints. Adding it again does nothing.
    ///
    /// # Panics
    /// Panics if either id does not belong to this graph.
    pub fn add_reference(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from.0].references.insert(to);
        self.nodes[to.0].referenced_by.insert(from);
    }

    /// Returns the node with `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &AssemblyNode {
        &self.nodes[id.0]
    }

    /// Returns the node with `id`, or `None` for a foreign id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&AssemblyNode> {
        self.nodes.get(id.0)
    }

    /// Looks up a node by key. The key is case-folded before lookup.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<NodeId> {
        self.index.get(&key.to_lowercase()).copied()
    }

    /// Nodes in id (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &AssemblyNode> {
        self.nodes.iter()
    }

    /// Nodes in key order.
    pub fn iter_by_key(&self) -> impl Iterator<Item = &AssemblyNode> {
        self.index.values().map(|id| &self.nodes[id.0])
    }

    /// Attaches metadata to `id`. Returns `false` if the node was already resolved, in
    /// which case nothing changes.
    ///
    /// # Panics
    /// Panics if `source` is `NotFound` or the node carries an alternative version.
    pub fn resolve(
        &mut self,
        id: NodeId,
        source: AssemblySource,
        metadata: Arc<AssemblyMetadata>,
        origin_file_name: Option<String>,
    ) -> bool {
        self.nodes[id.0].resolve(source, metadata, origin_file_name)
    }

    /// Records `alternative` as a stand-in for the unresolved node `id`.
    ///
    /// # Panics
    /// Panics if `id` holds metadata, if `alternative` does not, if they are the same
    /// node, or if their simple names differ.
    pub fn set_alternative_version(&mut self, id: NodeId, alternative: NodeId) {
        assert_ne!(id, alternative, "a node cannot be its own alternative");

        let candidate = &self.nodes[alternative.0];
        assert!(
            candidate.has_metadata(),
            "alternative {} is not resolved",
            candidate.key
        );
        assert!(
            candidate.identity.same_name(&self.nodes[id.0].identity),
            "alternative {} has a different name than {}",
            candidate.key,
            self.nodes[id.0].key
        );

        self.nodes[id.0].set_alternative(alternative);
    }

    /// Sets `reachable_from_root` on every node reachable from `roots`.
    pub fn mark_reachable(&mut self, roots: &[NodeId]) {
        let reached: Vec<NodeId> = dfs(self, roots).collect();
        for id in reached {
            self.nodes[id.0].reachable_from_root = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{identity, metadata, version};

    #[test]
    fn test_get_or_insert_dedups_by_effective_key() {
        let mut graph = AssemblyGraph::new();
        let a = graph.get_or_insert(identity("Lib"), identity("Lib"));
        let b = graph.get_or_insert(identity("LIB"), identity("LIB"));
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(a).identity().name, "Lib");

        let declared = AssemblyIdentity::new("Lib", version("0.9.0.0"));
        let c = graph.get_or_insert(declared, identity("Lib"));
        assert_eq!(a, c);

        assert_eq!(graph.find(&identity("lib").display_name()), Some(a));
        assert!(graph.find("nothing").is_none());
    }

    #[test]
    fn test_edges_are_symmetric_and_deduplicated() {
        let mut graph = AssemblyGraph::new();
        let app = graph.get_or_insert(identity("App"), identity("App"));
        let lib = graph.get_or_insert(identity("Lib"), identity("Lib"));

        graph.add_reference(app, lib);
        graph.add_reference(app, lib);

        assert_eq!(graph.node(app).references().collect::<Vec<_>>(), vec![lib]);
        assert_eq!(graph.node(lib).referenced_by().collect::<Vec<_>>(), vec![app]);
        assert_eq!(graph.node(app).referenced_by_count(), 0);
    }

    #[test]
    fn test_iteration_orders() {
        let mut graph = AssemblyGraph::new();
        let zed = graph.get_or_insert(identity("Zed"), identity("Zed"));
        let alpha = graph.get_or_insert(identity("alpha"), identity("alpha"));

        let by_id: Vec<NodeId> = graph.iter().map(AssemblyNode::id).collect();
        assert_eq!(by_id, vec![zed, alpha]);

        let by_key: Vec<NodeId> = graph.iter_by_key().map(AssemblyNode::id).collect();
        assert_eq!(by_key, vec![alpha, zed]);
    }

    #[test]
    fn test_alternative_version() {
        let mut graph = AssemblyGraph::new();
        let old = AssemblyIdentity::new("Lib", version("1.0.0.0"));
        let new = AssemblyIdentity::new("Lib", version("2.0.0.0"));
        let missing = graph.get_or_insert(old.clone(), old);
        let present = graph.get_or_insert(new.clone(), new);

        graph.resolve(
            present,
            AssemblySource::Local,
            metadata("Lib", "2.0.0.0", "/bin/Lib.dll"),
            Some("Lib.dll".into()),
        );
        graph.set_alternative_version(missing, present);

        assert_eq!(graph.node(missing).alternative_version(), Some(present));
        assert!(!graph.node(missing).is_missing());
    }

    #[test]
    #[should_panic(expected = "different name")]
    fn test_alternative_with_other_name_panics() {
        let mut graph = AssemblyGraph::new();
        let missing = graph.get_or_insert(identity("Lib"), identity("Lib"));
        let other = graph.get_or_insert(identity("Other"), identity("Other"));
        graph.resolve(
            other,
            AssemblySource::Local,
            metadata("Other", "1.0.0.0", "/bin/Other.dll"),
            None,
        );
        graph.set_alternative_version(missing, other);
    }

    #[test]
    #[should_panic(expected = "is not resolved")]
    fn test_unresolved_alternative_panics() {
        let mut graph = AssemblyGraph::new();
        let old = AssemblyIdentity::new("Lib", version("1.0.0.0"));
        let new = AssemblyIdentity::new("Lib", version("2.0.0.0"));
        let missing = graph.get_or_insert(old.clone(), old);
        let unresolved = graph.get_or_insert(new.clone(), new);
        graph.set_alternative_version(missing, unresolved);
    }

    #[test]
    fn test_mark_reachable() {
        let mut graph = AssemblyGraph::new();
        let app = graph.get_or_insert(identity("App"), identity("App"));
        let lib = graph.get_or_insert(identity("Lib"), identity("Lib"));
        let orphan = graph.get_or_insert(identity("Orphan"), identity("Orphan"));
        graph.add_reference(app, lib);
        graph.add_reference(lib, app);

        graph.mark_reachable(&[app]);
        assert!(graph.node(app).reachable_from_root());
        assert!(graph.node(lib).reachable_from_root());
        assert!(!graph.node(orphan).reachable_from_root());
    }
}
