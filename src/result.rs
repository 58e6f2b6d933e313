use std::path::PathBuf;

use crate::{
    analyzer::AnalysisOptions,
    graph::{AssemblyGraph, AssemblyNode, NodeId},
};

/// The outcome of one analysis. Read-only once returned.
///
/// # Examples
///
/// ```rust
/// use dotdeps::prelude::*;
///
/// let result = DependencyAnalyzer::new(Vec::new()).analyze(&Diagnostics::new());
/// assert!(result.is_empty());
/// assert!(result.missing_assemblies().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    graph: AssemblyGraph,
    analyzed_files: Vec<PathBuf>,
    roots: Vec<NodeId>,
    options: AnalysisOptions,
}

impl AnalysisResult {
    pub(crate) fn new(
        graph: AssemblyGraph,
        analyzed_files: Vec<PathBuf>,
        roots: Vec<NodeId>,
        options: AnalysisOptions,
    ) -> Self {
        AnalysisResult {
            graph,
            analyzed_files,
            roots,
            options,
        }
    }

    /// The underlying graph.
    #[must_use]
    pub fn graph(&self) -> &AssemblyGraph {
        &self.graph
    }

    /// The options the analysis ran with.
    #[must_use]
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Every node, in key order.
    pub fn assemblies(&self) -> impl Iterator<Item = &AssemblyNode> {
        self.graph.iter_by_key()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Returns `true` if there are no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// The node with `id`.
    ///
    /// # Panics
    /// Panics if `id` does not come from this result.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &AssemblyNode {
        self.graph.node(id)
    }

    /// Looks up a node by key, ignoring case.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AssemblyNode> {
        self.graph.find(key).map(|id| self.graph.node(id))
    }

    /// The files handed to the analyzer, as given.
    #[must_use]
    pub fn analyzed_files(&self) -> &[PathBuf] {
        &self.analyzed_files
    }

    /// Root ids in discovery order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Root nodes in discovery order.
    pub fn root_nodes(&self) -> impl Iterator<Item = &AssemblyNode> {
        self.roots.iter().map(|&id| self.graph.node(id))
    }

    /// Returns `true` if `id` is a root.
    #[must_use]
    pub fn is_root(&self, id: NodeId) -> bool {
        self.roots.contains(&id)
    }

    /// Nodes that were not found and have no alternative version, in key order.
    #[must_use]
    pub fn missing_assemblies(&self) -> Vec<&AssemblyNode> {
        self.assemblies().filter(|node| node.is_missing()).collect()
    }

    /// Nodes referenced by `id`.
    pub fn references(&self, id: NodeId) -> impl Iterator<Item = &AssemblyNode> {
        self.graph
            .node(id)
            .references()
            .map(|target| self.graph.node(target))
    }

    /// Nodes referencing `id`.
    pub fn referenced_by(&self, id: NodeId) -> impl Iterator<Item = &AssemblyNode> {
        self.graph
            .node(id)
            .referenced_by()
            .map(|source| self.graph.node(source))
    }

    /// The alternative version attached to `id`.
    #[must_use]
    pub fn alternative_version(&self, id: NodeId) -> Option<&AssemblyNode> {
        self.graph
            .node(id)
            .alternative_version()
            .map(|alternative| self.graph.node(alternative))
    }

    /// Nodes reachable from a root, in key order.
    pub fn reachable(&self) -> impl Iterator<Item = &AssemblyNode> {
        self.assemblies().filter(|node| node.reachable_from_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::AssemblySource,
        identity::AssemblyIdentity,
        test::{identity, metadata, version},
    };

    fn sample() -> AnalysisResult {
        let mut graph = AssemblyGraph::new();
        let app = graph.get_or_insert(identity("App"), identity("App"));
        let old = AssemblyIdentity::new("Lib", version("1.0.0.0"));
        let new = AssemblyIdentity::new("Lib", version("2.0.0.0"));
        let lib1 = graph.get_or_insert(old.clone(), old);
        let lib2 = graph.get_or_insert(new.clone(), new);
        let gone = graph.get_or_insert(identity("Gone"), identity("Gone"));

        graph.resolve(
            app,
            AssemblySource::Local,
            metadata("App", "1.0.0.0", "/bin/App.dll"),
            Some("App.dll".into()),
        );
        graph.resolve(
            lib2,
            AssemblySource::Local,
            metadata("Lib", "2.0.0.0", "/bin/Lib.dll"),
            Some("Lib.dll".into()),
        );
        graph.add_reference(app, lib1);
        graph.add_reference(app, gone);
        graph.set_alternative_version(lib1, lib2);
        graph.mark_reachable(&[app]);

        AnalysisResult::new(
            graph,
            vec![PathBuf::from("/bin/App.dll"), PathBuf::from("/bin/Lib.dll")],
            vec![app],
            AnalysisOptions::default(),
        )
    }

    #[test]
    fn accessors() {
        let result = sample();
        assert_eq!(result.len(), 4);
        assert_eq!(result.analyzed_files().len(), 2);

        let names: Vec<_> = result.assemblies().map(|n| n.identity().name.as_str()).collect();
        assert_eq!(names, vec!["App", "Gone", "Lib", "Lib"]);

        let app = result.get("APP, VERSION=1.0.0.0, CULTURE=NEUTRAL, PUBLICKEYTOKEN=NULL");
        let app = app.unwrap();
        assert!(result.is_root(app.id()));
        assert_eq!(result.root_nodes().count(), 1);
        assert_eq!(result.references(app.id()).count(), 2);
        assert_eq!(app.location(), Some(std::path::Path::new("/bin/App.dll")));
    }

    #[test]
    fn missing_excludes_alternatives() {
        let result = sample();
        let missing = result.missing_assemblies();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].identity().name, "Gone");

        let lib1 = result.get(&AssemblyIdentity::new("Lib", version("1.0.0.0")).key()).unwrap();
        let alternative = result.alternative_version(lib1.id()).unwrap();
        assert_eq!(alternative.identity().version, version("2.0.0.0"));
        assert_eq!(result.referenced_by(lib1.id()).count(), 1);
    }

    #[test]
    fn reachable_nodes() {
        let result = sample();
        let reachable: Vec<_> = result.reachable().map(|n| n.key().to_string()).collect();
        assert_eq!(reachable.len(), 3);
        assert!(!reachable.iter().any(|key| key.contains("version=2.0.0.0")));
    }
}
