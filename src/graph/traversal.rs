//! Graph traversal.
//!
//! Reference graphs may contain cycles, so every walk keeps a visited set and yields each
//! node at most once. The walk is iterative; deep reference chains cannot overflow the
//! stack.

use crate::graph::{AssemblyGraph, NodeId};

/// Depth-first pre-order iterator over the nodes reachable from a set of start nodes.
///
/// Start nodes are taken in the given order; successors are visited in id order.
/// Ids outside the graph are ignored.
pub struct DfsIterator<'g> {
    graph: &'g AssemblyGraph,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<'g> DfsIterator<'g> {
    fn new(graph: &'g AssemblyGraph, starts: &[NodeId]) -> Self {
        let stack = starts
            .iter()
            .rev()
            .copied()
            .filter(|start| start.index() < graph.len())
            .collect();

        DfsIterator {
            graph,
            stack,
            visited: vec![false; graph.len()],
        }
    }
}

impl Iterator for DfsIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if self.visited[node.index()] {
                continue;
            }
            self.visited[node.index()] = true;

            // Reverse order so successors come off the stack in id order
            for succ in self.graph.node(node).references.iter().rev() {
                if !self.visited[succ.index()] {
                    self.stack.push(*succ);
                }
            }

            return Some(node);
        }

        None
    }
}

/// Returns a depth-first iterator over every node reachable from `starts`, the start
/// nodes included.
///
/// # Complexity
///
/// O(V + E): each node is expanded once, so each edge is pushed at most once.
///
/// # Examples
///
/// ```rust
/// use dotdeps::graph::{dfs, AssemblyGraph};
/// use dotdeps::identity::{AssemblyIdentity, AssemblyVersion};
///
/// let mut graph = AssemblyGraph::new();
/// let v1 = AssemblyVersion::new(1, 0, 0, 0);
/// let a = graph.get_or_insert(AssemblyIdentity::new("A", v1), AssemblyIdentity::new("A", v1));
/// let b = graph.get_or_insert(AssemblyIdentity::new("B", v1), AssemblyIdentity::new("B", v1));
/// graph.add_reference(a, b);
/// graph.add_reference(b, a);
///
/// let order: Vec<_> = dfs(&graph, &[a]).collect();
/// assert_eq!(order, vec![a, b]);
/// ```
pub fn dfs<'g>(graph: &'g AssemblyGraph, starts: &[NodeId]) -> DfsIterator<'g> {
    DfsIterator::new(graph, starts)
}
