use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use tracing::debug;

use crate::SymmetryClass;

/// A symmetry class collapsed into one vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotientVertex {
    pub signature: String,
    /// How many original vertices the class holds.
    pub count: usize,
}

/// The graph of symmetry classes.
///
/// There is one vertex per class, in class order. An edge between two classes carries
/// the number of adjacent pairs of original vertices between them. A loop carries the
/// number of adjacent pairs inside one class.
#[derive(Debug, Clone)]
pub struct QuotientGraph {
    graph: UnGraph<QuotientVertex, usize>,
}

impl QuotientGraph {
    pub fn new(classes: &[SymmetryClass], connected: impl Fn(usize, usize) -> bool) -> Self {
        let mut graph = UnGraph::new_undirected();
        let indices: Vec<NodeIndex> = classes
            .iter()
            .map(|class| {
                graph.add_node(QuotientVertex {
                    signature: class.signature().to_string(),
                    count: class.len(),
                })
            })
            .collect();

        for (i, first) in classes.iter().enumerate() {
            for (j, second) in classes.iter().enumerate().skip(i) {
                let count = if i == j {
                    let members: Vec<usize> = first.vertices().collect();
                    members
                        .iter()
                        .enumerate()
                        .flat_map(|(k, &a)| members[k + 1..].iter().map(move |&b| (a, b)))
                        .filter(|&(a, b)| connected(a, b))
                        .count()
                } else {
                    first
                        .vertices()
                        .flat_map(|a| second.vertices().map(move |b| (a, b)))
                        .filter(|&(a, b)| connected(a, b))
                        .count()
                };
                if count > 0 {
                    graph.add_edge(indices[i], indices[j], count);
                }
            }
        }

        debug!(
            "Quotient graph has {} vertices and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Self { graph }
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges from a class to itself.
    pub fn loop_edge_count(&self) -> usize {
        self.graph
            .edge_references()
            .filter(|e| e.source() == e.target())
            .count()
    }

    pub fn non_loop_edge_count(&self) -> usize {
        self.edge_count() - self.loop_edge_count()
    }

    pub fn vertices(&self) -> Vec<&QuotientVertex> {
        self.graph.node_weights().collect()
    }

    /// Every edge as `(class, class, count)` with the lower class first.
    pub fn edges(&self) -> Vec<(usize, usize, usize)> {
        let mut edges: Vec<(usize, usize, usize)> = self
            .graph
            .edge_references()
            .map(|e| {
                let (a, b) = (e.source().index(), e.target().index());
                (a.min(b), a.max(b), *e.weight())
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    pub fn graph(&self) -> &UnGraph<QuotientVertex, usize> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{group_by_signature, SignatureGraph, SimpleGraph};

    #[test]
    fn test_path_quotient() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:3,3:4", ".").unwrap();
        let classes = group_by_signature(&["end", "inner", "center", "inner", "end"]);
        let quotient = QuotientGraph::new(&classes, |a, b| graph.is_connected(a, b));

        assert_eq!(quotient.vertex_count(), 3);
        assert_eq!(quotient.vertices()[0].count, 2);
        assert_eq!(quotient.vertices()[2].count, 1);
        assert_eq!(quotient.edges(), vec![(0, 1, 2), (1, 2, 2)]);
        assert_eq!(quotient.loop_edge_count(), 0);
        assert_eq!(quotient.non_loop_edge_count(), 2);
    }

    #[test]
    fn test_self_pairs_count_each_edge_once() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:3,3:0", "C").unwrap();
        let classes = group_by_signature(&["c", "c", "c", "c"]);
        let quotient = QuotientGraph::new(&classes, |a, b| graph.is_connected(a, b));

        assert_eq!(quotient.vertex_count(), 1);
        assert_eq!(quotient.edges(), vec![(0, 0, 4)]);
        assert_eq!(quotient.loop_edge_count(), 1);
        assert_eq!(quotient.non_loop_edge_count(), 0);
    }

    #[test]
    fn test_no_classes() {
        let quotient = QuotientGraph::new(&[], |_, _| true);
        assert_eq!(quotient.vertex_count(), 0);
        assert_eq!(quotient.edge_count(), 0);
    }
}
