use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::trace;

use crate::{dense_ranks, Dag, Invariants};

/// The order in which layers are visited during a refinement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the deepest layer to the root, looking at children.
    Up,
    /// From the root to the deepest layer, looking at parents.
    Down,
}

impl Dag {
    /// Refine `invariants` until the vertex partition stops splitting.
    ///
    /// A round is an up pass and a down pass, each followed by a recomputation of the
    /// vertex invariants.
    pub fn refine(&self, invariants: &mut Invariants) {
        let mut rounds = 0;
        loop {
            let before = invariants.class_count();
            self.update_node_invariants(invariants, Direction::Up);
            self.compute_vertex_invariants(invariants);
            self.update_node_invariants(invariants, Direction::Down);
            self.compute_vertex_invariants(invariants);
            rounds += 1;
            if invariants.class_count() == before {
                break;
            }
        }
        trace!(
            "Refined {} vertices into {} classes in {} rounds",
            self.vertex_count(),
            invariants.class_count(),
            rounds
        );
    }

    pub fn update_node_invariants(&self, invariants: &mut Invariants, direction: Direction) {
        match direction {
            Direction::Up => {
                for layer in (0..self.layer_count()).rev() {
                    self.update_layer(layer, invariants, direction);
                }
            }
            Direction::Down => {
                for layer in 0..self.layer_count() {
                    self.update_layer(layer, invariants, direction);
                }
            }
        }
    }

    /// Rank the nodes of one layer by (color, vertex invariant, relatives).
    ///
    /// The relatives are the children going up and the parents going down, each
    /// represented by its node invariant and the color of the connecting arc.
    fn update_layer(&self, layer: usize, invariants: &mut Invariants, direction: Direction) {
        let keyed = self.layers()[layer]
            .iter()
            .map(|&id| {
                let node = self.node(id);
                let relatives = match direction {
                    Direction::Up => &node.children,
                    Direction::Down => &node.parents,
                };
                let mut relative_invariants: Vec<(usize, u32)> = relatives
                    .iter()
                    .map(|&r| {
                        (
                            invariants.node_invariant(r),
                            self.edge_color(node.vertex, self.node(r).vertex),
                        )
                    })
                    .collect();
                relative_invariants.sort_unstable();
                let key = (
                    invariants.color(node.vertex),
                    invariants.vertex_invariant(node.vertex),
                    relative_invariants,
                );
                (key, id)
            })
            .collect();

        for (id, rank) in dense_ranks(keyed) {
            invariants.set_node_invariant(id, rank);
        }
    }

    /// Rank vertices by the invariants of their nodes, compared layer by layer.
    /// Layers a vertex does not occur in count as 0.
    ///
    /// Only the layers a vertex occurs in are stored. Node invariants are at least 1, so
    /// an entry at an earlier layer outranks a missing one, which `Reverse` expresses.
    pub fn compute_vertex_invariants(&self, invariants: &mut Invariants) {
        let mut per_layer: Vec<Vec<(Reverse<usize>, usize)>> = vec![Vec::new(); self.vertex_count()];
        for layer in self.layers() {
            for &id in layer {
                let node = self.node(id);
                per_layer[node.vertex].push((Reverse(node.layer), invariants.node_invariant(id)));
            }
        }

        let keyed = per_layer
            .into_iter()
            .enumerate()
            .map(|(vertex, layers)| (layers, vertex))
            .collect();
        for (vertex, rank) in dense_ranks(keyed) {
            invariants.set_vertex_invariant(vertex, rank);
        }
    }

    /// The vertices to individualize next: the largest class of vertices with at least two
    /// parents, preferring the lowest invariant on ties.
    ///
    /// Vertices with a single parent are fully determined by refinement, so only
    /// multi-parent vertices can be ambiguous. Fewer than two members means the coloring
    /// is already discrete.
    pub fn orbit(&self, invariants: &Invariants) -> Vec<usize> {
        let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for vertex in 0..self.vertex_count() {
            if self.parent_count(vertex) >= 2 {
                classes
                    .entry(invariants.vertex_invariant(vertex))
                    .or_default()
                    .push(vertex);
            }
        }

        let mut largest: Vec<usize> = Vec::new();
        for class in classes.into_values() {
            if class.len() > largest.len() {
                largest = class;
            }
        }
        largest
    }

    /// Uncolored vertices with at least two parents, by ascending invariant.
    pub fn uncolored_multi_parent_vertices(&self, invariants: &Invariants) -> Vec<usize> {
        let mut vertices: Vec<usize> = (0..self.vertex_count())
            .filter(|&v| self.parent_count(v) >= 2 && !invariants.is_colored(v))
            .collect();
        vertices.sort_by_key(|&v| (invariants.vertex_invariant(v), v));
        vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimpleGraph;

    fn refined(graph: &SimpleGraph, root: usize) -> (Dag, Invariants) {
        let dag = Dag::build(graph, root, None);
        let mut invariants = dag.initial_invariants();
        dag.refine(&mut invariants);
        (dag, invariants)
    }

    #[test]
    fn test_path_rooted_at_center_is_symmetric() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:3,3:4", ".").unwrap();
        let (dag, invariants) = refined(&graph, 2);
        let rank = |v| invariants.vertex_invariant(dag.local_index(v).unwrap());
        assert_eq!(rank(0), rank(4));
        assert_eq!(rank(1), rank(3));
        assert_ne!(rank(0), rank(1));
        assert_ne!(rank(1), rank(2));
        assert_eq!(invariants.class_count(), 3);
    }

    #[test]
    fn test_refinement_separates_by_descendants() {
        // 0 has an oxygen behind vertex 1 and a carbon behind vertex 2.
        let graph = SimpleGraph::from_symbols(&["C", "C", "C", "O", "C"], "0:1,0:2,1:3,2:4").unwrap();
        let (dag, invariants) = refined(&graph, 0);
        let rank = |v| invariants.vertex_invariant(dag.local_index(v).unwrap());
        assert_ne!(rank(1), rank(2));
        assert_eq!(invariants.class_count(), 5);
    }

    #[test]
    fn test_refinement_is_stable() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:3,3:4,4:5,5:0,0:3", "C").unwrap();
        let (dag, mut invariants) = refined(&graph, 0);
        let before = invariants.clone();
        dag.refine(&mut invariants);
        assert_eq!(invariants.class_count(), before.class_count());
    }

    #[test]
    fn test_four_cycle_orbit_is_trivial() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:3,3:0", "C").unwrap();
        let (dag, invariants) = refined(&graph, 0);
        assert_eq!(dag.orbit(&invariants), vec![dag.local_index(2).unwrap()]);
        assert_eq!(
            dag.uncolored_multi_parent_vertices(&invariants),
            vec![dag.local_index(2).unwrap()]
        );
    }

    #[test]
    fn test_complete_graph_orbit() {
        let graph = SimpleGraph::from_edge_string("0:1,0:2,0:3,1:2,1:3,2:3", "C").unwrap();
        let (dag, invariants) = refined(&graph, 0);
        let mut orbit: Vec<usize> = dag
            .orbit(&invariants)
            .into_iter()
            .map(|v| dag.original_index(v))
            .collect();
        orbit.sort_unstable();
        assert_eq!(orbit, vec![1, 2, 3]);
    }

    #[test]
    fn test_coloring_breaks_the_orbit() {
        let graph = SimpleGraph::from_edge_string("0:1,0:2,0:3,1:2,1:3,2:3", "C").unwrap();
        let (dag, mut invariants) = refined(&graph, 0);
        let first = dag.orbit(&invariants)[0];
        invariants.set_color(first, 1);
        dag.refine(&mut invariants);

        let orbit = dag.orbit(&invariants);
        assert_eq!(orbit.len(), 2);
        assert!(!orbit.contains(&first));
    }

    #[test]
    fn test_vertex_invariants_compare_layers_in_order() {
        // Rooted at 0, vertex 3 is reached at layer 2 and vertex 4 only at layer 3.
        let graph = SimpleGraph::from_edge_string("0:1,0:2,1:3,2:4,4:5", "C").unwrap();
        let (dag, invariants) = refined(&graph, 0);
        let rank = |v| invariants.vertex_invariant(dag.local_index(v).unwrap());
        assert!(rank(1) > rank(3));
        assert!(rank(3) > rank(5));
        assert_eq!(invariants.class_count(), 6);
    }
}
