use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::{dense_ranks, Invariants, SignatureGraph};

/// Index of a [`Node`] in its [`Dag`].
pub type NodeId = usize;

/// One occurrence of a vertex in a layer of the DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// The DAG-local index of the vertex this node stands for.
    pub vertex: usize,
    pub layer: usize,
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
}

/// An undirected edge between two DAG-local vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Arc {
    a: usize,
    b: usize,
}

impl Arc {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            a: a.min(b),
            b: a.max(b),
        }
    }
}

/// The layered expansion of a graph from a root vertex.
///
/// Layer `i` holds one node for every vertex first reached over an unused edge at
/// distance `i`. A vertex reached from several nodes of the previous layer gets a single
/// node with several parents, which is how cycles of the graph survive in an acyclic
/// structure.
#[derive(Debug, Clone)]
pub struct Dag {
    nodes: Vec<Node>,
    layers: Vec<Vec<NodeId>>,
    original_indices: Vec<usize>,
    vertex_labels: Vec<String>,
    parent_counts: Vec<usize>,
    edge_labels: HashMap<Arc, String>,
    edge_colors: HashMap<Arc, u32>,
}

impl Dag {
    /// Expand `graph` breadth-first from `root`, stopping after layer `height` if one is given.
    pub fn build<G: SignatureGraph + ?Sized>(graph: &G, root: usize, height: Option<usize>) -> Self {
        let mut builder = DagBuilder {
            graph,
            local_indices: HashMap::new(),
            dag: Dag {
                nodes: Vec::new(),
                layers: Vec::new(),
                original_indices: Vec::new(),
                vertex_labels: Vec::new(),
                parent_counts: Vec::new(),
                edge_labels: HashMap::new(),
                edge_colors: HashMap::new(),
            },
        };

        let root_vertex = builder.local_vertex(root);
        let root_node = builder.dag.make_node(root_vertex, 0);
        builder.dag.layers.push(vec![root_node]);

        let mut used_arcs = HashSet::new();
        while height.map_or(true, |h| builder.dag.layers.len() <= h) {
            if !builder.expand_layer(&mut used_arcs) {
                break;
            }
        }

        let mut dag = builder.dag;
        dag.assign_edge_colors(graph);
        debug!(
            "Built DAG rooted at vertex {}: {} layers, {} nodes, {} vertices",
            root,
            dag.layers.len(),
            dag.nodes.len(),
            dag.vertex_count()
        );
        dag
    }

    /// The root node is always the first node.
    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// The number of distinct vertices reached from the root.
    pub fn vertex_count(&self) -> usize {
        self.original_indices.len()
    }

    /// The index in the input graph of a DAG-local vertex.
    pub fn original_index(&self, vertex: usize) -> usize {
        self.original_indices[vertex]
    }

    /// The DAG-local index of a vertex of the input graph, if it was reached.
    pub fn local_index(&self, original: usize) -> Option<usize> {
        self.original_indices.iter().position(|&o| o == original)
    }

    pub fn vertex_label(&self, vertex: usize) -> &str {
        &self.vertex_labels[vertex]
    }

    /// How many parent relations the nodes of `vertex` have in total.
    pub fn parent_count(&self, vertex: usize) -> usize {
        self.parent_counts[vertex]
    }

    pub fn edge_label(&self, a: usize, b: usize) -> &str {
        self.edge_labels
            .get(&Arc::new(a, b))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn edge_color(&self, a: usize, b: usize) -> u32 {
        self.edge_colors.get(&Arc::new(a, b)).copied().unwrap_or(0)
    }

    /// A fresh store ranking every vertex by its (label, parent count) pair.
    pub fn initial_invariants(&self) -> Invariants {
        let mut invariants = Invariants::new(self.vertex_count(), self.node_count());
        let keyed = (0..self.vertex_count())
            .map(|v| ((self.vertex_labels[v].as_str(), self.parent_counts[v]), v))
            .collect();
        for (vertex, rank) in dense_ranks(keyed) {
            invariants.set_vertex_invariant(vertex, rank);
        }
        invariants
    }

    fn make_node(&mut self, vertex: usize, layer: usize) -> NodeId {
        self.nodes.push(Node {
            vertex,
            layer,
            parents: Vec::new(),
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn add_relation(&mut self, child: NodeId, parent: NodeId) {
        self.nodes[child].parents.push(parent);
        self.nodes[parent].children.push(child);
        self.parent_counts[self.nodes[child].vertex] += 1;
    }

    fn assign_edge_colors<G: SignatureGraph + ?Sized>(&mut self, graph: &G) {
        let distinct: BTreeSet<&String> = self.edge_labels.values().collect();
        let ranks: HashMap<&String, u32> = distinct
            .into_iter()
            .enumerate()
            .map(|(i, label)| (label, i as u32 + 1))
            .collect();
        self.edge_colors = self
            .edge_labels
            .iter()
            .map(|(&arc, label)| (arc, graph.edge_color(label).unwrap_or(ranks[label])))
            .collect();
    }
}

struct DagBuilder<'g, G: ?Sized> {
    graph: &'g G,
    local_indices: HashMap<usize, usize>,
    dag: Dag,
}

impl<G: SignatureGraph + ?Sized> DagBuilder<'_, G> {
    fn local_vertex(&mut self, original: usize) -> usize {
        if let Some(&local) = self.local_indices.get(&original) {
            return local;
        }
        let local = self.dag.original_indices.len();
        self.local_indices.insert(original, local);
        self.dag.original_indices.push(original);
        self.dag.vertex_labels.push(self.graph.vertex_symbol(original));
        self.dag.parent_counts.push(0);
        local
    }

    /// Build the layer below the current last layer. Returns `false` if it would be empty.
    fn expand_layer(&mut self, used_arcs: &mut HashSet<Arc>) -> bool {
        let layer = self.dag.layers.len();
        let previous = self.dag.layers[layer - 1].clone();
        let mut next: Vec<NodeId> = Vec::new();
        let mut layer_arcs = Vec::new();

        for parent in previous {
            let parent_vertex = self.dag.nodes[parent].vertex;
            let parent_original = self.dag.original_indices[parent_vertex];
            let mut connected = self.graph.connected(parent_original);
            connected.sort_unstable();
            connected.dedup();

            for original in connected {
                let vertex = self.local_vertex(original);
                let arc = Arc::new(parent_vertex, vertex);
                if used_arcs.contains(&arc) {
                    continue;
                }

                let existing = next
                    .iter()
                    .copied()
                    .find(|&n| self.dag.nodes[n].vertex == vertex);
                let child = match existing {
                    Some(node) => node,
                    None => {
                        let node = self.dag.make_node(vertex, layer);
                        next.push(node);
                        node
                    }
                };
                self.dag.add_relation(child, parent);
                self.dag
                    .edge_labels
                    .entry(arc)
                    .or_insert_with(|| self.graph.edge_label(parent_original, original));
                layer_arcs.push(arc);
            }
        }

        if next.is_empty() {
            return false;
        }
        used_arcs.extend(layer_arcs);
        self.dag.layers.push(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimpleGraph;

    fn layer_vertices(dag: &Dag, layer: usize) -> Vec<usize> {
        dag.layers()[layer]
            .iter()
            .map(|&n| dag.original_index(dag.node(n).vertex))
            .collect()
    }

    #[test]
    fn test_path_dag() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:3,3:4", ".").unwrap();
        let dag = Dag::build(&graph, 0, None);
        assert_eq!(dag.layer_count(), 5);
        assert_eq!(dag.node_count(), 5);
        assert_eq!(dag.vertex_count(), 5);
        for layer in 0..5 {
            assert_eq!(layer_vertices(&dag, layer), vec![layer]);
        }
    }

    #[test]
    fn test_four_cycle_merges_opposite_vertex() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:3,3:0", "C").unwrap();
        let dag = Dag::build(&graph, 0, None);
        assert_eq!(dag.layer_count(), 3);
        assert_eq!(layer_vertices(&dag, 1), vec![1, 3]);
        assert_eq!(layer_vertices(&dag, 2), vec![2]);

        let opposite = dag.local_index(2).unwrap();
        assert_eq!(dag.parent_count(opposite), 2);
        assert_eq!(dag.node(dag.layers()[2][0]).parents.len(), 2);
        assert_eq!(dag.parent_count(dag.local_index(0).unwrap()), 0);
    }

    #[test]
    fn test_triangle_repeats_vertices_in_a_deeper_layer() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:0", "C").unwrap();
        let dag = Dag::build(&graph, 0, None);
        assert_eq!(dag.layer_count(), 3);
        assert_eq!(layer_vertices(&dag, 1), vec![1, 2]);
        assert_eq!(layer_vertices(&dag, 2), vec![2, 1]);
        assert_eq!(dag.node_count(), 5);
        assert_eq!(dag.parent_count(dag.local_index(1).unwrap()), 2);
        assert_eq!(dag.parent_count(dag.local_index(2).unwrap()), 2);
    }

    #[test]
    fn test_height_bound() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:3,3:4", ".").unwrap();
        assert_eq!(Dag::build(&graph, 0, Some(0)).layer_count(), 1);
        assert_eq!(Dag::build(&graph, 0, Some(2)).layer_count(), 3);
        assert_eq!(Dag::build(&graph, 2, Some(2)).vertex_count(), 5);
        assert_eq!(Dag::build(&graph, 0, Some(10)).layer_count(), 5);
    }

    #[test]
    fn test_unreachable_vertices_are_left_out() {
        let mut graph = SimpleGraph::from_edge_string("0:1", "C").unwrap();
        graph.add_vertex("O");
        let dag = Dag::build(&graph, 0, None);
        assert_eq!(dag.vertex_count(), 2);
        assert_eq!(dag.local_index(2), None);
    }

    #[test]
    fn test_edge_colors_rank_labels() {
        let graph = SimpleGraph::from_symbols(&["C", "C", "O", "H"], "0:1:=,0:2:-,0:3").unwrap();
        let dag = Dag::build(&graph, 0, None);
        let local = |v| dag.local_index(v).unwrap();
        assert_eq!(dag.edge_label(local(1), local(0)), "=");
        assert_eq!(dag.edge_color(local(0), local(3)), 1);
        assert_eq!(dag.edge_color(local(0), local(2)), 2);
        assert_eq!(dag.edge_color(local(0), local(1)), 3);
    }

    #[test]
    fn test_initial_invariants() {
        let graph = SimpleGraph::from_edge_string("0:1,1:2,2:3,3:0", "C").unwrap();
        let dag = Dag::build(&graph, 0, None);
        let invariants = dag.initial_invariants();
        let rank = |v| invariants.vertex_invariant(dag.local_index(v).unwrap());
        assert_eq!(rank(0), 1);
        assert_eq!(rank(1), 2);
        assert_eq!(rank(3), 2);
        assert_eq!(rank(2), 3);
    }
}
