/// The mutable state of one canonicalization: vertex colors, vertex ranks and DAG node ranks.
///
/// Vertices are the DAG's local vertex indices and nodes are [`NodeId`](crate::NodeId)s.
/// The search hands every branch its own clone, so a branch can never leak state into
/// its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invariants {
    colors: Vec<usize>,
    vertex_invariants: Vec<usize>,
    node_invariants: Vec<usize>,
}

impl Invariants {
    pub fn new(vertex_count: usize, node_count: usize) -> Self {
        Self {
            colors: vec![0; vertex_count],
            vertex_invariants: vec![0; vertex_count],
            node_invariants: vec![0; node_count],
        }
    }

    /// The color of a vertex, or `0` if it is uncolored.
    pub fn color(&self, vertex: usize) -> usize {
        self.colors[vertex]
    }

    pub fn set_color(&mut self, vertex: usize, color: usize) {
        self.colors[vertex] = color;
    }

    pub fn is_colored(&self, vertex: usize) -> bool {
        self.colors[vertex] != 0
    }

    pub fn vertex_invariant(&self, vertex: usize) -> usize {
        self.vertex_invariants[vertex]
    }

    pub fn set_vertex_invariant(&mut self, vertex: usize, invariant: usize) {
        self.vertex_invariants[vertex] = invariant;
    }

    pub fn vertex_invariants(&self) -> &[usize] {
        &self.vertex_invariants
    }

    pub fn node_invariant(&self, node: usize) -> usize {
        self.node_invariants[node]
    }

    pub fn set_node_invariant(&mut self, node: usize, invariant: usize) {
        self.node_invariants[node] = invariant;
    }

    /// The number of distinct vertex ranks, i.e. the number of cells in the vertex partition.
    pub fn class_count(&self) -> usize {
        self.vertex_invariants.iter().copied().max().unwrap_or(0)
    }
}

/// Sort `(key, index)` pairs and give each index a dense rank starting at 1.
/// Indices with equal keys share a rank.
pub fn dense_ranks<K: Ord>(mut keyed: Vec<(K, usize)>) -> Vec<(usize, usize)> {
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    let mut ranks = Vec::with_capacity(keyed.len());
    let mut rank = 0;
    for i in 0..keyed.len() {
        if i == 0 || keyed[i - 1].0 != keyed[i].0 {
            rank += 1;
        }
        ranks.push((keyed[i].1, rank));
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_ranks() {
        let ranks = dense_ranks(vec![("c", 0), ("a", 1), ("c", 2), ("b", 3)]);
        assert_eq!(ranks, vec![(1, 1), (3, 2), (0, 3), (2, 3)]);
        assert!(dense_ranks::<u8>(vec![]).is_empty());
    }

    #[test]
    fn test_clones_are_independent() {
        let mut original = Invariants::new(3, 4);
        original.set_vertex_invariant(0, 1);
        original.set_vertex_invariant(1, 2);
        original.set_vertex_invariant(2, 2);

        let mut branch = original.clone();
        branch.set_color(1, 1);
        branch.set_node_invariant(3, 7);

        assert!(branch.is_colored(1));
        assert!(!original.is_colored(1));
        assert_eq!(original.node_invariant(3), 0);
        assert_eq!(original.class_count(), 2);
    }
}
