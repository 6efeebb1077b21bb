use std::collections::BTreeMap;
use std::fmt::Display;

use petgraph::graph::{IndexType, NodeIndex, UnGraph};
use thiserror::Error;

/// The read-only view of a graph that signatures are computed over.
///
/// Vertices are addressed by dense indices `0..vertex_count()`. Implementations are
/// trusted: an out-of-range index returned from `connected` is a bug in the
/// implementation and will panic at the point of use.
pub trait SignatureGraph {
    /// The number of vertices in the graph.
    fn vertex_count(&self) -> usize;

    /// The symbol printed for a vertex, such as an element name.
    fn vertex_symbol(&self, vertex: usize) -> String;

    /// The indices of the vertices adjacent to `vertex`.
    fn connected(&self, vertex: usize) -> Vec<usize>;

    /// The label printed in front of a child reached over the edge `a`-`b`.
    /// The empty string is a valid label.
    fn edge_label(&self, a: usize, b: usize) -> String;

    /// Map an edge label to a small positive color used during refinement.
    ///
    /// Returning `None` (the default) ranks the distinct labels of each DAG instead.
    fn edge_color(&self, _label: &str) -> Option<u32> {
        None
    }

    /// Whether `a` and `b` share an edge.
    fn is_connected(&self, a: usize, b: usize) -> bool {
        self.connected(a).contains(&b)
    }
}

impl<G: SignatureGraph + ?Sized> SignatureGraph for &G {
    fn vertex_count(&self) -> usize {
        (**self).vertex_count()
    }

    fn vertex_symbol(&self, vertex: usize) -> String {
        (**self).vertex_symbol(vertex)
    }

    fn connected(&self, vertex: usize) -> Vec<usize> {
        (**self).connected(vertex)
    }

    fn edge_label(&self, a: usize, b: usize) -> String {
        (**self).edge_label(a, b)
    }

    fn edge_color(&self, label: &str) -> Option<u32> {
        (**self).edge_color(label)
    }

    fn is_connected(&self, a: usize, b: usize) -> bool {
        (**self).is_connected(a, b)
    }
}

/// Any undirected petgraph graph whose weights can be displayed is a signature graph.
/// Node weights become vertex symbols and edge weights become edge labels.
impl<N, E, Ix> SignatureGraph for UnGraph<N, E, Ix>
where
    N: Display,
    E: Display,
    Ix: IndexType,
{
    fn vertex_count(&self) -> usize {
        self.node_count()
    }

    fn vertex_symbol(&self, vertex: usize) -> String {
        self[NodeIndex::<Ix>::new(vertex)].to_string()
    }

    fn connected(&self, vertex: usize) -> Vec<usize> {
        let mut neighbors: Vec<usize> = self
            .neighbors(NodeIndex::<Ix>::new(vertex))
            .map(|n| n.index())
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    fn edge_label(&self, a: usize, b: usize) -> String {
        self.find_edge(NodeIndex::<Ix>::new(a), NodeIndex::new(b))
            .map(|e| self[e].to_string())
            .unwrap_or_default()
    }

    fn is_connected(&self, a: usize, b: usize) -> bool {
        self.contains_edge(NodeIndex::<Ix>::new(a), NodeIndex::new(b))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphFormatError {
    #[error("Edge `{0}` is not of the form `a:b` or `a:b:label`")]
    MalformedEdge(String),
    #[error("Vertex index `{0}` in edge `{1}` is not a number")]
    BadIndex(String, String),
    #[error("Edge `{edge}` refers to vertex {vertex} but the graph has {count} vertices")]
    VertexOutOfRange {
        edge: String,
        vertex: usize,
        count: usize,
    },
    #[error("Edge `{edge}` refers to vertex {vertex} but edge strings allow at most {limit} vertices")]
    TooManyVertices {
        edge: String,
        vertex: usize,
        limit: usize,
    },
}

/// The most vertices [`SimpleGraph::from_edge_string`] will create.
pub const MAX_EDGE_STRING_VERTICES: usize = 1 << 20;

/// A small undirected graph stored as sorted adjacency lists.
///
/// Self loops and repeated edges are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleGraph {
    symbols: Vec<String>,
    adjacency: Vec<Vec<usize>>,
    edge_labels: BTreeMap<(usize, usize), String>,
}

impl SimpleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph of `count` unconnected vertices that all carry `symbol`.
    pub fn with_vertices(count: usize, symbol: &str) -> Self {
        let mut graph = Self::new();
        for _ in 0..count {
            graph.add_vertex(symbol);
        }
        graph
    }

    /// Parse an edge list such as `"0:1,1:2:="`.
    ///
    /// Each comma separated entry is `a:b` or `a:b:label`. Vertices are created up to the
    /// largest index mentioned, all with `symbol`. Indices must stay below
    /// [`MAX_EDGE_STRING_VERTICES`].
    pub fn from_edge_string(edges: &str, symbol: &str) -> Result<Self, GraphFormatError> {
        let parsed = parse_edge_list(edges)?;
        let mut count = 0;
        for (a, b, _) in &parsed {
            let vertex = *a.max(b);
            match vertex.checked_add(1) {
                Some(needed) if needed <= MAX_EDGE_STRING_VERTICES => count = count.max(needed),
                _ => {
                    return Err(GraphFormatError::TooManyVertices {
                        edge: format!("{a}:{b}"),
                        vertex,
                        limit: MAX_EDGE_STRING_VERTICES,
                    })
                }
            }
        }
        let mut graph = Self::with_vertices(count, symbol);
        for (a, b, label) in parsed {
            graph.add_labelled_edge(a, b, label);
        }
        Ok(graph)
    }

    /// Build a graph from explicit vertex symbols and an edge list in the
    /// [`from_edge_string`](Self::from_edge_string) format.
    pub fn from_symbols(symbols: &[&str], edges: &str) -> Result<Self, GraphFormatError> {
        let mut graph = Self::new();
        for symbol in symbols {
            graph.add_vertex(*symbol);
        }
        for (a, b, label) in parse_edge_list(edges)? {
            for vertex in [a, b] {
                if vertex >= graph.vertex_count() {
                    return Err(GraphFormatError::VertexOutOfRange {
                        edge: format!("{a}:{b}"),
                        vertex,
                        count: graph.vertex_count(),
                    });
                }
            }
            graph.add_labelled_edge(a, b, label);
        }
        Ok(graph)
    }

    pub fn add_vertex(&mut self, symbol: impl Into<String>) -> usize {
        self.symbols.push(symbol.into());
        self.adjacency.push(Vec::new());
        self.symbols.len() - 1
    }

    pub fn add_edge(&mut self, a: usize, b: usize) {
        self.add_labelled_edge(a, b, "");
    }

    pub fn add_labelled_edge(&mut self, a: usize, b: usize, label: impl Into<String>) {
        if a == b || self.adjacency[a].contains(&b) {
            return;
        }
        for (from, to) in [(a, b), (b, a)] {
            let neighbors = &mut self.adjacency[from];
            let position = neighbors.partition_point(|&n| n < to);
            neighbors.insert(position, to);
        }
        self.edge_labels.insert((a.min(b), a.max(b)), label.into());
    }

    pub fn edge_count(&self) -> usize {
        self.edge_labels.len()
    }

    /// All edges as `(low, high)` vertex pairs, in ascending order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.edge_labels.keys().copied().collect()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Relabel the graph so that old vertex `i` becomes vertex `permutation[i]`.
    pub fn permute(&self, permutation: &[usize]) -> Self {
        let n = self.symbols.len();
        let mut symbols = vec![String::new(); n];
        for (old, &new) in permutation.iter().enumerate() {
            symbols[new] = self.symbols[old].clone();
        }
        let mut permuted = Self {
            symbols,
            adjacency: vec![Vec::new(); n],
            edge_labels: BTreeMap::new(),
        };
        for (&(a, b), label) in &self.edge_labels {
            permuted.add_labelled_edge(permutation[a], permutation[b], label.clone());
        }
        permuted
    }
}

impl SignatureGraph for SimpleGraph {
    fn vertex_count(&self) -> usize {
        self.symbols.len()
    }

    fn vertex_symbol(&self, vertex: usize) -> String {
        self.symbols[vertex].clone()
    }

    fn connected(&self, vertex: usize) -> Vec<usize> {
        self.adjacency[vertex].clone()
    }

    fn edge_label(&self, a: usize, b: usize) -> String {
        self.edge_labels
            .get(&(a.min(b), a.max(b)))
            .cloned()
            .unwrap_or_default()
    }

    fn is_connected(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].binary_search(&b).is_ok()
    }
}

fn parse_edge_list(edges: &str) -> Result<Vec<(usize, usize, String)>, GraphFormatError> {
    let parse_index = |text: &str, edge: &str| {
        text.trim()
            .parse::<usize>()
            .map_err(|_| GraphFormatError::BadIndex(text.to_string(), edge.to_string()))
    };

    edges
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(a), Some(b), label) => Ok((
                    parse_index(a, entry)?,
                    parse_index(b, entry)?,
                    label.unwrap_or("").to_string(),
                )),
                _ => Err(GraphFormatError::MalformedEdge(entry.to_string())),
            }
        })
        .collect()
}
