use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::{
    parse_signature, ParseError, SignatureGraph, SimpleGraph, COLOR_SEPARATOR, END_BRANCH_SYMBOL,
    END_NODE_SYMBOL, START_BRANCH_SYMBOL, START_NODE_SYMBOL,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    /// The color tag, or `0` if the node was printed without one.
    pub color: usize,
    /// The label of the edge to the parent. Empty for the root.
    pub edge_label: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Distance from the root.
    pub height: usize,
}

/// The decoded form of a signature string.
///
/// Unlike the DAG it was printed from, this is a plain tree: a vertex printed several
/// times appears once per occurrence, and only matching color tags tell that the
/// occurrences are the same vertex. Nodes are stored in the order they were read, so
/// the root is node `0` and every parent precedes its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColoredTree {
    nodes: Vec<TreeNode>,
}

impl ColoredTree {
    pub fn new(label: impl Into<String>, color: usize) -> Self {
        Self {
            nodes: vec![TreeNode {
                label: label.into(),
                color,
                edge_label: String::new(),
                parent: None,
                children: Vec::new(),
                height: 0,
            }],
        }
    }

    /// Decode a signature string, see [`parse_signature`].
    pub fn parse(signature: &str) -> Result<Self, ParseError> {
        parse_signature(signature)
    }

    /// Append a child below `parent` and return its index.
    pub fn add_child(
        &mut self,
        parent: usize,
        edge_label: impl Into<String>,
        label: impl Into<String>,
        color: usize,
    ) -> usize {
        let id = self.nodes.len();
        let height = self.nodes[parent].height + 1;
        self.nodes.push(TreeNode {
            label: label.into(),
            color,
            edge_label: edge_label.into(),
            parent: Some(parent),
            children: Vec::new(),
            height,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, id: usize) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// The height of the deepest node.
    pub fn height(&self) -> usize {
        self.nodes.iter().map(|n| n.height).max().unwrap_or(0)
    }

    /// One graph vertex per tree node, weighted with the node label.
    pub fn to_tree_graph(&self) -> UnGraph<String, String> {
        let mut graph = UnGraph::new_undirected();
        let indices: Vec<NodeIndex> = self
            .nodes
            .iter()
            .map(|node| graph.add_node(node.label.clone()))
            .collect();
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                graph.add_edge(indices[parent], indices[id], node.edge_label.clone());
            }
        }
        graph
    }

    /// The vertex of the reconstructed graph each tree node stands for.
    ///
    /// Nodes sharing a nonzero color are one vertex. Vertices are numbered in the order
    /// they are first read.
    pub fn vertex_mapping(&self) -> Vec<usize> {
        let mut by_color: HashMap<usize, usize> = HashMap::new();
        let mut next = 0;
        self.nodes
            .iter()
            .map(|node| {
                if node.color != 0 {
                    if let Some(&vertex) = by_color.get(&node.color) {
                        return vertex;
                    }
                    by_color.insert(node.color, next);
                }
                next += 1;
                next - 1
            })
            .collect()
    }

    /// Rebuild the graph the tree was printed from.
    pub fn to_graph(&self) -> SimpleGraph {
        let mapping = self.vertex_mapping();
        let mut graph = SimpleGraph::new();
        for (id, node) in self.nodes.iter().enumerate() {
            if mapping[id] == graph.vertex_count() {
                graph.add_vertex(node.label.clone());
            }
        }
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                graph.add_labelled_edge(mapping[parent], mapping[id], node.edge_label.clone());
            }
        }
        graph
    }

    fn write_node(&self, id: usize, f: &mut Formatter) -> FmtResult {
        let node = &self.nodes[id];
        write!(f, "{}{}{}", node.edge_label, START_NODE_SYMBOL, node.label)?;
        if node.color != 0 {
            write!(f, "{}{}", COLOR_SEPARATOR, node.color)?;
        }
        write!(f, "{}", END_NODE_SYMBOL)
    }
}

impl Display for ColoredTree {
    /// Print the tree in signature syntax, walking it with an explicit stack of
    /// (node, next child) frames.
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        self.write_node(self.root(), f)?;
        let mut stack = vec![(self.root(), 0)];
        while let Some(frame) = stack.last_mut() {
            let (id, next) = *frame;
            let children = &self.nodes[id].children;
            if next < children.len() {
                frame.1 += 1;
                if next == 0 {
                    write!(f, "{}", START_BRANCH_SYMBOL)?;
                }
                let child = children[next];
                self.write_node(child, f)?;
                stack.push((child, 0));
            } else {
                if !children.is_empty() {
                    write!(f, "{}", END_BRANCH_SYMBOL)?;
                }
                stack.pop();
            }
        }
        Ok(())
    }
}

impl FromStr for ColoredTree {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_text() {
        for text in [
            "[A]([B1][B2][B3])",
            "[A](=[B1]=[B2])",
            "[C]([C,2]([C,1])[C,1])",
            "[x](-[y](#[z,10]))",
        ] {
            let tree: ColoredTree = text.parse().unwrap();
            assert_eq!(tree.to_string(), text);
        }
    }

    #[test]
    fn test_build_by_hand() {
        let mut tree = ColoredTree::new("C", 0);
        let o = tree.add_child(0, "=", "O", 0);
        tree.add_child(o, "", "H", 1);
        assert_eq!(tree.to_string(), "[C](=[O]([H,1]))");
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.edge_count(), 2);
    }

    #[test]
    fn test_reconstruct_four_cycle() {
        let tree = ColoredTree::parse("[C]([C]([C,1])[C]([C,1]))").unwrap();
        assert_eq!(tree.node_count(), 5);

        let tree_graph = tree.to_tree_graph();
        assert_eq!(tree_graph.node_count(), 5);
        assert_eq!(tree_graph.edge_count(), 4);

        let mapping = tree.vertex_mapping();
        assert_eq!(mapping, vec![0, 1, 2, 3, 2]);

        let graph = tree.to_graph();
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.edges(), vec![(0, 1), (0, 3), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_reconstruct_keeps_labels() {
        let graph = ColoredTree::parse("[C](=[O][N](-[H]))").unwrap().to_graph();
        assert_eq!(graph.symbols(), &["C", "O", "N", "H"]);
        assert_eq!(graph.edge_label(0, 1), "=");
        assert_eq!(graph.edge_label(2, 3), "-");
        assert_eq!(graph.edge_label(0, 2), "");
    }

    #[test]
    fn test_print_deep_tree() {
        let mut tree = ColoredTree::new("C", 0);
        let mut last = tree.root();
        for _ in 0..20_000 {
            last = tree.add_child(last, "", "C", 0);
        }
        tree.add_child(0, "=", "O", 0);
        let text = tree.to_string();
        assert!(text.starts_with("[C]([C]([C]("));
        assert!(text.ends_with("[C]))=[O])"));
        assert_eq!(text.len(), 3 + 2 + 20_000 * 3 + 19_999 * 2 + 4);
        assert_eq!(ColoredTree::parse(&text).unwrap(), tree);
    }
}
