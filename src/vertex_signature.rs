use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

use tracing::{instrument, trace};

use crate::{
    Arc, Dag, Invariants, NodeId, SignatureGraph, COLOR_SEPARATOR, END_BRANCH_SYMBOL,
    END_NODE_SYMBOL, START_BRANCH_SYMBOL, START_NODE_SYMBOL,
};

/// A printed signature together with the order in which it visits the original vertices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalForm {
    pub signature: String,
    /// Original vertex indices in order of their first appearance in `signature`.
    pub labels: Vec<usize>,
}

impl CanonicalForm {
    /// Greater strings win. Equal strings prefer the smaller label sequence so that an
    /// already canonical labelling reproduces itself.
    fn is_better_than(&self, other: &CanonicalForm) -> bool {
        match self.signature.cmp(&other.signature) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.labels < other.labels,
        }
    }
}

/// The signature of one vertex: the graph as seen from that vertex, up to an optional height.
#[derive(Debug, Clone)]
pub struct VertexSignature {
    root: usize,
    dag: Dag,
}

impl VertexSignature {
    pub fn new<G: SignatureGraph + ?Sized>(graph: &G, root: usize) -> Self {
        Self::with_height(graph, root, None)
    }

    pub fn with_height<G: SignatureGraph + ?Sized>(graph: &G, root: usize, height: Option<usize>) -> Self {
        Self {
            root,
            dag: Dag::build(graph, root, height),
        }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    /// The depth of the deepest layer.
    pub fn height(&self) -> usize {
        self.dag.layer_count() - 1
    }

    /// Search every coloring of the ambiguous vertices and keep the greatest printed string.
    pub fn canonical_form(&self) -> CanonicalForm {
        let mut best = CanonicalForm::default();
        self.search(self.dag.initial_invariants(), 1, &mut best);
        best
    }

    pub fn to_canonical_string(&self) -> String {
        self.canonical_form().signature
    }

    /// The original vertex indices in canonical print order.
    pub fn canonical_labels(&self) -> Vec<usize> {
        self.canonical_form().labels
    }

    #[instrument(level = "trace", skip_all, fields(root = self.root, color = color))]
    fn search(&self, mut invariants: Invariants, color: usize, best: &mut CanonicalForm) {
        self.dag.refine(&mut invariants);
        let orbit = self.dag.orbit(&invariants);

        if orbit.len() < 2 {
            let mut next_color = color;
            for vertex in self.dag.uncolored_multi_parent_vertices(&invariants) {
                invariants.set_color(vertex, next_color);
                next_color += 1;
            }
            let candidate = self.encode(&invariants);
            trace!("Candidate signature {}", candidate.signature);
            if candidate.is_better_than(best) {
                *best = candidate;
            }
            return;
        }

        trace!("Branching over an orbit of {} vertices", orbit.len());
        for vertex in orbit {
            let mut branch = invariants.clone();
            branch.set_color(vertex, color);
            self.search(branch, color + 1, best);
        }
    }

    /// Print the DAG under the given colors and node invariants.
    ///
    /// Every arc is printed once, so a vertex reached over several arcs shows up once per
    /// arc, and its color tag is what ties those occurrences together. The walk keeps its
    /// own stack of frames, so deep DAGs print without deep recursion.
    pub fn encode(&self, invariants: &Invariants) -> CanonicalForm {
        let mut printer = Printer {
            form: CanonicalForm::default(),
            printed_arcs: HashSet::new(),
            seen: vec![false; self.dag.vertex_count()],
        };

        let root = self.dag.root();
        self.print_atom(root, None, invariants, &mut printer);
        let mut stack = vec![Frame::new(root, self.sorted_children(root, invariants))];

        while let Some(frame) = stack.last_mut() {
            let Some(&child) = frame.children.get(frame.next) else {
                if frame.branched {
                    printer.form.signature.push(END_BRANCH_SYMBOL);
                }
                stack.pop();
                continue;
            };
            frame.next += 1;

            let id = frame.id;
            let arc = Arc::new(self.dag.node(id).vertex, self.dag.node(child).vertex);
            if !printer.printed_arcs.insert(arc) {
                continue;
            }
            if !frame.branched {
                frame.branched = true;
                printer.form.signature.push(START_BRANCH_SYMBOL);
            }
            self.print_atom(child, Some(id), invariants, &mut printer);
            stack.push(Frame::new(child, self.sorted_children(child, invariants)));
        }
        printer.form
    }

    /// Print the edge label from `parent` and the bracketed vertex of node `id`.
    fn print_atom(&self, id: NodeId, parent: Option<NodeId>, invariants: &Invariants, printer: &mut Printer) {
        let vertex = self.dag.node(id).vertex;
        let out = &mut printer.form;

        if let Some(parent) = parent {
            out.signature
                .push_str(self.dag.edge_label(self.dag.node(parent).vertex, vertex));
        }
        out.signature.push(START_NODE_SYMBOL);
        out.signature.push_str(self.dag.vertex_label(vertex));
        if invariants.is_colored(vertex) {
            out.signature.push(COLOR_SEPARATOR);
            out.signature.push_str(&invariants.color(vertex).to_string());
        }
        out.signature.push(END_NODE_SYMBOL);

        if !printer.seen[vertex] {
            printer.seen[vertex] = true;
            out.labels.push(self.dag.original_index(vertex));
        }
    }

    /// Children of `id` by (vertex label, node invariant). The sort is stable.
    fn sorted_children(&self, id: NodeId, invariants: &Invariants) -> Vec<NodeId> {
        let mut children = self.dag.node(id).children.clone();
        children.sort_by(|&a, &b| {
            let label_a = self.dag.vertex_label(self.dag.node(a).vertex);
            let label_b = self.dag.vertex_label(self.dag.node(b).vertex);
            label_a
                .cmp(label_b)
                .then_with(|| invariants.node_invariant(a).cmp(&invariants.node_invariant(b)))
        });
        children
    }
}

impl Display for VertexSignature {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.to_canonical_string())
    }
}

/// Accumulates one print of the DAG.
struct Printer {
    form: CanonicalForm,
    printed_arcs: HashSet<Arc>,
    seen: Vec<bool>,
}

/// A node whose children are being printed.
struct Frame {
    id: NodeId,
    children: Vec<NodeId>,
    next: usize,
    branched: bool,
}

impl Frame {
    fn new(id: NodeId, children: Vec<NodeId>) -> Self {
        Self {
            id,
            children,
            next: 0,
            branched: false,
        }
    }
}
