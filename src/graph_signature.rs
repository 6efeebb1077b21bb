use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::{
    group_by_signature, parse_signature, CanonicalForm, ParseError, QuotientGraph,
    SignatureGraph, SimpleGraph, SymmetryClass, VertexSignature,
};

/// Options shared by every signature computed over one graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureConfig {
    /// Stop each DAG after this many layers below its root. `None` explores the whole
    /// component.
    pub height: Option<usize>,
    /// Joins the entries of [`GraphSignature::to_full_string`].
    pub separator: String,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            height: None,
            separator: " + ".to_string(),
        }
    }
}

/// The whole-graph results of [`GraphSignature::summarize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSummary {
    pub canonical: String,
    pub full: String,
    pub classes: Vec<SymmetryClass>,
    pub labels: Vec<usize>,
}

/// Signatures of a whole graph, derived from the signatures of its vertices.
pub struct GraphSignature<'g, G: ?Sized> {
    graph: &'g G,
    config: SignatureConfig,
}

impl<'g, G: SignatureGraph + ?Sized> GraphSignature<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self::with_config(graph, SignatureConfig::default())
    }

    pub fn with_config(graph: &'g G, config: SignatureConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &SignatureConfig {
        &self.config
    }

    pub fn signature_for_vertex(&self, vertex: usize) -> VertexSignature {
        VertexSignature::with_height(self.graph, vertex, self.config.height)
    }

    pub fn signature_string_for_vertex(&self, vertex: usize) -> String {
        self.signature_for_vertex(vertex).to_canonical_string()
    }

    /// The canonical string of every vertex, indexed by vertex.
    pub fn vertex_signature_strings(&self) -> Vec<String> {
        signature_strings(&self.canonical_forms())
    }

    fn canonical_forms(&self) -> Vec<CanonicalForm> {
        let forms: Vec<CanonicalForm> = (0..self.graph.vertex_count())
            .map(|v| self.signature_for_vertex(v).canonical_form())
            .collect();
        debug!("Computed {} vertex signatures", forms.len());
        forms
    }

    /// The greatest vertex signature, or the empty string for an empty graph.
    pub fn to_canonical_string(&self) -> String {
        canonical_string(&self.canonical_forms())
    }

    /// Every distinct vertex signature prefixed with how many vertices have it, in
    /// ascending order and joined by the configured separator.
    pub fn to_full_string(&self) -> String {
        full_string(&self.vertex_signature_strings(), &self.config.separator)
    }

    /// Vertices grouped by identical signature, in order of first occurrence.
    pub fn symmetry_classes(&self) -> Vec<SymmetryClass> {
        self.classes(&self.vertex_signature_strings())
    }

    fn classes(&self, strings: &[String]) -> Vec<SymmetryClass> {
        let classes = group_by_signature(strings);
        info!(
            "Found {} symmetry classes among {} vertices",
            classes.len(),
            self.graph.vertex_count()
        );
        classes
    }

    /// The vertices of the canonical root's component in canonical print order.
    pub fn canonical_labels(&self) -> Vec<usize> {
        canonical_labels(&self.canonical_forms())
    }

    /// The canonical string, full string, symmetry classes and canonical labels, all
    /// from a single computation of the vertex signatures.
    pub fn summarize(&self) -> SignatureSummary {
        let forms = self.canonical_forms();
        let strings = signature_strings(&forms);
        SignatureSummary {
            canonical: canonical_string(&forms),
            full: full_string(&strings, &self.config.separator),
            classes: self.classes(&strings),
            labels: canonical_labels(&forms),
        }
    }

    /// Map each old vertex index to its canonical index.
    ///
    /// The canonical root's component comes first in print order, then every other
    /// vertex in index order.
    pub fn canonical_permutation(&self) -> Vec<usize> {
        let count = self.graph.vertex_count();
        let mut permutation = vec![usize::MAX; count];
        let mut next = 0;
        for vertex in self.canonical_labels() {
            permutation[vertex] = next;
            next += 1;
        }
        for slot in permutation.iter_mut().filter(|slot| **slot == usize::MAX) {
            *slot = next;
            next += 1;
        }
        permutation
    }

    /// Whether vertex 0 has the greatest signature and the vertices are already
    /// numbered in its print order.
    pub fn is_canonically_labelled(&self) -> bool {
        let forms = self.canonical_forms();
        let Some(first) = forms.first() else {
            return true;
        };
        forms.iter().all(|form| form.signature <= first.signature)
            && first.labels.windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Decode the canonical string and rebuild the graph it describes.
    ///
    /// An empty graph has an empty canonical string, which fails with
    /// [`ParseError::Empty`].
    pub fn reconstruct_canonical_graph(&self) -> Result<SimpleGraph, ParseError> {
        Ok(parse_signature(&self.to_canonical_string())?.to_graph())
    }

    pub fn quotient_graph(&self) -> QuotientGraph {
        QuotientGraph::new(&self.symmetry_classes(), |a, b| {
            self.graph.is_connected(a, b)
        })
    }
}

fn signature_strings(forms: &[CanonicalForm]) -> Vec<String> {
    forms.iter().map(|form| form.signature.clone()).collect()
}

/// The vertex with the greatest signature, preferring the lowest index.
fn canonical_root(forms: &[CanonicalForm]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (vertex, form) in forms.iter().enumerate() {
        if best.map_or(true, |b| form.signature > forms[b].signature) {
            best = Some(vertex);
        }
    }
    best
}

fn canonical_string(forms: &[CanonicalForm]) -> String {
    canonical_root(forms)
        .map(|root| forms[root].signature.clone())
        .unwrap_or_default()
}

fn canonical_labels(forms: &[CanonicalForm]) -> Vec<usize> {
    match canonical_root(forms) {
        Some(root) => forms[root].labels.clone(),
        None => Vec::new(),
    }
}

fn full_string(strings: &[String], separator: &str) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for signature in strings {
        *counts.entry(signature.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(signature, count)| format!("{count}{signature}"))
        .collect::<Vec<_>>()
        .join(separator)
}
