//! Semantic-role graph of a sentence and its process-wide cache.
//!
//! Nodes are predicate heads and argument heads; edges run from a predicate
//! to each argument head and carry the role label. Graphs are built lazily
//! once per (document, sentence) and kept until the document is released.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, Mutex};

use dashmap::DashMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::document::{Document, TermId, tree};

/// Extended POS prefixes of terms that can head a role argument.
pub const ARGUMENT_HEAD_POS: &[&str] = &["NN", "PRP", "JJP", "DTP", "WP", "VB"];

static GLOBAL: LazyLock<SrlGraphCache> = LazyLock::new(SrlGraphCache::new);

/// Role edge as traversed on a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrlEdge {
    pub source: TermId,
    pub target: TermId,
    pub label: String,
}

/// Simple path between two vertices; edges may be walked backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrlPath {
    /// `vertices.len() == edges.len() + 1`.
    pub vertices: Vec<TermId>,
    pub edges: Vec<SrlEdge>,
}

impl SrlPath {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Predicate/argument graph of one sentence.
#[derive(Debug, Default)]
pub struct SrlGraph {
    graph: DiGraph<TermId, String>,
    nodes: HashMap<TermId, NodeIndex>,
}

impl SrlGraph {
    /// Build the graph from the predicates headed inside `sentence`.
    pub fn build(doc: &Document, sentence: u32) -> Self {
        let mut graph = Self::default();
        let mut seen: HashSet<(TermId, TermId, &str)> = HashSet::new();
        for predicate in doc.predicates() {
            let span = predicate.terms.iter().copied().collect();
            let Some(head) = tree::terms_head(doc, &span) else {
                continue;
            };
            if doc.term(head).sentence != sentence {
                continue;
            }
            for role in &predicate.roles {
                for arg in tree::extract_heads(doc, &role.terms, Some(ARGUMENT_HEAD_POS)) {
                    if seen.insert((head, arg, role.label.as_str())) {
                        graph.add_edge(head, arg, &role.label);
                    }
                }
            }
        }
        graph
    }

    fn node(&mut self, term: TermId) -> NodeIndex {
        *self
            .nodes
            .entry(term)
            .or_insert_with(|| self.graph.add_node(term))
    }

    fn add_edge(&mut self, from: TermId, to: TermId, label: &str) {
        let a = self.node(from);
        let b = self.node(to);
        self.graph.add_edge(a, b, label.to_string());
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All simple paths of 1 to `max_len` edges from `from` to `to`.
    pub fn paths(&self, from: TermId, to: TermId, max_len: usize) -> Vec<SrlPath> {
        let mut result = Vec::new();
        let (Some(&start), Some(&end)) = (self.nodes.get(&from), self.nodes.get(&to)) else {
            return result;
        };
        if start == end {
            return result;
        }
        let mut path = SrlPath {
            vertices: vec![from],
            edges: Vec::new(),
        };
        self.walk(start, end, max_len, &mut path, &mut result);
        result
    }

    fn walk(
        &self,
        current: NodeIndex,
        end: NodeIndex,
        max_len: usize,
        path: &mut SrlPath,
        result: &mut Vec<SrlPath>,
    ) {
        if path.len() >= max_len {
            return;
        }
        let outgoing = self
            .graph
            .edges_directed(current, Direction::Outgoing)
            .map(|e| (e.target(), e));
        let incoming = self
            .graph
            .edges_directed(current, Direction::Incoming)
            .map(|e| (e.source(), e));
        for (next, edge) in outgoing.chain(incoming) {
            let term = self.graph[next];
            if path.vertices.contains(&term) {
                continue;
            }
            path.vertices.push(term);
            path.edges.push(SrlEdge {
                source: self.graph[edge.source()],
                target: self.graph[edge.target()],
                label: edge.weight().clone(),
            });
            if next == end {
                result.push(path.clone());
            } else {
                self.walk(next, end, max_len, path, result);
            }
            path.vertices.pop();
            path.edges.pop();
        }
    }
}

/// Graphs of one document, valid for the content they were built from.
#[derive(Debug)]
struct DocumentGraphs {
    fingerprint: u64,
    sentences: HashMap<u32, Arc<SrlGraph>>,
}

/// Concurrent cache of sentence graphs keyed by document id.
///
/// Each document has its own lock held across lookup and build, so a graph
/// is built at most once per (document, sentence). A document reusing a
/// cached id with different content replaces the stale graphs.
#[derive(Debug, Default)]
pub struct SrlGraphCache {
    documents: DashMap<String, Arc<Mutex<DocumentGraphs>>>,
}

impl SrlGraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used by the labellers.
    pub fn global() -> &'static SrlGraphCache {
        &GLOBAL
    }

    pub fn get_or_build(&self, doc: &Document, sentence: u32) -> Arc<SrlGraph> {
        let graphs = self
            .documents
            .entry(doc.id().to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(DocumentGraphs {
                    fingerprint: doc.fingerprint(),
                    sentences: HashMap::new(),
                }))
            })
            .clone();
        let mut graphs = graphs.lock().unwrap_or_else(|e| e.into_inner());
        if graphs.fingerprint != doc.fingerprint() {
            tracing::debug!(
                document = doc.id(),
                stale = graphs.sentences.len(),
                "document content changed, dropping cached SRL graphs"
            );
            graphs.fingerprint = doc.fingerprint();
            graphs.sentences.clear();
        }
        graphs
            .sentences
            .entry(sentence)
            .or_insert_with(|| {
                tracing::trace!(document = doc.id(), sentence, "building SRL graph");
                Arc::new(SrlGraph::build(doc, sentence))
            })
            .clone()
    }

    /// Whether graphs of the given document are cached.
    pub fn contains(&self, document_id: &str) -> bool {
        self.documents.contains_key(document_id)
    }

    /// Drop every graph of a document; returns whether any was cached.
    pub fn release(&self, document_id: &str) -> bool {
        self.documents.remove(document_id).is_some()
    }

    /// Number of documents with cached graphs.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures;

    #[test]
    fn graph_links_predicate_to_argument_heads() {
        let doc = fixtures::criticized();
        let graph = SrlGraph::build(&doc, 0);
        // criticized, John, Mary, plan
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn paths_walk_edges_both_ways() {
        let doc = fixtures::criticized();
        let graph = SrlGraph::build(&doc, 0);
        let paths = graph.paths(TermId(0), TermId(2), 2);
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.vertices, vec![TermId(0), TermId(4), TermId(2)]);
        assert_eq!(path.edges[0].source, TermId(4));
        assert_eq!(path.edges[0].label, "A0");

        assert!(graph.paths(TermId(0), TermId(2), 1).is_empty());
        assert_eq!(graph.paths(TermId(4), TermId(6), 2).len(), 1);
        assert!(graph.paths(TermId(3), TermId(6), 2).is_empty());
    }

    #[test]
    fn cache_builds_once_and_releases() {
        let doc = fixtures::criticized();
        let cache = SrlGraphCache::new();
        let a = cache.get_or_build(&doc, 0);
        let b = cache.get_or_build(&doc, 0);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(cache.release(doc.id()));
        assert!(!cache.release(doc.id()));
        let c = cache.get_or_build(&doc, 0);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn reused_id_rebuilds_for_new_content() {
        let cache = SrlGraphCache::new();
        let first = fixtures::criticized();
        let stale = cache.get_or_build(&first, 0);
        assert_eq!(stale.node_count(), 4);

        let mut b = Document::builder(first.id());
        let plans = b.term("Plans", "plan", "N", "NNS");
        let failed = b.term("failed", "fail", "V", "VBD");
        b.dep(failed, plans, "SBJ");
        b.predicate(&[failed], &[("A1", &[plans])]);
        let second = b.build().unwrap();

        let fresh = cache.get_or_build(&second, 0);
        assert_eq!(fresh.node_count(), 2);
        assert_eq!(fresh.paths(TermId(1), TermId(0), 1).len(), 1);
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&fresh, &cache.get_or_build(&second, 0)));
    }
}
