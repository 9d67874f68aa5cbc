//! Argument clustering: turn link probabilities into argument spans.
//!
//! Candidates joined by coordination form a cluster and share the best score
//! of their members. In unique mode only the best cluster survives; every
//! surviving head is then expanded and coordinated spans are merged.

use std::collections::{BTreeMap, BTreeSet};

use crate::classifier::Classifier;
use crate::document::{Document, TermId, tree};
use crate::expand::SpanLabeller;
use crate::link::LinkLabeller;
use crate::span::{Span, merge_spans};

/// Disjoint coordination clusters over the terms of a sentence.
///
/// Every term maps to the full set of its cluster; merging replaces the set of
/// every member with the union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clusters {
    members: BTreeMap<TermId, BTreeSet<TermId>>,
}

impl Clusters {
    /// One singleton cluster per term.
    pub fn new(terms: impl IntoIterator<Item = TermId>) -> Self {
        Self {
            members: terms
                .into_iter()
                .map(|t| (t, BTreeSet::from([t])))
                .collect(),
        }
    }

    /// Clusters of `sentence` joined by COORD/CONJ edges whose endpoints are
    /// not `blocked`.
    pub fn coordination(doc: &Document, sentence: u32, blocked: &BTreeSet<TermId>) -> Self {
        let mut clusters = Self::new(doc.sentence_terms(sentence).iter().copied());
        for dep in doc.sentence_deps(sentence) {
            let free = !blocked.contains(&dep.from) && !blocked.contains(&dep.to);
            if dep.is_coordination() && free {
                clusters.merge(dep.from, dep.to);
            }
        }
        clusters
    }

    /// Join the clusters of `a` and `b`. Returns whether anything changed.
    pub fn merge(&mut self, a: TermId, b: TermId) -> bool {
        let (Some(left), Some(right)) = (self.members.get(&a), self.members.get(&b)) else {
            return false;
        };
        if left.contains(&b) {
            return false;
        }
        let union: BTreeSet<TermId> = left.union(right).copied().collect();
        for &member in &union {
            self.members.insert(member, union.clone());
        }
        true
    }

    pub fn cluster_of(&self, term: TermId) -> Option<&BTreeSet<TermId>> {
        self.members.get(&term)
    }

    /// Each cluster once, in document order of its first member.
    pub fn iter(&self) -> impl Iterator<Item = &BTreeSet<TermId>> + '_ {
        self.members
            .iter()
            .filter(|(term, set)| set.first() == Some(term))
            .map(|(_, set)| set)
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Argument spans of the expression rooted at `expression_head`.
///
/// Returns no span when the link labeller selects nothing. Cluster scores are
/// the maximum member probability and propagate to members that are neither
/// conjunctions nor punctuation; on a tie the later cluster wins.
pub fn find_arguments<L: Classifier, S: Classifier>(
    doc: &Document,
    expression_head: TermId,
    link: &LinkLabeller<L>,
    span: &SpanLabeller<S>,
    unique: bool,
) -> Vec<Span> {
    let mut scores = link.label(doc, expression_head);
    if scores.is_empty() {
        tracing::trace!(document = doc.id(), %expression_head, "no argument candidates selected");
        return Vec::new();
    }

    // Blocked: the expression head and the chain of terms governing it. Its
    // dependents stay free to join clusters.
    let blocked = tree::dominating(doc, [expression_head]);
    let sentence = doc.term(expression_head).sentence;
    let clusters = Clusters::coordination(doc, sentence, &blocked);

    let mut best: Option<(&BTreeSet<TermId>, f32)> = None;
    for cluster in clusters.iter() {
        let Some(score) = cluster
            .iter()
            .filter_map(|t| scores.get(t).copied())
            .reduce(f32::max)
        else {
            continue;
        };
        for &member in cluster {
            if !matches!(doc.term(member).pos_letter(), 'C' | 'O') {
                scores.insert(member, score);
            }
        }
        if best.is_none_or(|(_, top)| score >= top) {
            best = Some((cluster, score));
        }
    }

    if let Some((cluster, score)) = best.filter(|_| unique) {
        tracing::trace!(?cluster, score, "best argument cluster");
        scores.retain(|term, _| cluster.contains(term));
    }

    let heads: Vec<TermId> = scores.into_keys().collect();
    let spans: Vec<Span> = heads
        .iter()
        .map(|&head| {
            let others: Vec<TermId> = heads.iter().copied().filter(|&t| t != head).collect();
            span.expand(doc, head, &others)
        })
        .collect();

    let merged = merge_spans(doc, &spans, unique);
    if merged.len() <= 1 {
        return merged;
    }
    let terms: Vec<TermId> = merged.iter().flat_map(|s| s.terms().iter().copied()).collect();
    vec![Span::new(terms, None).with_heads(heads)]
}
