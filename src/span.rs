//! Term spans and term-index ranges.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::document::{Document, TermId, tree};

/// Ordered, deduplicated terms of one sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    terms: Vec<TermId>,
    head: Option<TermId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    heads: BTreeSet<TermId>,
}

impl Span {
    /// Build a span, sorting and deduplicating the terms.
    pub fn new(terms: impl IntoIterator<Item = TermId>, head: Option<TermId>) -> Self {
        let set: BTreeSet<TermId> = terms.into_iter().collect();
        Self {
            terms: set.into_iter().collect(),
            head,
            heads: BTreeSet::new(),
        }
    }

    pub fn with_heads(mut self, heads: impl IntoIterator<Item = TermId>) -> Self {
        self.heads.extend(heads);
        self
    }

    pub fn terms(&self) -> &[TermId] {
        &self.terms
    }

    pub fn head(&self) -> Option<TermId> {
        self.head
    }

    pub fn heads(&self) -> &BTreeSet<TermId> {
        &self.heads
    }

    pub fn contains(&self, term: TermId) -> bool {
        self.terms.binary_search(&term).is_ok()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Term set view, for set algebra.
    pub fn term_set(&self) -> BTreeSet<TermId> {
        self.terms.iter().copied().collect()
    }

    /// The recorded head, or the dependency head of the terms.
    pub fn resolve_head(&self, doc: &Document) -> Option<TermId> {
        self.head.or_else(|| tree::terms_head(doc, &self.term_set()))
    }
}

/// Half-open range `[begin, end)` of term indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range {
    pub begin: usize,
    pub end: usize,
}

impl Range {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    /// Smallest range covering all the given ranges.
    pub fn enclose(ranges: &[Range]) -> Option<Range> {
        let begin = ranges.iter().map(|r| r.begin).min()?;
        let end = ranges.iter().map(|r| r.end).max()?;
        Some(Range { begin, end })
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Number of positions strictly between the two ranges, 0 when they touch.
    pub fn distance(&self, other: &Range) -> usize {
        if other.begin >= self.end {
            other.begin - self.end
        } else if self.begin >= other.end {
            self.begin - other.end
        } else {
            0
        }
    }

    pub fn overlaps(&self, other: &Range) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Overlapping or adjacent.
    pub fn connected(&self, other: &Range) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }

    pub fn overlaps_any(&self, others: &[Range]) -> bool {
        others.iter().any(|o| self.overlaps(o))
    }

    pub fn connected_any(&self, others: &[Range]) -> bool {
        others.iter().any(|o| self.connected(o))
    }
}

/// Maximal runs of consecutive term indexes.
pub fn term_ranges(terms: impl IntoIterator<Item = TermId>) -> Vec<Range> {
    let sorted: BTreeSet<TermId> = terms.into_iter().collect();
    let mut ranges: Vec<Range> = Vec::new();
    for TermId(index) in sorted {
        match ranges.last_mut() {
            Some(last) if last.end == index => last.end += 1,
            _ => ranges.push(Range::new(index, index + 1)),
        }
    }
    ranges
}

/// Group spans whose heads are coordinated into one span each.
///
/// Heads are coordinated when one reaches the other walking up COORD/CONJ
/// edges through conjunctions or punctuation only. The connecting terms join
/// the merged span. With `contiguous`, each merged span also absorbs every
/// term between its first and last term. Spans without a head pass through.
pub fn merge_spans(doc: &Document, spans: &[Span], contiguous: bool) -> Vec<Span> {
    let mut extents: BTreeMap<TermId, BTreeSet<TermId>> = BTreeMap::new();
    let mut result = Vec::new();
    for span in spans {
        match span.resolve_head(doc) {
            Some(head) => extents.entry(head).or_default().extend(span.terms()),
            None => result.push(span.clone()),
        }
    }

    let mut clusters: BTreeMap<TermId, BTreeSet<TermId>> = extents
        .keys()
        .map(|&head| (head, BTreeSet::from([head])))
        .collect();
    for &head in extents.keys() {
        let mut dep = doc.dep_to(head);
        while let Some(d) = dep.filter(|d| d.is_coordination()) {
            if extents.contains_key(&d.from) {
                let merged: BTreeSet<TermId> =
                    clusters[&head].union(&clusters[&d.from]).copied().collect();
                for &member in &merged {
                    clusters.insert(member, merged.clone());
                }
            } else if !matches!(doc.term(d.from).pos_letter(), 'C' | 'O') {
                break;
            }
            dep = doc.dep_to(d.from);
        }
    }

    let mut seen = BTreeSet::new();
    for (head, heads) in &clusters {
        if !seen.insert(*head) {
            continue;
        }
        seen.extend(heads.iter().copied());

        let mut terms: BTreeSet<TermId> = BTreeSet::new();
        let mut span_head = *head;
        for &h in heads {
            terms.extend(&extents[&h]);
            let mut path = Vec::new();
            let mut dep = doc.dep_to(h);
            let mut top = true;
            while let Some(d) = dep {
                path.push(d.from);
                if heads.contains(&d.from) {
                    terms.extend(path.drain(..));
                    top = false;
                }
                dep = doc.dep_to(d.from);
            }
            if top {
                span_head = h;
            }
        }

        if contiguous {
            if let (Some(&first), Some(&last)) = (terms.first(), terms.last()) {
                terms.extend((first.0..=last.0).map(TermId));
            }
        }
        result.push(Span::new(terms, Some(span_head)).with_heads(heads.iter().copied()));
    }

    result.sort_by_key(|s| s.terms().first().copied());
    result
}

/// Split a span into one sub-span per head.
///
/// Each sub-span holds the head and the span terms it dominates, minus terms
/// dominating any head.
pub fn split_span(doc: &Document, span: &Span, heads: &BTreeSet<TermId>) -> Vec<Span> {
    let excluded = tree::dominating(doc, heads.iter().copied());
    heads
        .iter()
        .filter_map(|&head| {
            let mut terms = tree::descendants(doc, [head]);
            terms.retain(|t| !excluded.contains(t));
            terms.insert(head);
            terms.retain(|&t| span.contains(t));
            (!terms.is_empty()).then(|| Span::new(terms, Some(head)))
        })
        .collect()
}
