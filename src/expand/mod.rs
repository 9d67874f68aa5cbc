//! Span expansion: grow an argument head into the full argument span.
//!
//! Expansion starts from the minimal span of the head and repeatedly asks a
//! classifier whether each dependent sub-span should join the selection.
//! Accepted children recurse, so the decision at every level sees the
//! selection built so far.

pub mod features;

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;

use crate::classifier::{self, Classifier, LogisticModel, Model, SetPrecisionRecall};
use crate::document::{Document, TermId, tree};
use crate::error::{ClassifierResult, ModelError, ModelResult};
use crate::features::{FeatureVector, LabeledVector, SELECTED, UNSELECTED};
use crate::link::MODEL_FILE;
use crate::span::Span;

use features::{SpanContext, span_features};

/// Coarse POS letters walked through, not offered, when collecting children.
const TRANSPARENT_POS: [char; 2] = ['P', 'C'];

/// The head plus entity terms around it, closed over verb-chain edges.
///
/// Entities are absorbed only when the union still has a single head.
pub fn minimal_span(doc: &Document, term: TermId) -> Span {
    let mut terms = BTreeSet::from([term]);
    for entity in doc.entities_by_term(term) {
        let mut union = terms.clone();
        union.extend(entity.terms.iter().copied());
        if tree::terms_head(doc, &union).is_some() {
            terms = union;
        }
    }

    let mut queue: VecDeque<TermId> = terms.iter().copied().collect();
    while let Some(t) = queue.pop_front() {
        for dep in doc.deps_of(t) {
            if !dep.is_verb_chain() {
                continue;
            }
            for next in [dep.from, dep.to] {
                if terms.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    let head = tree::terms_head(doc, &terms);
    Span::new(terms, head)
}

/// The content term of a span: its head, followed down verb chains.
pub fn main_term(doc: &Document, span: &Span) -> TermId {
    let mut term = span
        .resolve_head(doc)
        .or_else(|| span.terms().first().copied())
        .unwrap_or_default();
    while let Some(dep) = doc.deps_from(term).find(|d| d.is_verb_chain()) {
        term = dep.to;
    }
    term
}

/// Lowest character offset of the span.
fn span_offset(doc: &Document, span: &Span) -> usize {
    span.terms()
        .iter()
        .map(|&t| doc.term(t).offset)
        .min()
        .unwrap_or(0)
}

/// Minimal spans of the dependents of `parent`, nearest first.
///
/// Prepositions and conjunctions are looked through, and a dependent-free
/// term reached that way stands as a child on its own.
fn children(doc: &Document, parent: &Span) -> Vec<Span> {
    let mut found = Vec::new();
    for &start in parent.terms() {
        let mut queue = VecDeque::from([start]);
        while let Some(term) = queue.pop_front() {
            let mut has_deps = false;
            for dep in doc.deps_from(term) {
                has_deps = true;
                if parent.contains(dep.to) {
                    continue;
                }
                if TRANSPARENT_POS.contains(&doc.term(dep.to).pos_letter()) {
                    queue.push_back(dep.to);
                } else {
                    found.push(minimal_span(doc, dep.to));
                }
            }
            if !has_deps && !parent.contains(term) {
                found.push(minimal_span(doc, term));
            }
        }
    }

    let origin = span_offset(doc, parent);
    found.sort_by_key(|child| span_offset(doc, child).abs_diff(origin));
    found
}

/// One run of the recursive expansion.
struct Expansion<'a, 'p> {
    ctx: SpanContext<'a>,
    selection: BTreeSet<TermId>,
    predict: &'p mut dyn FnMut(&FeatureVector) -> u8,
    max_depth: usize,
}

impl Expansion<'_, '_> {
    fn grow(&mut self, parent: &Span, depth: usize) {
        self.selection.extend(parent.terms().iter().copied());
        if depth > self.max_depth {
            return;
        }
        let doc = self.ctx.doc;
        for child in children(doc, parent) {
            let vector = span_features(&self.ctx, &self.selection, parent, &child, depth);
            if (self.predict)(&vector) != SELECTED {
                continue;
            }
            // Pull in the connectives between the child and the selection.
            for &term in child.terms() {
                let mut current = term;
                while let Some(dep) = doc.dep_to(current) {
                    if !self.selection.insert(dep.from) {
                        break;
                    }
                    current = dep.from;
                }
            }
            self.grow(&child, depth + 1);
        }
    }
}

/// Expand `head` with an arbitrary child predictor.
fn expand_with(
    doc: &Document,
    head: TermId,
    marked: &BTreeSet<TermId>,
    predict: &mut dyn FnMut(&FeatureVector) -> u8,
) -> Span {
    let root = minimal_span(doc, head);
    let max_depth = doc.sentence_terms(doc.term(head).sentence).len();
    let mut expansion = Expansion {
        ctx: SpanContext {
            doc,
            marked,
            root: &root,
        },
        selection: BTreeSet::new(),
        predict,
        max_depth,
    };
    expansion.grow(&root, 0);
    Span::new(expansion.selection, root.head())
}

/// Grows argument heads into argument spans.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanLabeller<C = LogisticModel> {
    classifier: C,
}

impl<C: Classifier> SpanLabeller<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Expand one head. `marked` terms belong to sibling arguments.
    pub fn expand(&self, doc: &Document, head: TermId, marked: &[TermId]) -> Span {
        let marked: BTreeSet<TermId> = marked.iter().copied().collect();
        expand_with(doc, head, &marked, &mut |vector| {
            self.classifier.predict(vector).label
        })
    }

    /// Expand several heads and union the results.
    ///
    /// Each head sees the other heads as marked. With `merge`, a single
    /// unselected term is filled in when it hangs off a COORD-like or P edge,
    /// follows a selected term and precedes one within two positions.
    pub fn expand_heads(
        &self,
        doc: &Document,
        heads: &[TermId],
        marked: &[TermId],
        merge: bool,
    ) -> Span {
        let head_set: BTreeSet<TermId> = heads.iter().copied().collect();
        let mut terms = BTreeSet::new();
        for &head in &head_set {
            let others: Vec<TermId> = marked
                .iter()
                .chain(&head_set)
                .copied()
                .filter(|&t| t != head)
                .collect();
            terms.extend(self.expand(doc, head, &others).terms().iter().copied());
        }

        if merge {
            fill_gaps(doc, &mut terms);
        }
        Span::new(terms, None).with_heads(head_set)
    }
}

/// Fill single-term gaps bridged by a COORD-like or P edge.
fn fill_gaps(doc: &Document, terms: &mut BTreeSet<TermId>) {
    let (Some(&TermId(first)), Some(&TermId(last))) = (terms.first(), terms.last()) else {
        return;
    };
    for i in first + 1..last {
        if terms.contains(&TermId(i)) || !terms.contains(&TermId(i - 1)) {
            continue;
        }
        let bridging = doc.dep_to(TermId(i)).is_some_and(|dep| {
            let func = dep.func.to_uppercase();
            func.contains("COORD") || func == "P"
        });
        let resumes =
            terms.contains(&TermId(i + 1)) || (i + 2 <= last && terms.contains(&TermId(i + 2)));
        if bridging && resumes {
            terms.insert(TermId(i));
        }
    }
}

impl<C: Model> SpanLabeller<C> {
    /// Load a labeller directory holding `model`.
    pub fn read_from(dir: &Path) -> ModelResult<Self> {
        Ok(Self::new(C::read_from(&dir.join(MODEL_FILE))?))
    }

    pub fn write_to(&self, dir: &Path) -> ModelResult<()> {
        std::fs::create_dir_all(dir).map_err(|e| ModelError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        self.classifier.write_to(&dir.join(MODEL_FILE))
    }
}

/// Collects span-expansion examples by replaying gold spans.
#[derive(Debug, Clone, Default)]
pub struct SpanTrainer {
    examples: Vec<LabeledVector>,
    evaluation: SetPrecisionRecall,
}

impl SpanTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand `head` with a gold oracle, recording every decision.
    ///
    /// A child is accepted when its main term is in `gold` and not marked.
    pub fn add(&mut self, doc: &Document, head: TermId, marked: &[TermId], gold: &[TermId]) {
        let gold: BTreeSet<TermId> = gold.iter().copied().collect();
        let marked: BTreeSet<TermId> = marked.iter().copied().collect();
        let mut recorded = Vec::new();
        let span = expand_with(doc, head, &marked, &mut |vector| {
            let accept = vector
                .index()
                .map(TermId)
                .is_some_and(|t| gold.contains(&t) && !marked.contains(&t));
            let label = if accept { SELECTED } else { UNSELECTED };
            recorded.push(vector.clone().label(label));
            label
        });

        let output = span.term_set();
        if output != gold {
            tracing::debug!(
                head = %doc.term(head).text,
                gold = %doc.text_of(&gold.iter().copied().collect::<Vec<_>>()),
                output = %doc.text_of(span.terms()),
                "oracle expansion differs from gold span"
            );
        }
        self.evaluation.add(&gold, &output);
        self.examples.extend(recorded);
    }

    /// How well oracle-driven expansion reproduces the gold spans.
    pub fn evaluation(&self) -> &SetPrecisionRecall {
        &self.evaluation
    }

    pub fn examples(&self) -> &[LabeledVector] {
        &self.examples
    }

    /// Train the classifier and build the labeller.
    pub fn finish<M: Model>(
        self,
        grid_size: usize,
        analyze: bool,
    ) -> ClassifierResult<SpanLabeller<M>> {
        tracing::info!(
            evaluation = %self.evaluation,
            "maximum achievable performance given span expansion"
        );
        let model = classifier::train_labeller::<M>(&self.examples, grid_size, analyze)?;
        Ok(SpanLabeller::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Parameters;
    use crate::document::fixtures;

    fn constant(bias: f32) -> SpanLabeller {
        SpanLabeller::new(LogisticModel::from_weights(
            Parameters::default(),
            bias,
            std::iter::empty(),
        ))
    }

    #[test]
    fn minimal_span_absorbs_verb_chain() {
        let doc = fixtures::passive();
        let span = minimal_span(&doc, TermId(2));
        assert_eq!(span.terms(), &[TermId(2), TermId(3)]);
        assert_eq!(span.head(), Some(TermId(2)));
        assert_eq!(main_term(&doc, &span), TermId(3));
    }

    #[test]
    fn minimal_span_of_plain_noun_is_itself() {
        let doc = fixtures::criticized();
        let span = minimal_span(&doc, TermId(6));
        assert_eq!(span.terms(), &[TermId(6)]);
        assert_eq!(span.head(), Some(TermId(6)));
    }

    #[test]
    fn children_sorted_by_distance() {
        let doc = fixtures::criticized();
        let kids = children(&doc, &minimal_span(&doc, TermId(4)));
        let heads: Vec<TermId> = kids.iter().map(|s| s.terms()[0]).collect();
        // strongly, plan, ".", John by character distance from "criticized".
        assert_eq!(heads, [3, 6, 7, 0].map(TermId).to_vec());
    }

    #[test]
    fn coordination_is_looked_through() {
        let doc = fixtures::criticized();
        let kids = children(&doc, &minimal_span(&doc, TermId(0)));
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].terms(), &[TermId(2)]);
    }

    #[test]
    fn rejecting_everything_keeps_minimal_span() {
        let doc = fixtures::criticized();
        let span = constant(-5.0).expand(&doc, TermId(0), &[TermId(2)]);
        assert_eq!(span.terms(), &[TermId(0)]);
        assert_eq!(span.head(), Some(TermId(0)));
    }

    #[test]
    fn accepting_everything_covers_subtree_with_connectives() {
        let doc = fixtures::criticized();
        let span = constant(5.0).expand(&doc, TermId(4), &[]);
        assert_eq!(span.len(), doc.len());
        let from_john = constant(5.0).expand(&doc, TermId(0), &[]);
        // "and" joins as the connective between John and Mary.
        assert_eq!(from_john.terms(), &[TermId(0), TermId(1), TermId(2)]);
    }

    #[test]
    fn expand_heads_unions_and_records_heads() {
        let doc = fixtures::criticized();
        let span = constant(-5.0).expand_heads(&doc, &[TermId(0), TermId(2)], &[], false);
        assert_eq!(span.terms(), &[TermId(0), TermId(2)]);
        assert_eq!(span.heads(), &BTreeSet::from([TermId(0), TermId(2)]));
    }

    #[test]
    fn merge_fills_coordination_gap() {
        let doc = fixtures::criticized();
        let span = constant(-5.0).expand_heads(&doc, &[TermId(0), TermId(2)], &[], true);
        assert_eq!(span.terms(), &[TermId(0), TermId(1), TermId(2)]);
    }

    #[test]
    fn oracle_reproduces_reachable_gold() {
        let doc = fixtures::criticized();
        let mut trainer = SpanTrainer::new();
        trainer.add(&doc, TermId(6), &[], &[TermId(5), TermId(6)]);
        assert_eq!(trainer.examples().len(), 1);
        assert_eq!(trainer.examples()[0].label, SELECTED);
        assert_eq!(trainer.evaluation().exact_ratio(), 1.0);
    }

    #[test]
    fn oracle_rejects_marked_terms() {
        let doc = fixtures::criticized();
        let mut trainer = SpanTrainer::new();
        trainer.add(&doc, TermId(0), &[TermId(2)], &[TermId(0), TermId(1), TermId(2)]);
        assert!(trainer.examples().iter().all(|e| e.label == UNSELECTED));
        assert_eq!(trainer.evaluation().exact_ratio(), 0.0);
    }

    #[test]
    fn persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let labeller = constant(-1.5);
        labeller.write_to(dir.path()).unwrap();
        let loaded: SpanLabeller = SpanLabeller::read_from(dir.path()).unwrap();
        assert_eq!(loaded, labeller);
    }

    #[test]
    fn missing_model_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SpanLabeller::<LogisticModel>::read_from(dir.path()),
            Err(ModelError::MissingPath { .. })
        ));
    }
}
