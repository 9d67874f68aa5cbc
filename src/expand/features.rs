//! Features describing a parent span / child span pair during expansion.

use std::collections::BTreeSet;

use crate::document::{Document, TermId, tree};
use crate::features::{CLUSTER_PREFIX, FeatureBuilder, FeatureVector, INDEX_KEY};
use crate::span::{Range, Span, term_ranges};

use super::main_term;

/// Distance bucket of two ranges: adjacent, verynear, near or far.
fn distance_bucket(distance: usize) -> &'static str {
    match distance {
        0..=1 => "adjacent",
        2..=3 => "verynear",
        4..=6 => "near",
        _ => "far",
    }
}

fn position_features(b: &mut FeatureBuilder, prefix: &str, parent: Range, child: Range) {
    let bucket = distance_bucket(parent.distance(&child));
    let direction = if child.begin > parent.begin {
        "after"
    } else {
        "before"
    };
    b.set(format!("{prefix}{bucket}"))
        .set(format!("{prefix}{direction}"))
        .set(format!("{prefix}{direction}.{bucket}"));
}

fn term_features(b: &mut FeatureBuilder, prefix: &str, doc: &Document, term: TermId) {
    let t = doc.term(term);
    b.set(format!("{prefix}.pos.{}", t.morph_initial()))
        .set_if(format!("{prefix}.named"), t.is_named())
        .set(format!("{prefix}.lemma.{}", t.lemma.to_lowercase()))
        .set(format!("{prefix}.morph.{}", t.morphofeat));
}

fn enclosing(terms: impl IntoIterator<Item = TermId>) -> Option<Range> {
    Range::enclose(&term_ranges(terms))
}

/// Read-only state shared by every feature computation of one expansion.
pub(crate) struct SpanContext<'a> {
    pub doc: &'a Document,
    pub marked: &'a BTreeSet<TermId>,
    pub root: &'a Span,
}

/// Feature vector for growing `parent` into `child` at the given depth.
pub(crate) fn span_features(
    ctx: &SpanContext<'_>,
    selection: &BTreeSet<TermId>,
    parent: &Span,
    child: &Span,
    depth: usize,
) -> FeatureVector {
    let doc = ctx.doc;
    let parent_term = main_term(doc, parent);
    let child_term = main_term(doc, child);
    let child_head = child.resolve_head(doc).unwrap_or(child_term);

    // Walk from the child head up to the parent, collecting connectives and
    // the lemma-annotated function path.
    let mut connectives = BTreeSet::new();
    let mut top_dep = doc.dep_to(child_head);
    let mut pathex =
        top_dep.map(|dep| format!("{}-{}", dep.func, doc.term(dep.to).morph_initial()));
    while let Some(dep) = top_dep {
        if parent.contains(dep.from) {
            break;
        }
        connectives.insert(dep.from);
        let Some(next) = doc.dep_to(dep.from) else {
            tracing::trace!(document = doc.id(), %child_head, "child not below parent");
            top_dep = None;
            break;
        };
        let lemma = doc.term(next.to).lemma.to_lowercase();
        pathex = pathex.map(|p| format!("{}-{lemma}.{p}", next.func));
        top_dep = Some(next);
    }

    let mut b = FeatureVector::builder();
    b.set(format!("{CLUSTER_PREFIX}{}", doc.id()))
        .set_value(INDEX_KEY, child_term.0 as f32)
        .set(format!("depth{depth}"));

    let descendants = tree::descendants(
        doc,
        child.terms().iter().copied().chain(connectives.iter().copied()),
    );
    let root_range = enclosing(ctx.root.terms().iter().copied());
    let parent_range = enclosing(parent.terms().iter().copied());
    let child_range = enclosing(child.terms().iter().copied());
    let descendant_ranges = term_ranges(descendants.iter().copied());
    let descendants_range = Range::enclose(&descendant_ranges);

    if let (Some(root), Some(desc)) = (root_range, descendants_range) {
        position_features(&mut b, "pos.descroot.", root, desc);
    }
    if let Some(parent) = parent_range {
        if let Some(desc) = descendants_range {
            position_features(&mut b, "pos.descparent.", parent, desc);
        }
        if let Some(child) = child_range {
            position_features(&mut b, "pos.childparent.", parent, child);
        }
        b.set_if(
            "span.connected.parent",
            parent.connected_any(&descendant_ranges),
        );
    }
    if let Some(selected) = enclosing(selection.iter().copied()) {
        b.set_if("span.enclosed", selected.overlaps_any(&descendant_ranges))
            .set_if("span.connected", selected.connected_any(&descendant_ranges));
    }
    b.set_if("span.marked", ctx.marked.contains(&child_term))
        .set_if(
            "span.marked.descendant",
            !ctx.marked.is_disjoint(&descendants),
        )
        .set_value("span.depth", depth as f32);

    term_features(&mut b, "parent", doc, parent_term);
    term_features(&mut b, "child", doc, child_term);

    for dep in doc.deps_from(child_head) {
        b.set(format!(
            "depdown.{}.{}",
            dep.func,
            doc.term(dep.to).morph_initial()
        ));
    }
    if let (Some(pathex), Some(top)) = (pathex, top_dep) {
        b.set(format!("dep.{pathex}"));
        let scope = if depth == 0 { "top" } else { "nested" };
        b.set(format!("dep.{scope}.{}", top.func));
    }

    for predicate in doc.predicates_by_term(parent_term) {
        for role in &predicate.roles {
            if role.terms.contains(&child_term) {
                b.set(format!("srl.{}", role.label));
            }
        }
    }

    b.build()
}
