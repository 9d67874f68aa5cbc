//! Dependency-tree traversal primitives.
//!
//! Every function is a read-only view over a [`Document`].

use std::borrow::Cow;
use std::collections::{BTreeSet, VecDeque};
use std::sync::LazyLock;

use regex::Regex;

use super::{Dep, Document, TermId, func};

static BE_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:am|are|is|was|were|be|been|being)$").expect("valid regex"));

static HAVE_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ha(?:ve|s|d|ving)$").expect("valid regex"));

static FINITE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:VBZ|VBD|VBP|MD)$").expect("valid regex"));

/// Lemmas of determiners and adjectives that act as pronouns when they do not
/// modify a noun.
const PRONOMINAL_LEMMAS: &[&str] = &[
    "some", "many", "all", "few", "this", "these", "that", "those",
];

/// Unique path between two terms of the same dependency tree.
#[derive(Debug, Clone)]
pub struct DepPath<'a> {
    /// Edges in walking order, from the start term to the end term.
    pub deps: Vec<&'a Dep>,
    /// Visited terms; `terms.len() == deps.len() + 1`.
    pub terms: Vec<TermId>,
}

impl DepPath<'_> {
    /// Number of edges on the path.
    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }
}

/// The single term of `terms` whose parent lies outside the set.
///
/// Returns `None` for an empty set or when the set has several roots.
pub fn terms_head(doc: &Document, terms: &BTreeSet<TermId>) -> Option<TermId> {
    let mut roots = terms.iter().copied().filter(|&t| {
        doc.dep_to(t)
            .is_none_or(|dep| !terms.contains(&dep.from))
    });
    let head = roots.next()?;
    roots.next().is_none().then_some(head)
}

/// The given terms plus everything they dominate.
pub fn descendants(doc: &Document, roots: impl IntoIterator<Item = TermId>) -> BTreeSet<TermId> {
    let mut result = BTreeSet::new();
    let mut queue: VecDeque<TermId> = VecDeque::new();
    for root in roots {
        if result.insert(root) {
            queue.push_back(root);
        }
    }
    while let Some(term) = queue.pop_front() {
        for dep in doc.deps_from(term) {
            if result.insert(dep.to) {
                queue.push_back(dep.to);
            }
        }
    }
    result
}

/// The given terms plus every term on their ancestor chains.
pub fn dominating(doc: &Document, terms: impl IntoIterator<Item = TermId>) -> BTreeSet<TermId> {
    let mut result = BTreeSet::new();
    for term in terms {
        let mut current = Some(term);
        while let Some(t) = current {
            if !result.insert(t) {
                break;
            }
            current = doc.dep_to(t).map(|dep| dep.from);
        }
    }
    result
}

/// Ancestor chain of a term, starting with the term itself.
fn ancestor_chain(doc: &Document, term: TermId) -> Vec<TermId> {
    let mut chain = vec![term];
    let mut current = term;
    while let Some(dep) = doc.dep_to(current) {
        current = dep.from;
        chain.push(current);
    }
    chain
}

/// Walk the tree path from `from` to `to` through their lowest common ancestor.
///
/// Returns `None` when the terms live in different trees.
pub fn dep_path(doc: &Document, from: TermId, to: TermId) -> Option<DepPath<'_>> {
    let up = ancestor_chain(doc, from);
    let down = ancestor_chain(doc, to);
    let (i, j) = up
        .iter()
        .enumerate()
        .find_map(|(i, t)| down.iter().position(|d| d == t).map(|j| (i, j)))?;

    let mut deps = Vec::with_capacity(i + j);
    let mut terms = Vec::with_capacity(i + j + 1);
    for &t in &up[..i] {
        terms.push(t);
        deps.push(doc.dep_to(t)?);
    }
    terms.push(up[i]);
    for &t in down[..j].iter().rev() {
        deps.push(doc.dep_to(t)?);
        terms.push(t);
    }
    Some(DepPath { deps, terms })
}

/// Follow VC/IM edges down to the verb carrying the semantic predicate.
pub fn syntactic_to_srl_head(doc: &Document, term: TermId) -> TermId {
    let mut current = term;
    while let Some(dep) = doc.deps_from(current).find(|d| d.is_verb_chain()) {
        current = dep.to;
    }
    current
}

/// Morphological tag with a `P` suffix for pronominal determiners/adjectives.
pub fn extended_pos(doc: &Document, term: TermId) -> Cow<'_, str> {
    let t = doc.term(term);
    let lemma = t.lemma.to_lowercase();
    if PRONOMINAL_LEMMAS.contains(&lemma.as_str())
        && doc.dep_to(term).is_none_or(|dep| dep.func != func::NMOD)
    {
        return Cow::Owned(format!("{}P", t.morphofeat));
    }
    Cow::Borrowed(&t.morphofeat)
}

/// Whether the extended POS of `term` starts with one of `prefixes`.
pub fn matches_extended_pos<S: AsRef<str>>(doc: &Document, term: TermId, prefixes: &[S]) -> bool {
    let pos = extended_pos(doc, term);
    prefixes.iter().any(|p| pos.starts_with(p.as_ref()))
}

/// Voice of a verb: `Some(true)` active, `Some(false)` passive, `None` for non-verbs.
pub fn is_active_form(doc: &Document, term: TermId) -> Option<bool> {
    let t = doc.term(term);
    if !t.morphofeat.starts_with('V') {
        return None;
    }
    if t.text.to_lowercase() == "been" || t.morphofeat != "VBN" {
        return Some(true);
    }

    // A past participle is active only under a form of "have".
    let mut current = term;
    loop {
        let Some(dep) = doc.dep_to(current) else {
            return Some(false);
        };
        let parent = doc.term(dep.from);
        let word = parent.text.to_lowercase();
        if parent.morphofeat.starts_with("NN") || BE_FORM.is_match(&word) {
            return Some(false);
        }
        if HAVE_FORM.is_match(&word) {
            return Some(true);
        }
        if FINITE_TAG.is_match(&parent.morphofeat) {
            return Some(false);
        }
        current = dep.from;
    }
}

/// Heads of a span, optionally restricted to terms matching POS prefixes.
///
/// Starting from the span roots, verbs are resolved to their semantic head,
/// coordinated terms contribute further heads, and rejected terms pass the
/// search down to their dependents. Results outside the span are dropped.
pub fn extract_heads<S: AsRef<str>>(
    doc: &Document,
    span: &[TermId],
    prefixes: Option<&[S]>,
) -> BTreeSet<TermId> {
    let set: BTreeSet<TermId> = span.iter().copied().collect();
    let mut result = BTreeSet::new();
    for &term in &set {
        if doc.dep_to(term).is_none_or(|dep| !set.contains(&dep.from)) {
            collect_heads(doc, term, prefixes, &mut result);
        }
    }
    result.retain(|t| set.contains(t));
    result
}

fn collect_heads<S: AsRef<str>>(
    doc: &Document,
    term: TermId,
    prefixes: Option<&[S]>,
    result: &mut BTreeSet<TermId>,
) -> bool {
    let mut accepted = false;
    if extended_pos(doc, term).starts_with('V') {
        let srl_head = syntactic_to_srl_head(doc, term);
        if srl_head != term {
            accepted = collect_heads(doc, srl_head, prefixes, result);
        }
    }
    if !accepted && prefixes.is_none_or(|p| matches_extended_pos(doc, term, p)) {
        result.insert(term);
        accepted = true;
    }
    for dep in doc.deps_from(term) {
        if !accepted || dep.func.to_uppercase().contains(func::COORD) {
            collect_heads(doc, dep.to, prefixes, result);
        }
    }
    accepted
}
