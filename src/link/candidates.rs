//! Candidate argument heads for an expression root.

use std::collections::{BTreeSet, VecDeque};

use crate::document::{Dep, Document, TermId, func, tree};

fn is_modifier(dep: &Dep) -> bool {
    dep.func == func::NMOD || dep.func == func::AMOD
}

/// Add `term` and its dependents, without descending below modifiers.
fn collect_non_modifiers(doc: &Document, term: TermId, out: &mut BTreeSet<TermId>) {
    let mut stack = vec![term];
    while let Some(t) = stack.pop() {
        if !out.insert(t) {
            continue;
        }
        for dep in doc.deps_from(t) {
            if is_modifier(dep) {
                out.insert(dep.to);
            } else {
                stack.push(dep.to);
            }
        }
    }
}

/// Terms of the root's sentence eligible as argument heads, in sentence order.
///
/// Candidates come from the root's own dependents and from the subtrees hanging
/// off each of its ancestors, where coordinated sisters of an ancestor count as
/// the ancestor itself. Verbs qualify only when they carry the semantic
/// predicate of their chain, and every candidate needs a letter.
pub fn candidates<S: AsRef<str>>(
    doc: &Document,
    root: TermId,
    pos_prefixes: Option<&[S]>,
) -> Vec<TermId> {
    let mut reachable = BTreeSet::new();
    for dep in doc.deps_from(root) {
        if !dep.is_coordination() {
            collect_non_modifiers(doc, dep.to, &mut reachable);
        }
    }

    let mut current = root;
    while let Some(up) = doc.dep_to(current) {
        current = up.from;
        if up.is_coordination() {
            continue;
        }
        let mut queue = VecDeque::from([up.from]);
        while let Some(ancestor) = queue.pop_front() {
            reachable.insert(ancestor);
            for dep in doc.deps_from(ancestor) {
                if dep.to == up.to {
                    continue;
                }
                if dep.is_coordination() {
                    queue.push_back(dep.to);
                } else {
                    collect_non_modifiers(doc, dep.to, &mut reachable);
                }
            }
        }
    }

    let sentence = doc.term(root).sentence;
    doc.sentence_terms(sentence)
        .iter()
        .copied()
        .filter(|&t| t != root && reachable.contains(&t))
        .filter(|&t| pos_prefixes.is_none_or(|p| tree::matches_extended_pos(doc, t, p)))
        .filter(|&t| doc.term(t).pos_letter() != 'V' || tree::syntactic_to_srl_head(doc, t) == t)
        .filter(|&t| doc.term(t).has_letter())
        .collect()
}
