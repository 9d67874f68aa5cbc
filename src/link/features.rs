//! Features describing a root/candidate pair.

use crate::document::{
    DepPath, Document, RESOURCE_BBN, RESOURCE_WN_SST, RESOURCE_WN_SYNSET, TermId, func, tree,
};
use crate::features::{CLUSTER_PREFIX, FeatureBuilder, FeatureVector};
use crate::srl::SrlGraphCache;

/// Path-length thresholds emitted as `path.lenless.<i>`.
const PATH_LENGTH_THRESHOLDS: usize = 10;

/// Longest SRL path considered.
const MAX_SRL_PATH: usize = 2;

/// Top-level supersense: the `wn30-sst` reference minus its category prefix.
fn supersense(doc: &Document, term: TermId) -> &str {
    let sst = doc.term(term).reference(RESOURCE_WN_SST).unwrap_or("none");
    sst.split_once('.').map_or(sst, |(_, rest)| rest)
}

fn term_features(b: &mut FeatureBuilder, prefix: &str, doc: &Document, term: TermId, root: bool) {
    let t = doc.term(term);
    b.set(format!("{prefix}.pos.{}", t.morphofeat));
    let dep = doc.dep_to(term).map_or("none", |d| d.func.as_str());
    b.set(format!("{prefix}.dep.{dep}"));
    b.set_all(&format!("{prefix}.wn."), t.refs(RESOURCE_WN_SYNSET));
    b.set(format!("{prefix}.word.{}", t.text.to_lowercase()));
    if root {
        b.set(format!("{prefix}.lemma.{}", t.lemma.to_lowercase()));
    }
    b.set_if(format!("{prefix}.named"), t.is_named());
    b.set_all(&format!("{prefix}.bbn."), t.refs(RESOURCE_BBN));
    if root {
        let form = match tree::is_active_form(doc, term) {
            Some(true) => "active",
            Some(false) => "passive",
            None => "none",
        };
        b.set(format!("{prefix}.form.{form}"));
    }
    b.set(format!("{prefix}.sst.{}", supersense(doc, term)));
}

/// Direction-tagged path label with coordination scaffolding elided.
///
/// COORD/CONJ hops are dropped, as are PMOD hops next to one of them.
pub fn simplified_path_label(path: &DepPath<'_>) -> String {
    let is_coord = |i: usize| {
        path.deps.get(i).is_some_and(|d| {
            d.func.eq_ignore_ascii_case(func::COORD) || d.func.eq_ignore_ascii_case(func::CONJ)
        })
    };
    let mut label = String::new();
    for (i, dep) in path.deps.iter().enumerate() {
        if is_coord(i) {
            continue;
        }
        if dep.func.eq_ignore_ascii_case(func::PMOD)
            && ((i > 0 && is_coord(i - 1)) || is_coord(i + 1))
        {
            continue;
        }
        label.push_str(&dep.func.to_lowercase());
        label.push(if path.terms[i] == dep.from { 'D' } else { 'U' });
    }
    label
}

/// Feature vector for a (root, candidate) pair.
pub fn link_features(doc: &Document, root: TermId, node: TermId) -> FeatureVector {
    let mut b = FeatureVector::builder();
    b.set(format!("{CLUSTER_PREFIX}{}", doc.id()));

    term_features(&mut b, "root", doc, root, true);
    term_features(&mut b, "node", doc, node, false);

    let left = node.0.checked_sub(1).and_then(|i| doc.get(TermId(i)));
    let right = doc.get(TermId(node.0 + 1));
    for (side, term) in [("left", left), ("right", right)] {
        let pos = term.map_or("none", |t| t.morphofeat.as_str());
        let word = term.map_or_else(|| "none".to_string(), |t| t.text.to_lowercase());
        b.set(format!("{side}.pos.{pos}"));
        b.set(format!("{side}.word.{word}"));
    }

    match tree::dep_path(doc, root, node) {
        Some(path) => {
            b.set(format!("path.{}", simplified_path_label(&path)));
            for i in path.len()..PATH_LENGTH_THRESHOLDS {
                b.set(format!("path.lenless.{i}"));
            }
        }
        None => {
            tracing::trace!(document = doc.id(), %root, %node, "no dependency path");
            b.set("path.none");
        }
    }

    let graph = SrlGraphCache::global().get_or_build(doc, doc.term(root).sentence);
    for path in graph.paths(root, node, MAX_SRL_PATH) {
        let mut name = String::from("srl.path.");
        for (i, (&vertex, edge)) in path.vertices.iter().zip(&path.edges).enumerate() {
            let t = doc.term(vertex);
            if i > 0
                && t.morphofeat.starts_with("VB")
                && doc.predicates_by_term(vertex).next().is_some()
            {
                name.push('_');
                name.push_str(&t.lemma.to_lowercase());
            }
            name.push_str(if edge.source == vertex { "_F_" } else { "_B_" });
            name.push_str(&edge.label);
        }
        b.set(name);
    }

    b.build()
}
