//! Annotated document model: terms, dependency edges, predicates and entities.
//!
//! A [`Document`] is immutable once built. Terms are addressed by [`TermId`],
//! their position in document order, so sorting ids sorts terms by offset.
//! The dependency tree is indexed both downward (`deps_from`) and upward
//! (`dep_to`); tree traversal helpers live in [`tree`].

pub mod tree;

#[cfg(test)]
pub(crate) mod fixtures;

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocumentError, DocumentResult};

pub use tree::DepPath;

/// External resource holding WordNet synset references.
pub const RESOURCE_WN_SYNSET: &str = "wn30-ukb";

/// External resource holding WordNet supersense references.
pub const RESOURCE_WN_SST: &str = "wn30-sst";

/// External resource holding BBN named-entity types.
pub const RESOURCE_BBN: &str = "BBN";

/// Dependency function labels the pipeline reacts to.
pub mod func {
    pub const NMOD: &str = "NMOD";
    pub const AMOD: &str = "AMOD";
    pub const COORD: &str = "COORD";
    pub const CONJ: &str = "CONJ";
    pub const VC: &str = "VC";
    pub const IM: &str = "IM";
    pub const PMOD: &str = "PMOD";
}

/// Position of a term in document order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TermId(pub usize);

impl TermId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Reference from a term to an external lexical resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    pub resource: String,
    pub reference: String,
}

/// Atomic annotated token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Surface string.
    pub text: String,
    pub lemma: String,
    /// Coarse part of speech (N, R, G, V, P, A, C, D, O, Q).
    pub pos: String,
    /// Fine-grained morphological tag (Penn Treebank style).
    pub morphofeat: String,
    /// Character offset of the first character.
    pub offset: usize,
    pub length: usize,
    pub sentence: u32,
    #[serde(default)]
    pub refs: Vec<ExternalRef>,
}

impl Term {
    /// Upper-cased first letter of the coarse POS, `'\0'` when missing.
    pub fn pos_letter(&self) -> char {
        self.pos
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('\0')
    }

    /// First character of the morphological tag.
    pub fn morph_initial(&self) -> &str {
        match self.morphofeat.char_indices().nth(1) {
            Some((end, _)) => &self.morphofeat[..end],
            None => &self.morphofeat,
        }
    }

    /// Whether the term is tagged as a proper noun.
    pub fn is_named(&self) -> bool {
        self.morphofeat.starts_with("NNP")
    }

    pub fn has_letter(&self) -> bool {
        self.text.chars().any(char::is_alphabetic)
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// All references to the given resource, in annotation order.
    pub fn refs<'a, 'r>(
        &'a self,
        resource: &'r str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'r> {
        self.refs
            .iter()
            .filter(move |r| r.resource == resource)
            .map(|r| r.reference.as_str())
    }

    /// The lexicographically smallest reference to the given resource.
    pub fn reference(&self, resource: &str) -> Option<&str> {
        self.refs(resource).min()
    }
}

/// Directed dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dep {
    pub from: TermId,
    pub to: TermId,
    pub func: String,
}

impl Dep {
    /// Whether the edge is part of a coordination structure.
    pub fn is_coordination(&self) -> bool {
        self.func == func::COORD || self.func == func::CONJ
    }

    /// Whether the edge links auxiliaries or infinitive markers to their verb.
    pub fn is_verb_chain(&self) -> bool {
        self.func == func::VC || self.func == func::IM
    }
}

/// Semantic role of a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub label: String,
    pub terms: Vec<TermId>,
}

/// Predicate with its semantic roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub terms: Vec<TermId>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Entity mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub terms: Vec<TermId>,
    #[serde(default)]
    pub kind: Option<String>,
}

/// Serialized form of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentData {
    pub id: String,
    pub terms: Vec<Term>,
    #[serde(default)]
    pub deps: Vec<Dep>,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// Read-only annotated document with dependency and predicate indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DocumentData", into = "DocumentData")]
pub struct Document {
    id: String,
    terms: Vec<Term>,
    deps: Vec<Dep>,
    predicates: Vec<Predicate>,
    entities: Vec<Entity>,
    /// Term → indexes into `deps` of its outgoing edges.
    deps_from: Vec<Vec<usize>>,
    /// Term → index into `deps` of its incoming edge.
    dep_to: Vec<Option<usize>>,
    sentences: BTreeMap<u32, Vec<TermId>>,
    predicates_by_term: HashMap<TermId, Vec<usize>>,
    entities_by_term: HashMap<TermId, Vec<usize>>,
    /// Hash of the annotation layers derived structures are built from.
    fingerprint: u64,
}

/// Hash of term tags, dependency edges and predicate structure.
fn content_fingerprint(data: &DocumentData) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.terms.len().hash(&mut hasher);
    for term in &data.terms {
        (term.sentence, &term.pos, &term.morphofeat).hash(&mut hasher);
    }
    for dep in &data.deps {
        (dep.from, dep.to, &dep.func).hash(&mut hasher);
    }
    for predicate in &data.predicates {
        predicate.terms.hash(&mut hasher);
        for role in &predicate.roles {
            (&role.label, &role.terms).hash(&mut hasher);
        }
    }
    hasher.finish()
}

impl Document {
    /// Start building a document with the given identifier.
    pub fn builder(id: impl Into<String>) -> DocumentBuilder {
        DocumentBuilder::new(id)
    }

    /// Parse a document from its JSON form.
    pub fn from_json(json: &str) -> DocumentResult<Self> {
        serde_json::from_str(json).map_err(|e| DocumentError::Parse {
            message: e.to_string(),
        })
    }

    /// Load a JSON document from disk.
    pub fn read_from(path: &Path) -> DocumentResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Stable identifier (URI) of the document.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Content hash distinguishing documents that share an id.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn term(&self, id: TermId) -> &Term {
        &self.terms[id.0]
    }

    /// Look up a term, returning `None` for out-of-range ids.
    pub fn get(&self, id: TermId) -> Option<&Term> {
        self.terms.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Identifiers of all sentences, ascending.
    pub fn sentences(&self) -> impl Iterator<Item = u32> + '_ {
        self.sentences.keys().copied()
    }

    /// Terms of a sentence in document order.
    pub fn sentence_terms(&self, sentence: u32) -> &[TermId] {
        self.sentences
            .get(&sentence)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn deps(&self) -> &[Dep] {
        &self.deps
    }

    /// Outgoing dependency edges of a term.
    pub fn deps_from(&self, term: TermId) -> impl Iterator<Item = &Dep> + '_ {
        self.deps_from
            .get(term.0)
            .into_iter()
            .flatten()
            .map(move |&i| &self.deps[i])
    }

    /// The incoming dependency edge of a term, if any.
    pub fn dep_to(&self, term: TermId) -> Option<&Dep> {
        self.dep_to
            .get(term.0)
            .copied()
            .flatten()
            .map(|i| &self.deps[i])
    }

    /// Incoming and outgoing edges of a term.
    pub fn deps_of(&self, term: TermId) -> impl Iterator<Item = &Dep> + '_ {
        self.dep_to(term).into_iter().chain(self.deps_from(term))
    }

    /// Dependency edges whose target lies in the given sentence.
    pub fn sentence_deps(&self, sentence: u32) -> impl Iterator<Item = &Dep> + '_ {
        self.sentence_terms(sentence)
            .iter()
            .filter_map(move |&t| self.dep_to(t))
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Predicates whose span contains the term.
    pub fn predicates_by_term(&self, term: TermId) -> impl Iterator<Item = &Predicate> + '_ {
        self.predicates_by_term
            .get(&term)
            .into_iter()
            .flatten()
            .map(move |&i| &self.predicates[i])
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Entity mentions containing the term.
    pub fn entities_by_term(&self, term: TermId) -> impl Iterator<Item = &Entity> + '_ {
        self.entities_by_term
            .get(&term)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entities[i])
    }

    /// Space-joined surface strings of the given terms.
    pub fn text_of(&self, terms: &[TermId]) -> String {
        terms
            .iter()
            .map(|&t| self.term(t).text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TryFrom<DocumentData> for Document {
    type Error = DocumentError;

    fn try_from(data: DocumentData) -> DocumentResult<Self> {
        let len = data.terms.len();
        let check = |t: TermId| {
            if t.0 < len {
                Ok(())
            } else {
                Err(DocumentError::UnknownTerm { index: t.0, len })
            }
        };

        // Terms must be in document order.
        for (i, pair) in data.terms.windows(2).enumerate() {
            if pair[1].offset < pair[0].offset {
                return Err(DocumentError::OutOfOrder {
                    index: i + 1,
                    offset: pair[1].offset,
                    previous: pair[0].offset,
                });
            }
        }

        let mut deps_from = vec![Vec::new(); len];
        let mut dep_to = vec![None; len];
        for (i, dep) in data.deps.iter().enumerate() {
            check(dep.from)?;
            check(dep.to)?;
            if data.terms[dep.from.0].sentence != data.terms[dep.to.0].sentence {
                return Err(DocumentError::CrossSentence {
                    from: dep.from.0,
                    to: dep.to.0,
                });
            }
            if dep_to[dep.to.0].replace(i).is_some() {
                return Err(DocumentError::MultipleHeads { index: dep.to.0 });
            }
            deps_from[dep.from.0].push(i);
        }

        // Every upward walk must terminate.
        for start in 0..len {
            let mut current = start;
            let mut steps = 0;
            while let Some(i) = dep_to[current] {
                current = data.deps[i].from.0;
                steps += 1;
                if steps > len {
                    return Err(DocumentError::Cycle { index: start });
                }
            }
        }

        let mut predicates_by_term: HashMap<TermId, Vec<usize>> = HashMap::new();
        for (i, predicate) in data.predicates.iter().enumerate() {
            for &t in &predicate.terms {
                check(t)?;
                predicates_by_term.entry(t).or_default().push(i);
            }
            for role in &predicate.roles {
                role.terms.iter().try_for_each(|&t| check(t))?;
            }
        }

        let mut entities_by_term: HashMap<TermId, Vec<usize>> = HashMap::new();
        for (i, entity) in data.entities.iter().enumerate() {
            for &t in &entity.terms {
                check(t)?;
                entities_by_term.entry(t).or_default().push(i);
            }
        }

        let mut sentences: BTreeMap<u32, Vec<TermId>> = BTreeMap::new();
        for (i, term) in data.terms.iter().enumerate() {
            sentences.entry(term.sentence).or_default().push(TermId(i));
        }

        let fingerprint = content_fingerprint(&data);
        Ok(Self {
            id: data.id,
            terms: data.terms,
            deps: data.deps,
            predicates: data.predicates,
            entities: data.entities,
            deps_from,
            dep_to,
            sentences,
            predicates_by_term,
            entities_by_term,
            fingerprint,
        })
    }
}

impl From<Document> for DocumentData {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            terms: document.terms,
            deps: document.deps,
            predicates: document.predicates,
            entities: document.entities,
        }
    }
}

/// Incremental document construction, mostly for tests and adapters.
///
/// Terms are appended to the current sentence with offsets computed from the
/// previous term (single space separation).
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    data: DocumentData,
    sentence: u32,
    next_offset: usize,
}

impl DocumentBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            data: DocumentData {
                id: id.into(),
                terms: Vec::new(),
                deps: Vec::new(),
                predicates: Vec::new(),
                entities: Vec::new(),
            },
            sentence: 0,
            next_offset: 0,
        }
    }

    /// Start a new sentence; subsequent terms belong to it.
    pub fn sentence(&mut self) -> &mut Self {
        if self
            .data
            .terms
            .last()
            .is_some_and(|t| t.sentence == self.sentence)
        {
            self.sentence += 1;
        }
        self
    }

    /// Append a term to the current sentence.
    pub fn term(&mut self, text: &str, lemma: &str, pos: &str, morphofeat: &str) -> TermId {
        let id = TermId(self.data.terms.len());
        let length = text.chars().count();
        self.data.terms.push(Term {
            text: text.to_string(),
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            morphofeat: morphofeat.to_string(),
            offset: self.next_offset,
            length,
            sentence: self.sentence,
            refs: Vec::new(),
        });
        self.next_offset += length + 1;
        id
    }

    /// Attach an external reference to a previously added term.
    pub fn term_ref(&mut self, term: TermId, resource: &str, reference: &str) -> &mut Self {
        if let Some(t) = self.data.terms.get_mut(term.0) {
            t.refs.push(ExternalRef {
                resource: resource.to_string(),
                reference: reference.to_string(),
            });
        }
        self
    }

    pub fn dep(&mut self, from: TermId, to: TermId, func: &str) -> &mut Self {
        self.data.deps.push(Dep {
            from,
            to,
            func: func.to_string(),
        });
        self
    }

    /// Add a predicate spanning `terms` with `(label, role terms)` roles.
    pub fn predicate(&mut self, terms: &[TermId], roles: &[(&str, &[TermId])]) -> &mut Self {
        self.data.predicates.push(Predicate {
            terms: terms.to_vec(),
            roles: roles
                .iter()
                .map(|(label, terms)| Role {
                    label: label.to_string(),
                    terms: terms.to_vec(),
                })
                .collect(),
        });
        self
    }

    pub fn entity(&mut self, terms: &[TermId], kind: Option<&str>) -> &mut Self {
        self.data.entities.push(Entity {
            terms: terms.to_vec(),
            kind: kind.map(str::to_string),
        });
        self
    }

    /// Validate and index the document.
    pub fn build(self) -> DocumentResult<Document> {
        Document::try_from(self.data)
    }
}
