//! Link labelling: which candidate terms are arguments of an expression root.

pub mod candidates;
pub mod features;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::classifier::{self, Classifier, LogisticModel, Model, PrecisionRecall};
use crate::document::{Document, TermId};
use crate::error::{ClassifierResult, ModelError, ModelResult};
use crate::features::{LabeledVector, SELECTED, UNSELECTED};
use crate::properties::Properties;

pub use candidates::candidates;
pub use features::{link_features, simplified_path_label};

/// File holding the classifier inside a labeller directory.
pub const MODEL_FILE: &str = "model";

/// File holding labeller settings inside a labeller directory.
pub const PROPERTIES_FILE: &str = "properties";

const POS_PROPERTY: &str = "pos";

/// Scores candidate terms of an expression root.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkLabeller<C = LogisticModel> {
    classifier: C,
    pos_prefixes: Option<Vec<String>>,
}

impl<C: Classifier> LinkLabeller<C> {
    pub fn new(classifier: C, pos_prefixes: Option<Vec<String>>) -> Self {
        Self {
            classifier,
            pos_prefixes,
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Extended POS prefixes candidates must match, if restricted.
    pub fn pos_prefixes(&self) -> Option<&[String]> {
        self.pos_prefixes.as_deref()
    }

    pub fn candidates(&self, doc: &Document, root: TermId) -> Vec<TermId> {
        candidates(doc, root, self.pos_prefixes())
    }

    /// Probability of every candidate the classifier selects.
    pub fn label(&self, doc: &Document, root: TermId) -> BTreeMap<TermId, f32> {
        self.candidates(doc, root)
            .into_iter()
            .filter_map(|term| {
                let prediction = self.classifier.predict(&link_features(doc, root, term));
                (prediction.label == SELECTED).then_some((term, prediction.probability))
            })
            .collect()
    }
}

impl<C: Model> LinkLabeller<C> {
    /// Load a labeller directory holding `model` and `properties`.
    pub fn read_from(dir: &Path) -> ModelResult<Self> {
        let classifier = C::read_from(&dir.join(MODEL_FILE))?;
        let properties = Properties::read_from(&dir.join(PROPERTIES_FILE))?;
        let pos_prefixes = properties.get(POS_PROPERTY).map(|pos| {
            pos.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        });
        Ok(Self::new(classifier, pos_prefixes))
    }

    pub fn write_to(&self, dir: &Path) -> ModelResult<()> {
        std::fs::create_dir_all(dir).map_err(|e| ModelError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        self.classifier.write_to(&dir.join(MODEL_FILE))?;
        let mut properties = Properties::new();
        if let Some(prefixes) = &self.pos_prefixes {
            properties.set(POS_PROPERTY, prefixes.join(","));
        }
        properties.write_to(&dir.join(PROPERTIES_FILE))
    }
}

/// Collects link-labelling examples from gold arguments.
#[derive(Debug, Clone, Default)]
pub struct LinkTrainer {
    examples: Vec<LabeledVector>,
    coverage: PrecisionRecall,
    pos_prefixes: Option<Vec<String>>,
}

impl LinkTrainer {
    pub fn new(pos_prefixes: Option<Vec<String>>) -> Self {
        Self {
            pos_prefixes,
            ..Self::default()
        }
    }

    /// Add one example per candidate of `root`, labelled by membership in `gold`.
    pub fn add(&mut self, doc: &Document, root: TermId, gold: &[TermId]) {
        let gold: BTreeSet<TermId> = gold.iter().copied().collect();
        let found = candidates(doc, root, self.pos_prefixes.as_deref());
        let mut reached = 0u64;
        for &term in &found {
            let label = if gold.contains(&term) {
                reached += 1;
                SELECTED
            } else {
                UNSELECTED
            };
            self.examples.push(link_features(doc, root, term).label(label));
        }

        if gold.is_empty() {
            return;
        }
        let missed = gold.len() as u64 - reached;
        self.coverage.add(reached, 0, missed);
        if missed > 0 {
            let missing: Vec<String> = gold
                .iter()
                .filter(|&&t| !found.contains(&t))
                .map(|&t| doc.term(t).text.clone())
                .collect();
            tracing::debug!(
                ?missing,
                root = %doc.term(root).text,
                sentence = %doc.text_of(doc.sentence_terms(doc.term(root).sentence)),
                "gold arguments unreachable as candidates"
            );
        }
    }

    /// Upper bound on recall imposed by candidate selection.
    pub fn coverage(&self) -> PrecisionRecall {
        self.coverage
    }

    pub fn examples(&self) -> &[LabeledVector] {
        &self.examples
    }

    /// Train the classifier and build the labeller.
    pub fn finish<M: Model>(
        self,
        grid_size: usize,
        analyze: bool,
    ) -> ClassifierResult<LinkLabeller<M>> {
        tracing::info!(
            coverage = %self.coverage,
            "maximum achievable performance given candidate selection"
        );
        let model = classifier::train_labeller::<M>(&self.examples, grid_size, analyze)?;
        Ok(LinkLabeller::new(model, self.pos_prefixes))
    }
}
