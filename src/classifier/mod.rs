//! Binary classifier boundary: prediction, grid-search training and
//! cluster-aware cross-validation.
//!
//! The labellers depend only on [`Classifier`] for prediction and on
//! [`Model`] for fitting and persistence; [`LogisticModel`] is the bundled
//! learner.

pub mod eval;
pub mod logistic;
pub mod stats;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, ClassifierResult, ModelResult};
use crate::features::{FeatureVector, LabeledVector};

pub use eval::{ConfusionMatrix, Measure, PrecisionRecall, SetPrecisionRecall};
pub use logistic::LogisticModel;

/// Class-weight ratios crossed with every model grid.
pub const CLASS_WEIGHT_RATIOS: [f32; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];

/// Multiplicative spread of [`Parameters::grid`].
pub const GRID_FACTOR: f32 = 10.0;

/// Maximum training epochs used by the labeller trainers.
pub const MAX_ITERATIONS: usize = 1000;

/// Folds used for cross-validation.
pub const FOLDS: usize = 5;

/// Learner hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Inverse regularisation strength.
    pub c: f32,
    /// Loss weight of each class, indexed by label.
    pub weights: [f32; 2],
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            c: 1.0,
            weights: [1.0, 1.0],
        }
    }
}

impl Parameters {
    pub fn new(weights: [f32; 2], c: f32) -> Self {
        Self { c, weights }
    }

    pub fn validate(&self) -> ClassifierResult<()> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.c) && self.weights.iter().copied().all(ok) {
            Ok(())
        } else {
            Err(ClassifierError::InvalidParameters {
                message: format!("c={} weights={:?}", self.c, self.weights),
            })
        }
    }

    /// `size` values of `c` spread geometrically over `[c / factor, c * factor]`.
    ///
    /// A size of 0 or 1 yields these parameters alone.
    pub fn grid(&self, size: usize, factor: f32) -> Vec<Parameters> {
        if size <= 1 {
            return vec![*self];
        }
        let low = (self.c / factor).ln();
        let high = (self.c * factor).ln();
        (0..size)
            .map(|i| {
                let t = i as f32 / (size - 1) as f32;
                Parameters {
                    c: (low + t * (high - low)).exp(),
                    weights: self.weights,
                }
            })
            .collect()
    }

    /// The default labeller grid: class-weight ratios crossed with a `c` sweep.
    pub fn labeller_grid(size: usize) -> Vec<Parameters> {
        CLASS_WEIGHT_RATIOS
            .iter()
            .flat_map(|&w| Parameters::new([1.0, w], 1.0).grid(size.max(1), GRID_FACTOR))
            .collect()
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "c={:.4} weights=[{}, {}]",
            self.c, self.weights[0], self.weights[1]
        )
    }
}

/// Predicted label with the probability of label 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: u8,
    pub probability: f32,
}

/// A trained binary classifier.
pub trait Classifier: Send + Sync {
    fn predict(&self, vector: &FeatureVector) -> Prediction;

    fn parameters(&self) -> &Parameters;
}

/// A classifier that can be fitted and persisted.
pub trait Model: Classifier + Sized {
    fn fit(
        parameters: &Parameters,
        examples: &[LabeledVector],
        max_iterations: usize,
    ) -> ClassifierResult<Self>;

    fn read_from(path: &Path) -> ModelResult<Self>;

    fn write_to(&self, path: &Path) -> ModelResult<()>;
}

/// Model-selection criterion: a measure on one label's precision/recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criterion {
    pub measure: Measure,
    pub label: u8,
}

impl Criterion {
    /// F1 of the given label.
    pub fn f1(label: u8) -> Self {
        Self {
            measure: Measure::F1,
            label,
        }
    }

    pub fn score(&self, matrix: &ConfusionMatrix) -> f64 {
        matrix.precision_recall(self.label).measure(self.measure)
    }
}

/// Confusion matrix of a classifier over labelled examples.
pub fn evaluate<C: Classifier>(classifier: &C, examples: &[LabeledVector]) -> ConfusionMatrix {
    let mut matrix = ConfusionMatrix::default();
    for example in examples {
        matrix.add(example.label, classifier.predict(&example.vector).label);
    }
    matrix
}

/// Fold of every example.
///
/// Examples of the same `_cluster` share a fold. With fewer clusters than
/// folds, examples are spread round-robin instead.
fn assign_folds(examples: &[LabeledVector], folds: usize) -> Vec<usize> {
    let clusters: BTreeSet<Option<&str>> = examples.iter().map(|e| e.vector.cluster()).collect();
    if clusters.len() < folds {
        return (0..examples.len()).map(|i| i % folds).collect();
    }
    let index: BTreeMap<Option<&str>, usize> = clusters
        .into_iter()
        .enumerate()
        .map(|(i, c)| (c, i % folds))
        .collect();
    examples
        .iter()
        .map(|e| index[&e.vector.cluster()])
        .collect()
}

/// k-fold cross-validation of one parameter setting.
///
/// Folds whose training part is empty or single-class are skipped.
pub fn cross_validate<M: Model>(
    parameters: &Parameters,
    examples: &[LabeledVector],
    folds: usize,
    max_iterations: usize,
) -> ClassifierResult<ConfusionMatrix> {
    let folds = folds.max(2);
    let assignment = assign_folds(examples, folds);
    let mut matrix = ConfusionMatrix::default();
    for fold in 0..folds {
        let (test, train): (Vec<_>, Vec<_>) = examples
            .iter()
            .zip(&assignment)
            .partition(|&(_, &f)| f == fold);
        let test: Vec<LabeledVector> = test.into_iter().map(|(e, _)| e.clone()).collect();
        let train: Vec<LabeledVector> = train.into_iter().map(|(e, _)| e.clone()).collect();
        if test.is_empty() || single_label(&train).is_some() || train.is_empty() {
            continue;
        }
        let model = M::fit(parameters, &train, max_iterations)?;
        matrix += evaluate(&model, &test);
    }
    Ok(matrix)
}

/// The only label of a non-empty single-class set.
fn single_label(examples: &[LabeledVector]) -> Option<u8> {
    let first = examples.first()?.label;
    examples.iter().all(|e| e.label == first).then_some(first)
}

/// Select the best parameters by cross-validation, then refit on all examples.
///
/// Grid points are evaluated in parallel; ties go to the earliest point.
pub fn train<M: Model>(
    grid: &[Parameters],
    examples: &[LabeledVector],
    criterion: Criterion,
    max_iterations: usize,
) -> ClassifierResult<M> {
    if grid.is_empty() {
        return Err(ClassifierError::EmptyGrid);
    }
    if examples.is_empty() {
        return Err(ClassifierError::EmptyTrainingSet);
    }
    if let Some(label) = single_label(examples) {
        return Err(ClassifierError::SingleClass { label });
    }

    let best = if grid.len() == 1 {
        grid[0]
    } else {
        let scores: Vec<(usize, f64)> = grid
            .par_iter()
            .enumerate()
            .map(|(i, parameters)| {
                cross_validate::<M>(parameters, examples, FOLDS, max_iterations)
                    .map(|matrix| (i, criterion.score(&matrix)))
            })
            .collect::<ClassifierResult<_>>()?;
        let (index, score) = scores
            .into_iter()
            .fold((0, f64::NEG_INFINITY), |best, current| {
                if current.1 > best.1 { current } else { best }
            });
        tracing::debug!(grid = grid.len(), score, "grid search done");
        grid[index]
    };

    M::fit(&best, examples, max_iterations)
}

/// Number of features listed by the training-set analysis.
const ANALYSIS_TOP_FEATURES: usize = 30;

/// Train a labeller model over [`Parameters::labeller_grid`], selecting by
/// positive-class F1, with optional feature and cross-validation reports.
pub fn train_labeller<M: Model>(
    examples: &[LabeledVector],
    grid_size: usize,
    analyze: bool,
) -> ClassifierResult<M> {
    if analyze {
        let stats = stats::feature_stats(examples);
        tracing::info!(
            "feature analysis (top {ANALYSIS_TOP_FEATURES} features):\n{}",
            stats::format_top(&stats, ANALYSIS_TOP_FEATURES)
        );
    }

    let grid = Parameters::labeller_grid(grid_size);
    tracing::info!(examples = examples.len(), grid = grid.len(), "training classifier");
    let model: M = train(&grid, examples, Criterion::f1(1), MAX_ITERATIONS)?;
    tracing::info!(parameters = %model.parameters(), "best classifier parameters");

    if analyze {
        tracing::info!("performance on training set:\n{}", evaluate(&model, examples));
        let cv = cross_validate::<M>(model.parameters(), examples, FOLDS, MAX_ITERATIONS)?;
        tracing::info!("{FOLDS}-fold cross-validation performance:\n{cv}");
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{SELECTED, UNSELECTED};

    fn example(doc: usize, features: &[&str], label: u8) -> LabeledVector {
        let mut b = FeatureVector::builder();
        b.set(format!("_cluster.doc{doc}"));
        for f in features {
            b.set(*f);
        }
        b.build().label(label)
    }

    fn corpus() -> Vec<LabeledVector> {
        (0..10)
            .flat_map(|doc| {
                [
                    example(doc, &["node.named"], SELECTED),
                    example(doc, &["node.pos.NN"], UNSELECTED),
                    example(doc, &["node.pos.RB"], UNSELECTED),
                ]
            })
            .collect()
    }

    #[test]
    fn grid_is_geometric() {
        let grid = Parameters::default().grid(3, 10.0);
        assert_eq!(grid.len(), 3);
        assert!((grid[0].c - 0.1).abs() < 1e-4);
        assert!((grid[1].c - 1.0).abs() < 1e-4);
        assert!((grid[2].c - 10.0).abs() < 1e-3);
        assert_eq!(Parameters::default().grid(0, 10.0), vec![Parameters::default()]);
        assert_eq!(Parameters::labeller_grid(2).len(), 10);
    }

    #[test]
    fn folds_follow_clusters() {
        let examples = corpus();
        let folds = assign_folds(&examples, 5);
        for chunk in folds.chunks(3) {
            assert!(chunk.iter().all(|&f| f == chunk[0]));
        }
    }

    #[test]
    fn train_selects_and_refits() {
        let grid = Parameters::labeller_grid(2);
        let model: LogisticModel = train(&grid, &corpus(), Criterion::f1(1), 100).unwrap();
        assert!(grid.contains(model.parameters()));
        let matrix = evaluate(&model, &corpus());
        assert_eq!(matrix.precision_recall(1).f1(), 1.0);
    }

    #[test]
    fn train_rejects_degenerate_sets() {
        let grid = vec![Parameters::default()];
        let only_negative = vec![example(0, &["x"], UNSELECTED)];
        assert!(matches!(
            train::<LogisticModel>(&grid, &only_negative, Criterion::f1(1), 10),
            Err(ClassifierError::SingleClass { label: 0 })
        ));
        assert!(matches!(
            train::<LogisticModel>(&[], &corpus(), Criterion::f1(1), 10),
            Err(ClassifierError::EmptyGrid)
        ));
    }

    #[test]
    fn cross_validation_covers_every_example() {
        let matrix =
            cross_validate::<LogisticModel>(&Parameters::default(), &corpus(), 5, 50).unwrap();
        assert_eq!(matrix.total(), 30);
    }
}
