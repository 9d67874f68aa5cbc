//! L2-regularised logistic regression trained by stochastic gradient descent.

use std::collections::BTreeMap;
use std::path::Path;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, ClassifierResult, ModelError, ModelResult};
use crate::features::{FeatureVector, LabeledVector, SELECTED};

use super::{Classifier, Model, Parameters, Prediction};

const LEARNING_RATE: f32 = 0.1;
const DECAY: f32 = 0.05;
const TOLERANCE: f64 = 1e-4;
const SHUFFLE_SEED: u64 = 0x5eed_0a7c;
/// Weights smaller than this are dropped from the trained model.
const PRUNE: f32 = 1e-6;

/// Binary logistic regression over sparse named features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    parameters: Parameters,
    bias: f32,
    weights: BTreeMap<String, f32>,
}

impl LogisticModel {
    /// Build a model from explicit weights.
    pub fn from_weights(
        parameters: Parameters,
        bias: f32,
        weights: impl IntoIterator<Item = (String, f32)>,
    ) -> Self {
        Self {
            parameters,
            bias,
            weights: weights.into_iter().collect(),
        }
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn weight(&self, feature: &str) -> f32 {
        self.weights.get(feature).copied().unwrap_or(0.0)
    }

    /// Number of non-zero weights.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    fn score(&self, vector: &FeatureVector) -> f32 {
        vector
            .learnable()
            .map(|(name, value)| self.weight(name) * value)
            .sum::<f32>()
            + self.bias
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticModel {
    fn predict(&self, vector: &FeatureVector) -> Prediction {
        let probability = sigmoid(self.score(vector));
        Prediction {
            label: u8::from(probability >= 0.5),
            probability,
        }
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

impl Model for LogisticModel {
    fn fit(
        parameters: &Parameters,
        examples: &[LabeledVector],
        max_iterations: usize,
    ) -> ClassifierResult<Self> {
        parameters.validate()?;
        if examples.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet);
        }

        // Intern feature names so the inner loop works on dense indexes.
        let mut vocabulary: BTreeMap<&str, usize> = BTreeMap::new();
        let rows: Vec<(Vec<(usize, f32)>, u8)> = examples
            .iter()
            .map(|example| {
                let features = example
                    .vector
                    .learnable()
                    .map(|(name, value)| {
                        let next = vocabulary.len();
                        (*vocabulary.entry(name).or_insert(next), value)
                    })
                    .collect();
                (features, example.label.min(1))
            })
            .collect();

        let n = rows.len();
        let lambda = 1.0 / (parameters.c * n as f32);
        let mut weights = vec![0.0f32; vocabulary.len()];
        let mut bias = 0.0f32;
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(SHUFFLE_SEED);
        let mut previous = f64::INFINITY;

        for epoch in 0..max_iterations.max(1) {
            order.shuffle(&mut rng);
            let rate = LEARNING_RATE / (1.0 + DECAY * epoch as f32);
            let mut loss = 0.0f64;
            for &i in &order {
                let (features, label) = &rows[i];
                let z = bias + features.iter().map(|&(f, v)| weights[f] * v).sum::<f32>();
                let p = sigmoid(z);
                let y = f32::from(*label);
                let class_weight = parameters.weights[usize::from(*label)];
                let gradient = (p - y) * class_weight;
                for &(f, v) in features {
                    weights[f] -= rate * (gradient * v + lambda * weights[f]);
                }
                bias -= rate * gradient;
                let likelihood = if *label == SELECTED { p } else { 1.0 - p };
                loss -= f64::from(class_weight) * f64::from(likelihood.max(1e-7)).ln();
            }
            let loss = loss / n as f64;
            if previous.is_finite() && (previous - loss).abs() <= TOLERANCE * previous.max(1.0) {
                tracing::trace!(epoch, loss, "logistic regression converged");
                break;
            }
            previous = loss;
        }

        let weights = vocabulary
            .into_iter()
            .map(|(name, index)| (name.to_string(), weights[index]))
            .filter(|(_, w)| w.abs() > PRUNE)
            .collect();
        Ok(Self {
            parameters: *parameters,
            bias,
            weights,
        })
    }

    fn read_from(path: &Path) -> ModelResult<Self> {
        if !path.exists() {
            return Err(ModelError::MissingPath {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| ModelError::Serialization {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn write_to(&self, path: &Path) -> ModelResult<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ModelError::Serialization {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        std::fs::write(path, content).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::UNSELECTED;

    fn example(features: &[&str], label: u8) -> LabeledVector {
        let mut b = FeatureVector::builder();
        b.set("_cluster.doc");
        for f in features {
            b.set(*f);
        }
        b.build().label(label)
    }

    fn separable() -> Vec<LabeledVector> {
        let mut examples = Vec::new();
        for _ in 0..10 {
            examples.push(example(&["node.named", "path.sbjD"], SELECTED));
            examples.push(example(&["node.pos.NN", "path.objD"], UNSELECTED));
            examples.push(example(&["node.pos.RB", "path.advD"], UNSELECTED));
        }
        examples
    }

    #[test]
    fn learns_separable_data() {
        let model = LogisticModel::fit(&Parameters::default(), &separable(), 200).unwrap();
        let positive = model.predict(&example(&["node.named", "path.sbjD"], 0).vector);
        let negative = model.predict(&example(&["node.pos.NN", "path.objD"], 0).vector);
        assert_eq!(positive.label, SELECTED);
        assert!(positive.probability > 0.5);
        assert_eq!(negative.label, UNSELECTED);
        assert!(negative.probability < 0.5);
        assert_eq!(model.weight("_cluster.doc"), 0.0);
    }

    #[test]
    fn training_is_deterministic() {
        let a = LogisticModel::fit(&Parameters::default(), &separable(), 50).unwrap();
        let b = LogisticModel::fit(&Parameters::default(), &separable(), 50).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_empty_and_invalid_input() {
        assert!(matches!(
            LogisticModel::fit(&Parameters::default(), &[], 10),
            Err(ClassifierError::EmptyTrainingSet)
        ));
        let bad = Parameters::new([1.0, 1.0], -1.0);
        assert!(matches!(
            LogisticModel::fit(&bad, &separable(), 10),
            Err(ClassifierError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn hand_built_model_predicts_from_weights() {
        let model = LogisticModel::from_weights(
            Parameters::default(),
            -2.5,
            [("node.named".to_string(), 5.0)],
        );
        let p = model.predict(&example(&["node.named"], 0).vector);
        assert_eq!(p.label, SELECTED);
        assert!((p.probability - sigmoid(2.5)).abs() < 1e-6);
        assert_eq!(model.predict(&example(&[], 0).vector).label, UNSELECTED);
    }

    #[test]
    fn missing_model_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = LogisticModel::read_from(&dir.path().join("model")).unwrap_err();
        assert!(matches!(err, ModelError::MissingPath { .. }));
    }
}
