//! Sparse named feature vectors.
//!
//! Keys starting with `_` are bookkeeping: `_cluster.<doc-id>` groups vectors
//! of one document for cross-validation and `_index` carries a term index.
//! Learners skip them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Label of a positive example.
pub const SELECTED: u8 = 1;

/// Label of a negative example.
pub const UNSELECTED: u8 = 0;

/// Prefix of the cross-validation grouping key.
pub const CLUSTER_PREFIX: &str = "_cluster.";

/// Key holding the term index of span vectors.
pub const INDEX_KEY: &str = "_index";

/// Mapping from feature name to value; boolean features have value 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<String, f32>,
}

impl FeatureVector {
    pub fn builder() -> FeatureBuilder {
        FeatureBuilder::default()
    }

    /// Value of a feature, 0 when absent.
    pub fn get(&self, name: &str) -> f32 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Non-zero features visible to learners.
    pub fn learnable(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.iter()
            .filter(|(name, value)| !name.starts_with('_') && *value != 0.0)
    }

    /// Cross-validation group of the vector.
    pub fn cluster(&self) -> Option<&str> {
        self.values
            .keys()
            .find_map(|k| k.strip_prefix(CLUSTER_PREFIX))
    }

    /// Term index recorded in the vector.
    pub fn index(&self) -> Option<usize> {
        self.values.get(INDEX_KEY).map(|&v| v as usize)
    }

    pub fn label(self, label: u8) -> LabeledVector {
        LabeledVector {
            vector: self,
            label,
        }
    }
}

/// Accumulates features; later writes to the same name overwrite earlier ones.
#[derive(Debug, Default)]
pub struct FeatureBuilder {
    values: BTreeMap<String, f32>,
}

impl FeatureBuilder {
    /// Set a boolean feature.
    pub fn set(&mut self, name: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), 1.0);
        self
    }

    /// Set a boolean feature only when `present` holds.
    pub fn set_if(&mut self, name: impl Into<String>, present: bool) -> &mut Self {
        if present {
            self.set(name);
        }
        self
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: f32) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Set `prefix + suffix` for every suffix.
    pub fn set_all<I, S>(&mut self, prefix: &str, suffixes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for suffix in suffixes {
            self.set(format!("{prefix}{}", suffix.as_ref()));
        }
        self
    }

    pub fn build(self) -> FeatureVector {
        FeatureVector {
            values: self.values,
        }
    }
}

/// Feature vector with a binary label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledVector {
    pub vector: FeatureVector,
    pub label: u8,
}
