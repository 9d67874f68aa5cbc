//! Flat `key=value` property files used by labeller directories.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ModelError, ModelResult};

/// Ordered key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse property text; `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> ModelResult<Self> {
        let mut entries = BTreeMap::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ModelError::MalformedProperties {
                    path: path.display().to_string(),
                    line: i + 1,
                    content: line.to_string(),
                });
            };
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { entries })
    }

    pub fn read_from(path: &Path) -> ModelResult<Self> {
        if !path.exists() {
            return Err(ModelError::MissingPath {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    pub fn write_to(&self, path: &Path) -> ModelResult<()> {
        let mut content = String::new();
        for (key, value) in &self.entries {
            content.push_str(key);
            content.push('=');
            content.push_str(value);
            content.push('\n');
        }
        std::fs::write(path, content).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }
}
