//! Mapping import names and installed distribution names onto one canonical
//! spelling.
//!
//! Normalization is two steps: every `_` becomes `-`, then the result is
//! looked up in an [`AliasTable`] that resolves known import/distribution
//! mismatches (`cv2` is published as `opencv-python-headless`). Case is
//! preserved; names are compared as exact strings afterwards.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::snapshot::EnvironmentSnapshot;

/// Import names whose distribution is published under a different name.
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("cv2", "opencv-python-headless"),
    ("sklearn", "scikit-learn"),
];

pub fn hyphenate(name: &str) -> String {
    name.replace('_', "-")
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AliasError {
    #[error("alias names must not be empty")]
    Empty,
    #[error("alias `{key}` -> `{target}` would chain through `{via}`")]
    Chained {
        key: String,
        target: String,
        via: String,
    },
}

/// Alias entries keyed and valued by their hyphenated form. Chains are
/// rejected on insert so that normalizing twice never moves a name again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_ALIASES
                .iter()
                .map(|(key, target)| (hyphenate(key), hyphenate(target)))
                .collect(),
        }
    }

    /// Adds or replaces an alias, returning the previous target for `key`.
    pub fn insert(&mut self, key: &str, target: &str) -> Result<Option<String>, AliasError> {
        let key = hyphenate(key.trim());
        let target = hyphenate(target.trim());
        if key.is_empty() || target.is_empty() {
            return Err(AliasError::Empty);
        }
        if key != target {
            if let Some(next) = self.entries.get(&target) {
                if *next != target {
                    return Err(AliasError::Chained {
                        key,
                        target: target.clone(),
                        via: target,
                    });
                }
            }
            if let Some((source, _)) = self
                .entries
                .iter()
                .find(|(source, existing)| **existing == key && **source != key)
            {
                return Err(AliasError::Chained {
                    key: source.clone(),
                    target,
                    via: key,
                });
            }
        }
        Ok(self.entries.insert(key, target))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, target)| (key.as_str(), target.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameNormalizer {
    aliases: AliasTable,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new(AliasTable::builtin())
    }
}

impl NameNormalizer {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn normalize(&self, name: &str) -> String {
        let hyphenated = hyphenate(name);
        match self.aliases.get(&hyphenated) {
            Some(target) => target.to_string(),
            None => hyphenated,
        }
    }
}

/// Distinct installed names sharing one canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCollision {
    pub canonical: String,
    pub names: Vec<String>,
}

/// Groups installed records whose names normalize identically. Each record is
/// still classified on its own; this only surfaces the ambiguity.
pub fn find_collisions(
    snapshot: &EnvironmentSnapshot,
    normalizer: &NameNormalizer,
) -> Vec<NameCollision> {
    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for record in snapshot {
        groups
            .entry(normalizer.normalize(record.name()))
            .or_default()
            .push(record.name().to_string());
    }
    groups
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(canonical, names)| NameCollision { canonical, names })
        .collect()
}
