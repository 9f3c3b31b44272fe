use std::collections::BTreeSet;

use serde::Serialize;

use crate::imports::ImportSet;
use crate::names::NameNormalizer;
use crate::snapshot::{EnvironmentSnapshot, PackageRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    Production,
    Development,
}

/// Installed records split by whether the project imports them. Both sides
/// keep snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub production: Vec<PackageRecord>,
    pub development: Vec<PackageRecord>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.production.len() + self.development.len()
    }

    pub fn is_empty(&self) -> bool {
        self.production.is_empty() && self.development.is_empty()
    }
}

/// Classifies one record against an already-normalized import set.
pub fn classify(
    record: &PackageRecord,
    normalized_imports: &BTreeSet<String>,
    normalizer: &NameNormalizer,
) -> Bucket {
    if normalized_imports.contains(&normalizer.normalize(record.name())) {
        Bucket::Production
    } else {
        Bucket::Development
    }
}

/// Stable partition of the snapshot. Import names with no installed
/// counterpart are never consulted.
pub fn partition(
    snapshot: &EnvironmentSnapshot,
    imports: &ImportSet,
    normalizer: &NameNormalizer,
) -> Partition {
    let wanted = imports.normalized(normalizer);
    let mut out = Partition::default();
    for record in snapshot {
        match classify(record, &wanted, normalizer) {
            Bucket::Production => out.production.push(record.clone()),
            Bucket::Development => out.development.push(record.clone()),
        }
    }
    out
}
