use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use pep508_rs::{Requirement as PepRequirement, VersionOrUrl};
use serde::{Deserialize, Serialize};

/// Distributions `pip freeze` leaves out unless `--all` is passed.
pub const FREEZE_SKIP: &[&str] = &["pip", "setuptools", "wheel", "distribute"];

/// A distribution present in the queried environment, pinned to the version
/// it had when the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRecord {
    name: String,
    version: String,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Name as the environment reported it (case and separators untouched).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn pin(&self) -> String {
        format!("{}=={}", self.name, self.version)
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// PEP 503 style comparison key. Only used to match skip lists, never for
/// classification.
pub fn canonical_dist_name(name: &str) -> String {
    name.to_ascii_lowercase().replace(['_', '.'], "-")
}

/// Installed set captured once per run and passed by reference through the
/// pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentSnapshot {
    records: Vec<PackageRecord>,
}

impl EnvironmentSnapshot {
    /// Keeps the first record seen for each exact name, in input order.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PackageRecord>,
    {
        let mut unique: IndexMap<String, PackageRecord> = IndexMap::new();
        for record in records {
            unique.entry(record.name.clone()).or_insert(record);
        }
        Self {
            records: unique.into_values().collect(),
        }
    }

    /// Orders records the way `pip freeze` lists them.
    #[must_use]
    pub fn sorted_by_name(mut self) -> Self {
        self.records.sort_by(|left, right| {
            left.name
                .to_ascii_lowercase()
                .cmp(&right.name.to_ascii_lowercase())
        });
        self
    }

    /// Splits off every record whose canonical name appears in `skip`.
    #[must_use]
    pub fn without(self, skip: &[String]) -> (Self, Vec<PackageRecord>) {
        if skip.is_empty() {
            return (self, Vec::new());
        }
        let skip: HashSet<String> = skip.iter().map(|name| canonical_dist_name(name)).collect();
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .records
            .into_iter()
            .partition(|record| skip.contains(&canonical_dist_name(&record.name)));
        (Self { records: kept }, removed)
    }

    pub fn records(&self) -> &[PackageRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PackageRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One `name==version` line per record.
    pub fn to_freeze_listing(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.pin());
            out.push('\n');
        }
        out
    }
}

impl<'a> IntoIterator for &'a EnvironmentSnapshot {
    type Item = &'a PackageRecord;
    type IntoIter = std::slice::Iter<'a, PackageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum FreezeLineError {
    #[error("pip option lines do not name an installed distribution")]
    OptionLine,
    #[error("direct reference to `{0}` carries no version pin")]
    DirectReference(String),
    #[error("`{0}` is not pinned to an exact version")]
    Unpinned(String),
    #[error("invalid requirement: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    pub line: usize,
    pub text: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreezeListing {
    pub snapshot: EnvironmentSnapshot,
    pub skipped: Vec<SkippedLine>,
}

/// Parses `pip freeze` output. Lines that do not pin a distribution are
/// reported in `skipped` rather than failing the whole listing.
pub fn parse_freeze(text: &str) -> FreezeListing {
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        match parse_freeze_line(raw) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(err) => skipped.push(SkippedLine {
                line: idx + 1,
                text: raw.trim().to_string(),
                reason: err.to_string(),
            }),
        }
    }
    FreezeListing {
        snapshot: EnvironmentSnapshot::from_records(records),
        skipped,
    }
}

/// Parses a single freeze line. Blank lines and comments yield `Ok(None)`.
pub fn parse_freeze_line(line: &str) -> Result<Option<PackageRecord>, FreezeLineError> {
    let trimmed = strip_comment(line).trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.starts_with('-') {
        return Err(FreezeLineError::OptionLine);
    }
    let name = leading_name(trimmed);
    if name.is_empty() {
        return Err(FreezeLineError::Invalid(trimmed.to_string()));
    }

    match PepRequirement::from_str(trimmed) {
        Ok(req) => match req.version_or_url.as_ref() {
            Some(VersionOrUrl::VersionSpecifier(_)) => raw_pin(trimmed, name)
                .map(|version| Some(PackageRecord::new(name, version)))
                .ok_or_else(|| FreezeLineError::Unpinned(trimmed.to_string())),
            Some(_) => Err(FreezeLineError::DirectReference(name.to_string())),
            None => Err(FreezeLineError::Unpinned(trimmed.to_string())),
        },
        // Legacy versions that PEP 440 rejects still show up in old environments.
        Err(err) => raw_pin(trimmed, name)
            .map(|version| Some(PackageRecord::new(name, version)))
            .ok_or_else(|| FreezeLineError::Invalid(err.to_string())),
    }
}

fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn leading_name(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-')))
        .map_or(line.len(), |(idx, _)| idx);
    &line[..end]
}

/// Version text exactly as written after `==`/`===`, so the snapshot keeps
/// the environment's spelling instead of the PEP 440 normal form.
fn raw_pin<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let head = line.split(';').next().unwrap_or(line);
    let (before, rest) = head.split_once("==")?;
    let before = before.trim();
    if before != name && !(before.starts_with(name) && before.ends_with(']')) {
        return None;
    }
    let version = rest.strip_prefix('=').unwrap_or(rest).trim();
    if version.is_empty()
        || version.contains(|ch: char| {
            ch.is_whitespace() || matches!(ch, ',' | '*' | '<' | '>' | '!' | '~' | '=')
        })
    {
        return None;
    }
    Some(version)
}
