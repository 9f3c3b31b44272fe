use std::fmt;
use std::str::FromStr;

use pep440_rs::Version;
use serde::{Deserialize, Serialize};

use crate::partition::Partition;
use crate::snapshot::PackageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintOp {
    /// `~=`: patch and minor upgrades within the snapshot's major release.
    CompatibleRelease,
    /// `>=`: anything at or above the snapshot version.
    AtLeast,
    /// `==`: the snapshot version only.
    Exact,
}

impl ConstraintOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintOp::CompatibleRelease => "~=",
            ConstraintOp::AtLeast => ">=",
            ConstraintOp::Exact => "==",
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstraintOp {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "~=" | "compatible" | "compatible-release" => Ok(ConstraintOp::CompatibleRelease),
            ">=" | "at-least" | "minimum" => Ok(ConstraintOp::AtLeast),
            "==" | "exact" | "pinned" => Ok(ConstraintOp::Exact),
            other => Err(format!(
                "unknown constraint operator `{other}` (expected `~=`, `>=`, or `==`)"
            )),
        }
    }
}

/// One requirements-file line: `name` followed by its operator and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementEntry {
    pub name: String,
    pub constraint: String,
}

impl fmt::Display for RequirementEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.constraint)
    }
}

/// Loosens a snapshot pin into a requirement under `op`.
pub fn rewrite(record: &PackageRecord, op: ConstraintOp) -> RequirementEntry {
    let version = match op {
        ConstraintOp::Exact => record.version().to_string(),
        ConstraintOp::AtLeast => public_version(record.version()).to_string(),
        ConstraintOp::CompatibleRelease => compatible_base(public_version(record.version())),
    };
    RequirementEntry {
        name: record.name().to_string(),
        constraint: format!("{}{}", op.as_str(), version),
    }
}

/// Local labels (`+cpu`) are not allowed in `~=` or `>=` clauses.
fn public_version(version: &str) -> &str {
    version.split('+').next().unwrap_or(version)
}

/// `~=` needs at least two release segments; `~=N.0` covers the same major.
fn compatible_base(version: &str) -> String {
    match Version::from_str(version) {
        Ok(parsed)
            if parsed.release().len() == 1
                && parsed.pre().is_none()
                && parsed.post().is_none()
                && parsed.dev().is_none() =>
        {
            format!("{version}.0")
        }
        _ => version.to_string(),
    }
}

/// Operators applied to each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConstraintPolicy {
    pub production: ConstraintOp,
    pub development: ConstraintOp,
}

impl Default for ConstraintPolicy {
    fn default() -> Self {
        Self {
            production: ConstraintOp::CompatibleRelease,
            development: ConstraintOp::AtLeast,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequirementSets {
    pub production: Vec<RequirementEntry>,
    pub development: Vec<RequirementEntry>,
}

impl ConstraintPolicy {
    pub fn apply(&self, partition: &Partition) -> RequirementSets {
        RequirementSets {
            production: partition
                .production
                .iter()
                .map(|record| rewrite(record, self.production))
                .collect(),
            development: partition
                .development
                .iter()
                .map(|record| rewrite(record, self.development))
                .collect(),
        }
    }
}

/// Requirements-file text, one entry per line.
pub fn render_requirements(entries: &[RequirementEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_uses_compatible_release() {
        let entry = rewrite(&PackageRecord::new("foo", "1.2.3"), ConstraintOp::CompatibleRelease);
        assert_eq!(entry.to_string(), "foo~=1.2.3");
    }

    #[test]
    fn development_uses_at_least() {
        let entry = rewrite(&PackageRecord::new("foo", "1.2.3"), ConstraintOp::AtLeast);
        assert_eq!(entry.to_string(), "foo>=1.2.3");
    }

    #[test]
    fn exact_keeps_full_version() {
        let entry = rewrite(&PackageRecord::new("torch", "2.2.0+cpu"), ConstraintOp::Exact);
        assert_eq!(entry.to_string(), "torch==2.2.0+cpu");
    }

    #[test]
    fn local_labels_are_dropped_for_ranges() {
        let record = PackageRecord::new("torch", "2.2.0+cpu");
        assert_eq!(
            rewrite(&record, ConstraintOp::CompatibleRelease).to_string(),
            "torch~=2.2.0"
        );
        assert_eq!(rewrite(&record, ConstraintOp::AtLeast).to_string(), "torch>=2.2.0");
    }

    #[test]
    fn single_segment_release_is_widened_for_compatible_release() {
        let record = PackageRecord::new("tzdata", "2024");
        assert_eq!(
            rewrite(&record, ConstraintOp::CompatibleRelease).to_string(),
            "tzdata~=2024.0"
        );
        assert_eq!(rewrite(&record, ConstraintOp::AtLeast).to_string(), "tzdata>=2024");
    }

    #[test]
    fn name_spelling_is_kept() {
        let entry = rewrite(&PackageRecord::new("some_package", "1.0.0"), ConstraintOp::AtLeast);
        assert_eq!(entry.name, "some_package");
        assert_eq!(entry.constraint, ">=1.0.0");
    }

    #[test]
    fn policy_applies_operator_per_bucket() {
        let partition = Partition {
            production: vec![
                PackageRecord::new("numpy", "1.26.0"),
                PackageRecord::new("opencv-python-headless", "4.9.0"),
            ],
            development: vec![PackageRecord::new("black", "24.1.0")],
        };
        let sets = ConstraintPolicy::default().apply(&partition);
        assert_eq!(
            render_requirements(&sets.production),
            "numpy~=1.26.0\nopencv-python-headless~=4.9.0\n"
        );
        assert_eq!(render_requirements(&sets.development), "black>=24.1.0\n");
    }

    #[test]
    fn empty_sets_render_empty_text() {
        assert_eq!(render_requirements(&[]), "");
    }

    #[test]
    fn operators_parse_from_symbols_and_names() {
        assert_eq!("~=".parse::<ConstraintOp>(), Ok(ConstraintOp::CompatibleRelease));
        assert_eq!("at-least".parse::<ConstraintOp>(), Ok(ConstraintOp::AtLeast));
        assert_eq!(" == ".parse::<ConstraintOp>(), Ok(ConstraintOp::Exact));
        assert!("<".parse::<ConstraintOp>().is_err());
    }
}
