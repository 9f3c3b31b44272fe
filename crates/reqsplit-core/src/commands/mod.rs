//! Command handlers. Each returns an [`ExecutionOutcome`](crate::ExecutionOutcome);
//! pipeline errors are folded into user-error or failure outcomes rather
//! than propagated.

mod imports;
mod snapshot;
mod update;

use std::path::PathBuf;

use serde_json::{json, Value};
use tracing::warn;

use reqsplit_domain::{find_collisions, EnvironmentSnapshot, NameNormalizer};

pub use imports::list_imports;
pub use snapshot::show_snapshot;
pub use update::update_requirements;

use crate::snapshot::EnvironmentRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    #[default]
    Write,
    /// Render both artifacts without touching the output directory.
    DryRun,
    /// Compare the rendered artifacts to the files on disk.
    Check,
}

impl UpdateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateMode::Write => "write",
            UpdateMode::DryRun => "dry-run",
            UpdateMode::Check => "check",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub project: Option<String>,
    pub environment: EnvironmentRequest,
    pub output_dir: Option<PathBuf>,
    pub mode: UpdateMode,
}

#[derive(Debug, Clone, Default)]
pub struct ImportsRequest {
    pub project: Option<String>,
    pub environment: EnvironmentRequest,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotRequest {
    pub environment: EnvironmentRequest,
}

fn collision_details(snapshot: &EnvironmentSnapshot, normalizer: &NameNormalizer) -> Value {
    let collisions = find_collisions(snapshot, normalizer);
    for collision in &collisions {
        warn!(
            canonical = %collision.canonical,
            names = ?collision.names,
            "installed distributions share a normalized name"
        );
    }
    json!(collisions)
}
