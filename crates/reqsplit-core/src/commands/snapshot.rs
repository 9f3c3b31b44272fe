use anyhow::Result;
use reqsplit_domain::PackageRecord;
use serde_json::json;

use super::{collision_details, SnapshotRequest};
use crate::config::CommandContext;
use crate::errors::SplitError;
use crate::outcome::ExecutionOutcome;
use crate::snapshot::capture_snapshot;

/// Captures and reports the installed set without scanning anything.
///
/// # Errors
/// Pipeline errors become outcomes; only unexpected internal errors are
/// returned.
pub fn show_snapshot(ctx: &CommandContext, request: &SnapshotRequest) -> Result<ExecutionOutcome> {
    match run_snapshot(ctx, request) {
        Ok(outcome) => Ok(outcome),
        Err(err) => Ok(err.into_outcome()),
    }
}

fn run_snapshot(ctx: &CommandContext, request: &SnapshotRequest) -> Result<ExecutionOutcome, SplitError> {
    let config = ctx.config_for(ctx.cwd())?;
    let captured = capture_snapshot(ctx, &request.environment, &config)?;
    let collisions = collision_details(&captured.snapshot, &config.normalizer());
    let pins: Vec<String> = captured.snapshot.iter().map(PackageRecord::pin).collect();
    Ok(ExecutionOutcome::success(
        format!("{} installed packages", pins.len()),
        json!({
            "source": captured.source,
            "packages": pins,
            "excluded": captured.excluded.iter().map(PackageRecord::pin).collect::<Vec<_>>(),
            "skipped_lines": captured.skipped_lines,
            "nonstandard_versions": captured.nonstandard_versions,
            "collisions": collisions,
        }),
    ))
}
