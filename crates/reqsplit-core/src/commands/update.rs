use std::path::{Path, PathBuf};

use anyhow::Result;
use reqsplit_domain::{partition, render_requirements, RequirementEntry};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{collision_details, UpdateMode, UpdateRequest};
use crate::config::CommandContext;
use crate::errors::SplitError;
use crate::outcome::ExecutionOutcome;
use crate::scan::{locate_project, scan_location};
use crate::scratch::ScratchSpace;
use crate::snapshot::capture_snapshot;
use crate::writer::{commit_artifacts, ArtifactPair, ArtifactTarget};

/// Snapshots the environment, scans the project, and writes (or previews, or
/// checks) the production and development requirements files.
///
/// # Errors
/// Pipeline errors become outcomes; only unexpected internal errors are
/// returned.
pub fn update_requirements(ctx: &CommandContext, request: &UpdateRequest) -> Result<ExecutionOutcome> {
    match run_update(ctx, request) {
        Ok(outcome) => Ok(outcome),
        Err(err) => Ok(err.into_outcome()),
    }
}

fn run_update(ctx: &CommandContext, request: &UpdateRequest) -> Result<ExecutionOutcome, SplitError> {
    let location = locate_project(ctx, request.project.as_deref(), &request.environment)?;
    let home = location.home(ctx.cwd()).to_path_buf();
    let config = ctx.config_for(&home)?;

    let captured = capture_snapshot(ctx, &request.environment, &config)?;
    let normalizer = config.normalizer();
    let collisions = collision_details(&captured.snapshot, &normalizer);

    let report = scan_location(&location, &config.exclude)?;
    let split = partition(&captured.snapshot, &report.imports, &normalizer);
    let sets = config.constraints.apply(&split);
    info!(
        production = sets.production.len(),
        development = sets.development.len(),
        "partitioned installed set"
    );

    let output_dir = match (&request.output_dir, &config.output_dir) {
        (Some(dir), _) => ctx.resolve_path(dir),
        (None, Some(dir)) => dir.clone(),
        (None, None) => home.clone(),
    };
    let pair = ArtifactPair {
        production: ArtifactTarget::new(
            output_dir.join(&config.production_file),
            render_requirements(&sets.production),
        ),
        development: ArtifactTarget::new(
            output_dir.join(&config.development_file),
            render_requirements(&sets.development),
        ),
    };

    let scratch = match request.mode {
        UpdateMode::Write => {
            if !output_dir.is_dir() {
                return Err(SplitError::write(
                    &output_dir,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "output directory does not exist",
                    ),
                ));
            }
            ScratchSpace::create_in(&output_dir)
        }
        UpdateMode::DryRun | UpdateMode::Check => ScratchSpace::create_temp(),
    }
    .map_err(|err| SplitError::write(&output_dir, err))?;
    scratch
        .write_listing("installed.txt", &captured.snapshot.to_freeze_listing())
        .and_then(|_| scratch.write_listing("imports.txt", &report.imports.to_listing()))
        .map_err(|err| SplitError::write(scratch.path(), err))?;

    let mut details = json!({
        "mode": request.mode.as_str(),
        "project": location,
        "source": captured.source,
        "output_dir": output_dir.display().to_string(),
        "production": bucket_details(&pair.production.path, &sets.production),
        "development": bucket_details(&pair.development.path, &sets.development),
        "files_scanned": report.files_scanned,
        "imports": report.imports.iter().collect::<Vec<_>>(),
        "skipped_files": report.skipped,
        "skipped_lines": captured.skipped_lines,
        "excluded": captured.excluded.iter().map(|record| record.pin()).collect::<Vec<_>>(),
        "nonstandard_versions": captured.nonstandard_versions,
        "collisions": collisions,
    });
    let counts = format!(
        "{} production and {} development requirements",
        sets.production.len(),
        sets.development.len()
    );

    let outcome = match request.mode {
        UpdateMode::Write => {
            commit_artifacts(&scratch, &pair)?;
            info!(dir = %output_dir.display(), "wrote requirements");
            details["written"] = json!(true);
            ExecutionOutcome::success(format!("wrote {counts}"), details)
        }
        UpdateMode::DryRun => {
            details["written"] = json!(false);
            ExecutionOutcome::success(format!("would write {counts}"), details)
        }
        UpdateMode::Check => {
            let stale = pair.stale();
            details["written"] = json!(false);
            details["stale"] = json!(paths(&stale));
            if stale.is_empty() {
                ExecutionOutcome::success(format!("requirements are up to date ({counts})"), details)
            } else {
                details["reason"] = json!("requirements_stale");
                details["phase"] = json!("write");
                details["hint"] = json!("run `reqsplit update` to regenerate the requirements files");
                ExecutionOutcome::user_error(
                    format!("{} requirements file(s) are out of date", stale.len()),
                    details,
                )
            }
        }
    };

    if let Err(err) = scratch.close() {
        warn!(%err, "failed to remove scratch directory");
    }
    Ok(outcome)
}

fn bucket_details(path: &Path, entries: &[RequirementEntry]) -> Value {
    json!({
        "path": path.display().to_string(),
        "count": entries.len(),
        "requirements": entries.iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}

fn paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|path| path.display().to_string()).collect()
}
