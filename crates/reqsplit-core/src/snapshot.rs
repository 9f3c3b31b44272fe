use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use pep440_rs::Version;
use reqsplit_domain::{
    parse_freeze, EnvironmentSnapshot, PackageRecord, SkippedLine,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{CommandContext, Config};
use crate::errors::SplitError;
use crate::python::resolve_interpreter;

const SNAPSHOT_SCRIPT: &str = r"
import importlib.metadata as im
import json

packages = []
for dist in im.distributions():
    name = dist.metadata.get('Name') if dist.metadata else None
    if not name:
        continue
    packages.append({'name': name.strip(), 'version': (dist.version or '').strip()})
print(json.dumps({'packages': packages}))
";

/// How the installed set is obtained for one invocation.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentRequest {
    pub python: Option<String>,
    pub venv: Option<PathBuf>,
    /// A `pip freeze` listing read instead of querying an interpreter.
    pub installed: Option<PathBuf>,
    /// Keep distributions on the skip list when querying an interpreter.
    pub include_all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SnapshotSource {
    Interpreter { python: String },
    Listing { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct CapturedSnapshot {
    pub snapshot: EnvironmentSnapshot,
    pub source: SnapshotSource,
    pub skipped_lines: Vec<SkippedLine>,
    /// Interpreter records dropped by the skip list.
    pub excluded: Vec<PackageRecord>,
    /// Pins whose version is not valid PEP 440.
    pub nonstandard_versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SnapshotPayload {
    packages: Vec<SnapshotEntry>,
}

#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

/// Captures the installed set once. Every later phase works from the
/// returned value.
pub fn capture_snapshot(
    ctx: &CommandContext,
    request: &EnvironmentRequest,
    config: &Config,
) -> Result<CapturedSnapshot, SplitError> {
    // A supplied listing already is the snapshot: its order is kept and
    // nothing is left out. Only the unordered interpreter payload is sorted
    // and filtered through the skip list.
    let (snapshot, source, skipped_lines, excluded) = match &request.installed {
        Some(path) => {
            let path = ctx.resolve_path(path);
            let (snapshot, skipped) = read_listing(&path)?;
            (snapshot, SnapshotSource::Listing { path }, skipped, Vec::new())
        }
        None => {
            let (snapshot, python) = query_interpreter(ctx, request, config)?;
            let snapshot = snapshot.sorted_by_name();
            let (snapshot, excluded) = if request.include_all {
                (snapshot, Vec::new())
            } else {
                snapshot.without(&config.skip)
            };
            for record in &excluded {
                debug!(package = record.name(), "left out by skip list");
            }
            (snapshot, SnapshotSource::Interpreter { python }, Vec::new(), excluded)
        }
    };

    let mut nonstandard_versions = Vec::new();
    for record in &snapshot {
        debug!(package = record.name(), version = record.version(), "installed");
        if Version::from_str(record.version()).is_err() {
            warn!(
                package = record.name(),
                version = record.version(),
                "version is not PEP 440; kept verbatim"
            );
            nonstandard_versions.push(record.pin());
        }
    }
    info!(packages = snapshot.len(), "captured installed set");

    Ok(CapturedSnapshot {
        snapshot,
        source,
        skipped_lines,
        excluded,
        nonstandard_versions,
    })
}

fn read_listing(path: &std::path::Path) -> Result<(EnvironmentSnapshot, Vec<SkippedLine>), SplitError> {
    let text = fs::read_to_string(path).map_err(|err| {
        SplitError::environment_with(
            format!("unable to read installed listing {}", path.display()),
            err.to_string(),
        )
    })?;
    let listing = parse_freeze(&text);
    for skipped in &listing.skipped {
        warn!(
            line = skipped.line,
            text = %skipped.text,
            reason = %skipped.reason,
            "skipping installed listing line"
        );
    }
    Ok((listing.snapshot, listing.skipped))
}

fn query_interpreter(
    ctx: &CommandContext,
    request: &EnvironmentRequest,
    config: &Config,
) -> Result<(EnvironmentSnapshot, String), SplitError> {
    let settings = ctx.settings()?;
    let interpreter = resolve_interpreter(ctx.runtime(), request, &settings, config)?;
    let python = interpreter.path;
    let args = vec!["-c".to_string(), SNAPSHOT_SCRIPT.to_string()];
    let envs = vec![("PYTHONIOENCODING".to_string(), "utf-8".to_string())];
    let output = ctx
        .runtime()
        .run_command(&python, &args, &envs, ctx.cwd(), settings.max_capture_bytes)
        .map_err(|err| SplitError::environment(format!("{err:#}")))?;
    if !output.success() {
        return Err(SplitError::environment_with(
            format!("{python} exited with code {}", output.code),
            output.stderr.trim(),
        ));
    }
    if output.truncated {
        return Err(SplitError::environment(format!(
            "{python} produced more than {} bytes; raise REQSPLIT_MAX_CAPTURE_BYTES",
            settings.max_capture_bytes
        )));
    }
    let snapshot = parse_payload(&output.stdout).map_err(|reason| {
        SplitError::environment_with(
            format!("unable to parse package listing from {python}"),
            reason,
        )
    })?;
    Ok((snapshot, python))
}

/// Reads the last non-empty stdout line so that interpreter start-up noise
/// does not break parsing.
fn parse_payload(stdout: &str) -> Result<EnvironmentSnapshot, String> {
    let line = stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| "interpreter printed nothing".to_string())?;
    let payload: SnapshotPayload = serde_json::from_str(line).map_err(|err| err.to_string())?;
    let records = payload.packages.into_iter().filter_map(|entry| {
        let version = entry.version.unwrap_or_default();
        if entry.name.trim().is_empty() || version.trim().is_empty() {
            debug!(package = %entry.name, "distribution without name or version ignored");
            return None;
        }
        Some(PackageRecord::new(entry.name.trim(), version.trim()))
    });
    Ok(EnvironmentSnapshot::from_records(records))
}
