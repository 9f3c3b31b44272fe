//! Walking a project and collecting the imports of every Python file in it.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use reqsplit_domain::{scan_source, ImportSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CommandContext;
use crate::errors::SplitError;
use crate::python::resolve_interpreter;
use crate::snapshot::EnvironmentRequest;

/// Directory names never descended into.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "__pycache__",
    ".git",
    ".venv",
    "venv",
    "build",
    "dist",
    "node_modules",
];

const FIND_SPEC_SCRIPT: &str = r"
import importlib.util
import json
import sys

name = sys.argv[1]
try:
    spec = importlib.util.find_spec(name)
except (ImportError, ValueError):
    spec = None
if spec is None:
    print(json.dumps({'found': False}))
else:
    print(json.dumps({
        'found': True,
        'origin': spec.origin,
        'locations': list(spec.submodule_search_locations or []),
    }))
";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub imports: ImportSet,
    pub files_scanned: usize,
    pub skipped: Vec<SkippedFile>,
}

impl ScanReport {
    fn merge(&mut self, other: ScanReport) {
        self.imports.merge(other.imports);
        self.files_scanned += other.files_scanned;
        self.skipped.extend(other.skipped);
    }

    fn skip(&mut self, path: &Path, reason: String) {
        warn!(path = %path.display(), %reason, "skipping file");
        self.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            reason,
        });
    }
}

/// What a project identifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProjectLocation {
    Directory { path: PathBuf },
    File { path: PathBuf },
    Package { name: String, paths: Vec<PathBuf> },
}

impl ProjectLocation {
    pub fn roots(&self) -> Vec<&Path> {
        match self {
            ProjectLocation::Directory { path } | ProjectLocation::File { path } => {
                vec![path.as_path()]
            }
            ProjectLocation::Package { paths, .. } => paths.iter().map(PathBuf::as_path).collect(),
        }
    }

    /// Directory whose configuration applies, and the default output
    /// directory: the project itself when it is a directory, otherwise the
    /// working directory.
    pub fn home<'a>(&'a self, cwd: &'a Path) -> &'a Path {
        match self {
            ProjectLocation::Directory { path } => path,
            ProjectLocation::File { .. } | ProjectLocation::Package { .. } => cwd,
        }
    }
}

/// Resolves `identifier` as a path first and then as an importable package
/// name. `None` means the working directory.
pub fn locate_project(
    ctx: &CommandContext,
    identifier: Option<&str>,
    request: &EnvironmentRequest,
) -> Result<ProjectLocation, SplitError> {
    let Some(identifier) = identifier.map(str::trim) else {
        return Ok(ProjectLocation::Directory {
            path: ctx.cwd().to_path_buf(),
        });
    };
    let not_found = |reason: &str| SplitError::ProjectNotFound {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };
    if identifier.is_empty() {
        return Err(not_found("empty project identifier"));
    }

    let candidate = ctx.resolve_path(Path::new(identifier));
    if candidate.is_dir() {
        return Ok(ProjectLocation::Directory { path: candidate });
    }
    if candidate.is_file() {
        return Ok(ProjectLocation::File { path: candidate });
    }
    if identifier.contains(['/', '\\']) || identifier.ends_with(".py") {
        return Err(not_found("no such file or directory"));
    }
    if identifier.contains('.') {
        return Err(not_found("only top-level package names can be resolved"));
    }
    if !is_identifier(identifier) {
        return Err(not_found("not a path or an importable package name"));
    }
    resolve_package(ctx, identifier, request)
}

#[derive(Debug, Deserialize)]
struct SpecPayload {
    found: bool,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    locations: Vec<String>,
}

fn resolve_package(
    ctx: &CommandContext,
    name: &str,
    request: &EnvironmentRequest,
) -> Result<ProjectLocation, SplitError> {
    let settings = ctx.settings()?;
    let config = ctx.config_for(ctx.cwd())?;
    let interpreter = resolve_interpreter(ctx.runtime(), request, &settings, &config)?;
    let args = vec![
        "-c".to_string(),
        FIND_SPEC_SCRIPT.to_string(),
        name.to_string(),
    ];
    let output = ctx
        .runtime()
        .run_command(
            &interpreter.path,
            &args,
            &[],
            ctx.cwd(),
            settings.max_capture_bytes,
        )
        .map_err(|err| SplitError::environment(format!("{err:#}")))?;
    if !output.success() {
        return Err(SplitError::environment_with(
            format!("{} exited with code {}", interpreter.path, output.code),
            output.stderr.trim(),
        ));
    }
    let line = output
        .stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    let payload: SpecPayload = serde_json::from_str(line).map_err(|err| {
        SplitError::environment_with(
            format!("unable to parse package lookup from {}", interpreter.path),
            err.to_string(),
        )
    })?;

    let not_found = |reason: &str| SplitError::ProjectNotFound {
        identifier: name.to_string(),
        reason: reason.to_string(),
    };
    if !payload.found {
        return Err(not_found("no importable package by that name"));
    }
    let mut paths: Vec<PathBuf> = payload
        .locations
        .iter()
        .map(PathBuf::from)
        .filter(|path| path.is_dir())
        .collect();
    if paths.is_empty() {
        if let Some(origin) = payload.origin.as_deref() {
            let origin = PathBuf::from(origin);
            if origin.extension().is_some_and(|ext| ext == "py") && origin.is_file() {
                paths.push(origin);
            }
        }
    }
    if paths.is_empty() {
        return Err(not_found("package has no Python source to scan"));
    }
    debug!(package = name, paths = ?paths, "resolved package");
    Ok(ProjectLocation::Package {
        name: name.to_string(),
        paths,
    })
}

/// Scans every root of `location`.
pub fn scan_location(location: &ProjectLocation, exclude: &[String]) -> Result<ScanReport, SplitError> {
    let mut report = ScanReport::default();
    for root in location.roots() {
        report.merge(scan_tree(root, exclude)?);
    }
    info!(
        files = report.files_scanned,
        skipped = report.skipped.len(),
        imports = report.imports.len(),
        "scanned project"
    );
    Ok(report)
}

/// Scans a single file, or walks a directory and scans each `.py` file in
/// it. Files that cannot be read or lexed are skipped and reported.
pub fn scan_tree(root: &Path, exclude: &[String]) -> Result<ScanReport, SplitError> {
    let mut report = ScanReport::default();
    if root.is_file() {
        scan_file(root, &mut report);
        return Ok(report);
    }
    if !root.is_dir() {
        return Err(SplitError::ProjectNotFound {
            identifier: root.display().to_string(),
            reason: "no such file or directory".to_string(),
        });
    }

    let extra: Vec<String> = exclude.to_vec();
    let mut walker = WalkBuilder::new(root);
    walker
        .git_ignore(true)
        .git_exclude(true)
        .require_git(false)
        .parents(false)
        .hidden(true)
        .ignore(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|kind| kind.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !is_excluded_dir(&name, &extra)
        });

    for entry in walker.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                report.skip(root, err.to_string());
                continue;
            }
        };
        if !entry.file_type().is_some_and(|kind| kind.is_file()) {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "py") {
            scan_file(path, &mut report);
        }
    }
    Ok(report)
}

fn scan_file(path: &Path, report: &mut ScanReport) {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            report.skip(path, format!("unable to read file: {err}"));
            return;
        }
    };
    let Ok(source) = String::from_utf8(bytes) else {
        report.skip(path, "file is not valid UTF-8".to_string());
        return;
    };
    match scan_source(&source) {
        Ok(imports) => {
            debug!(path = %path.display(), imports = imports.len(), "scanned file");
            report.files_scanned += 1;
            report.imports.merge(imports);
        }
        Err(err) => report.skip(path, err.to_string()),
    }
}

fn is_excluded_dir(name: &str, extra: &[String]) -> bool {
    DEFAULT_EXCLUDED_DIRS.contains(&name)
        || name.ends_with(".egg-info")
        || extra.iter().any(|excluded| excluded == name)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}
