use anyhow::Result;
use serde_json::json;

use super::ImportsRequest;
use crate::config::CommandContext;
use crate::errors::SplitError;
use crate::outcome::ExecutionOutcome;
use crate::scan::{locate_project, scan_location};

/// Lists the top-level modules a project imports, with the distribution name
/// each one normalizes to.
///
/// # Errors
/// Pipeline errors become outcomes; only unexpected internal errors are
/// returned.
pub fn list_imports(ctx: &CommandContext, request: &ImportsRequest) -> Result<ExecutionOutcome> {
    match run_imports(ctx, request) {
        Ok(outcome) => Ok(outcome),
        Err(err) => Ok(err.into_outcome()),
    }
}

fn run_imports(ctx: &CommandContext, request: &ImportsRequest) -> Result<ExecutionOutcome, SplitError> {
    let location = locate_project(ctx, request.project.as_deref(), &request.environment)?;
    let config = ctx.config_for(location.home(ctx.cwd()))?;
    let report = scan_location(&location, &config.exclude)?;
    let normalizer = config.normalizer();

    let imports: Vec<_> = report
        .imports
        .iter()
        .map(|name| json!({ "module": name, "normalized": normalizer.normalize(name) }))
        .collect();
    let message = format!(
        "{} imports in {} files",
        report.imports.len(),
        report.files_scanned
    );
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "project": location,
            "imports": imports,
            "files_scanned": report.files_scanned,
            "skipped_files": report.skipped,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::commands::test_support::context;
    use crate::config::GlobalOptions;
    use crate::outcome::CommandStatus;
    use crate::testing::FakeRuntime;

    #[test]
    fn lists_normalized_imports_and_skips() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("a.py"), "import cv2\nimport some_package.sub\n").expect("write");
        fs::write(temp.path().join("b.py"), "s = '''never closed\n").expect("write");
        let global = GlobalOptions::default();
        let ctx = context(&global, FakeRuntime::default(), temp.path());
        let outcome = list_imports(&ctx, &ImportsRequest::default()).expect("imports");
        assert_eq!(outcome.status, CommandStatus::Ok);
        assert_eq!(outcome.details["imports"][0]["module"], "cv2");
        assert_eq!(outcome.details["imports"][0]["normalized"], "opencv-python-headless");
        assert_eq!(outcome.details["imports"][1]["normalized"], "some-package");
        assert_eq!(outcome.details["files_scanned"], 1);
        assert_eq!(outcome.details["skipped_files"].as_array().map(Vec::len), Some(1));
        assert_eq!(outcome.message, "2 imports in 1 files");
    }

    #[test]
    fn missing_project_is_a_user_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let global = GlobalOptions::default();
        let ctx = context(&global, FakeRuntime::default(), temp.path());
        let request = ImportsRequest {
            project: Some("./missing".to_string()),
            ..ImportsRequest::default()
        };
        let outcome = list_imports(&ctx, &request).expect("imports");
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.details["reason"], "project_not_found");
        assert_eq!(outcome.details["phase"], "scan");
    }
}
