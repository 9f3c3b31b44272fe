use std::io;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::json;

use crate::outcome::ExecutionOutcome;

/// Pipeline stage a fatal error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Config,
    Snapshot,
    Scan,
    Write,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Config => "config",
            Phase::Snapshot => "snapshot",
            Phase::Scan => "scan",
            Phase::Write => "write",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("installed packages could not be queried: {reason}")]
    EnvironmentUnavailable {
        reason: String,
        detail: Option<String>,
    },
    #[error("project `{identifier}` could not be located: {reason}")]
    ProjectNotFound { identifier: String, reason: String },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl SplitError {
    pub(crate) fn environment(reason: impl Into<String>) -> Self {
        SplitError::EnvironmentUnavailable {
            reason: reason.into(),
            detail: None,
        }
    }

    pub(crate) fn environment_with(reason: impl Into<String>, detail: impl Into<String>) -> Self {
        SplitError::EnvironmentUnavailable {
            reason: reason.into(),
            detail: Some(detail.into()),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SplitError::Write {
            path: path.into(),
            source,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            SplitError::EnvironmentUnavailable { .. } => Phase::Snapshot,
            SplitError::ProjectNotFound { .. } => Phase::Scan,
            SplitError::Write { .. } => Phase::Write,
            SplitError::Config { .. } => Phase::Config,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            SplitError::EnvironmentUnavailable { .. } => "environment_unavailable",
            SplitError::ProjectNotFound { .. } => "project_not_found",
            SplitError::Write { .. } => "write_failed",
            SplitError::Config { .. } => "invalid_config",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            SplitError::EnvironmentUnavailable { .. } => {
                "activate the environment, pass --python/--venv, or supply --installed FILE"
            }
            SplitError::ProjectNotFound { .. } => {
                "pass a source directory or the import name of an installed package"
            }
            SplitError::Write { .. } => "check permissions and free space for the output directory",
            SplitError::Config { .. } => "fix the reqsplit configuration and rerun the command",
        }
    }

    /// Environment and write failures abort the run; configuration and lookup
    /// problems are the caller's to fix.
    pub fn into_outcome(self) -> ExecutionOutcome {
        let mut details = json!({
            "reason": self.reason_code(),
            "phase": self.phase().as_str(),
            "error": self.to_string(),
            "hint": self.hint(),
        });
        match &self {
            SplitError::EnvironmentUnavailable {
                detail: Some(detail),
                ..
            } => {
                details["detail"] = json!(detail);
            }
            SplitError::Write { path, .. } | SplitError::Config { path, .. } => {
                details["path"] = json!(path.display().to_string());
            }
            _ => {}
        }
        let message = self.to_string();
        match self {
            SplitError::EnvironmentUnavailable { .. } | SplitError::Write { .. } => {
                ExecutionOutcome::failure(message, details)
            }
            SplitError::ProjectNotFound { .. } | SplitError::Config { .. } => {
                ExecutionOutcome::user_error(message, details)
            }
        }
    }
}
