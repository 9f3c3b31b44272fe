use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::SplitError;
use crate::process::DEFAULT_MAX_CAPTURE_BYTES;

pub const PYTHON_ENV: &str = "REQSPLIT_PYTHON";
pub const VIRTUAL_ENV: &str = "VIRTUAL_ENV";
pub const MAX_CAPTURE_ENV: &str = "REQSPLIT_MAX_CAPTURE_BYTES";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
    pub config: Option<String>,
}

/// Process environment captured once per invocation.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Builds a snapshot from explicit pairs instead of the process
    /// environment.
    #[must_use]
    pub fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.var(key).map(str::trim).filter(|value| !value.is_empty())
    }
}

/// Settings read from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSettings {
    pub python: Option<String>,
    pub virtual_env: Option<PathBuf>,
    pub max_capture_bytes: usize,
}

impl EnvSettings {
    pub fn from_snapshot(env: &EnvSnapshot) -> Result<Self, SplitError> {
        let max_capture_bytes = match env.non_empty(MAX_CAPTURE_ENV) {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|bytes| *bytes > 0)
                .ok_or_else(|| SplitError::Config {
                    path: PathBuf::from(MAX_CAPTURE_ENV),
                    reason: format!("expected a positive byte count, found `{raw}`"),
                })?,
            None => DEFAULT_MAX_CAPTURE_BYTES,
        };
        Ok(Self {
            python: env.non_empty(PYTHON_ENV).map(ToString::to_string),
            virtual_env: env.non_empty(VIRTUAL_ENV).map(PathBuf::from),
            max_capture_bytes,
        })
    }
}
