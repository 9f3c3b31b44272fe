use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{Config, EnvSettings, EnvSnapshot, GlobalOptions};
use crate::effects::{PythonRuntime, SharedRuntime};
use crate::errors::SplitError;

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    env: EnvSnapshot,
    runtime: SharedRuntime,
    cwd: PathBuf,
}

impl<'a> CommandContext<'a> {
    /// Creates a context over the live process environment.
    ///
    /// # Errors
    /// Returns an error if the working directory cannot be determined.
    pub fn new(global: &'a GlobalOptions, runtime: SharedRuntime) -> Result<Self> {
        let cwd = env::current_dir().context("unable to determine the working directory")?;
        Ok(Self::with_environment(global, EnvSnapshot::capture(), runtime, cwd))
    }

    pub fn with_environment(
        global: &'a GlobalOptions,
        env: EnvSnapshot,
        runtime: SharedRuntime,
        cwd: PathBuf,
    ) -> Self {
        Self {
            global,
            env,
            runtime,
            cwd,
        }
    }

    pub fn runtime(&self) -> &dyn PythonRuntime {
        self.runtime.as_ref()
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Joins relative paths onto the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    pub fn settings(&self) -> Result<EnvSettings, SplitError> {
        EnvSettings::from_snapshot(&self.env)
    }

    /// Configuration for a project rooted at `root`; `--config` wins over
    /// discovery.
    pub fn config_for(&self, root: &Path) -> Result<Config, SplitError> {
        let explicit = self
            .global
            .config
            .as_deref()
            .map(|path| self.resolve_path(Path::new(path)));
        Config::load(root, explicit.as_deref())
    }
}
