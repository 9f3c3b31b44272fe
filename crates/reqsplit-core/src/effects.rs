use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};

use crate::process::{self, RunOutput};

/// Seam between the pipeline and the interpreter it queries. Tests swap in a
/// scripted runtime.
pub trait PythonRuntime: Send + Sync {
    /// First `python3` or `python` found on `PATH`.
    fn detect_interpreter(&self) -> Result<String>;

    fn run_command(
        &self,
        python: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
        limit: usize,
    ) -> Result<RunOutput>;
}

pub type SharedRuntime = Arc<dyn PythonRuntime>;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPythonRuntime;

impl SystemPythonRuntime {
    #[must_use]
    pub fn shared() -> SharedRuntime {
        Arc::new(Self)
    }
}

impl PythonRuntime for SystemPythonRuntime {
    fn detect_interpreter(&self) -> Result<String> {
        for candidate in ["python3", "python"] {
            if let Ok(path) = which::which(candidate) {
                return path
                    .into_os_string()
                    .into_string()
                    .map_err(|_| anyhow!("non-utf8 path"));
            }
        }
        bail!("no python interpreter found on PATH; pass --python or set REQSPLIT_PYTHON");
    }

    fn run_command(
        &self,
        python: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
        limit: usize,
    ) -> Result<RunOutput> {
        process::run_command(python, args, env, cwd, limit)
    }
}
