use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};

use crate::effects::PythonRuntime;
use crate::process::RunOutput;

/// Scripted interpreter: each invocation is answered by the first output
/// whose needle appears in its arguments.
pub(crate) struct FakeRuntime {
    pub interpreter: Option<String>,
    pub outputs: Vec<(&'static str, RunOutput)>,
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self {
            interpreter: Some("python3".to_string()),
            outputs: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeRuntime {
    pub(crate) fn answering(mut self, needle: &'static str, code: i32, stdout: &str) -> Self {
        self.outputs.push((
            needle,
            RunOutput {
                code,
                stdout: stdout.to_string(),
                stderr: if code == 0 { String::new() } else { "Traceback: boom".to_string() },
                truncated: false,
            },
        ));
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }
}

impl PythonRuntime for FakeRuntime {
    fn detect_interpreter(&self) -> Result<String> {
        self.interpreter
            .clone()
            .ok_or_else(|| anyhow!("no python interpreter found on PATH"))
    }

    fn run_command(
        &self,
        python: &str,
        args: &[String],
        _env: &[(String, String)],
        _cwd: &Path,
        _limit: usize,
    ) -> Result<RunOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((python.to_string(), args.to_vec()));
        }
        for (needle, output) in &self.outputs {
            if args.iter().any(|arg| arg.contains(needle)) {
                return Ok(output.clone());
            }
        }
        bail!("failed to start {python}: unexpected invocation")
    }
}
