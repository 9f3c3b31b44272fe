use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Config, EnvSettings};
use crate::effects::PythonRuntime;
use crate::errors::SplitError;
use crate::snapshot::EnvironmentRequest;

/// Where the chosen interpreter came from, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterSource {
    Flag,
    Venv,
    EnvVar,
    Config,
    ActiveVenv,
    Path,
}

impl InterpreterSource {
    pub fn as_str(self) -> &'static str {
        match self {
            InterpreterSource::Flag => "--python",
            InterpreterSource::Venv => "--venv",
            InterpreterSource::EnvVar => "REQSPLIT_PYTHON",
            InterpreterSource::Config => "config",
            InterpreterSource::ActiveVenv => "VIRTUAL_ENV",
            InterpreterSource::Path => "PATH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub path: String,
    pub source: InterpreterSource,
}

/// Picks the interpreter whose environment is queried: `--python`, `--venv`,
/// `REQSPLIT_PYTHON`, config `python`, `VIRTUAL_ENV`, then `PATH`.
pub fn resolve_interpreter(
    runtime: &dyn PythonRuntime,
    request: &EnvironmentRequest,
    settings: &EnvSettings,
    config: &Config,
) -> Result<Interpreter, SplitError> {
    let chosen = if let Some(python) = &request.python {
        Interpreter {
            path: python.clone(),
            source: InterpreterSource::Flag,
        }
    } else if let Some(venv) = &request.venv {
        Interpreter {
            path: venv_python(venv)?,
            source: InterpreterSource::Venv,
        }
    } else if let Some(python) = &settings.python {
        Interpreter {
            path: python.clone(),
            source: InterpreterSource::EnvVar,
        }
    } else if let Some(python) = &config.python {
        Interpreter {
            path: python.clone(),
            source: InterpreterSource::Config,
        }
    } else if let Some(venv) = &settings.virtual_env {
        Interpreter {
            path: venv_python(venv)?,
            source: InterpreterSource::ActiveVenv,
        }
    } else {
        let path = runtime
            .detect_interpreter()
            .map_err(|err| SplitError::environment(format!("{err:#}")))?;
        Interpreter {
            path,
            source: InterpreterSource::Path,
        }
    };
    debug!(python = %chosen.path, source = chosen.source.as_str(), "selected interpreter");
    Ok(chosen)
}

fn venv_python(venv: &Path) -> Result<String, SplitError> {
    let candidates: [PathBuf; 3] = [
        venv.join("bin").join("python"),
        venv.join("bin").join("python3"),
        venv.join("Scripts").join("python.exe"),
    ];
    candidates
        .iter()
        .find(|candidate| candidate.is_file())
        .map(|candidate| candidate.display().to_string())
        .ok_or_else(|| {
            SplitError::environment(format!(
                "no python interpreter found in virtual environment {}",
                venv.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::testing::FakeRuntime;

    fn settings(python: Option<&str>, venv: Option<&Path>) -> EnvSettings {
        EnvSettings {
            python: python.map(ToString::to_string),
            virtual_env: venv.map(Path::to_path_buf),
            max_capture_bytes: 1024,
        }
    }

    fn make_venv() -> tempfile::TempDir {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("bin")).expect("bin");
        fs::write(temp.path().join("bin").join("python"), "").expect("python");
        temp
    }

    #[test]
    fn flag_wins_over_everything() {
        let request = EnvironmentRequest {
            python: Some("/flag/python".into()),
            ..EnvironmentRequest::default()
        };
        let config = Config {
            python: Some("/config/python".into()),
            ..Config::default()
        };
        let chosen = resolve_interpreter(
            &FakeRuntime::default(),
            &request,
            &settings(Some("/env/python"), None),
            &config,
        )
        .expect("interpreter");
        assert_eq!(chosen.path, "/flag/python");
        assert_eq!(chosen.source, InterpreterSource::Flag);
    }

    #[test]
    fn env_var_wins_over_config_and_active_venv() {
        let venv = make_venv();
        let config = Config {
            python: Some("/config/python".into()),
            ..Config::default()
        };
        let chosen = resolve_interpreter(
            &FakeRuntime::default(),
            &EnvironmentRequest::default(),
            &settings(Some("/env/python"), Some(venv.path())),
            &config,
        )
        .expect("interpreter");
        assert_eq!(chosen.source, InterpreterSource::EnvVar);
    }

    #[test]
    fn active_venv_is_used_before_path() {
        let venv = make_venv();
        let chosen = resolve_interpreter(
            &FakeRuntime::default(),
            &EnvironmentRequest::default(),
            &settings(None, Some(venv.path())),
            &Config::default(),
        )
        .expect("interpreter");
        assert_eq!(chosen.source, InterpreterSource::ActiveVenv);
        assert!(chosen.path.ends_with("python"));
    }

    #[test]
    fn falls_back_to_detection() {
        let chosen = resolve_interpreter(
            &FakeRuntime::default(),
            &EnvironmentRequest::default(),
            &settings(None, None),
            &Config::default(),
        )
        .expect("interpreter");
        assert_eq!(chosen.path, "python3");
        assert_eq!(chosen.source, InterpreterSource::Path);
    }

    #[test]
    fn venv_without_interpreter_is_unavailable() {
        let empty = tempfile::tempdir().expect("tempdir");
        let request = EnvironmentRequest {
            venv: Some(empty.path().to_path_buf()),
            ..EnvironmentRequest::default()
        };
        let err = resolve_interpreter(
            &FakeRuntime::default(),
            &request,
            &settings(None, None),
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.reason_code(), "environment_unavailable");
    }

    #[test]
    fn missing_interpreter_on_path_is_unavailable() {
        let runtime = FakeRuntime {
            interpreter: None,
            ..FakeRuntime::default()
        };
        let err = resolve_interpreter(
            &runtime,
            &EnvironmentRequest::default(),
            &settings(None, None),
            &Config::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no python interpreter"));
    }
}
