use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::SplitError;
use crate::scratch::ScratchSpace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactTarget {
    pub path: PathBuf,
    pub contents: String,
}

impl ArtifactTarget {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// True when the file on disk already holds exactly `contents`.
    pub fn is_current(&self) -> bool {
        fs::read(&self.path).is_ok_and(|bytes| bytes == self.contents.as_bytes())
    }
}

/// The production and development requirements files, committed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPair {
    pub production: ArtifactTarget,
    pub development: ArtifactTarget,
}

impl ArtifactPair {
    pub fn targets(&self) -> [&ArtifactTarget; 2] {
        [&self.production, &self.development]
    }

    /// Targets that are missing or differ from their rendered text.
    pub fn stale(&self) -> Vec<PathBuf> {
        self.targets()
            .into_iter()
            .filter(|target| !target.is_current())
            .map(|target| target.path.clone())
            .collect()
    }
}

struct StagedArtifact<'a> {
    target: &'a ArtifactTarget,
    file: NamedTempFile,
    backup: Option<PathBuf>,
}

/// Writes both artifacts or neither. Each file is staged in `scratch` and
/// existing targets are backed up there before anything is replaced; if the
/// second replacement fails the first target is put back.
pub fn commit_artifacts(scratch: &ScratchSpace, pair: &ArtifactPair) -> Result<(), SplitError> {
    let mut staged = Vec::with_capacity(2);
    for (idx, target) in pair.targets().into_iter().enumerate() {
        staged.push(stage(scratch, target, idx)?);
    }

    let mut staged = staged.into_iter();
    let (Some(first), Some(second)) = (staged.next(), staged.next()) else {
        return Ok(());
    };
    let first_path = &first.target.path;
    first
        .file
        .persist(first_path)
        .map_err(|err| SplitError::write(first_path, err.error))?;
    debug!(path = %first_path.display(), "replaced artifact");

    let second_path = &second.target.path;
    if let Err(err) = second.file.persist(second_path) {
        restore(first_path, first.backup.as_deref());
        return Err(SplitError::write(second_path, err.error));
    }
    debug!(path = %second_path.display(), "replaced artifact");
    Ok(())
}

fn stage<'a>(
    scratch: &ScratchSpace,
    target: &'a ArtifactTarget,
    idx: usize,
) -> Result<StagedArtifact<'a>, SplitError> {
    let path = &target.path;
    let existing = match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Some(meta),
        Ok(_) => {
            return Err(SplitError::write(
                path,
                io::Error::other("target exists and is not a regular file"),
            ))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => return Err(SplitError::write(path, err)),
    };

    let mut file = NamedTempFile::new_in(scratch.path()).map_err(|err| SplitError::write(path, err))?;
    file.write_all(target.contents.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|err| SplitError::write(path, err))?;
    let permissions = match &existing {
        Some(meta) => Some(meta.permissions()),
        None => default_permissions(),
    };
    if let Some(permissions) = permissions {
        file.as_file()
            .set_permissions(permissions)
            .map_err(|err| SplitError::write(path, err))?;
    }

    let backup = match existing {
        Some(_) => {
            let backup = scratch.path().join(format!("backup-{idx}"));
            fs::copy(path, &backup).map_err(|err| SplitError::write(path, err))?;
            Some(backup)
        }
        None => None,
    };
    Ok(StagedArtifact {
        target,
        file,
        backup,
    })
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

fn restore(path: &Path, backup: Option<&Path>) {
    let restored = match backup {
        Some(backup) => fs::copy(backup, path).map(|_| ()),
        None => fs::remove_file(path),
    };
    match restored {
        Ok(()) => debug!(path = %path.display(), "rolled back artifact"),
        Err(err) => warn!(path = %path.display(), %err, "failed to roll back artifact"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(dir: &Path, production: &str, development: &str) -> ArtifactPair {
        ArtifactPair {
            production: ArtifactTarget::new(dir.join("requirements.txt"), production),
            development: ArtifactTarget::new(dir.join("requirements-dev.txt"), development),
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn writes_both_files_and_leaves_no_scratch() {
        let out = tempfile::tempdir().expect("tempdir");
        fs::write(out.path().join("requirements.txt"), "stale\n").expect("seed");
        let artifacts = pair(out.path(), "numpy~=1.26.0\n", "black>=24.1.0\n");
        {
            let scratch = ScratchSpace::create_in(out.path()).expect("scratch");
            commit_artifacts(&scratch, &artifacts).expect("commit");
        }
        assert_eq!(
            fs::read_to_string(out.path().join("requirements.txt")).expect("read"),
            "numpy~=1.26.0\n"
        );
        assert_eq!(
            fs::read_to_string(out.path().join("requirements-dev.txt")).expect("read"),
            "black>=24.1.0\n"
        );
        assert_eq!(entries(out.path()), vec!["requirements-dev.txt", "requirements.txt"]);
        assert!(artifacts.stale().is_empty());
    }

    #[test]
    fn empty_artifacts_are_written_as_empty_files() {
        let out = tempfile::tempdir().expect("tempdir");
        let artifacts = pair(out.path(), "", "");
        let scratch = ScratchSpace::create_in(out.path()).expect("scratch");
        commit_artifacts(&scratch, &artifacts).expect("commit");
        assert_eq!(fs::read(out.path().join("requirements.txt")).expect("read"), b"");
    }

    #[test]
    fn failed_second_write_restores_first_target() {
        let out = tempfile::tempdir().expect("tempdir");
        fs::write(out.path().join("requirements.txt"), "old~=1.0\n").expect("seed");
        let artifacts = ArtifactPair {
            production: ArtifactTarget::new(out.path().join("requirements.txt"), "new~=2.0\n"),
            development: ArtifactTarget::new(
                out.path().join("missing").join("requirements-dev.txt"),
                "black>=24.1.0\n",
            ),
        };
        {
            let scratch = ScratchSpace::create_in(out.path()).expect("scratch");
            let err = commit_artifacts(&scratch, &artifacts).unwrap_err();
            assert!(matches!(err, SplitError::Write { ref path, .. } if path.ends_with("missing/requirements-dev.txt")));
        }
        assert_eq!(
            fs::read_to_string(out.path().join("requirements.txt")).expect("read"),
            "old~=1.0\n"
        );
        assert_eq!(entries(out.path()), vec!["requirements.txt"]);
    }

    #[test]
    fn failed_second_write_removes_new_first_target() {
        let out = tempfile::tempdir().expect("tempdir");
        let artifacts = ArtifactPair {
            production: ArtifactTarget::new(out.path().join("requirements.txt"), "new~=2.0\n"),
            development: ArtifactTarget::new(
                out.path().join("missing").join("requirements-dev.txt"),
                "",
            ),
        };
        {
            let scratch = ScratchSpace::create_in(out.path()).expect("scratch");
            commit_artifacts(&scratch, &artifacts).unwrap_err();
        }
        assert!(entries(out.path()).is_empty());
    }

    #[test]
    fn directory_in_the_way_fails_before_writing() {
        let out = tempfile::tempdir().expect("tempdir");
        fs::create_dir(out.path().join("requirements-dev.txt")).expect("mkdir");
        let artifacts = pair(out.path(), "numpy~=1.26.0\n", "black>=24.1.0\n");
        {
            let scratch = ScratchSpace::create_in(out.path()).expect("scratch");
            let err = commit_artifacts(&scratch, &artifacts).unwrap_err();
            assert_eq!(err.reason_code(), "write_failed");
        }
        assert!(!out.path().join("requirements.txt").exists());
    }

    #[test]
    fn stale_lists_missing_and_changed_files() {
        let out = tempfile::tempdir().expect("tempdir");
        fs::write(out.path().join("requirements.txt"), "numpy~=1.26.0\n").expect("seed");
        let artifacts = pair(out.path(), "numpy~=1.26.0\n", "black>=24.1.0\n");
        assert_eq!(artifacts.stale(), vec![out.path().join("requirements-dev.txt")]);
        fs::write(out.path().join("requirements.txt"), "numpy~=1.25.0\n").expect("seed");
        assert_eq!(artifacts.stale().len(), 2);
    }
}
