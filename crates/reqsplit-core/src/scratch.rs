use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use tracing::debug;

/// Per-run working directory. Everything placed here (listings, staged
/// artifacts, backups) is removed when the value is dropped.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Creates the scratch directory inside `parent` so staged files can be
    /// renamed onto their targets.
    pub fn create_in(parent: &Path) -> io::Result<Self> {
        let dir = Builder::new().prefix(".reqsplit-").tempdir_in(parent)?;
        debug!(path = %dir.path().display(), "created scratch directory");
        Ok(Self { dir })
    }

    pub fn create_temp() -> io::Result<Self> {
        let dir = Builder::new().prefix("reqsplit-").tempdir()?;
        debug!(path = %dir.path().display(), "created scratch directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_listing(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Removes the directory now and reports failures that drop would hide.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_is_removed_on_drop() {
        let parent = tempfile::tempdir().expect("tempdir");
        let path = {
            let scratch = ScratchSpace::create_in(parent.path()).expect("scratch");
            scratch.write_listing("installed.txt", "numpy==1.26.0\n").expect("write");
            assert!(scratch.path().join("installed.txt").is_file());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
        assert_eq!(fs::read_dir(parent.path()).expect("read").count(), 0);
    }

    #[test]
    fn close_removes_directory() {
        let scratch = ScratchSpace::create_temp().expect("scratch");
        let path = scratch.path().to_path_buf();
        scratch.close().expect("close");
        assert!(!path.exists());
    }
}
