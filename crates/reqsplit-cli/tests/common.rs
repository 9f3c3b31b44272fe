#![allow(dead_code)]

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use assert_cmd::assert::Assert;
use serde_json::Value;
use tempfile::TempDir;

pub fn prepare_fixture(prefix: &str) -> (TempDir, PathBuf) {
    let temp = tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("tempdir");
    let dst = temp.path().join("sample_app");
    copy_dir_all(&fixture_source(), &dst).expect("copy fixture");
    (temp, dst)
}

pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

pub fn fixture_source() -> PathBuf {
    workspace_root().join("fixtures").join("sample_app")
}

fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stdout(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

pub fn find_python() -> Option<String> {
    let candidates = [
        std::env::var("PYTHON").ok(),
        Some("python3".to_string()),
        Some("python".to_string()),
    ];
    for candidate in candidates.into_iter().flatten() {
        let status = std::process::Command::new(&candidate)
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
        if matches!(status, Ok(code) if code.success()) {
            return Some(candidate);
        }
    }
    None
}

pub const PRODUCTION: &str = "\
requests~=2.31.0
numpy~=1.26.0
opencv-python-headless~=4.9.0.80
scikit-learn~=1.4.0
some_package~=1.0.0
";

pub const DEVELOPMENT: &str = "\
black>=24.1.0
pytest>=8.0.0
pip>=24.0
";
