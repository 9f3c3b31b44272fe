use assert_cmd::cargo::cargo_bin_cmd;

mod common;

use common::{parse_json, prepare_fixture, stdout};

#[test]
fn imports_lists_top_level_modules() {
    let (_tmp, project) = prepare_fixture("imports-json");
    let assert = cargo_bin_cmd!("reqsplit")
        .current_dir(&project)
        .args(["--json", "imports"])
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "ok");
    let modules: Vec<&str> = payload["details"]["imports"]
        .as_array()
        .expect("imports array")
        .iter()
        .filter_map(|entry| entry["module"].as_str())
        .collect();
    assert_eq!(
        modules,
        vec!["cv2", "json", "numpy", "os", "requests", "sklearn", "some_package", "typing"]
    );
    assert_eq!(payload["details"]["files_scanned"], 3);
    let skipped = payload["details"]["skipped_files"]
        .as_array()
        .expect("skipped array");
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0]["path"]
        .as_str()
        .is_some_and(|path| path.ends_with("legacy.py")));
}

#[test]
fn imports_shows_alias_targets() {
    let (_tmp, project) = prepare_fixture("imports-human");
    let assert = cargo_bin_cmd!("reqsplit")
        .current_dir(&project)
        .arg("imports")
        .assert()
        .success();
    let out = stdout(&assert);
    assert!(out.contains("reqsplit imports: 8 imports in 3 files"), "{out}");
    assert!(out.contains("cv2 → opencv-python-headless"), "{out}");
    assert!(out.contains("warning: skipped"), "{out}");
}

#[test]
fn imports_scans_a_single_file() {
    let (_tmp, project) = prepare_fixture("imports-file");
    let assert = cargo_bin_cmd!("reqsplit")
        .current_dir(&project)
        .args(["--json", "imports", "sample_app/helpers.py"])
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(payload["details"]["files_scanned"], 1);
    assert_eq!(payload["details"]["project"]["kind"], "file");
}

#[test]
fn missing_project_is_a_user_error() {
    let (_tmp, project) = prepare_fixture("imports-missing");
    let assert = cargo_bin_cmd!("reqsplit")
        .current_dir(&project)
        .env_remove("VIRTUAL_ENV")
        .env_remove("REQSPLIT_PYTHON")
        .args(["--json", "imports", "does-not-exist", "--python", "/nonexistent/bin/python3"])
        .assert()
        .code(1);
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(payload["details"]["reason"], "project_not_found");
}
