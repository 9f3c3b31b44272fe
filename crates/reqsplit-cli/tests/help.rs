use assert_cmd::cargo::cargo_bin_cmd;

#[test]
fn help_lists_commands() {
    let assert = cargo_bin_cmd!("reqsplit").arg("--help").assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for command in ["update", "imports", "snapshot"] {
        assert!(out.contains(command), "help missing {command}: {out}");
    }
}

#[test]
fn update_help_mentions_check() {
    let assert = cargo_bin_cmd!("reqsplit")
        .args(["update", "--help"])
        .assert()
        .success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(out.contains("--check"), "{out}");
    assert!(out.contains("--dry-run"), "{out}");
}

#[test]
fn conflicting_modes_are_rejected() {
    cargo_bin_cmd!("reqsplit")
        .args(["update", "--check", "--dry-run"])
        .assert()
        .failure();
}
