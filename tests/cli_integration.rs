//! Integration tests for the confpatch command-line interface

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SAMPLE: &str = "\
# display setup
section Video
\twidth 800 # screen width
\theight 600
\tsection Modes
\t\tlist (640x480, 800x600)
\tendsection
endsection
verbose 0
";

/// Helper to create a test directory holding one configuration file
fn setup_test_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.cfg"), SAMPLE).unwrap();
    dir
}

/// Helper to run confpatch with a settings file isolated from the user's
fn confpatch(dir: &Path, args: &[&str]) -> Output {
    let settings = dir.join("settings.toml");
    if !settings.exists() {
        fs::write(&settings, "[patch]\nsync = false\n").unwrap();
    }
    Command::new(env!("CARGO_BIN_EXE_confpatch"))
        .arg("--settings")
        .arg(&settings)
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute confpatch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_confpatch"))
        .arg("--help")
        .output()
        .expect("Failed to execute confpatch");

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("confpatch"));
    assert!(text.contains("get"));
    assert!(text.contains("set"));
    assert!(text.contains("merge"));
}

#[test]
fn test_get_value() {
    let dir = setup_test_dir();
    let output = confpatch(dir.path(), &["get", "app.cfg", "/Video/width"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "800\n");

    let output = confpatch(dir.path(), &["get", "app.cfg", "Video/Modes/list"]);
    assert_eq!(stdout(&output), "(640x480, 800x600)\n");
}

#[test]
fn test_get_missing_with_default() {
    let dir = setup_test_dir();
    let output = confpatch(dir.path(), &["get", "app.cfg", "/Video/depth", "--default", "24"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "24\n");
}

#[test]
fn test_get_missing_suggests_tag() {
    let dir = setup_test_dir();
    let output = confpatch(dir.path(), &["get", "app.cfg", "/Video/widht"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"));
    assert!(stderr.contains("width"));
}

#[test]
fn test_set_patches_in_place() {
    let dir = setup_test_dir();
    let output = confpatch(dir.path(), &["set", "app.cfg", "/Video/width", "1024"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("line 3"));

    let patched = fs::read_to_string(dir.path().join("app.cfg")).unwrap();
    assert_eq!(patched, SAMPLE.replace("width 800", "width 1024"));
}

#[test]
fn test_set_dry_run_leaves_file() {
    let dir = setup_test_dir();
    let output = confpatch(
        dir.path(),
        &["set", "app.cfg", "/Video/height", "768", "--dry-run"],
    );
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Would patch"));
    assert!(text.contains("height 768"));

    let unchanged = fs::read_to_string(dir.path().join("app.cfg")).unwrap();
    assert_eq!(unchanged, SAMPLE);
}

#[test]
fn test_set_missing_tag_fails() {
    let dir = setup_test_dir();
    let output = confpatch(dir.path(), &["set", "app.cfg", "/Audio/rate", "48000"]);
    assert!(!output.status.success());

    let unchanged = fs::read_to_string(dir.path().join("app.cfg")).unwrap();
    assert_eq!(unchanged, SAMPLE);
}

#[test]
fn test_list_section() {
    let dir = setup_test_dir();
    let output = confpatch(dir.path(), &["list", "app.cfg", "Video"]);
    assert!(output.status.success());
    let entries: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(entries, vec!["Modes/", "width", "height"]);
}

#[test]
fn test_dump_json() {
    let dir = setup_test_dir();
    let output = confpatch(dir.path(), &["dump", "app.cfg", "--json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["sections"][0]["name"], "Video");
    assert_eq!(json["values"][0]["tag"], "verbose");
    assert_eq!(json["values"][0]["value"], "0");
}

#[test]
fn test_merge_overlay_to_output() {
    let dir = setup_test_dir();
    fs::write(
        dir.path().join("local.cfg"),
        "section Video\n\twidth 1920\n\tsection Modes\n\t\tlist += (1920x1080)\n\tendsection\nendsection\n",
    )
    .unwrap();

    let output = confpatch(
        dir.path(),
        &["merge", "app.cfg", "local.cfg", "-o", "merged.cfg"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = confpatch(dir.path(), &["get", "merged.cfg", "/Video/Modes/list"]);
    assert_eq!(stdout(&output), "(640x480, 800x600, 1920x1080)\n");
    let output = confpatch(dir.path(), &["get", "merged.cfg", "/Video/width"]);
    assert_eq!(stdout(&output), "1920\n");
}

#[test]
fn test_check_reports_malformed_files() {
    let dir = setup_test_dir();
    let nested = dir.path().join("conf.d");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("good.cfg"), "a 1\n").unwrap();
    fs::write(nested.join("bad.cfg"), "a 1\nendsection\n").unwrap();

    let output = confpatch(dir.path(), &["check", "conf.d"]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Extra endsection command in line 2"));

    fs::remove_file(nested.join("bad.cfg")).unwrap();
    let output = confpatch(dir.path(), &["check", "conf.d", "app.cfg"]);
    assert!(output.status.success());
}

#[test]
fn test_invalid_settings_rejected() {
    let dir = setup_test_dir();
    fs::write(dir.path().join("settings.toml"), "[parser]\nmax_line_length = 1\n").unwrap();
    let output = confpatch(dir.path(), &["get", "app.cfg", "/verbose"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("at least 2"));
}
