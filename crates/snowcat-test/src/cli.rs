//! CLI regression tests for the `snowcat` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in
//! flag names, exit codes, and output formats.
//!
//! Run with: `cargo test -p snowcat-test`
//! Requires the `snowcat` binary to be built first (`cargo build -p snowcat`).

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use crate::fixture;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `snowcat` binary.
fn snowcat() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("snowcat").expect("snowcat binary not found, run `cargo build -p snowcat`")
}

// ---------------------------------------------------------------------------
// snowcat --version / --help
// ---------------------------------------------------------------------------

#[test]
fn version_includes_parser_version() {
    snowcat()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("parser: snowcat-blueprint"));
}

#[test]
fn help_lists_commands() {
    snowcat()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("lint"))
        .stdout(contains("html"))
        .stdout(contains("mock"));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    snowcat().arg("frobnicate").assert().failure().code(2);
}

// ---------------------------------------------------------------------------
// snowcat lint
// ---------------------------------------------------------------------------

#[test]
fn lint_clean_document_prints_ok() {
    snowcat()
        .arg("lint")
        .arg(fixture("notes.apib"))
        .assert()
        .success()
        .stdout("OK\n");
}

#[test]
fn lint_annotated_document_prints_table_and_exits_one() {
    snowcat()
        .arg("lint")
        .arg(fixture("invalid.apib"))
        .assert()
        .failure()
        .code(1)
        .stdout(contains("Char Index|Description"))
        .stdout(contains("7:1"))
        .stdout(contains("999"));
}

#[test]
fn lint_missing_file_exits_one() {
    snowcat()
        .args(["lint", "this-file-does-not-exist.apib"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("file does not exist"));
}

// ---------------------------------------------------------------------------
// snowcat html / json / apib
// ---------------------------------------------------------------------------

#[test]
fn html_to_stdout() {
    snowcat()
        .arg("html")
        .arg(fixture("notes.apib"))
        .assert()
        .success()
        .stdout(contains("<title>Notes API</title>"))
        .stdout(contains("/notes/{id}"));
}

#[test]
fn html_to_file_prints_notice() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("docs.html");

    snowcat()
        .arg("html")
        .arg(fixture("notes.apib"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("docs.html: HTML has been generated!"));

    let html = fs::read_to_string(&out).unwrap();
    assert!(html.contains("Notes API"));
}

#[test]
fn html_quiet_suppresses_notice() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("docs.html");

    snowcat()
        .arg("html")
        .arg(fixture("notes.apib"))
        .arg("-o")
        .arg(&out)
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(out.exists());
}

#[test]
fn html_custom_template_file() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("t.html");
    fs::write(&template, "<h1>{{title}}</h1>").unwrap();

    snowcat()
        .arg("html")
        .arg(fixture("notes.apib"))
        .arg("-t")
        .arg(&template)
        .assert()
        .success()
        .stdout("<h1>Notes API</h1>\n");
}

#[test]
fn html_unknown_template_exits_one() {
    snowcat()
        .arg("html")
        .arg(fixture("notes.apib"))
        .args(["-t", "no-such-template"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("unknown template"));
}

#[test]
fn html_invalid_document_exits_one() {
    snowcat()
        .arg("html")
        .arg(fixture("invalid.apib"))
        .assert()
        .failure()
        .code(1);
}

#[test]
fn json_outputs_document_model() {
    let output = snowcat()
        .arg("json")
        .arg(fixture("notes.apib"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let s = String::from_utf8(output).expect("stdout should be valid UTF-8");
    let v: serde_json::Value = serde_json::from_str(&s).expect("json output should be valid JSON");
    assert_eq!(v["name"], "Notes API");
    assert_eq!(v["metadata"][0], serde_json::json!(["FORMAT", "1A"]));
}

#[test]
fn json_to_file_prints_notice() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("api.json");

    snowcat()
        .arg("json")
        .arg(fixture("notes.apib"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("api.json: API element JSON has been generated!"));
}

#[test]
fn apib_expands_includes() {
    snowcat()
        .arg("apib")
        .arg(fixture("includes/main.apib"))
        .assert()
        .success()
        .stdout(contains("# Library API"))
        .stdout(contains("## Books [/books]"))
        .stdout(contains("include(").not());
}

#[test]
fn apib_to_file_prints_notice() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("full.apib");

    snowcat()
        .arg("apib")
        .arg(fixture("includes/main.apib"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("full.apib: API blueprint has been generated!"));
}

#[test]
fn invalid_watch_interval_exits_one() {
    snowcat()
        .arg("apib")
        .arg(fixture("notes.apib"))
        .args(["--watch", "--watch-interval", "soon"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("--watch-interval"));
}

#[test]
fn zero_watch_interval_exits_one() {
    snowcat()
        .arg("apib")
        .arg(fixture("notes.apib"))
        .args(["--watch", "--watch-interval", "0s"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("greater than zero"));
}

// ---------------------------------------------------------------------------
// snowcat list
// ---------------------------------------------------------------------------

#[test]
fn list_prints_route_table() {
    snowcat()
        .arg("list")
        .arg(fixture("notes.apib"))
        .assert()
        .success()
        .stdout(
            "GET\t200\t/notes\n\
             POST\t201\t/notes\n\
             GET\t200\t/notes/{id}\n\
             GET\t404\t/notes/{id}\n\
             DELETE\t204\t/notes/{id}\n",
        );
}

#[test]
fn list_merges_in_argument_order() {
    let output = snowcat()
        .arg("list")
        .arg(fixture("shadow.apib"))
        .arg(fixture("users.apib"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let s = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = s.lines().collect();
    assert_eq!(lines, vec!["GET\t503\t/notes", "GET\t200\t/users/{id}"]);
}

#[test]
fn list_requires_input() {
    snowcat().arg("list").assert().failure().code(2);
}

#[test]
fn list_missing_file_exits_one() {
    snowcat()
        .args(["list", "missing.apib"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("missing.apib"));
}

// ---------------------------------------------------------------------------
// snowcat mock
// ---------------------------------------------------------------------------

#[test]
fn mock_invalid_bind_exits_one() {
    snowcat()
        .arg("mock")
        .arg(fixture("notes.apib"))
        .args(["--bind", "not-an-address"])
        .assert()
        .failure()
        .code(1);
}
