// CLI integration tests for the echo and version flows.
use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::{Value, json};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_echoact");
    Command::new(exe)
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    parse_json(line)
}

fn allparams(stdout: &[u8]) -> Value {
    parse_json_line(stdout)
        .get("allparams")
        .cloned()
        .expect("allparams object")
}

#[test]
fn echo_fills_missing_myparam_with_default() {
    let output = cmd()
        .args(["echo", r#"{"a": 1}"#])
        .output()
        .expect("echo");
    assert!(output.status.success());
    let all = allparams(&output.stdout);
    assert_eq!(all.get("myparam"), Some(&json!("myparam default")));
    assert_eq!(all.get("a"), Some(&json!(1)));
}

#[test]
fn echo_stringifies_supplied_myparam() {
    let output = cmd()
        .args(["echo", r#"{"myparam": 7}"#])
        .output()
        .expect("echo");
    assert!(output.status.success());
    assert_eq!(allparams(&output.stdout).get("myparam"), Some(&json!("7")));

    let output = cmd()
        .args(["echo", r#"{"myparam": "already text"}"#])
        .output()
        .expect("echo");
    assert!(output.status.success());
    assert_eq!(
        allparams(&output.stdout).get("myparam"),
        Some(&json!("already text"))
    );
}

#[test]
fn echo_preserves_other_keys() {
    let output = cmd()
        .args(["echo", r#"{"a": [1, 2], "b": {"nested": true}, "c": null}"#])
        .output()
        .expect("echo");
    assert!(output.status.success());
    let all = allparams(&output.stdout);
    assert_eq!(all.get("a"), Some(&json!([1, 2])));
    assert_eq!(all.get("b"), Some(&json!({"nested": true})));
    assert_eq!(all.get("c"), Some(&json!(null)));
}

#[test]
fn echo_rejects_malformed_json() {
    let output = cmd().args(["echo", "not-json"]).output().expect("echo");
    assert_eq!(output.status.code().unwrap(), 3);
    let err = parse_json_line(&output.stderr);
    assert_eq!(
        err.get("error").and_then(|e| e.get("kind")),
        Some(&json!("Parse"))
    );
}

#[test]
fn echo_rejects_non_object_params() {
    let output = cmd().args(["echo", "[1, 2]"]).output().expect("echo");
    assert_eq!(output.status.code().unwrap(), 3);
}

#[test]
fn echo_without_input_exits_usage() {
    let output = cmd().arg("echo").output().expect("echo");
    assert_eq!(output.status.code().unwrap(), 2);
}

#[test]
fn stamped_echo_reads_build_stamp_env() {
    let output = cmd()
        .args(["echo", "--stamped", "{}"])
        .env("REFRESHED_AT", "2023-01-01")
        .output()
        .expect("echo");
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout);
    let mut lines = text.lines();
    let info = lines.next().expect("info line");
    assert!(info.starts_with("echoact "));
    assert!(info.contains("(2023-01-01)"));

    let payload = parse_json(lines.next().expect("json line"));
    let all = payload.get("allparams").expect("allparams");
    assert_eq!(all.get("actionVersion"), Some(&json!("2023-01-01")));
    let runtime = all
        .get("runtime")
        .and_then(|v| v.as_str())
        .expect("runtime field");
    assert!(runtime.starts_with("echoact/"));
    assert_eq!(all.get("myparam"), Some(&json!("myparam default")));
}

#[test]
fn stamped_echo_falls_back_without_env() {
    let output = cmd()
        .args(["echo", "--stamped", "{}"])
        .env_remove("REFRESHED_AT")
        .output()
        .expect("echo");
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout);
    let payload = parse_json(text.lines().nth(1).expect("json line"));
    assert_eq!(
        payload.get("allparams").and_then(|all| all.get("actionVersion")),
        Some(&json!("no Dockerfile ENV"))
    );
}

#[test]
fn plain_echo_has_no_stamp_fields() {
    let output = cmd().args(["echo", "{}"]).output().expect("echo");
    assert!(output.status.success());
    let all = allparams(&output.stdout);
    assert!(all.get("runtime").is_none());
    assert!(all.get("actionVersion").is_none());
}

#[test]
fn echo_reads_params_from_stdin() {
    let mut child = cmd()
        .args(["echo", "--file", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(br#"{"from": "pipe"}"#)
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    let all = allparams(&output.stdout);
    assert_eq!(all.get("from"), Some(&json!("pipe")));
    assert_eq!(all.get("myparam"), Some(&json!("myparam default")));
}

#[test]
fn echo_reports_missing_params_file() {
    let output = cmd()
        .args(["echo", "--file", "/nonexistent/params.json"])
        .output()
        .expect("echo");
    assert_eq!(output.status.code().unwrap(), 4);
    let err = parse_json_line(&output.stderr);
    assert_eq!(
        err.get("error").and_then(|e| e.get("kind")),
        Some(&json!("Io"))
    );
}

#[test]
fn version_emits_json_on_pipe() {
    let output = cmd().arg("version").output().expect("version");
    assert!(output.status.success());
    let version = parse_json_line(&output.stdout);
    assert_eq!(version.get("name"), Some(&json!("echoact")));
    assert!(version.get("version").and_then(|v| v.as_str()).is_some());
}
