//! `photon tools list` / `photon tools call` (spec §6 `tools/list`,
//! `tools/call`).

use crate::prelude::*;

#[test]
fn list_against_an_empty_daemon_prints_nothing() {
    let daemon = Daemon::start_empty();
    let stdout = daemon.cli().args(&["tools", "list"]).passes().stdout();
    assert!(stdout.is_empty());
}

#[test]
fn list_as_json_is_an_empty_array() {
    let daemon = Daemon::start_empty();
    daemon
        .cli()
        .args(&["--output", "json", "tools", "list"])
        .passes()
        .stdout_has("\"tools\": []");
}

#[test]
fn call_against_unknown_tool_fails_with_not_found() {
    let daemon = Daemon::start_empty();
    daemon
        .cli()
        .args(&["tools", "call", "nope.method"])
        .fails()
        .stderr_has("NotFound");
}

#[test]
fn call_rejects_unqualified_name() {
    let daemon = Daemon::start_empty();
    daemon.cli().args(&["tools", "call", "not-qualified"]).fails();
}

#[test]
fn call_accepts_key_value_arguments() {
    let daemon = Daemon::start_empty();
    daemon
        .cli()
        .args(&["tools", "call", "nope.method", "--arg", "count=3", "--arg", "label=hi"])
        .fails()
        .stderr_has("NotFound");
}

#[test]
fn call_rejects_args_and_args_json_together() {
    let daemon = Daemon::start_empty();
    daemon
        .cli()
        .args(&["tools", "call", "nope.method", "--arg", "a=1", "--args-json", "{}"])
        .fails();
}
