//! `photon status` (spec §6, ambient CLI scope per SPEC_FULL.md).

use crate::prelude::*;

#[test]
fn reports_not_running_when_no_daemon_is_reachable() {
    cli()
        .env("PHOTON_URL", "http://127.0.0.1:1")
        .args(&["status"])
        .passes()
        .stdout_has("not running");
}

#[test]
fn reports_not_running_as_json() {
    cli()
        .env("PHOTON_URL", "http://127.0.0.1:1")
        .args(&["--output", "json", "status"])
        .passes()
        .stdout_has("\"running\": false");
}

#[test]
fn reports_zero_tools_against_an_empty_daemon() {
    let daemon = Daemon::start_empty();
    daemon.cli().args(&["status"]).passes().stdout_has("0 across 0 photon(s)");
}

#[test]
fn reports_zero_tools_as_json() {
    let daemon = Daemon::start_empty();
    daemon
        .cli()
        .args(&["--output", "json", "status"])
        .passes()
        .stdout_has("\"toolCount\": 0")
        .stdout_has("\"running\": true");
}
