//! `photond` startup, port-probe, and health behavior (spec §6 "Startup",
//! "bind failure after port-probe exhaustion").

use crate::prelude::*;
use serde_json::{json, Value};

#[tokio::test]
async fn empty_working_dir_starts_and_serves_health() {
    let daemon = Daemon::start_empty();

    let body: Value = reqwest::get(format!("{}/health", daemon.base_url())).await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "photond");
}

#[tokio::test]
async fn empty_working_dir_reports_no_tools_or_pending_photons() {
    let daemon = Daemon::start_empty();

    let result = rpc_call(&daemon, "tools/list", Value::Null).await;
    assert_eq!(result["tools"].as_array().unwrap().len(), 0);

    let result = rpc_call(&daemon, "configuration/list", Value::Null).await;
    assert_eq!(result["photons"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn initialize_reports_tools_capability() {
    let daemon = Daemon::start_empty();
    let result = rpc_call(&daemon, "initialize", json!({})).await;
    assert_eq!(result["serverInfo"]["name"], "photond");
    assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
}

#[tokio::test]
async fn unknown_method_returns_method_not_found() {
    let daemon = Daemon::start_empty();
    let err = rpc_error(&daemon, "not/a/method", Value::Null).await;
    assert_eq!(err["code"], -32601);
}

#[tokio::test]
async fn tools_call_with_unqualified_name_is_invalid_params() {
    let daemon = Daemon::start_empty();
    let err = rpc_error(&daemon, "tools/call", json!({ "name": "not-qualified", "arguments": {} })).await;
    assert_eq!(err["code"], -32602);
}

#[tokio::test]
async fn tools_call_against_unknown_owner_is_not_found() {
    let daemon = Daemon::start_empty();
    let err = rpc_error(&daemon, "tools/call", json!({ "name": "nope.method", "arguments": {} })).await;
    assert_eq!(err["data"]["kind"], "NotFound");
}

#[tokio::test]
async fn two_daemons_probe_to_distinct_ports() {
    let first = Daemon::start_empty();
    let second = Daemon::start_empty();
    assert_ne!(first.base_url(), second.base_url());

    let first_health: Value = reqwest::get(format!("{}/health", first.base_url())).await.unwrap().json().await.unwrap();
    let second_health: Value = reqwest::get(format!("{}/health", second.base_url())).await.unwrap().json().await.unwrap();
    assert_eq!(first_health["status"], "ok");
    assert_eq!(second_health["status"], "ok");
}

async fn rpc(daemon: &Daemon, method: &str, params: Value) -> Value {
    let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 });
    reqwest::Client::new()
        .post(format!("{}/mcp", daemon.base_url()))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn rpc_call(daemon: &Daemon, method: &str, params: Value) -> Value {
    let resp = rpc(daemon, method, params).await;
    resp["result"].clone()
}

async fn rpc_error(daemon: &Daemon, method: &str, params: Value) -> Value {
    let resp = rpc(daemon, method, params).await;
    resp["error"].clone()
}
