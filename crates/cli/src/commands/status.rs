//! `photon status` — a smoke-test summary of a running `photond` (spec §6
//! `tools/list` + `configuration/list`).

use std::collections::BTreeSet;

use clap::Args;

use crate::client::{ClientError, PhotonClient};
use crate::color;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct StatusArgs {}

pub async fn run(_args: StatusArgs, format: OutputFormat) -> anyhow::Result<()> {
    let client = match PhotonClient::connect().await {
        Ok(client) => client,
        Err(ClientError::DaemonNotRunning(url)) => {
            if format == OutputFormat::Json {
                print_json(&serde_json::json!({ "running": false, "url": url }));
            } else {
                println!("photond: {} ({url})", color::status("errored: not running"));
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let health = client.health().await?;
    let tools = client.tools_list().await?;
    let pending = client.configuration_list().await?;

    let tool_list = tools["tools"].as_array().cloned().unwrap_or_default();
    let owners: BTreeSet<String> = tool_list
        .iter()
        .filter_map(|t| t["name"].as_str())
        .filter_map(|n| n.split_once('.').map(|(owner, _)| owner.to_string()))
        .collect();
    let pending_list = pending["photons"].as_array().cloned().unwrap_or_default();

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "running": true,
            "service": health["service"],
            "toolCount": tool_list.len(),
            "photonCount": owners.len(),
            "pending": pending_list,
        }));
        return Ok(());
    }

    println!("photond: {} ({})", color::status("ready"), PhotonClient::base_url());
    println!("tools:   {} across {} photon(s)", tool_list.len(), owners.len());
    if pending_list.is_empty() {
        println!("pending: none");
    } else {
        let names: Vec<&str> = pending_list.iter().filter_map(|p| p["name"].as_str()).collect();
        println!(
            "pending: {} {}",
            color::status("needs-config"),
            names.join(", ")
        );
    }
    Ok(())
}
