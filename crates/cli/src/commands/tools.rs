//! `photon tools list` / `photon tools call` (spec §6 `tools/list`,
//! `tools/call`).

use clap::{Args, Subcommand};
use serde_json::Value;

use crate::client::PhotonClient;
use crate::output::{print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct ToolsArgs {
    #[command(subcommand)]
    pub command: ToolsCommand,
}

#[derive(Subcommand)]
pub enum ToolsCommand {
    /// List every ready method exposed by photons and connected external servers
    List(ListArgs),
    /// Invoke a fully-qualified method (e.g. `git-box.status`)
    Call(CallArgs),
}

#[derive(Args)]
pub struct ListArgs {}

#[derive(Args)]
pub struct CallArgs {
    /// Fully-qualified method name, `<photon-or-server>.<method>`
    pub name: String,

    /// A `key=value` argument; value is parsed as JSON if possible,
    /// otherwise passed through as a string. May be repeated.
    #[arg(long = "arg", value_parser = parse_key_val)]
    pub args: Vec<(String, Value)>,

    /// Pass the full call arguments as a raw JSON object, overriding `--arg`
    #[arg(long = "args-json", conflicts_with = "args")]
    pub args_json: Option<String>,
}

fn parse_key_val(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

pub async fn run(args: ToolsArgs, format: OutputFormat) -> anyhow::Result<()> {
    match args.command {
        ToolsCommand::List(args) => list(args, format).await,
        ToolsCommand::Call(args) => call(args, format).await,
    }
}

async fn list(_args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let client = PhotonClient::connect().await?;
    let result = client.tools_list().await?;

    if format == OutputFormat::Json {
        print_json(&result);
        return Ok(());
    }

    let mut table = Table::new(vec![
        Column::left("NAME"),
        Column::left("OUTPUT").with_max(12),
        Column::left("DESCRIPTION").with_max(60),
    ]);
    for tool in result["tools"].as_array().cloned().unwrap_or_default() {
        table.row(vec![
            tool["name"].as_str().unwrap_or_default().to_string(),
            tool["outputFormat"].as_str().unwrap_or("-").to_string(),
            tool["description"].as_str().unwrap_or_default().to_string(),
        ]);
    }
    table.render(&mut std::io::stdout());
    Ok(())
}

async fn call(args: CallArgs, format: OutputFormat) -> anyhow::Result<()> {
    let client = PhotonClient::connect_or_start().await?;
    let arguments = if let Some(raw) = &args.args_json {
        serde_json::from_str(raw)?
    } else {
        let mut map = serde_json::Map::new();
        for (k, v) in args.args {
            map.insert(k, v);
        }
        Value::Object(map)
    };

    let result = client.tools_call(&args.name, arguments).await?;

    if format == OutputFormat::Json {
        print_json(&result);
    } else {
        match serde_json::to_string_pretty(&result) {
            Ok(s) => println!("{s}"),
            Err(_) => println!("{result}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_key_val_accepts_json_value() {
        let (k, v) = parse_key_val("count=3").unwrap();
        assert_eq!(k, "count");
        assert_eq!(v, Value::from(3));
    }

    #[test]
    fn parse_key_val_falls_back_to_string() {
        let (k, v) = parse_key_val("token=abc").unwrap();
        assert_eq!(k, "token");
        assert_eq!(v, Value::String("abc".to_string()));
    }

    #[test]
    fn parse_key_val_rejects_missing_equals() {
        assert!(parse_key_val("no-equals-here").is_err());
    }

    #[test]
    fn parse_key_val_accepts_json_object_value() {
        let (k, v) = parse_key_val(r#"opts={"a":1}"#).unwrap();
        assert_eq!(k, "opts");
        assert_eq!(v, serde_json::json!({"a": 1}));
    }
}
