//! `photon` — a thin smoke-test client for a running `photond` (spec §6).
//!
//! Deliberately minimal: the real clients of the streaming endpoint are
//! machine JSON-RPC callers and the embedded browser UI (out of scope, spec
//! §1). This binary exists for manual poking and CI smoke checks — status,
//! `tools/list`, `tools/call` — the way the teacher keeps a CLI alongside
//! its daemon for the same purpose.

mod client;
mod color;
mod commands;
mod daemon_process;
mod output;
mod table;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{status, tools};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "photon", version, about = "Thin client for photond")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a running photond: tool count, pending photon configuration
    Status(status::StatusArgs),
    /// Interact with the tool catalog
    Tools(tools::ToolsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Cli::command().styles(color::styles()).get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    match cli.command {
        Command::Status(args) => status::run(args, cli.output).await,
        Command::Tools(args) => tools::run(args, cli.output).await,
    }
}
