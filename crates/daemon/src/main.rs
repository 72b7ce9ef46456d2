//! Photon control plane daemon (`photond`): background process hosting the
//! registry, federation layer, subscription manager, watchers, and the
//! streamable transport.

use clap::Parser;
use photon_daemon::config::{Config, PORT_PROBE_ATTEMPTS};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Photon control plane daemon. Typically started by the `photon` CLI and
/// not invoked directly; listens on a probed local port for the streamable
/// transport.
#[derive(Parser)]
#[command(name = "photond", version, about)]
struct Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    Cli::parse();

    let config = Config::load()?;
    photon_daemon::logging::rotate_log_if_needed(&config.log_path);
    let log_guard = photon_daemon::logging::setup_logging(&config)?;

    let _lock_file = match photon_daemon::lock::acquire(&config.lock_path) {
        Ok(file) => file,
        Err(photon_daemon::lock::LockError::AlreadyRunning(_)) => {
            let pid = photon_daemon::lock::read_pid(&config.lock_path);
            eprintln!("photond is already running");
            if let Some(pid) = pid {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to acquire single-instance lock: {e}");
            return Err(e.into());
        }
    };

    info!("starting photon control plane daemon");

    let daemon = photon_daemon::build(&config).await?;

    let (listener, bound_port) = match bind_with_port_probe(&config).await {
        Some(pair) => pair,
        None => {
            error!(
                "failed to bind to any port in range {}-{} on {}",
                config.bind_port,
                config.bind_port.saturating_add(PORT_PROBE_ATTEMPTS - 1),
                config.bind_host
            );
            drop(log_guard);
            std::process::exit(1);
        }
    };

    info!("listening on {}:{}", config.bind_host, bound_port);
    println!("READY {}", bound_port);

    axum::serve(listener, daemon.router).with_graceful_shutdown(shutdown_signal()).await?;

    info!("photond stopped");
    Ok(())
}

/// Probe `PORT_PROBE_ATTEMPTS` consecutive ports starting at
/// `config.bind_port`, returning the first successful bind (spec §6 "bind
/// failure after port-probe exhaustion").
async fn bind_with_port_probe(config: &Config) -> Option<(TcpListener, u16)> {
    for offset in 0..PORT_PROBE_ATTEMPTS {
        let port = config.bind_port.checked_add(offset)?;
        let addr = format!("{}:{port}", config.bind_host);
        if let Ok(listener) = TcpListener::bind(&addr).await {
            return Some((listener, port));
        }
    }
    None
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(_) => return,
    };
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }
}
