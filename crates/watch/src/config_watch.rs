//! Config watcher pipeline (spec §4.5 "Config watcher").

use crate::debounce::Debouncer;
use crate::fs_watch::WatchError;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use photon_core::external::ExternalServerTransport;
use photon_core::ConfigEnvelope;
use photon_storage::ConfigStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

/// Config-file debounce (spec §5 Timeouts).
pub const CONFIG_DEBOUNCE: Duration = Duration::from_millis(500);

/// A single key the debouncer tracks; there is only ever one, but the
/// shared [`Debouncer`] type wants something `Eq + Hash`.
const CONFIG_KEY: &str = "config";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerChange {
    Added(String, ExternalServerTransport),
    Removed(String),
    Modified(String, ExternalServerTransport),
}

/// Diff two `mcpServers` maps into added / removed / modified edits (spec
/// §4.5: "diff `mcpServers` into added / removed / modified").
pub fn diff_mcp_servers(
    old: &HashMap<String, ExternalServerTransport>,
    new: &HashMap<String, ExternalServerTransport>,
) -> Vec<ServerChange> {
    let mut changes = Vec::new();

    for (name, config) in new {
        match old.get(name) {
            None => changes.push(ServerChange::Added(name.clone(), config.clone())),
            Some(prev) if prev != config => {
                changes.push(ServerChange::Modified(name.clone(), config.clone()))
            }
            Some(_) => {}
        }
    }
    for name in old.keys() {
        if !new.contains_key(name) {
            changes.push(ServerChange::Removed(name.clone()));
        }
    }

    changes
}

/// Watches the directory containing the configuration envelope (watching
/// the parent handles atomic-rename writes correctly, spec §4.5) and
/// emits the federation edits implied by each debounced change.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn start(
        config_path: PathBuf,
        initial: ConfigEnvelope,
        out_tx: mpsc::Sender<Vec<ServerChange>>,
    ) -> Result<Self, WatchError> {
        let watch_dir = config_path.parent().map(|p| p.to_path_buf()).unwrap_or_else(|| PathBuf::from("."));

        let (raw_tx, mut raw_rx) = mpsc::channel::<()>(64);
        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if res.is_ok() {
                let _ = raw_tx.blocking_send(());
            }
        })?;
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        tokio::spawn(async move {
            let store = ConfigStore::new(config_path.clone());
            let mut current = initial;
            let mut debouncer: Debouncer<&'static str> = Debouncer::new(CONFIG_DEBOUNCE);
            let mut tick = tokio::time::interval(Duration::from_millis(50));

            loop {
                tokio::select! {
                    maybe = raw_rx.recv() => {
                        if maybe.is_none() {
                            break;
                        }
                        debouncer.touch(CONFIG_KEY, Instant::now());
                    }
                    _ = tick.tick() => {
                        if debouncer.drain_ready(Instant::now()).is_empty() {
                            continue;
                        }
                        match store.load() {
                            Ok(next) => {
                                let changes = diff_mcp_servers(&current.mcp_servers, &next.mcp_servers);
                                current = next;
                                if !changes.is_empty() && out_tx.send(changes).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => warn!(error = %e, "failed to reload configuration after change"),
                        }
                    }
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stdio(command: &str) -> ExternalServerTransport {
        ExternalServerTransport::Stdio {
            command: command.to_string(),
            args: vec![],
            env: HashMap::new(),
            cwd: None,
        }
    }

    #[test]
    fn detects_added_removed_and_modified_servers() {
        let old = HashMap::from([
            ("kept-same".to_string(), stdio("a")),
            ("will-remove".to_string(), stdio("b")),
            ("will-modify".to_string(), stdio("c")),
        ]);
        let new = HashMap::from([
            ("kept-same".to_string(), stdio("a")),
            ("will-modify".to_string(), stdio("c-v2")),
            ("newcomer".to_string(), stdio("d")),
        ]);

        let mut changes = diff_mcp_servers(&old, &new);
        changes.sort_by_key(|c| match c {
            ServerChange::Added(n, _) => format!("a:{n}"),
            ServerChange::Removed(n) => format!("r:{n}"),
            ServerChange::Modified(n, _) => format!("m:{n}"),
        });

        assert_eq!(
            changes,
            vec![
                ServerChange::Added("newcomer".to_string(), stdio("d")),
                ServerChange::Modified("will-modify".to_string(), stdio("c-v2")),
                ServerChange::Removed("will-remove".to_string()),
            ]
        );
    }

    #[test]
    fn no_changes_yields_empty_diff() {
        let servers = HashMap::from([("a".to_string(), stdio("x"))]);
        assert!(diff_mcp_servers(&servers, &servers).is_empty());
    }
}
