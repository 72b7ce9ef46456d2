//! Filesystem watcher pipeline (spec §4.5 "Filesystem watcher").

use crate::debounce::Debouncer;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;

/// Filesystem debounce (spec §5 Timeouts).
pub const FS_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to start filesystem watcher: {0}")]
    Notify(#[from] notify::Error),
}

/// Map a changed path to the photon it belongs to, per spec §4.5: a direct
/// `<name>.photon.ts` file maps to `<name>`; a path of the form
/// `<name>/...` maps to `<name>` only if a known photon by that name
/// exists. Data files are filtered out by the caller via [`is_ignored`]
/// before this is called.
pub fn map_path_to_photon(path: &Path, working_dir: &Path, is_known: impl Fn(&str) -> bool) -> Option<String> {
    let rel = path.strip_prefix(working_dir).ok()?;
    let mut components = rel.components();
    let first = components.next()?.as_os_str().to_str()?;

    if let Some(name) = first.strip_suffix(".photon.ts") {
        if components.next().is_none() {
            return Some(name.to_string());
        }
        return None;
    }

    if is_known(first) {
        return Some(first.to_string());
    }
    None
}

/// Data files the photon writes itself are ignored to avoid reload loops
/// (spec §4.5: `*.json`, `boards/*`, `data.json`).
pub fn is_ignored(path: &Path, working_dir: &Path) -> bool {
    let Some(rel) = path.strip_prefix(working_dir).ok() else {
        return false;
    };
    if rel.components().any(|c| c.as_os_str() == "boards") {
        return true;
    }
    let is_nested = rel.components().count() > 1;
    let is_json = rel.extension().and_then(|e| e.to_str()) == Some("json");
    is_nested && is_json
}

/// Spawns a recursive `notify` watcher on `working_dir` plus any extra
/// per-photon asset directories (for photons resolved via symlink whose
/// real target lies outside the working directory), debounces per photon
/// name, and yields the name of each photon that should be reloaded.
pub struct PhotonFsWatcher {
    _watchers: Vec<RecommendedWatcher>,
}

impl PhotonFsWatcher {
    pub fn start(
        working_dir: PathBuf,
        extra_roots: Vec<PathBuf>,
        is_known: impl Fn(&str) -> bool + Send + Sync + 'static,
        out_tx: mpsc::Sender<String>,
    ) -> Result<Self, WatchError> {
        let (raw_tx, mut raw_rx) = mpsc::channel::<PathBuf>(256);

        let mut watchers = Vec::new();
        let watch_root = |root: &Path| -> Result<RecommendedWatcher, WatchError> {
            let tx = raw_tx.clone();
            let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
                if let Ok(event) = res {
                    for path in event.paths {
                        let _ = tx.blocking_send(path);
                    }
                }
            })?;
            watcher.watch(root, RecursiveMode::Recursive)?;
            Ok(watcher)
        };

        watchers.push(watch_root(&working_dir)?);
        for root in &extra_roots {
            watchers.push(watch_root(root)?);
        }

        tokio::spawn(async move {
            let mut debouncer: Debouncer<String> = Debouncer::new(FS_DEBOUNCE);
            let mut tick = tokio::time::interval(Duration::from_millis(20));
            loop {
                tokio::select! {
                    maybe_path = raw_rx.recv() => {
                        let Some(path) = maybe_path else { break };
                        if is_ignored(&path, &working_dir) {
                            continue;
                        }
                        if let Some(name) = map_path_to_photon(&path, &working_dir, &is_known) {
                            debouncer.touch(name, Instant::now());
                        }
                    }
                    _ = tick.tick() => {
                        for name in debouncer.drain_ready(Instant::now()) {
                            if out_tx.send(name).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self { _watchers: watchers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_photon_file_maps_to_its_name() {
        let root = Path::new("/work");
        let path = Path::new("/work/git-box.photon.ts");
        assert_eq!(map_path_to_photon(path, root, |_| false), Some("git-box".to_string()));
    }

    #[test]
    fn nested_path_maps_only_if_name_known() {
        let root = Path::new("/work");
        let path = Path::new("/work/git-box/assets/icon.svg");
        assert_eq!(map_path_to_photon(path, root, |n| n == "git-box"), Some("git-box".to_string()));
        assert_eq!(map_path_to_photon(path, root, |_| false), None);
    }

    #[test]
    fn data_json_under_photon_dir_is_ignored() {
        let root = Path::new("/work");
        assert!(is_ignored(Path::new("/work/git-box/data.json"), root));
        assert!(is_ignored(Path::new("/work/git-box/boards/card.txt"), root));
        assert!(!is_ignored(Path::new("/work/git-box.photon.ts"), root));
    }

    #[test]
    fn top_level_photon_file_is_never_ignored_even_though_it_has_no_json_extension() {
        let root = Path::new("/work");
        assert!(!is_ignored(Path::new("/work/git-box.photon.ts"), root));
    }
}
