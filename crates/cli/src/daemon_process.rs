//! Background `photond` spawn, mirroring the teacher's
//! `start_daemon_background`/`find_ojd_binary` pattern (resolve sibling
//! binary relative to the current executable, with a debug-build
//! `CARGO_MANIFEST_DIR` fallback), simplified: no version file, no
//! single-instance PID bookkeeping here — `photond` owns its own lock
//! (spec §5 "the configuration file is written atomically").

use std::path::PathBuf;
use std::process::Command;

use crate::client::ClientError;

/// Start `photond` detached, inheriting no stdio so the CLI process can exit
/// independently of it.
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let photond_path = find_photond_binary()?;
    Command::new(&photond_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

fn find_photond_binary() -> Result<PathBuf, ClientError> {
    if let Ok(path) = std::env::var("PHOTON_DAEMON_BINARY") {
        return Ok(PathBuf::from(path));
    }

    let current_exe = std::env::current_exe().ok();

    // Only trust CARGO_MANIFEST_DIR when the CLI itself is a debug build, so
    // a release `photon` binary never picks up a stray dev-tree `photond`.
    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .map(|s| s.contains("target/debug"))
        .unwrap_or(false);

    if is_debug_build {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let dev_path = PathBuf::from(manifest_dir)
                .join("../../target/debug/photond")
                .canonicalize()
                .unwrap_or_else(|_| PathBuf::from("photond"));
            if dev_path.exists() {
                return Ok(dev_path);
            }
        }
    }

    if let Some(exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("photond");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    Ok(PathBuf::from("photond"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_bare_name_when_nothing_resolves() {
        std::env::remove_var("PHOTON_DAEMON_BINARY");
        let path = find_photond_binary().unwrap();
        assert!(!path.as_os_str().is_empty());
    }

    #[test]
    fn honors_explicit_override() {
        std::env::set_var("PHOTON_DAEMON_BINARY", "/usr/local/bin/photond");
        let path = find_photond_binary().unwrap();
        assert_eq!(path, PathBuf::from("/usr/local/bin/photond"));
        std::env::remove_var("PHOTON_DAEMON_BINARY");
    }
}
