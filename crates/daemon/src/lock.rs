//! Single-instance lock: an exclusive `flock` on the PID file, the same
//! acquire-before-truncate shape as the teacher's `lifecycle::startup_inner`
//! (open without truncating, lock, then write the PID so a losing process
//! never wipes the winner's file).

use fs2::FileExt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("another photond is already running: {0}")]
    AlreadyRunning(io::Error),
    #[error("failed to access lock file: {0}")]
    Io(#[from] io::Error),
}

/// Acquire the single-instance lock, writing this process's pid. The
/// returned file must be kept open for the process lifetime; the lock is
/// released on drop or process exit.
pub fn acquire(lock_path: &Path) -> Result<File, LockError> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(lock_path)?;
    file.try_lock_exclusive().map_err(LockError::AlreadyRunning)?;

    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Read the pid recorded in an existing (held-by-someone-else) lock file,
/// for a human-readable "already running" message.
pub fn read_pid(lock_path: &Path) -> Option<String> {
    std::fs::read_to_string(lock_path).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("daemon.pid");

        let first = acquire(&lock_path).unwrap();
        let second = acquire(&lock_path);
        assert!(matches!(second, Err(LockError::AlreadyRunning(_))));
        drop(first);
    }

    #[test]
    fn acquire_writes_own_pid() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("daemon.pid");

        let _file = acquire(&lock_path).unwrap();
        assert_eq!(read_pid(&lock_path), Some(std::process::id().to_string()));
    }

    #[test]
    fn acquire_can_be_reacquired_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("daemon.pid");

        let first = acquire(&lock_path).unwrap();
        drop(first);
        let second = acquire(&lock_path);
        assert!(second.is_ok());
    }
}
