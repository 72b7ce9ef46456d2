//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for black-box testing of `photon` (the CLI)
//! and `photond` (the daemon it talks to).

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// Aggressive timeouts for fast tests.
const PHOTON_CLI_TIMEOUT_MS: &str = "2000";
const PHOTON_CLI_CONNECT_TIMEOUT_MS: &str = "2000";

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

/// Returns the path to a binary, checking llvm-cov target directory first.
/// This works with both standard builds and llvm-cov coverage runs.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale (e.g. compiled by a removed worktree into a
/// shared target directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Returns the path to the `photon` CLI binary.
fn photon_binary() -> PathBuf {
    binary_path("photon")
}

/// Returns the path to the `photond` daemon binary.
pub fn photond_binary() -> PathBuf {
    binary_path("photond")
}

/// Create a CLI builder for `photon` commands.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions.
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                ("PHOTON_DAEMON_BINARY".into(), photond_binary().to_string_lossy().into()),
                ("PHOTON_CLI_TIMEOUT_MS".into(), PHOTON_CLI_TIMEOUT_MS.into()),
                ("PHOTON_CLI_CONNECT_TIMEOUT_MS".into(), PHOTON_CLI_CONNECT_TIMEOUT_MS.into()),
            ],
        }
    }

    /// Add CLI arguments.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set working directory.
    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    /// Set environment variable.
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string_lossy().to_string()));
        self
    }

    /// Build the command without running it.
    pub fn command(self) -> Command {
        let mut cmd = Command::new(photon_binary());
        cmd.args(&self.args);

        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    /// Run and expect success (exit code 0).
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code).
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(!stdout.contains(unexpected), "stdout should not contain '{unexpected}'\nstdout: {stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain '{expected}'\nstderr: {stderr}");
        self
    }
}

/// Poll a condition until it returns true or the timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// A temporary photon working directory plus an isolated daemon state dir,
/// with an owned background `photond` process (spec §4.1 "List roots",
/// §6 "Startup").
pub struct Daemon {
    _working_dir: tempfile::TempDir,
    state_dir: tempfile::TempDir,
    child: std::process::Child,
    port: u16,
}

impl Daemon {
    /// Start `photond` against an empty working directory (no `.photon.ts`
    /// candidates, so startup never shells out to a photon runtime) and
    /// wait for its `READY <port>` line on stdout.
    pub fn start_empty() -> Self {
        let working_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();

        let mut child = Command::new(photond_binary())
            .env("PHOTON_WORKING_DIR", working_dir.path())
            .env("PHOTON_STATE_DIR", state_dir.path())
            .env("PHOTON_CONFIG_PATH", state_dir.path().join("config.json"))
            .env("PHOTON_HOST", "127.0.0.1")
            // A non-zero base lets `photond`'s own port-probe (spec §6) pick
            // a free port when several instances race for it in parallel
            // test threads; port 0 is avoided since the probe loop reports
            // back the requested candidate, not the kernel-assigned one.
            .env("PHOTON_PORT", next_test_port().to_string())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .expect("photond should spawn");

        let port = read_ready_port(&mut child);

        Self { _working_dir: working_dir, state_dir, child, port }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Environment overrides a `photon` CLI invocation needs to reach this
    /// daemon instead of auto-starting (or probing) a different one.
    pub fn cli(&self) -> CliBuilder {
        cli().env("PHOTON_URL", self.base_url().as_str())
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Hands out a distinct starting port per `Daemon::start_empty()` call so
/// concurrently-running tests don't all race `photond`'s port-probe for the
/// same base port (each still tolerates losing that race up to
/// `PORT_PROBE_ATTEMPTS` times).
fn next_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static NEXT: AtomicU16 = AtomicU16::new(18_173);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

fn read_ready_port(child: &mut std::process::Child) -> u16 {
    use std::io::{BufRead, BufReader};
    let stdout = child.stdout.take().expect("photond stdout should be piped");
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let line = line.expect("photond stdout should be valid UTF-8");
        if let Some(rest) = line.strip_prefix("READY ") {
            return rest.trim().parse().expect("READY line should carry a port number");
        }
    }
    panic!("photond exited before printing READY");
}
