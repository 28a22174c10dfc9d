//! Shared helpers for specs

#![allow(dead_code)]

use assert_cmd::Command;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub use predicates::prelude::*;

/// Config with one listener over `in/` that moves processed files to `done/`
pub const MOVE_CONFIG: &str = r#"
[[listener]]
name = "inbox"
directory = "in"
frequency = "50ms"
move_to_directory = "done"
"#;

/// A scratch directory used as the daemon's working and state directory
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_path(&self) -> PathBuf {
        self.path().join("state")
    }

    /// Write a file, creating parent directories
    pub fn file(&self, relative: &str, content: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn dir(&self, relative: &str) {
        std::fs::create_dir_all(self.path().join(relative)).unwrap();
    }

    /// Write `fpoll.toml` rooted at this project
    pub fn config(&self, body: &str) {
        let header = format!(
            "working_dir = {:?}\nstate_dir = {:?}\n",
            self.path().display().to_string(),
            self.state_path().display().to_string()
        );
        self.file("fpoll.toml", &format!("{header}{body}"));
    }

    pub fn fpolld(&self) -> Cmd {
        let mut cmd = Command::cargo_bin("fpolld").unwrap();
        cmd.current_dir(self.path());
        cmd.env("RUST_LOG", "info");
        Cmd { cmd }
    }

    /// Start `fpolld run` and wait for READY
    pub fn spawn_daemon(&self) -> Daemon {
        let bin = assert_cmd::cargo::cargo_bin("fpolld");
        let mut child = std::process::Command::new(bin)
            .args(["run", "--config", "fpoll.toml"])
            .current_dir(self.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let mut line = String::new();
        BufReader::new(stdout).read_line(&mut line).unwrap();
        assert_eq!(line.trim(), "READY", "daemon did not report ready");
        Daemon { child }
    }
}

pub struct Cmd {
    cmd: Command,
}

impl Cmd {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn passes(mut self) -> Run {
        Run {
            assert: self.cmd.assert().success(),
        }
    }

    pub fn fails(mut self) -> Run {
        Run {
            assert: self.cmd.assert().failure(),
        }
    }
}

pub struct Run {
    assert: assert_cmd::assert::Assert,
}

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.assert.get_output().stdout).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        Self {
            assert: self.assert.stdout(predicate::str::contains(expected)),
        }
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        Self {
            assert: self.assert.stdout(predicate::str::contains(unexpected).not()),
        }
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        Self {
            assert: self.assert.stderr(predicate::str::contains(expected)),
        }
    }
}

/// A running daemon, terminated with SIGTERM on drop
pub struct Daemon {
    child: Child,
}

impl Daemon {
    /// Send SIGTERM and wait for a clean exit
    pub fn terminate(mut self) -> std::process::ExitStatus {
        self.signal_term();
        self.child.wait().unwrap()
    }

    fn signal_term(&self) {
        let _ = std::process::Command::new("kill")
            .args(["-TERM", &self.child.id().to_string()])
            .status();
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            self.signal_term();
            let _ = self.child.wait();
        }
    }
}

/// Poll `check` until it holds or `timeout` elapses
pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    check()
}
