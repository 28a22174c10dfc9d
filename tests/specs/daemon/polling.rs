//! Daemon polling specs
//!
//! Verify a running daemon delivers files and applies post actions.

use crate::prelude::*;
use std::time::Duration;

#[test]
fn delivered_file_is_moved_after_processing() {
    let temp = Project::empty();
    temp.dir("in");
    temp.config(MOVE_CONFIG);
    let daemon = temp.spawn_daemon();

    temp.file("in/report.csv", "a,b,c\n");

    let done = temp.path().join("done/report.csv");
    assert!(wait_for(Duration::from_secs(10), || done.exists()));
    assert!(!temp.path().join("in/report.csv").exists());
    assert!(daemon.terminate().success());
}

#[test]
fn daemon_writes_pid_and_removes_it_on_stop() {
    let temp = Project::empty();
    temp.dir("in");
    temp.config(MOVE_CONFIG);
    let daemon = temp.spawn_daemon();

    let pid = temp.state_path().join("fpolld.pid");
    assert!(pid.exists());

    assert!(daemon.terminate().success());
    assert!(!pid.exists());
}

#[test]
fn second_daemon_on_same_state_fails() {
    let temp = Project::empty();
    temp.dir("in");
    temp.config(MOVE_CONFIG);
    let _daemon = temp.spawn_daemon();

    temp.fpolld()
        .args(&["run", "--config", "fpoll.toml"])
        .fails()
        .stderr_has("daemon already running");
}
